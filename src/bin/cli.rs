// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! sdfscad CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use sdfscad::diagnostics::{Level, MemorySink};
use sdfscad::io::{export_stl, read_scad_file};
use sdfscad::{Config, Interpreter, Kernel};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sdfscad")]
#[command(about = "OpenSCAD-style language compiler producing SDF geometry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./sdfscad.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a SCAD file to an STL mesh
    Render {
        /// Input SCAD file
        input: PathBuf,

        /// Output STL file
        #[arg(short, long)]
        output: PathBuf,

        /// Grid cells along the longest axis
        #[arg(short, long)]
        resolution: Option<u32>,
    },

    /// Compile a SCAD file and print its IR as JSON
    Ir {
        /// Input SCAD file
        input: PathBuf,

        /// Output JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compile and evaluate a SCAD file, reporting diagnostics
    Check {
        /// Input SCAD file
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "sdfscad=debug" } else { "sdfscad=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            let mut config = Config::from_file(path)?;
            config.apply_overrides(|key| std::env::var(key).ok());
            Ok(config)
        }
        None => Config::load(),
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Render {
            input,
            output,
            resolution,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(resolution) = resolution {
                config.mesh.resolution = *resolution;
            }
            render_command(input, output, config, cli.verbose)
        }
        Commands::Ir { input, output } => {
            let config = load_config(cli.config.as_deref())?;
            ir_command(input, output.as_deref(), config)
        }
        Commands::Check { input } => {
            let config = load_config(cli.config.as_deref())?;
            check_command(input, config)
        }
        Commands::Version => {
            println!("sdfscad v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn render_command(input: &Path, output: &Path, config: Config, verbose: bool) -> Result<()> {
    let kernel = Kernel::with_config(config);

    let start = Instant::now();
    let mesh = kernel.mesh_file(input)?;
    let render_time = start.elapsed();

    if verbose {
        println!("Rendered in {:.2?}", render_time);
        println!("Vertices: {}", mesh.vertex_count());
        println!("Triangles: {}", mesh.triangle_count());
        println!("Hash: {}", mesh.content_hash());
    }

    export_stl(&mesh, output)?;
    println!(
        "{} {} -> {}",
        "Rendered".green(),
        input.display(),
        output.display()
    );
    Ok(())
}

fn ir_command(input: &Path, output: Option<&Path>, config: Config) -> Result<()> {
    let source = read_scad_file(input)?;
    let program = Kernel::with_config(config).compile(&source)?;
    let json = serde_json::to_string_pretty(&program).context("Failed to serialize IR")?;

    match output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}

fn check_command(input: &Path, config: Config) -> Result<()> {
    let sink = MemorySink::new();
    let interpreter = Interpreter::new()
        .with_config(config)
        .with_diagnostics(sink.clone());
    let kernel = Kernel::with_interpreter(interpreter);

    let source = read_scad_file(input)?;
    let result = kernel.evaluate(&source);

    for (level, message) in sink.entries() {
        match level {
            Level::Warning => println!("{} {}", "WARNING:".yellow(), message),
            Level::Error => println!("{} {}", "ERROR:".red(), message),
            _ => println!("{}", message),
        }
    }

    let geometries = result?;
    let (flat, solid) = geometries
        .iter()
        .fold((0, 0), |(f, s), g| if g.is_2d() { (f + 1, s) } else { (f, s + 1) });
    println!(
        "{} {} top-level geometries ({} 3-D, {} 2-D)",
        "OK".green().bold(),
        geometries.len(),
        solid,
        flat
    );
    Ok(())
}
