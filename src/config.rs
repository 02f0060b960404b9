// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Runtime and meshing configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file looked up by [`Config::load`]
pub const CONFIG_FILE: &str = "sdfscad.toml";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default smoothing radii of the combinators
    pub smoothing: SmoothingDefaults,
    /// Mesh extraction settings
    pub mesh: MeshConfig,
    /// Font lookup settings used by `text`
    pub fonts: FontSettings,
    /// Maximum nesting of user function and module calls
    pub max_recursion_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smoothing: SmoothingDefaults::default(),
            mesh: MeshConfig::default(),
            fonts: FontSettings::default(),
            max_recursion_depth: 1000,
        }
    }
}

/// Smoothing parameter `k` used when a combinator call omits it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingDefaults {
    pub union: f64,
    pub intersection: f64,
    pub difference: f64,
    pub blend: f64,
}

impl Default for SmoothingDefaults {
    fn default() -> Self {
        Self {
            union: 1.0,
            intersection: 0.0,
            difference: 0.0,
            blend: 0.5,
        }
    }
}

/// Marching-tetrahedra grid settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Grid cells along the longest bounding-box axis
    pub resolution: u32,
    /// Extra padding around the bounds, in cells
    pub margin: f64,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            resolution: 64,
            margin: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontSettings {
    /// Directory scanned for `.ttf`/`.otf` files
    pub cache_dir: PathBuf,
    /// Family used when `text` gets no `font` argument
    pub default_family: String,
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("fonts"),
            default_family: "Liberation Sans".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load `sdfscad.toml` if present, then apply `SDFSCAD_*` environment overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a key lookup such as the process environment.
    /// Unparseable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(resolution) = lookup("SDFSCAD_MESH_RESOLUTION").and_then(|v| v.parse().ok()) {
            self.mesh.resolution = resolution;
        }

        if let Some(dir) = lookup("SDFSCAD_FONT_DIR") {
            self.fonts.cache_dir = PathBuf::from(dir);
        }

        if let Some(depth) = lookup("SDFSCAD_MAX_RECURSION").and_then(|v| v.parse().ok()) {
            self.max_recursion_depth = depth;
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.smoothing.union, 1.0);
        assert_eq!(config.smoothing.difference, 0.0);
        assert_eq!(config.mesh.resolution, 64);
        assert_eq!(config.max_recursion_depth, 1000);
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("sdfscad.toml");
        std::fs::write(&path, "[smoothing]\nunion = 0.25\n")?;

        let config = Config::from_file(&path)?;
        assert_eq!(config.smoothing.union, 0.25);
        assert_eq!(config.smoothing.blend, 0.5);
        assert_eq!(config.mesh, MeshConfig::default());
        Ok(())
    }

    #[test]
    fn test_save_and_reload() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.toml");

        let mut config = Config::default();
        config.mesh.resolution = 96;
        config.save(&path)?;

        assert_eq!(Config::from_file(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "SDFSCAD_MESH_RESOLUTION" => Some("128".into()),
            "SDFSCAD_FONT_DIR" => Some("/tmp/fonts".into()),
            "SDFSCAD_MAX_RECURSION" => Some("not a number".into()),
            _ => None,
        });
        assert_eq!(config.mesh.resolution, 128);
        assert_eq!(config.fonts.cache_dir, PathBuf::from("/tmp/fonts"));
        assert_eq!(config.max_recursion_depth, 1000);
    }
}
