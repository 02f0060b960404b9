// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sdfscad::config::MeshConfig;
use sdfscad::{Config, Kernel, Mesh};

const COMPLEX: &str = r#"
    module ring(n) {
        for (i = [0 : n]) rotate([0, 0, i * 360 / n]) translate([10, 0, 0]) children();
    }
    difference() {
        cube([20, 20, 20], center = true);
        sphere(r = 12);
    }
    ring(12) sphere(2);
"#;

fn kernel(resolution: u32) -> Kernel {
    Kernel::with_config(Config {
        mesh: MeshConfig {
            resolution,
            ..MeshConfig::default()
        },
        ..Config::default()
    })
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    let kernel = Kernel::new();

    let simple = "cube([10, 10, 10]);";
    group.bench_with_input(BenchmarkId::new("simple_cube", ""), &simple, |b, source| {
        b.iter(|| kernel.compile(black_box(source)).unwrap());
    });

    group.bench_with_input(BenchmarkId::new("complex", ""), &COMPLEX, |b, source| {
        b.iter(|| kernel.compile(black_box(source)).unwrap());
    });

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let kernel = Kernel::new();

    group.bench_function("complex", |b| {
        b.iter(|| kernel.evaluate(black_box(COMPLEX)).unwrap());
    });

    let nested = "for (x = [0:10], y = [0:10], z = [0:10]) translate([x, y, z]) cube(0.5);";
    group.bench_function("nested_for", |b| {
        b.iter(|| kernel.evaluate(black_box(nested)).unwrap());
    });

    group.finish();
}

fn bench_mesh(c: &mut Criterion) {
    let mut group = c.benchmark_group("mesh");
    group.sample_size(10);

    for resolution in [32, 64] {
        let kernel = kernel(resolution);
        group.bench_with_input(
            BenchmarkId::new("sphere", resolution),
            &kernel,
            |b, kernel| {
                b.iter(|| kernel.mesh(black_box("sphere(r = 10);")).unwrap());
            },
        );
    }

    let kernel = kernel(48);
    group.bench_function("complex", |b| {
        b.iter(|| kernel.mesh(black_box(COMPLEX)).unwrap());
    });

    let mesh: Mesh = kernel.mesh(COMPLEX).unwrap();
    group.bench_function("content_hash", |b| {
        b.iter(|| black_box(&mesh).content_hash());
    });

    group.finish();
}

criterion_group!(benches, bench_compile, bench_evaluate, bench_mesh);
criterion_main!(benches);
