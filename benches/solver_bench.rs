// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use fmm_esdf::{signed_distance, unsigned_distance};

fn point_source_2d(n: usize) -> (Vec<[i32; 2]>, Vec<f64>, Vec<[f64; 2]>) {
    let c = (n / 2) as i32;
    (vec![[c, c]], vec![0.0], vec![[1.0, 0.0]])
}

fn circle_sources_2d(n: usize, radius: f64) -> (Vec<[i32; 2]>, Vec<f64>, Vec<[f64; 2]>) {
    let center = (n / 2) as f64;
    let mut indices = Vec::new();
    let mut distances = Vec::new();
    let mut normals = Vec::new();
    for j in 0..n {
        for i in 0..n {
            let px = i as f64 - center;
            let py = j as f64 - center;
            let r = (px * px + py * py).sqrt();
            if (r - radius).abs() <= 0.8 {
                indices.push([i as i32, j as i32]);
                distances.push(r - radius);
                normals.push([px / r, py / r]);
            }
        }
    }
    (indices, distances, normals)
}

fn sphere_sources_3d(n: usize, radius: f64) -> (Vec<[i32; 3]>, Vec<f64>, Vec<[f64; 3]>) {
    let center = (n / 2) as f64;
    let mut indices = Vec::new();
    let mut distances = Vec::new();
    let mut normals = Vec::new();
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                let p = [i as f64 - center, j as f64 - center, k as f64 - center];
                let r = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
                if (r - radius).abs() <= 0.8 {
                    indices.push([i as i32, j as i32, k as i32]);
                    distances.push(r - radius);
                    normals.push([p[0] / r, p[1] / r, p[2] / r]);
                }
            }
        }
    }
    (indices, distances, normals)
}

/// Unsigned field from a single point source on 2-D grids of
/// increasing size.
fn bench_unsigned_point_2d(c: &mut Criterion) {
    let mut group = c.benchmark_group("unsigned_point_2d");
    for &n in &[64, 128, 256] {
        let (indices, distances, normals) = point_source_2d(n);
        group.bench_function(format!("{}x{}", n, n), |b| {
            b.iter(|| {
                let field = unsigned_distance::<2>(
                    [n, n],
                    [1.0, 1.0],
                    1.0,
                    black_box(&indices),
                    black_box(&distances),
                    black_box(&normals),
                )
                .unwrap();
                black_box(field)
            });
        });
    }
    group.finish();
}

/// Signed field from a circle interface, the production-shaped workload.
fn bench_signed_circle_2d(c: &mut Criterion) {
    let mut group = c.benchmark_group("signed_circle_2d");
    for &n in &[128, 256] {
        let (indices, distances, normals) = circle_sources_2d(n, n as f64 / 4.0);
        group.bench_function(format!("{}x{}", n, n), |b| {
            b.iter(|| {
                let field = signed_distance::<2>(
                    [n, n],
                    [1.0, 1.0],
                    1.0,
                    black_box(&indices),
                    black_box(&distances),
                    black_box(&normals),
                )
                .unwrap();
                black_box(field)
            });
        });
    }
    group.finish();
}

/// Signed field from a sphere interface in 3-D.
fn bench_signed_sphere_3d(c: &mut Criterion) {
    let mut group = c.benchmark_group("signed_sphere_3d");
    for &n in &[32, 64] {
        let (indices, distances, normals) = sphere_sources_3d(n, n as f64 / 4.0);
        group.bench_function(format!("{}x{}x{}", n, n, n), |b| {
            b.iter(|| {
                let field = signed_distance::<3>(
                    [n, n, n],
                    [1.0, 1.0, 1.0],
                    1.0,
                    black_box(&indices),
                    black_box(&distances),
                    black_box(&normals),
                )
                .unwrap();
                black_box(field)
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_unsigned_point_2d,
    bench_signed_circle_2d,
    bench_signed_sphere_3d,
);
criterion_main!(benches);
