// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};

use fmm_esdf::io;
use fmm_esdf::{signed_distance, unsigned_distance};

#[derive(Parser)]
#[command(name = "fmm-esdf", about = "Fast Marching Method distance field solver")]
struct Cli {
    /// Dimensionality (1, 2, or 3)
    #[arg(short = 'd', long)]
    dim: usize,

    /// Grid size, comma-separated (e.g., 256,256 or 128,128,128)
    #[arg(short = 's', long)]
    size: String,

    /// Grid spacing: a single value for all axes, or comma-separated per axis
    #[arg(long, default_value = "1.0")]
    spacing: String,

    /// Front speed
    #[arg(long, default_value = "1.0")]
    speed: f64,

    /// Source cell as "index:distance:normal", e.g. "2,2:0.0:1,0"
    /// (repeatable for multiple sources)
    #[arg(long, num_args = 1)]
    source: Vec<String>,

    /// Load sources from a .npy or .mat file instead: a K x (2N+1) matrix
    /// with rows [index.., distance, normal..]
    #[arg(long)]
    sources_file: Option<PathBuf>,

    /// Field variant to compute
    #[arg(long, value_enum, default_value = "signed")]
    mode: Mode,

    /// Output file path (.npy or .mat)
    #[arg(short = 'o', long, default_value = "distance.npy")]
    output: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Signed distance: negative inside the interface, positive outside.
    Signed,
    /// Unsigned distance to the source set.
    Unsigned,
}

fn parse_list<T: std::str::FromStr>(s: &str, what: &str) -> Result<Vec<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    s.split(',')
        .map(|p| p.trim().parse::<T>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid {}: expected comma-separated values, got '{}'", what, s))
}

fn to_array<T, const N: usize>(values: Vec<T>, what: &str) -> Result<[T; N]> {
    let len = values.len();
    values
        .try_into()
        .map_err(|_| anyhow::anyhow!("{} has {} components but --dim is {}", what, len, N))
}

/// Parse one "index:distance:normal" source spec.
fn parse_source<const N: usize>(s: &str) -> Result<([i32; N], f64, [f64; N])> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        bail!("invalid --source '{}': expected 'index:distance:normal'", s);
    }
    let index = to_array::<i32, N>(parse_list(parts[0], "--source index")?, "--source index")?;
    let distance: f64 = parts[1]
        .trim()
        .parse()
        .with_context(|| format!("invalid --source distance '{}'", parts[1]))?;
    let normal = to_array::<f64, N>(parse_list(parts[2], "--source normal")?, "--source normal")?;
    Ok((index, distance, normal))
}

fn parse_spacing<const N: usize>(s: &str) -> Result<[f64; N]> {
    let values: Vec<f64> = parse_list(s, "--spacing")?;
    if values.len() == 1 {
        return Ok([values[0]; N]);
    }
    to_array(values, "--spacing")
}

fn run<const N: usize>(cli: &Cli) -> Result<()> {
    let size = to_array::<usize, N>(parse_list(&cli.size, "--size")?, "--size")?;
    let dx = parse_spacing::<N>(&cli.spacing)?;

    let (frozen_indices, frozen_distances, normals) = if let Some(path) = &cli.sources_file {
        if !cli.source.is_empty() {
            bail!("--source and --sources-file are mutually exclusive");
        }
        io::load_sources::<N>(path)
            .with_context(|| format!("failed to load sources from {}", path.display()))?
    } else {
        let mut indices = Vec::new();
        let mut distances = Vec::new();
        let mut normals = Vec::new();
        for spec in &cli.source {
            let (index, distance, normal) = parse_source::<N>(spec)?;
            indices.push(index);
            distances.push(distance);
            normals.push(normal);
        }
        (indices, distances, normals)
    };

    if frozen_indices.is_empty() {
        bail!("at least one source must be specified (--source or --sources-file)");
    }

    let field = match cli.mode {
        Mode::Signed => signed_distance::<N>(
            size,
            dx,
            cli.speed,
            &frozen_indices,
            &frozen_distances,
            &normals,
        ),
        Mode::Unsigned => unsigned_distance::<N>(
            size,
            dx,
            cli.speed,
            &frozen_indices,
            &frozen_distances,
            &normals,
        ),
    }
    .map_err(|e| anyhow::anyhow!("{}", e))?;

    io::save_field(&field, &size, &cli.output).map_err(|e| anyhow::anyhow!("{}", e))?;
    log::info!(
        "wrote {} cells to {}",
        field.len(),
        cli.output.display()
    );

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.dim {
        1 => run::<1>(&cli),
        2 => run::<2>(&cli),
        3 => run::<3>(&cli),
        _ => bail!("--dim must be 1, 2, or 3, got {}", cli.dim),
    }
}
