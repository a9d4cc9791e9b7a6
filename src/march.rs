// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use log::{debug, trace};

use crate::core::{inside, neighbor_offsets, offset_index, squared_magnitude, CellState, Grid};
use crate::error::{FmmError, Result};
use crate::narrow_band::NarrowBandStore;
use crate::update_kernels::EikonalSolver;

/// Which side of the interface a march propagates toward. Seeding admits
/// a neighbor offset when its dot product with the source normal (outside)
/// or the flipped normal (inside) is non-negative; tangential offsets are
/// admitted by both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarchSide {
    Inside,
    Outside,
}

impl MarchSide {
    fn admits<const N: usize>(self, normal: [f64; N], offset: [i32; N]) -> bool {
        let mut dot = 0.0;
        for d in 0..N {
            dot += normal[d] * offset[d] as f64;
        }
        match self {
            MarchSide::Outside => dot >= 0.0,
            MarchSide::Inside => -dot >= 0.0,
        }
    }
}

/// Write `multiplier * frozen_distances[k]` at each source cell and mark
/// it `Frozen`. The inside march passes -1, the outside march +1.
fn initialize_frozen_cells<const N: usize>(
    frozen_indices: &[[i32; N]],
    frozen_distances: &[f64],
    multiplier: f64,
    distance_grid: &mut Grid<f64, N>,
    state_grid: &mut Grid<CellState, N>,
) {
    debug_assert_eq!(frozen_indices.len(), frozen_distances.len());

    for (&index, &distance) in frozen_indices.iter().zip(frozen_distances) {
        debug_assert!(distance_grid.inside(index));
        *distance_grid.cell_mut(index) = multiplier * distance;
        *state_grid.cell_mut(index) = CellState::Frozen;
    }
}

/// Recompute the tentative distance at `neighbor_index` from its frozen
/// neighbors. Far cells enter the narrow band; narrow band cells are
/// re-keyed when the candidate is strictly smaller; frozen cells and
/// out-of-grid indices are left alone.
fn relax<const N: usize>(
    neighbor_index: [i32; N],
    solver: &EikonalSolver<N>,
    offsets: &[[i32; N]],
    distance_grid: &mut Grid<f64, N>,
    state_grid: &mut Grid<CellState, N>,
    narrow_band: &mut NarrowBandStore<N>,
) -> Result<()> {
    if !distance_grid.inside(neighbor_index) {
        return Ok(());
    }

    match *state_grid.cell(neighbor_index) {
        CellState::Frozen => Ok(()),
        CellState::Far => {
            let distance = solver
                .solve(neighbor_index, offsets, distance_grid, state_grid)
                .ok_or_else(|| FmmError::InternalSolveFailure {
                    index: neighbor_index.to_vec(),
                })?;
            *distance_grid.cell_mut(neighbor_index) = distance;
            *state_grid.cell_mut(neighbor_index) = CellState::NarrowBand;
            narrow_band.insert(distance, neighbor_index)
        }
        CellState::NarrowBand => {
            let current = *distance_grid.cell(neighbor_index);
            let candidate = solver
                .solve(neighbor_index, offsets, distance_grid, state_grid)
                .ok_or_else(|| FmmError::InternalSolveFailure {
                    index: neighbor_index.to_vec(),
                })?;
            if candidate < current {
                narrow_band.decrease_distance(neighbor_index, candidate)?;
                *distance_grid.cell_mut(neighbor_index) = candidate;
            }
            Ok(())
        }
    }
}

/// Relax the normal-admitted neighbors of every source cell, producing
/// the initial narrow band for one side. The band may come out empty when
/// the other side's march has already frozen every candidate; the caller
/// decides whether that is an error.
fn seed_narrow_band<const N: usize>(
    solver: &EikonalSolver<N>,
    frozen_indices: &[[i32; N]],
    offsets: &[[i32; N]],
    normals: &[[f64; N]],
    side: MarchSide,
    distance_grid: &mut Grid<f64, N>,
    state_grid: &mut Grid<CellState, N>,
) -> Result<NarrowBandStore<N>> {
    debug_assert_eq!(frozen_indices.len(), normals.len());

    let mut narrow_band = NarrowBandStore::new();
    for (&source, &normal) in frozen_indices.iter().zip(normals) {
        debug_assert_eq!(*state_grid.cell(source), CellState::Frozen);
        for &offset in offsets {
            if !side.admits(normal, offset) {
                continue;
            }
            relax(
                offset_index(source, offset),
                solver,
                offsets,
                distance_grid,
                state_grid,
                &mut narrow_band,
            )?;
        }
    }

    trace!(
        "{:?} seeding produced {} narrow band cells from {} sources",
        side,
        narrow_band.len(),
        frozen_indices.len()
    );
    Ok(narrow_band)
}

/// Pop the minimum-distance narrow band cell, freeze it, and relax all of
/// its 2N neighbors, until the band is empty. Returns the number of cells
/// frozen. Normal gating does not apply here; after seeding, every
/// non-frozen neighbor is eligible.
fn march<const N: usize>(
    solver: &EikonalSolver<N>,
    offsets: &[[i32; N]],
    distance_grid: &mut Grid<f64, N>,
    state_grid: &mut Grid<CellState, N>,
    narrow_band: &mut NarrowBandStore<N>,
) -> Result<usize> {
    let mut frozen_count = 0;

    while !narrow_band.is_empty() {
        let (distance, index) = narrow_band.pop()?;
        debug_assert_eq!(*state_grid.cell(index), CellState::NarrowBand);

        *distance_grid.cell_mut(index) = distance;
        *state_grid.cell_mut(index) = CellState::Frozen;
        frozen_count += 1;

        for &offset in offsets {
            relax(
                offset_index(index, offset),
                solver,
                offsets,
                distance_grid,
                state_grid,
                narrow_band,
            )?;
        }
    }

    Ok(frozen_count)
}

fn validate_inputs<const N: usize>(
    size: [usize; N],
    dx: [f64; N],
    speed: f64,
    frozen_indices: &[[i32; N]],
    frozen_distances: &[f64],
    normals: &[[f64; N]],
) -> Result<()> {
    for (axis, &extent) in size.iter().enumerate() {
        if extent < 1 {
            return Err(FmmError::InvalidSize { axis, size: extent });
        }
    }
    for (axis, &spacing) in dx.iter().enumerate() {
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(FmmError::InvalidSpacing { axis, dx: spacing });
        }
    }
    if !speed.is_finite() || speed <= 0.0 {
        return Err(FmmError::InvalidSpeed(speed));
    }
    if frozen_indices.len() != frozen_distances.len() || frozen_indices.len() != normals.len() {
        return Err(FmmError::SizeMismatch {
            indices: frozen_indices.len(),
            distances: frozen_distances.len(),
            normals: normals.len(),
        });
    }

    for &index in frozen_indices {
        if !inside(index, size) {
            return Err(FmmError::InvalidIndex {
                index: index.to_vec(),
            });
        }
    }
    for (position, &value) in frozen_distances.iter().enumerate() {
        if value.is_nan() {
            return Err(FmmError::InvalidDistance { position, value });
        }
    }
    Ok(())
}

fn validate_normals<const N: usize>(normals: &[[f64; N]]) -> Result<()> {
    for (position, &normal) in normals.iter().enumerate() {
        let sm = squared_magnitude(normal);
        if !(sm >= 0.25) {
            return Err(FmmError::InvalidNormal {
                position,
                squared_magnitude: sm,
            });
        }
    }
    Ok(())
}

/// Compute the unsigned distance field to the source set.
///
/// Runs the inside and outside marches sequentially into a single
/// distance grid initialized to infinity, then overwrites each source
/// cell with `|frozen_distances[k]|`. All finite distances come out
/// non-negative; cells no march reached stay at infinity.
///
/// Normals are used only to orient seeding; their magnitude is not
/// checked here (only [`signed_distance`] requires usable normals).
///
/// The returned buffer has length `size[0] * ... * size[N-1]` and is
/// linearized with axis 0 contiguous, matching [`Grid`].
///
/// # Errors
///
/// Input validation errors are raised before any march begins. `SeedEmpty`
/// is raised when neither side's seeding yields any narrow band cell.
pub fn unsigned_distance<const N: usize>(
    size: [usize; N],
    dx: [f64; N],
    speed: f64,
    frozen_indices: &[[i32; N]],
    frozen_distances: &[f64],
    normals: &[[f64; N]],
) -> Result<Vec<f64>> {
    validate_inputs(size, dx, speed, frozen_indices, frozen_distances, normals)?;

    let offsets = neighbor_offsets::<N>();
    let solver = EikonalSolver::new(dx, speed);
    let mut distance_grid = Grid::new(size, f64::INFINITY);
    let mut state_grid = Grid::new(size, CellState::Far);

    initialize_frozen_cells(
        frozen_indices,
        frozen_distances,
        -1.0,
        &mut distance_grid,
        &mut state_grid,
    );
    let mut inside_band = seed_narrow_band(
        &solver,
        frozen_indices,
        &offsets,
        normals,
        MarchSide::Inside,
        &mut distance_grid,
        &mut state_grid,
    )?;
    let inside_seeded = !inside_band.is_empty();
    let inside_frozen = march(
        &solver,
        &offsets,
        &mut distance_grid,
        &mut state_grid,
        &mut inside_band,
    )?;

    initialize_frozen_cells(
        frozen_indices,
        frozen_distances,
        1.0,
        &mut distance_grid,
        &mut state_grid,
    );
    let mut outside_band = seed_narrow_band(
        &solver,
        frozen_indices,
        &offsets,
        normals,
        MarchSide::Outside,
        &mut distance_grid,
        &mut state_grid,
    )?;
    if !inside_seeded && outside_band.is_empty() {
        return Err(FmmError::SeedEmpty);
    }
    let outside_frozen = march(
        &solver,
        &offsets,
        &mut distance_grid,
        &mut state_grid,
        &mut outside_band,
    )?;

    debug!(
        "unsigned march froze {} cells inside, {} outside",
        inside_frozen, outside_frozen
    );

    for (&index, &distance) in frozen_indices.iter().zip(frozen_distances) {
        *distance_grid.cell_mut(index) = distance.abs();
    }

    Ok(distance_grid.into_cells())
}

/// Compute the signed distance field to the interface described by the
/// sources: negative inside (against the normals), positive outside.
///
/// Runs the inside and outside marches into two separate distance grids
/// sharing one state grid, then merges per cell: a finite inside value
/// wins as `-inside`, else a finite outside value as `+outside`, else
/// infinity. Source cells end up at `frozen_distances[k]` as provided.
///
/// The returned buffer is linearized exactly as for
/// [`unsigned_distance`].
///
/// # Errors
///
/// As for [`unsigned_distance`], plus `InvalidNormal` for any normal with
/// squared magnitude below 0.25 (too short to pick a side reliably).
pub fn signed_distance<const N: usize>(
    size: [usize; N],
    dx: [f64; N],
    speed: f64,
    frozen_indices: &[[i32; N]],
    frozen_distances: &[f64],
    normals: &[[f64; N]],
) -> Result<Vec<f64>> {
    validate_inputs(size, dx, speed, frozen_indices, frozen_distances, normals)?;
    validate_normals(normals)?;

    let offsets = neighbor_offsets::<N>();
    let solver = EikonalSolver::new(dx, speed);
    let mut state_grid = Grid::new(size, CellState::Far);

    let mut inside_grid = Grid::new(size, f64::INFINITY);
    initialize_frozen_cells(
        frozen_indices,
        frozen_distances,
        -1.0,
        &mut inside_grid,
        &mut state_grid,
    );
    let mut inside_band = seed_narrow_band(
        &solver,
        frozen_indices,
        &offsets,
        normals,
        MarchSide::Inside,
        &mut inside_grid,
        &mut state_grid,
    )?;
    let inside_seeded = !inside_band.is_empty();
    let inside_frozen = march(
        &solver,
        &offsets,
        &mut inside_grid,
        &mut state_grid,
        &mut inside_band,
    )?;

    let mut outside_grid = Grid::new(size, f64::INFINITY);
    initialize_frozen_cells(
        frozen_indices,
        frozen_distances,
        1.0,
        &mut outside_grid,
        &mut state_grid,
    );
    let mut outside_band = seed_narrow_band(
        &solver,
        frozen_indices,
        &offsets,
        normals,
        MarchSide::Outside,
        &mut outside_grid,
        &mut state_grid,
    )?;
    if !inside_seeded && outside_band.is_empty() {
        return Err(FmmError::SeedEmpty);
    }
    let outside_frozen = march(
        &solver,
        &offsets,
        &mut outside_grid,
        &mut state_grid,
        &mut outside_band,
    )?;

    debug!(
        "signed march froze {} cells inside, {} outside",
        inside_frozen, outside_frozen
    );

    let inside_cells = inside_grid.into_cells();
    let outside_cells = outside_grid.into_cells();
    let mut merged = vec![f64::INFINITY; inside_cells.len()];
    for (cell, &inside) in merged.iter_mut().zip(&inside_cells) {
        if inside.is_finite() {
            *cell = -inside;
        }
    }
    for (cell, &outside) in merged.iter_mut().zip(&outside_cells) {
        if outside.is_finite() {
            *cell = outside;
        }
    }

    let mut distance_grid = Grid::from_cells(size, merged);
    for (&index, &distance) in frozen_indices.iter().zip(frozen_distances) {
        *distance_grid.cell_mut(index) = distance;
    }

    Ok(distance_grid.into_cells())
}
