// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::core::{offset_index, CellState, Grid};

/// Tolerance below which quadratic coefficients are treated as zero.
const EPS: f64 = 1e-9;

/// Computes candidate arrival distances from frozen axis neighbors under
/// constant speed F and per-axis spacing dx, by solving the Godunov upwind
/// discretization of |grad u| * F = 1.
///
/// Stateless apart from the precomputed 1/dx^2 and 1/F^2; borrows the
/// distance and state grids read-only for the duration of a single solve.
pub struct EikonalSolver<const N: usize> {
    inv_dx_squared: [f64; N],
    inv_speed_squared: f64,
}

impl<const N: usize> EikonalSolver<N> {
    /// Create a solver for the given axis spacings and front speed.
    /// F > 0 and dx[i] > 0 are validated upstream.
    pub fn new(dx: [f64; N], speed: f64) -> Self {
        debug_assert!(dx.iter().all(|&x| x > 0.0));
        debug_assert!(speed > 0.0);
        let mut inv_dx_squared = [0.0; N];
        for d in 0..N {
            inv_dx_squared[d] = 1.0 / (dx[d] * dx[d]);
        }
        EikonalSolver {
            inv_dx_squared,
            inv_speed_squared: 1.0 / (speed * speed),
        }
    }

    /// Candidate arrival distance at `index`, combining the minimum frozen
    /// neighbor along each axis into one quadratic. Axes without a frozen
    /// neighbor contribute nothing. Returns `None` only when no axis has a
    /// frozen neighbor, which cannot happen in a valid march (the popped
    /// cell always has at least one).
    ///
    /// Normal-gated seeding can leave a cell facing frozen neighbors whose
    /// values are mutually inconsistent (the full quadratic has no root
    /// above all of them). The Godunov upwind answer is to drop the axis
    /// with the largest neighbor value and re-solve; a single-axis update
    /// always succeeds.
    ///
    /// `neighbor_offsets` must pair axis i at positions 2i and 2i+1, as
    /// produced by [`crate::core::neighbor_offsets`].
    pub fn solve(
        &self,
        index: [i32; N],
        neighbor_offsets: &[[i32; N]],
        distance_grid: &Grid<f64, N>,
        state_grid: &Grid<CellState, N>,
    ) -> Option<f64> {
        debug_assert!(distance_grid.inside(index));
        debug_assert_eq!(neighbor_offsets.len(), 2 * N);

        // Per contributing axis: the smaller frozen neighbor distance and
        // the axis weight 1/dx^2.
        let mut contributions = [(0.0f64, 0.0f64); N];
        let mut count = 0;

        for i in 0..N {
            let mut min_frozen = f64::INFINITY;
            for j in 0..2 {
                let neighbor = offset_index(index, neighbor_offsets[2 * i + j]);
                if state_grid.inside(neighbor) && *state_grid.cell(neighbor) == CellState::Frozen {
                    min_frozen = min_frozen.min(*distance_grid.cell(neighbor));
                }
            }

            if min_frozen < f64::INFINITY {
                contributions[count] = (min_frozen, self.inv_dx_squared[i]);
                count += 1;
            }
        }
        if count == 0 {
            return None;
        }

        contributions[..count]
            .sort_unstable_by(|x, y| x.0.partial_cmp(&y.0).unwrap_or(std::cmp::Ordering::Equal));

        // Try the full update first, then retreat to the k smallest axes.
        for k in (2..=count).rev() {
            let active = &contributions[..k];

            let mut c = -self.inv_speed_squared;
            let mut b = 0.0;
            let mut a = 0.0;
            for &(m, inv_dx_squared) in active {
                c += m * m * inv_dx_squared;
                b += -2.0 * m * inv_dx_squared;
                a += inv_dx_squared;
            }

            if let Some(root) = largest_quadratic_root(c, b, a) {
                // Upwind admissibility: the arrival must lie above every
                // neighbor it was built from.
                if root > active[k - 1].0 {
                    debug_assert!(root >= 0.0);
                    return Some(root);
                }
            }
        }

        // Single-axis update: (u - m)^2 / dx^2 = 1 / F^2, upwind root.
        let (m, inv_dx_squared) = contributions[0];
        let root = m + (self.inv_speed_squared / inv_dx_squared).sqrt();
        debug_assert!(root >= 0.0);
        Some(root)
    }
}

/// Largest real root of a*u^2 + b*u + c = 0, or `None` if no real root
/// exists. Degenerate coefficients (|a| and |b| both below tolerance)
/// also yield `None`.
///
/// The two-root case uses the numerically stable form: the root with the
/// larger magnitude is computed from the quadratic formula with the sign
/// chosen to avoid cancellation, the other from c / (a * r0).
fn largest_quadratic_root(c: f64, b: f64, a: f64) -> Option<f64> {
    if a.abs() < EPS {
        if b.abs() < EPS {
            return None;
        }
        // b*u + c = 0, one root.
        return Some(-c / b);
    }

    if b.abs() < EPS {
        // a*u^2 + c = 0; roots are +/- sqrt(-c/a).
        let ratio = -c / a;
        if ratio < 0.0 {
            return None;
        }
        return Some(ratio.sqrt());
    }

    let discriminant_squared = b * b - 4.0 * a * c;
    if discriminant_squared <= EPS {
        return None;
    }
    let discriminant = discriminant_squared.sqrt();

    let r0 = if b < 0.0 {
        (-b + discriminant) / (2.0 * a)
    } else {
        (-b - discriminant) / (2.0 * a)
    };
    let r1 = c / (a * r0);
    Some(r0.max(r1))
}
