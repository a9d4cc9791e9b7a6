// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

/// Errors that can occur during distance field computation or I/O.
#[derive(Debug)]
pub enum FmmError {
    /// Grid size is invalid (zero extent on some axis).
    InvalidSize {
        /// The axis index.
        axis: usize,
        /// The extent provided.
        size: usize,
    },
    /// Grid spacing is not positive and finite.
    InvalidSpacing {
        /// The axis index.
        axis: usize,
        /// The spacing provided.
        dx: f64,
    },
    /// Propagation speed is not positive and finite.
    InvalidSpeed(f64),
    /// Source input sequences have different lengths.
    SizeMismatch {
        /// Number of source indices.
        indices: usize,
        /// Number of source distances.
        distances: usize,
        /// Number of source normals.
        normals: usize,
    },
    /// A source index lies outside the grid.
    InvalidIndex {
        /// The offending cell index.
        index: Vec<i32>,
    },
    /// A source distance is NaN.
    InvalidDistance {
        /// Position in the source list.
        position: usize,
        /// The offending value.
        value: f64,
    },
    /// A source normal is too short to orient seeding (squared magnitude < 0.25).
    InvalidNormal {
        /// Position in the source list.
        position: usize,
        /// The squared magnitude found.
        squared_magnitude: f64,
    },
    /// Neither the inside nor the outside seeding produced any narrow band
    /// cells, so no propagation direction exists.
    SeedEmpty,
    /// The quadratic update had no admissible root while marching.
    /// This indicates a broken cell-state invariant, not bad input.
    InternalSolveFailure {
        /// The cell being updated when the solve failed.
        index: Vec<i32>,
    },
    /// Attempted to insert an index already present in the narrow band.
    DuplicateIndex {
        /// The offending cell index.
        index: Vec<i32>,
    },
    /// Attempted to pop from an empty narrow band.
    EmptyNarrowBand,
    /// A keyed narrow band update referenced an absent index.
    IndexNotFound {
        /// The offending cell index.
        index: Vec<i32>,
    },
    /// `decrease_distance` was called with a value that does not decrease.
    DistanceNotDecreased {
        /// The distance currently stored.
        current: f64,
        /// The rejected replacement.
        proposed: f64,
    },
    /// `increase_distance` was called with a value that does not increase.
    DistanceNotIncreased {
        /// The distance currently stored.
        current: f64,
        /// The rejected replacement.
        proposed: f64,
    },
    /// Array shape does not match expected shape.
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape encountered.
        got: Vec<usize>,
    },
    /// Unsupported data type in file.
    UnsupportedDtype(String),
    /// Unsupported file format (unrecognized extension).
    UnsupportedFileFormat(String),
    /// Expected MAT variable not found in file.
    MatVariableNotFound {
        /// The variable name that was requested.
        expected: String,
        /// The variable names that are available.
        available: Vec<String>,
    },
    /// I/O error occurred.
    IoError(std::io::Error),
    /// Other error with a descriptive message.
    Other(String),
}

impl fmt::Display for FmmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FmmError::InvalidSize { axis, size } => {
                write!(
                    f,
                    "invalid grid size: axis {} has extent {} (must be >= 1)",
                    axis, size
                )
            }
            FmmError::InvalidSpacing { axis, dx } => {
                write!(
                    f,
                    "invalid grid spacing on axis {}: {} (must be positive and finite)",
                    axis, dx
                )
            }
            FmmError::InvalidSpeed(speed) => {
                write!(f, "invalid speed: {} (must be positive and finite)", speed)
            }
            FmmError::SizeMismatch {
                indices,
                distances,
                normals,
            } => {
                write!(
                    f,
                    "source input size mismatch: {} indices, {} distances, {} normals",
                    indices, distances, normals
                )
            }
            FmmError::InvalidIndex { index } => {
                write!(f, "source index {:?} is outside the grid", index)
            }
            FmmError::InvalidDistance { position, value } => {
                write!(
                    f,
                    "invalid source distance at position {}: {}",
                    position, value
                )
            }
            FmmError::InvalidNormal {
                position,
                squared_magnitude,
            } => {
                write!(
                    f,
                    "invalid source normal at position {}: squared magnitude {} < 0.25",
                    position, squared_magnitude
                )
            }
            FmmError::SeedEmpty => {
                write!(f, "narrow band is empty after seeding both sides")
            }
            FmmError::InternalSolveFailure { index } => {
                write!(f, "eikonal update failed at cell {:?} while marching", index)
            }
            FmmError::DuplicateIndex { index } => {
                write!(f, "narrow band index {:?} must be unique", index)
            }
            FmmError::EmptyNarrowBand => {
                write!(f, "cannot pop from an empty narrow band")
            }
            FmmError::IndexNotFound { index } => {
                write!(f, "narrow band index {:?} not found", index)
            }
            FmmError::DistanceNotDecreased { current, proposed } => {
                write!(
                    f,
                    "new distance {} must be less than stored distance {}",
                    proposed, current
                )
            }
            FmmError::DistanceNotIncreased { current, proposed } => {
                write!(
                    f,
                    "new distance {} must be greater than stored distance {}",
                    proposed, current
                )
            }
            FmmError::ShapeMismatch { expected, got } => {
                write!(f, "shape mismatch: expected {:?}, got {:?}", expected, got)
            }
            FmmError::UnsupportedDtype(dtype) => {
                write!(f, "unsupported dtype: {}", dtype)
            }
            FmmError::UnsupportedFileFormat(ext) => {
                write!(f, "unsupported file format: {}", ext)
            }
            FmmError::MatVariableNotFound {
                expected,
                available,
            } => {
                write!(
                    f,
                    "MAT variable '{}' not found; available variables: {:?}",
                    expected, available
                )
            }
            FmmError::IoError(e) => write!(f, "I/O error: {}", e),
            FmmError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FmmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FmmError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FmmError {
    fn from(e: std::io::Error) -> Self {
        FmmError::IoError(e)
    }
}

/// Convenience type alias for Results with FmmError.
pub type Result<T> = std::result::Result<T, FmmError>;
