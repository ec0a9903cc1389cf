//! Panoramic interior orientation.
//!
//! The stitched panoramic image is modeled as a chain of strips, each with
//! its own affine map to nominal film coordinates. Strips are delimited by
//! fully observed fiducial pairs, fitted independently by least squares and
//! then tied together with Lagrange multipliers so that neighbors agree on
//! the pair they share.

mod affine;
mod continuity;
mod fiducials;
mod solver;
mod stats;
mod strips;

use serde::{Deserialize, Serialize};

pub use affine::{Affine2, StripBoundary};
pub use fiducials::{
    Fiducial, FiducialSpacing, FIDUCIAL_COUNT, MAX_STRIPS, MEASUREMENT_LIMIT, STATS_NOT_COMPUTED,
};
pub use solver::PanInteriorOrientation;
pub use stats::ResidualStats;
pub use strips::Strip;

use crate::linalg::{CholeskyPolicy, SolveStatus};

/// Solver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Nominal fiducial spacing; also fixes the image unit.
    pub spacing: FiducialSpacing,
    /// Handling of non-positive pivots in every normal-equation solve.
    pub cholesky: CholeskyPolicy,
}

impl OrientationConfig {
    /// Image coordinates in millimeters.
    pub fn millimeters() -> Self {
        Self {
            spacing: FiducialSpacing::MILLIMETERS,
            ..Self::default()
        }
    }
}

/// Summary of a successful [`PanInteriorOrientation::compute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveReport {
    /// Strips discovered and fitted.
    pub strip_count: usize,
    /// Strips whose normal matrix was not positive definite.
    pub degenerate_strips: Vec<usize>,
    /// Outcome of the continuity multiplier solve. `NotSolvable` also when
    /// the stage was skipped because of degenerate strips.
    pub constraint_status: SolveStatus,
}

impl SolveReport {
    /// Every strip and the continuity stage solved without fallback.
    pub fn is_clean(&self) -> bool {
        self.degenerate_strips.is_empty() && self.constraint_status.is_solved()
    }
}

/// Errors of [`PanInteriorOrientation`].
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum OrientationError {
    #[error("fiducial index {0} outside 0..90")]
    InvalidIndex(usize),
    #[error("measurement ({x}, {y}) beyond the 1e20 sanity bound")]
    OutOfRange { x: f64, y: f64 },
    #[error("no complete fiducial pair observed")]
    InsufficientData,
}

impl OrientationError {
    /// Negative status code of the camera-model interface.
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidIndex(_) => -1,
            Self::OutOfRange { .. } => -2,
            Self::InsufficientData => -3,
        }
    }
}
