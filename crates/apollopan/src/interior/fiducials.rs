//! Fiducial slots and the nominal film layout.

use serde::{Deserialize, Serialize};

/// Fiducial slots along the film, two rails of 45.
pub const FIDUCIAL_COUNT: usize = 90;
/// Upper bound on strips: one per interior fiducial pair.
pub const MAX_STRIPS: usize = 44;
/// Sanity bound on measured machine coordinates.
pub const MEASUREMENT_LIMIT: f64 = 1e20;
/// Residual statistics value before a successful solve.
pub const STATS_NOT_COMPUTED: f64 = -1.0;

/// Index of the pair that sits half a row closer to its predecessor.
const HALF_STEP_PAIR: usize = 22;

/// Nominal fiducial spacing of the panoramic camera.
///
/// `long` is the distance between successive pairs along the film, `short`
/// the distance between the two rails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiducialSpacing {
    /// Pair-to-pair distance along the film.
    pub long: f64,
    /// Rail-to-rail distance.
    pub short: f64,
}

impl FiducialSpacing {
    /// Image units of 5-micron pixels.
    pub const PIXELS_5_MICRON: Self = Self {
        long: 5344.186,
        short: 22980.0,
    };
    /// Image units of millimeters.
    pub const MILLIMETERS: Self = Self {
        long: 26.72093,
        short: 114.9,
    };

    /// Nominal image coordinates of fiducial `index`.
    ///
    /// Even indices lie on the `+short/2` rail, odd ones on `−short/2`. Pair
    /// `k = index / 2` sits at `(−21.5 + k)·long`, minus half a row for pair
    /// 22 and a full row beyond it, with the sign flipped so the layout runs
    /// from positive to negative y.
    pub fn nominal(&self, index: usize) -> [f64; 2] {
        let x = if index % 2 == 0 {
            0.5 * self.short
        } else {
            -0.5 * self.short
        };
        let pair = index / 2;
        let mut y = (-21.5 + pair as f64) * self.long;
        if pair == HALF_STEP_PAIR {
            y -= 0.5 * self.long;
        } else if pair > HALF_STEP_PAIR {
            y -= self.long;
        }
        [x, -y]
    }
}

impl Default for FiducialSpacing {
    fn default() -> Self {
        Self::PIXELS_5_MICRON
    }
}

/// One fiducial slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fiducial {
    /// Set by a measurement, cleared by `clear_observation`.
    pub observed: bool,
    /// Measured position on the stitched image.
    pub machine: [f64; 2],
    /// Nominal film position.
    pub image: [f64; 2],
    /// Measured minus predicted machine position after a solve.
    pub residual: [f64; 2],
}

impl Fiducial {
    pub(crate) fn unobserved(image: [f64; 2]) -> Self {
        Self {
            observed: false,
            machine: [0.0, 0.0],
            image,
            residual: [0.0, 0.0],
        }
    }

    /// Euclidean length of `residual`.
    pub fn residual_length(&self) -> f64 {
        self.residual[0].hypot(self.residual[1])
    }
}

/// Nominal layout of all slots for `spacing`.
pub(crate) fn nominal_layout(spacing: &FiducialSpacing) -> Vec<Fiducial> {
    (0..FIDUCIAL_COUNT)
        .map(|i| Fiducial::unobserved(spacing.nominal(i)))
        .collect()
}
