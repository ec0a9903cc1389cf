//! Strip discovery and the independent per-strip affine fits.

use serde::{Deserialize, Serialize};

use super::affine::{Affine2, StripBoundary};
use super::fiducials::{Fiducial, FIDUCIAL_COUNT, MAX_STRIPS};
use crate::linalg::{solve, CholeskyPolicy, PackedSymmetric, SolveMode, SolveStatus};

/// Affine unknowns per strip.
pub(crate) const STRIP_UNKNOWNS: usize = 6;

/// One solved strip of the panorama.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Strip {
    /// First fiducial slot bound to the strip.
    pub first: usize,
    /// Last fiducial slot; `last − 1` and `last` form its right boundary.
    pub last: usize,
    /// False when the strip normal matrix was not positive definite.
    pub solved: bool,
    /// Machine to image.
    pub to_image: Affine2,
    /// Image to machine.
    pub to_machine: Affine2,
    /// Right boundary in machine space.
    pub machine_boundary: StripBoundary,
    /// Right boundary in image space.
    pub image_boundary: StripBoundary,
}

/// Slot ranges `[first, last]` of the strips implied by the observed pairs.
///
/// Strip 0 opens at slot 0. Every fully observed pair `(i, i + 1)` with even
/// `i ≥ 2` closes the open strip at `i + 1` and opens the next one at `i`.
/// The strip left open after the last pair is dropped.
pub(crate) fn discover(fiducials: &[Fiducial]) -> Vec<(usize, usize)> {
    let mut ranges = Vec::with_capacity(MAX_STRIPS);
    let mut start = 0;
    for i in (2..FIDUCIAL_COUNT - 1).step_by(2) {
        if fiducials[i].observed && fiducials[i + 1].observed {
            ranges.push((start, i + 1));
            start = i;
        }
    }
    ranges
}

/// Independent least-squares fit of one strip.
pub(crate) struct StripFit {
    pub first: usize,
    pub last: usize,
    pub coeffs: [f64; STRIP_UNKNOWNS],
    /// `N⁻¹` of the strip normal equations; meaningful only when `status` is solved
    /// or the policy is permissive.
    pub inverse_normal: PackedSymmetric,
    pub status: SolveStatus,
}

/// Observation rows of one fiducial: `u` yields image x, `v` image y.
#[inline]
pub(crate) fn observation_rows(m: [f64; 2]) -> [[f64; STRIP_UNKNOWNS]; 2] {
    [
        [m[0], m[1], 0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, m[0], m[1], 0.0, 1.0],
    ]
}

/// Fit the affine of the strip spanning `[first, last]` from its observed
/// fiducials, keeping the inverse normal matrix for the continuity stage.
pub(crate) fn fit_strip(
    fiducials: &[Fiducial],
    first: usize,
    last: usize,
    policy: CholeskyPolicy,
) -> StripFit {
    let mut normal = PackedSymmetric::zeros(STRIP_UNKNOWNS);
    let mut rhs = [0.0; STRIP_UNKNOWNS];
    for f in fiducials[first..=last].iter().filter(|f| f.observed) {
        for (row, target) in observation_rows(f.machine).iter().zip(f.image) {
            normal.add_outer(row, 1.0);
            for (r, &a) in rhs.iter_mut().zip(row) {
                *r += a * target;
            }
        }
    }

    let status = solve(&mut normal, &mut rhs, SolveMode::SolveAndInvert, policy);
    let coeffs = if status.is_solved() || policy == CholeskyPolicy::Permissive {
        rhs
    } else {
        [f64::NAN; STRIP_UNKNOWNS]
    };
    StripFit {
        first,
        last,
        coeffs,
        inverse_normal: normal,
        status,
    }
}
