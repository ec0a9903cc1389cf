//! The panoramic interior orientation solver.

use super::affine::{Affine2, StripBoundary};
use super::continuity::enforce_continuity;
use super::fiducials::{nominal_layout, Fiducial, FIDUCIAL_COUNT, MEASUREMENT_LIMIT};
use super::stats::ResidualStats;
use super::strips::{discover, fit_strip, Strip, StripFit};
use super::{OrientationConfig, OrientationError, SolveReport};
use crate::linalg::{CholeskyPolicy, SolveStatus};

/// Chained strip affines between machine (stitched image) coordinates and
/// nominal film coordinates, fitted to measured fiducial marks.
///
/// Typical use: record measurements with [`set_observation`], call
/// [`compute`], then transform with [`machine_to_image`] and
/// [`image_to_machine`].
///
/// [`set_observation`]: Self::set_observation
/// [`compute`]: Self::compute
/// [`machine_to_image`]: Self::machine_to_image
/// [`image_to_machine`]: Self::image_to_machine
#[derive(Debug, Clone)]
pub struct PanInteriorOrientation {
    config: OrientationConfig,
    fiducials: Vec<Fiducial>,
    strips: Vec<Strip>,
    stats: ResidualStats,
}

impl Default for PanInteriorOrientation {
    fn default() -> Self {
        Self::new(OrientationConfig::default())
    }
}

impl PanInteriorOrientation {
    /// Solver with every slot unobserved and no solution.
    pub fn new(config: OrientationConfig) -> Self {
        Self {
            fiducials: nominal_layout(&config.spacing),
            config,
            strips: Vec::new(),
            stats: ResidualStats::default(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &OrientationConfig {
        &self.config
    }

    /// Record the measured machine position of fiducial `index`.
    pub fn set_observation(&mut self, index: usize, x: f64, y: f64) -> Result<(), OrientationError> {
        if index >= FIDUCIAL_COUNT {
            return Err(OrientationError::InvalidIndex(index));
        }
        if !(x.abs() < MEASUREMENT_LIMIT && y.abs() < MEASUREMENT_LIMIT) {
            return Err(OrientationError::OutOfRange { x, y });
        }
        let f = &mut self.fiducials[index];
        f.observed = true;
        f.machine = [x, y];
        Ok(())
    }

    /// Mark fiducial `index` as not measured.
    pub fn clear_observation(&mut self, index: usize) -> Result<(), OrientationError> {
        let f = self
            .fiducials
            .get_mut(index)
            .ok_or(OrientationError::InvalidIndex(index))?;
        f.observed = false;
        Ok(())
    }

    /// Fit the strip affines, tie adjacent strips together and compute the
    /// fiducial residuals.
    ///
    /// Fails only when no fiducial pair beyond the first is fully observed;
    /// the previous solution is discarded either way. Numerical trouble in
    /// the normal equations is absorbed and reported through [`SolveReport`].
    pub fn compute(&mut self) -> Result<SolveReport, OrientationError> {
        self.reset_solution();
        let ranges = discover(&self.fiducials);
        if ranges.is_empty() {
            return Err(OrientationError::InsufficientData);
        }
        let policy = self.config.cholesky;

        let mut fits: Vec<StripFit> = ranges
            .iter()
            .map(|&(first, last)| fit_strip(&self.fiducials, first, last, policy))
            .collect();
        let degenerate_strips: Vec<usize> = fits
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.status.is_solved())
            .map(|(k, _)| k)
            .collect();
        for &k in &degenerate_strips {
            tracing::warn!(
                strip = k,
                first = fits[k].first,
                last = fits[k].last,
                ?policy,
                "strip normal matrix not positive definite"
            );
        }

        let constraint_status = if degenerate_strips.is_empty() || policy == CholeskyPolicy::Permissive
        {
            enforce_continuity(&self.fiducials, &mut fits, policy)
        } else {
            SolveStatus::NotSolvable
        };

        self.strips = fits
            .iter()
            .map(|fit| self.finish_strip(fit))
            .collect();
        self.update_residuals();

        tracing::debug!(
            strips = self.strips.len(),
            degenerate = degenerate_strips.len(),
            ?constraint_status,
            max = self.stats.max,
            mean = self.stats.mean,
            stdev = self.stats.stdev,
            "interior orientation solved"
        );
        Ok(SolveReport {
            strip_count: self.strips.len(),
            degenerate_strips,
            constraint_status,
        })
    }

    fn reset_solution(&mut self) {
        self.strips.clear();
        self.stats = ResidualStats::default();
        for f in &mut self.fiducials {
            f.residual = [0.0, 0.0];
        }
    }

    /// Inverse affine and both boundaries of a fitted strip.
    fn finish_strip(&self, fit: &StripFit) -> Strip {
        let to_image = Affine2::new(fit.coeffs);
        let to_machine = to_image.inverse().unwrap_or(Affine2::INVALID);
        let m0 = self.fiducials[fit.last - 1].machine;
        let m1 = self.fiducials[fit.last].machine;
        let (machine_boundary, image_boundary) = if to_image.is_finite() {
            (
                StripBoundary::machine(m0, m1),
                StripBoundary::image(to_image.apply(m0), to_image.apply(m1)),
            )
        } else {
            (StripBoundary::INVALID, StripBoundary::INVALID)
        };
        Strip {
            first: fit.first,
            last: fit.last,
            solved: fit.status.is_solved(),
            to_image,
            to_machine,
            machine_boundary,
            image_boundary,
        }
    }

    fn update_residuals(&mut self) {
        let mut lengths = Vec::with_capacity(FIDUCIAL_COUNT);
        for i in 0..FIDUCIAL_COUNT {
            let f = self.fiducials[i];
            if !f.observed {
                continue;
            }
            let predicted = self.image_to_machine(f.image[0], f.image[1]);
            let residual = [f.machine[0] - predicted[0], f.machine[1] - predicted[1]];
            self.fiducials[i].residual = residual;
            lengths.push(residual[0].hypot(residual[1]));
        }
        self.stats = ResidualStats::from_lengths(&lengths);
    }

    /// Strip whose machine-space domain claims `p`.
    ///
    /// Points past the right boundary of the second-to-last strip go to the
    /// last strip; otherwise the first strip whose boundary is not exceeded
    /// wins. Points claimed by no strip fall back to the last one. `None`
    /// before a successful [`compute`](Self::compute).
    pub fn strip_for_machine(&self, p: [f64; 2]) -> Option<usize> {
        let n = self.strips.len();
        if n <= 1 {
            return n.checked_sub(1);
        }
        let b = &self.strips[n - 2].machine_boundary;
        if b.rotated_y(p) > b.max {
            return Some(n - 1);
        }
        let hit = self.strips[..n - 1].iter().position(|s| {
            let b = &s.machine_boundary;
            b.rotated_y(p) <= b.max
        });
        Some(hit.unwrap_or(n - 1))
    }

    /// Strip whose image-space domain claims `p`; the comparisons are
    /// reversed relative to [`strip_for_machine`](Self::strip_for_machine).
    pub fn strip_for_image(&self, p: [f64; 2]) -> Option<usize> {
        let n = self.strips.len();
        if n <= 1 {
            return n.checked_sub(1);
        }
        let b = &self.strips[n - 2].image_boundary;
        if b.rotated_y(p) < b.max {
            return Some(n - 1);
        }
        let hit = self.strips[..n - 1].iter().position(|s| {
            let b = &s.image_boundary;
            b.rotated_y(p) >= b.max
        });
        Some(hit.unwrap_or(n - 1))
    }

    /// Machine to image coordinates; NaN before a successful solve.
    pub fn machine_to_image(&self, x: f64, y: f64) -> [f64; 2] {
        let p = [x, y];
        match self.strip_for_machine(p) {
            Some(k) => self.strips[k].to_image.apply(p),
            None => [f64::NAN, f64::NAN],
        }
    }

    /// Image to machine coordinates; NaN before a successful solve.
    pub fn image_to_machine(&self, x: f64, y: f64) -> [f64; 2] {
        let p = [x, y];
        match self.strip_for_image(p) {
            Some(k) => self.strips[k].to_machine.apply(p),
            None => [f64::NAN, f64::NAN],
        }
    }

    /// Largest residual length, or
    /// [`STATS_NOT_COMPUTED`](crate::interior::STATS_NOT_COMPUTED) before a
    /// successful solve.
    pub fn residual_max(&self) -> f64 {
        self.stats.max
    }

    /// Mean residual length, or the sentinel.
    pub fn residual_mean(&self) -> f64 {
        self.stats.mean
    }

    /// Sample standard deviation of the residual lengths, or the sentinel.
    pub fn residual_stdev(&self) -> f64 {
        self.stats.stdev
    }

    /// All residual statistics of the last solve.
    pub fn residual_stats(&self) -> ResidualStats {
        self.stats
    }

    /// Strips of the last successful solve; 0 otherwise.
    pub fn strip_count(&self) -> usize {
        self.strips.len()
    }

    /// Solved strips in film order.
    pub fn strips(&self) -> &[Strip] {
        &self.strips
    }

    /// Slot `index`, or `None` past the last slot.
    pub fn fiducial(&self, index: usize) -> Option<&Fiducial> {
        self.fiducials.get(index)
    }

    /// All slots, observed or not.
    pub fn fiducials(&self) -> &[Fiducial] {
        &self.fiducials
    }

    /// Nominal film position of fiducial `index`.
    pub fn nominal_image(&self, index: usize) -> Option<[f64; 2]> {
        self.fiducials.get(index).map(|f| f.image)
    }
}
