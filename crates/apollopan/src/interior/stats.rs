use serde::{Deserialize, Serialize};

use super::fiducials::STATS_NOT_COMPUTED;

/// Aggregate residual lengths over the observed fiducials.
///
/// All fields hold [`STATS_NOT_COMPUTED`] until a solve succeeds. A NaN
/// residual makes every statistic NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualStats {
    /// Largest residual length.
    pub max: f64,
    /// Mean residual length.
    pub mean: f64,
    /// Sample standard deviation (divisor `N − 1`); 0 for a single value.
    pub stdev: f64,
    /// Observed fiducials contributing.
    pub count: usize,
}

impl Default for ResidualStats {
    fn default() -> Self {
        Self {
            max: STATS_NOT_COMPUTED,
            mean: STATS_NOT_COMPUTED,
            stdev: STATS_NOT_COMPUTED,
            count: 0,
        }
    }
}

impl ResidualStats {
    /// Statistics of residual lengths; all zeros for an empty slice.
    pub fn from_lengths(lengths: &[f64]) -> Self {
        let count = lengths.len();
        if count == 0 {
            return Self {
                max: 0.0,
                mean: 0.0,
                stdev: 0.0,
                count,
            };
        }
        let max = lengths
            .iter()
            .copied()
            .fold(0.0, |m: f64, l| if m.is_nan() || l.is_nan() { f64::NAN } else { m.max(l) });
        let mean = lengths.iter().sum::<f64>() / count as f64;
        let stdev = if count < 2 {
            0.0
        } else {
            let ss: f64 = lengths.iter().map(|l| (l - mean) * (l - mean)).sum();
            (ss / (count - 1) as f64).sqrt()
        };
        Self {
            max,
            mean,
            stdev,
            count,
        }
    }

    /// False while the fields still hold the sentinel.
    pub fn is_computed(&self) -> bool {
        self.max != STATS_NOT_COMPUTED
    }
}
