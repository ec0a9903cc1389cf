//! Minimum bounding ellipse of a point set.

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use super::Ellipse;

/// Iteration controls for [`minimum_bounding_ellipse`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundingEllipseConfig {
    /// Weight updates before giving up.
    pub max_iters: usize,
    /// Stop once the L² norm of the weight update falls below this value.
    pub tolerance: f64,
}

impl Default for BoundingEllipseConfig {
    fn default() -> Self {
        Self {
            max_iters: 500,
            tolerance: 1e-10,
        }
    }
}

/// Result of [`minimum_bounding_ellipse`].
#[derive(Debug, Clone)]
pub struct BoundingEllipse {
    /// Enclosing ellipse, rescaled so the farthest point lies on it.
    pub ellipse: Ellipse,
    /// Final per-point weights; points on the boundary carry the mass,
    /// interior points decay towards zero.
    pub weights: Vec<f64>,
    pub iterations: usize,
    /// False when `max_iters` ran out first.
    pub converged: bool,
}

/// Minimum-area ellipse enclosing `points`.
///
/// Fixed-point iteration on the weights `λ`: the weighted centroid gives the
/// center, the weighted scatter `M` gives `A = M⁻¹ / 2`, and each weight is
/// multiplied by `(pᵢ − c)ᵀ A (pᵢ − c)`. After the loop `A` is rescaled so
/// that the farthest point lies exactly on the boundary.
///
/// Returns `None` for fewer than three points or a degenerate (collinear)
/// point set.
pub fn minimum_bounding_ellipse(
    points: &[[f64; 2]],
    config: &BoundingEllipseConfig,
) -> Option<BoundingEllipse> {
    let n = points.len();
    if n < 3 {
        return None;
    }
    let pts: Vec<Vector2<f64>> = points.iter().map(|p| Vector2::new(p[0], p[1])).collect();

    let mut weights = vec![1.0 / n as f64; n];
    let mut center = Vector2::zeros();
    let mut a = Matrix2::zeros();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iters {
        iterations += 1;
        center = pts
            .iter()
            .zip(&weights)
            .fold(Vector2::zeros(), |acc, (p, &w)| acc + p * w);
        let scatter = pts.iter().zip(&weights).fold(Matrix2::zeros(), |acc, (p, &w)| {
            let d = p - center;
            acc + d * d.transpose() * w
        });
        a = scatter.try_inverse()? * 0.5;

        let mut update_sq = 0.0;
        for (p, w) in pts.iter().zip(weights.iter_mut()) {
            let d = p - center;
            let g = (d.transpose() * a * d)[(0, 0)];
            let next = *w * g;
            update_sq += (next - *w) * (next - *w);
            *w = next;
        }
        if !update_sq.is_finite() {
            return None;
        }
        if update_sq.sqrt() < config.tolerance {
            converged = true;
            break;
        }
    }

    let worst = pts
        .iter()
        .map(|p| {
            let d = p - center;
            (d.transpose() * a * d)[(0, 0)]
        })
        .fold(0.0f64, f64::max);
    if worst <= 0.0 || !worst.is_finite() {
        return None;
    }
    let a = a / worst;

    let ellipse = Ellipse::from_matrix([center.x, center.y], [a[(0, 0)], a[(0, 1)], a[(1, 1)]])?;
    tracing::trace!(iterations, converged, area = ellipse.area, "bounding ellipse");
    Some(BoundingEllipse {
        ellipse,
        weights,
        iterations,
        converged,
    })
}
