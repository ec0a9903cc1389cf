//! Gauss–Helmert refinement of an ellipse against edge pixels.
//!
//! Unknowns are `(a11, a12, a22, cx, cy)`. Each pixel `p` is an observation
//! of the implicit condition `f = (p − c)ᵀ A (p − c) − 1 = 0`. With `Ȧ` the
//! partials w.r.t. the unknowns, `Ḃ` the partials w.r.t. the pixel and `ẇ`
//! the misclosure, a pixel contributes `Ȧᵀ (ḂḂᵀ)⁻¹ Ȧ` to the normal matrix
//! and `−Ȧᵀ (ḂḂᵀ)⁻¹ ẇ` to the right-hand side.

use crate::conic::Ellipse;
use crate::linalg::{solve, CholeskyPolicy, PackedSymmetric, SolveMode};

const UNKNOWNS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum RefineError {
    #[error("only {admitted} points within the gate, need 5")]
    TooFewPoints { admitted: usize },
    #[error("normal matrix is not positive definite")]
    NotSolvable,
    #[error("non-finite correction")]
    NonFinite,
    #[error("refined matrix is not positive definite")]
    NotEllipse,
    #[error("no convergence after {0} iterations")]
    NotConverged(usize),
}

/// Iterate the Gauss–Helmert adjustment from `initial`.
///
/// Only points whose current first-order distance to the boundary is at
/// most `play` take part in an iteration, so the admitted set follows the
/// ellipse as it moves. Center corrections must drop below `tol` pixels and
/// matrix corrections below `tol` relative to the largest diagonal entry.
pub fn refine_ellipse(
    points: &[[f64; 2]],
    initial: &Ellipse,
    play: f64,
    max_iters: usize,
    tol: f64,
) -> Result<Ellipse, RefineError> {
    let [mut a11, mut a12, mut a22] = initial.matrix;
    let [mut cx, mut cy] = initial.center;

    let mut normal = PackedSymmetric::zeros(UNKNOWNS);
    for _ in 0..max_iters {
        normal.clear();
        let mut rhs = [0.0; UNKNOWNS];
        let mut admitted = 0usize;

        for p in points {
            let dx = p[0] - cx;
            let dy = p[1] - cy;
            let w = a11 * dx * dx + 2.0 * a12 * dx * dy + a22 * dy * dy - 1.0;
            let bx = 2.0 * (a11 * dx + a12 * dy);
            let by = 2.0 * (a12 * dx + a22 * dy);
            let bb = bx * bx + by * by;
            if bb <= 0.0 || w.abs() > play * bb.sqrt() {
                continue;
            }
            let row = [dx * dx, 2.0 * dx * dy, dy * dy, -bx, -by];
            let weight = 1.0 / bb;
            normal.add_outer(&row, weight);
            for (r, &v) in rhs.iter_mut().zip(&row) {
                *r -= v * w * weight;
            }
            admitted += 1;
        }

        if admitted < UNKNOWNS {
            return Err(RefineError::TooFewPoints { admitted });
        }
        let status = solve(&mut normal, &mut rhs, SolveMode::Solve, CholeskyPolicy::Strict);
        if !status.is_solved() {
            return Err(RefineError::NotSolvable);
        }
        if rhs.iter().any(|v| !v.is_finite()) {
            return Err(RefineError::NonFinite);
        }

        a11 += rhs[0];
        a12 += rhs[1];
        a22 += rhs[2];
        cx += rhs[3];
        cy += rhs[4];
        if a11 <= 0.0 || a11 * a22 - a12 * a12 <= 0.0 {
            return Err(RefineError::NotEllipse);
        }

        let scale = a11.abs().max(a22.abs());
        let converged = rhs[..3].iter().all(|d| d.abs() <= tol * scale)
            && rhs[3..].iter().all(|d| d.abs() <= tol);
        if converged {
            return Ellipse::from_matrix([cx, cy], [a11, a12, a22]).ok_or(RefineError::NotEllipse);
        }
    }
    Err(RefineError::NotConverged(max_iters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::prelude::*;

    #[test]
    fn converges_from_perturbed_start() {
        let truth = Ellipse::from_axes([60.0, 45.0], 25.0, 14.0, 0.4).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let pts: Vec<[f64; 2]> = truth
            .sample_points(180)
            .into_iter()
            .map(|[x, y]| [x + rng.gen_range(-0.2..0.2), y + rng.gen_range(-0.2..0.2)])
            .collect();

        let start = Ellipse::from_axes([60.8, 44.5], 24.5, 14.4, 0.35).unwrap();
        let refined = refine_ellipse(&pts, &start, 2.0, 50, 1e-6).expect("refinement");
        assert_relative_eq!(refined.center[0], 60.0, epsilon = 0.1);
        assert_relative_eq!(refined.center[1], 45.0, epsilon = 0.1);
        assert_relative_eq!(refined.semi_major, 25.0, epsilon = 0.1);
        assert_relative_eq!(refined.semi_minor, 14.0, epsilon = 0.1);
    }

    #[test]
    fn gate_excludes_far_points() {
        let truth = Ellipse::from_axes([0.0, 0.0], 10.0, 6.0, 0.0).unwrap();
        let mut pts = truth.sample_points(60);
        pts.extend([[40.0, 40.0], [-35.0, 2.0], [0.0, 30.0]]);
        let refined = refine_ellipse(&pts, &truth, 1.0, 20, 1e-8).expect("refinement");
        assert_relative_eq!(refined.semi_major, 10.0, epsilon = 1e-6);
        assert_relative_eq!(refined.semi_minor, 6.0, epsilon = 1e-6);
    }

    #[test]
    fn too_few_points_in_gate() {
        let e = Ellipse::from_axes([0.0, 0.0], 10.0, 10.0, 0.0).unwrap();
        let pts = [[10.0, 0.0], [0.0, 10.0], [50.0, 50.0], [60.0, 0.0]];
        assert!(matches!(
            refine_ellipse(&pts, &e, 1.0, 10, 1e-3),
            Err(RefineError::TooFewPoints { admitted: 2 })
        ));
    }

    #[test]
    fn iteration_budget() {
        let truth = Ellipse::from_axes([0.0, 0.0], 10.0, 6.0, 0.0).unwrap();
        let start = Ellipse::from_axes([0.5, 0.0], 10.0, 6.0, 0.0).unwrap();
        let pts = truth.sample_points(40);
        assert!(matches!(
            refine_ellipse(&pts, &start, 2.0, 1, 1e-12),
            Err(RefineError::NotConverged(1))
        ));
    }
}
