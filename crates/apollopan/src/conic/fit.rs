//! Minimal-sample conic fitting through the SVD null vector.

use nalgebra::DMatrix;

use super::ConicCoeffs;

/// Fit a general conic through five (or more) points.
///
/// Rows `(x², xy, y², x, y, 1)` form the design matrix, zero-padded to at
/// least 6×6; the conic is the right singular vector belonging to the
/// smallest singular value. Coordinates are normalized before the
/// decomposition and the coefficients mapped back afterwards.
///
/// Returns `None` for fewer than five points or when the null space is not
/// one-dimensional (duplicate or collinear samples). The result is not
/// classified; call [`ConicCoeffs::to_ellipse`] to keep only real ellipses.
pub fn fit_conic_svd(points: &[[f64; 2]]) -> Option<ConicCoeffs> {
    let n = points.len();
    if n < 5 {
        return None;
    }

    let (mean_x, mean_y, scale) = normalization_params(points);

    let rows = n.max(6);
    let mut d = DMatrix::<f64>::zeros(rows, 6);
    for (i, &[px, py]) in points.iter().enumerate() {
        let x = (px - mean_x) * scale;
        let y = (py - mean_y) * scale;
        d[(i, 0)] = x * x;
        d[(i, 1)] = x * y;
        d[(i, 2)] = y * y;
        d[(i, 3)] = x;
        d[(i, 4)] = y;
        d[(i, 5)] = 1.0;
    }

    let svd = d.svd(false, true);
    let v_t = svd.v_t?;
    let sv = &svd.singular_values;

    let mut order: Vec<usize> = (0..sv.len()).collect();
    order.sort_by(|&a, &b| sv[a].total_cmp(&sv[b]));
    let smallest = order[0];
    let runner_up = sv[order[1]];
    let largest = sv[order[order.len() - 1]];
    if !largest.is_finite() || largest <= 0.0 || runner_up <= 1e-10 * largest {
        return None;
    }

    let row = v_t.row(smallest);
    let coeffs_norm = [row[0], row[1], row[2], row[3], row[4], row[5]];
    let coeffs = denormalize_conic(&coeffs_norm, mean_x, mean_y, scale);
    if coeffs.iter().any(|c| !c.is_finite()) {
        return None;
    }
    Some(ConicCoeffs(coeffs))
}

/// Centroid and isotropic scale so that the mean distance from the centroid
/// becomes √2.
fn normalization_params(points: &[[f64; 2]]) -> (f64, f64, f64) {
    let n = points.len() as f64;
    let mean_x: f64 = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let mean_y: f64 = points.iter().map(|p| p[1]).sum::<f64>() / n;

    let mean_dist: f64 = points
        .iter()
        .map(|p| ((p[0] - mean_x).powi(2) + (p[1] - mean_y).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    let scale = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    (mean_x, mean_y, scale)
}

/// Map conic coefficients fitted on x' = s(x − mx), y' = s(y − my) back to
/// the original frame.
fn denormalize_conic(c: &[f64; 6], mx: f64, my: f64, s: f64) -> [f64; 6] {
    let [a_, b_, c_, d_, e_, f_] = *c;
    let s2 = s * s;

    let a = a_ * s2;
    let b = b_ * s2;
    let c = c_ * s2;
    let d = -2.0 * a_ * s2 * mx - b_ * s2 * my + d_ * s;
    let e = -b_ * s2 * mx - 2.0 * c_ * s2 * my + e_ * s;
    let f =
        a_ * s2 * mx * mx + b_ * s2 * mx * my + c_ * s2 * my * my - d_ * s * mx - e_ * s * my + f_;

    [a, b, c, d, e, f]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conic::Ellipse;
    use approx::assert_relative_eq;

    #[test]
    fn five_points_on_ellipse_recover_it() {
        let e = Ellipse::from_axes([40.0, 55.0], 12.0, 7.0, -0.4).unwrap();
        let pts: Vec<[f64; 2]> = e.sample_points(10).into_iter().step_by(2).collect();
        assert_eq!(pts.len(), 5);

        let conic = fit_conic_svd(&pts).expect("fit should succeed");
        let fitted = conic.to_ellipse().expect("should be a real ellipse");
        assert_relative_eq!(fitted.center[0], 40.0, epsilon = 1e-8);
        assert_relative_eq!(fitted.center[1], 55.0, epsilon = 1e-8);
        assert_relative_eq!(fitted.semi_major, 12.0, epsilon = 1e-8);
        assert_relative_eq!(fitted.semi_minor, 7.0, epsilon = 1e-8);
        assert_relative_eq!(fitted.angle(), -0.4, epsilon = 1e-8);
    }

    #[test]
    fn overdetermined_exact_points() {
        let e = Ellipse::from_axes([100.0, 80.0], 30.0, 15.0, 0.3).unwrap();
        let conic = fit_conic_svd(&e.sample_points(40)).expect("fit should succeed");
        let fitted = conic.to_ellipse().unwrap();
        assert_relative_eq!(fitted.area, e.area, max_relative = 1e-8);
    }

    #[test]
    fn degenerate_samples_rejected() {
        let line: Vec<[f64; 2]> = (0..5).map(|i| [i as f64, 2.0 * i as f64]).collect();
        assert!(fit_conic_svd(&line).is_none());

        let dup = vec![[3.0, 4.0]; 5];
        assert!(fit_conic_svd(&dup).is_none());

        assert!(fit_conic_svd(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]).is_none());
    }

    #[test]
    fn hyperbola_samples_fit_but_do_not_classify() {
        // x y = 1
        let pts = [[1.0, 1.0], [2.0, 0.5], [0.5, 2.0], [-1.0, -1.0], [-2.0, -0.5]];
        let conic = fit_conic_svd(&pts).expect("a conic exists");
        assert!(conic.to_ellipse().is_none());
    }
}
