//! In-place Cholesky factorization of packed symmetric matrices.
//!
//! All routines work on a [`PackedSymmetric`] whose storage is reused for the
//! factor `L` (and optionally for `A⁻¹`), so normal matrices can be
//! accumulated, factored and inverted without extra allocations beyond a
//! scratch triangle for the inverse.

use serde::{Deserialize, Serialize};

use super::packed::PackedSymmetric;
use super::LinalgError;

/// Outcome of a packed Cholesky operation. Encodes as `0` / `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum SolveStatus {
    /// A pivot was non-positive; the output is partial or pseudo-factored.
    NotSolvable = 0,
    /// Every pivot was positive.
    Solved = 1,
}

impl SolveStatus {
    /// True for [`SolveStatus::Solved`].
    pub fn is_solved(self) -> bool {
        matches!(self, Self::Solved)
    }
}

/// Handling of non-positive pivots during factorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CholeskyPolicy {
    /// Stop at the first non-positive pivot and report `NotSolvable`.
    #[default]
    Strict,
    /// Replace a non-positive pivot `d` with `sqrt(|d|)` and keep going.
    ///
    /// `|d|` is floored at `ε·|a_jj|` (and at the smallest normal `f64`), so a
    /// vanishing pivot still yields a finite pseudo-factor. The result stays
    /// usable for tightly constrained normal equations close to singularity.
    /// The status is still reported as `NotSolvable`.
    Permissive,
}

/// Which stages [`solve`] runs. Mirrors the numeric modes 1..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMode {
    /// Factor only (`A ← L`).
    Decompose = 1,
    /// Factor and solve `A x = b` (`b ← x`).
    Solve = 2,
    /// Factor, solve, and replace the factor with `A⁻¹`.
    SolveAndInvert = 3,
}

impl TryFrom<i32> for SolveMode {
    type Error = LinalgError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Decompose),
            2 => Ok(Self::Solve),
            3 => Ok(Self::SolveAndInvert),
            other => Err(LinalgError::InvalidMode(other)),
        }
    }
}

/// Factor `a` in place into its lower Cholesky factor `L` (`A = L Lᵀ`).
pub fn decompose(a: &mut PackedSymmetric, policy: CholeskyPolicy) -> SolveStatus {
    let n = a.dim();
    let mut status = SolveStatus::Solved;

    for j in 0..n {
        let diagonal = a.get(j, j);
        let mut pivot = diagonal;
        for k in 0..j {
            let l = a.get(j, k);
            pivot -= l * l;
        }
        if pivot <= 0.0 || !pivot.is_finite() {
            match policy {
                CholeskyPolicy::Strict => return SolveStatus::NotSolvable,
                CholeskyPolicy::Permissive => {
                    tracing::warn!(column = j, pivot, "non-positive Cholesky pivot, using |pivot|");
                    status = SolveStatus::NotSolvable;
                    pivot = permissive_pivot(pivot, diagonal);
                }
            }
        }
        let diag = pivot.sqrt();
        a.set(j, j, diag);

        for i in (j + 1)..n {
            let mut v = a.get(i, j);
            for k in 0..j {
                v -= a.get(i, k) * a.get(j, k);
            }
            a.set(i, j, v / diag);
        }
    }
    status
}

/// Finite positive stand-in for a non-positive pivot.
fn permissive_pivot(pivot: f64, diagonal: f64) -> f64 {
    let floor = (f64::EPSILON * diagonal.abs()).max(f64::MIN_POSITIVE);
    let floor = if floor.is_finite() { floor } else { f64::MIN_POSITIVE };
    if pivot.is_finite() {
        pivot.abs().max(floor)
    } else {
        floor
    }
}

/// Solve `L y = b` in place, `L` being the factor left by [`decompose`].
pub fn forward_substitute(l: &PackedSymmetric, b: &mut [f64]) {
    let n = l.dim();
    debug_assert_eq!(b.len(), n);
    for i in 0..n {
        let mut v = b[i];
        for k in 0..i {
            v -= l.get(i, k) * b[k];
        }
        b[i] = v / l.get(i, i);
    }
}

/// Solve `Lᵀ x = y` in place.
pub fn back_substitute(l: &PackedSymmetric, y: &mut [f64]) {
    let n = l.dim();
    debug_assert_eq!(y.len(), n);
    for i in (0..n).rev() {
        let mut v = y[i];
        for k in (i + 1)..n {
            v -= l.get(k, i) * y[k];
        }
        y[i] = v / l.get(i, i);
    }
}

/// Replace the factor `L` with the full inverse `A⁻¹ = L⁻ᵀ L⁻¹` in packed form.
pub fn invert(l: &mut PackedSymmetric) {
    let n = l.dim();

    // W = L⁻¹ is lower triangular and fits the same packed layout.
    let mut w = PackedSymmetric::zeros(n);
    for j in 0..n {
        w.set(j, j, 1.0 / l.get(j, j));
        for i in (j + 1)..n {
            let mut v = 0.0;
            for k in j..i {
                v += l.get(i, k) * w.get(k, j);
            }
            w.set(i, j, -v / l.get(i, i));
        }
    }

    for i in 0..n {
        for j in 0..=i {
            let mut v = 0.0;
            for k in i..n {
                v += w.get(k, i) * w.get(k, j);
            }
            l.set(i, j, v);
        }
    }
}

/// Factor `a` and run the stages selected by `mode`.
///
/// With [`SolveMode::Solve`] or [`SolveMode::SolveAndInvert`], `b` is
/// overwritten by the solution. Under [`CholeskyPolicy::Strict`] a failed
/// factorization stops immediately and leaves `a` partially factored and
/// `b` untouched.
pub fn solve(
    a: &mut PackedSymmetric,
    b: &mut [f64],
    mode: SolveMode,
    policy: CholeskyPolicy,
) -> SolveStatus {
    let status = decompose(a, policy);
    if !status.is_solved() && policy == CholeskyPolicy::Strict {
        return status;
    }
    if matches!(mode, SolveMode::Solve | SolveMode::SolveAndInvert) {
        forward_substitute(a, b);
        back_substitute(a, b);
    }
    if mode == SolveMode::SolveAndInvert {
        invert(a);
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{DMatrix, DVector};

    fn spd(n: usize) -> DMatrix<f64> {
        // Hilbert-like, shifted onto the diagonal to keep the test well posed.
        DMatrix::from_fn(n, n, |i, j| {
            let h = 1.0 / (i + j + 1) as f64;
            if i == j {
                h + 1.0
            } else {
                h
            }
        })
    }

    #[test]
    fn factor_reproduces_matrix() {
        let dense = spd(5);
        let mut a = PackedSymmetric::from_dense(&dense).unwrap();
        assert_eq!(decompose(&mut a, CholeskyPolicy::Strict), SolveStatus::Solved);

        let l = DMatrix::from_fn(5, 5, |i, j| if i >= j { a.get(i, j) } else { 0.0 });
        let rebuilt = &l * l.transpose();
        for (x, y) in rebuilt.iter().zip(dense.iter()) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-12);
        }
    }

    #[test]
    fn solve_and_invert_match_dense() {
        let dense = spd(6);
        let rhs = DVector::from_vec(vec![1.0, -2.0, 0.5, 3.0, 0.0, -1.0]);
        let expected = dense.clone().cholesky().unwrap().solve(&rhs);
        let expected_inv = dense.clone().try_inverse().unwrap();

        let mut a = PackedSymmetric::from_dense(&dense).unwrap();
        let mut b = rhs.as_slice().to_vec();
        let status = solve(&mut a, &mut b, SolveMode::SolveAndInvert, CholeskyPolicy::Strict);
        assert!(status.is_solved());
        for (x, y) in b.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-10);
        }
        for i in 0..6 {
            for j in 0..6 {
                assert_abs_diff_eq!(a.get(i, j), expected_inv[(i, j)], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn strict_rejects_indefinite() {
        let dense = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        let mut a = PackedSymmetric::from_dense(&dense).unwrap();
        let mut b = vec![1.0, 1.0];
        let status = solve(&mut a, &mut b, SolveMode::Solve, CholeskyPolicy::Strict);
        assert_eq!(status, SolveStatus::NotSolvable);
        assert_eq!(b, vec![1.0, 1.0]);
    }

    #[test]
    fn permissive_keeps_going_with_finite_output() {
        let dense = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        let mut a = PackedSymmetric::from_dense(&dense).unwrap();
        let mut b = vec![1.0, 1.0];
        let status = solve(&mut a, &mut b, SolveMode::Solve, CholeskyPolicy::Permissive);
        assert_eq!(status, SolveStatus::NotSolvable);
        assert!(b.iter().all(|v| v.is_finite()));
        assert_abs_diff_eq!(a.get(1, 1), 3.0f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn permissive_zero_pivot_stays_finite() {
        let dense = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);

        let mut a = PackedSymmetric::from_dense(&dense).unwrap();
        let status = decompose(&mut a, CholeskyPolicy::Permissive);
        assert_eq!(status, SolveStatus::NotSolvable);
        assert_eq!(a.get(1, 1), f64::EPSILON.sqrt());

        let mut a = PackedSymmetric::from_dense(&dense).unwrap();
        let mut b = vec![1.0, 2.0];
        let status = solve(&mut a, &mut b, SolveMode::SolveAndInvert, CholeskyPolicy::Permissive);
        assert_eq!(status, SolveStatus::NotSolvable);
        assert!(b.iter().all(|v| v.is_finite()), "{b:?}");
        assert!(a.as_slice().iter().all(|v| v.is_finite()));

        assert!(permissive_pivot(f64::NAN, 4.0).is_finite());
        assert!(permissive_pivot(f64::NEG_INFINITY, f64::INFINITY) > 0.0);
        assert_eq!(permissive_pivot(-9.0, 1.0), 9.0);
    }

    #[test]
    fn mode_codes() {
        assert_eq!(SolveMode::try_from(1).unwrap(), SolveMode::Decompose);
        assert_eq!(SolveMode::try_from(3).unwrap(), SolveMode::SolveAndInvert);
        assert!(matches!(SolveMode::try_from(4), Err(LinalgError::InvalidMode(4))));
        assert_eq!(SolveStatus::Solved as i32, 1);
        assert_eq!(SolveStatus::NotSolvable as i32, 0);
    }

    #[test]
    fn decompose_only_leaves_rhs() {
        let mut a = PackedSymmetric::from_dense(&spd(3)).unwrap();
        let mut b = vec![1.0, 2.0, 3.0];
        let status = solve(&mut a, &mut b, SolveMode::Decompose, CholeskyPolicy::Strict);
        assert!(status.is_solved());
        assert_eq!(b, vec![1.0, 2.0, 3.0]);
    }
}
