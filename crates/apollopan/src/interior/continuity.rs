//! Lagrange continuity adjustment between adjacent strips.
//!
//! Adjacent strips `k` and `k + 1` share the fiducial pair closing strip
//! `k`. Requiring both affines to map those two points identically gives
//! four linear conditions `C_k·(x_k − x_{k+1}) = 0`, with `C_k` the 4×6
//! observation rows of the shared pair. With `N_k⁻¹` from the independent
//! fits, the multipliers solve the block tridiagonal system
//! `(B N⁻¹ Bᵀ)·K = C·(x_{k+1} − x_k)`, and each strip is corrected by
//! `N_k⁻¹ Bᵀ K`.

use super::fiducials::Fiducial;
use super::strips::{observation_rows, StripFit, STRIP_UNKNOWNS};
use crate::linalg::{solve, CholeskyPolicy, PackedSymmetric, SolveMode, SolveStatus};

const CONDITIONS: usize = 4;

type Rows = [[f64; STRIP_UNKNOWNS]; CONDITIONS];

/// Constraint rows of one adjacent pair and their products with the
/// inverse normals on either side.
struct Junction {
    c: Rows,
    /// `C_k · N_k⁻¹`
    left: Rows,
    /// `−C_k · N_{k+1}⁻¹`
    right: Rows,
}

impl Junction {
    fn new(fiducials: &[Fiducial], fits: &[StripFit], k: usize) -> Self {
        let last = fits[k].last;
        let [u0, v0] = observation_rows(fiducials[last - 1].machine);
        let [u1, v1] = observation_rows(fiducials[last].machine);
        let c = [u0, v0, u1, v1];
        let left = times_inverse(&c, &fits[k].inverse_normal, 1.0);
        let right = times_inverse(&c, &fits[k + 1].inverse_normal, -1.0);
        Self { c, left, right }
    }
}

fn times_inverse(c: &Rows, inverse: &PackedSymmetric, sign: f64) -> Rows {
    let mut out = [[0.0; STRIP_UNKNOWNS]; CONDITIONS];
    for (o, row) in out.iter_mut().zip(c) {
        for (j, v) in o.iter_mut().enumerate() {
            *v = sign * (0..STRIP_UNKNOWNS).map(|i| row[i] * inverse.get(i, j)).sum::<f64>();
        }
    }
    out
}

#[inline]
fn dot(a: &[f64; STRIP_UNKNOWNS], b: &[f64; STRIP_UNKNOWNS]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Correct the coefficients of `fits` in place so that adjacent affines
/// agree on their shared fiducials. Returns the status of the multiplier
/// solve; under the strict policy a failed solve leaves `fits` unchanged.
pub(crate) fn enforce_continuity(
    fiducials: &[Fiducial],
    fits: &mut [StripFit],
    policy: CholeskyPolicy,
) -> SolveStatus {
    let n = fits.len();
    if n < 2 {
        return SolveStatus::Solved;
    }
    let junctions: Vec<Junction> = (0..n - 1).map(|k| Junction::new(fiducials, fits, k)).collect();

    let dim = CONDITIONS * (n - 1);
    let mut system = PackedSymmetric::zeros(dim);
    let mut multipliers = vec![0.0; dim];
    for (k, j) in junctions.iter().enumerate() {
        let base = CONDITIONS * k;
        for r in 0..CONDITIONS {
            for s in 0..=r {
                let v = dot(&j.left[r], &j.c[s]) - dot(&j.right[r], &j.c[s]);
                system.set(base + r, base + s, v);
            }
        }
        if let Some(next) = junctions.get(k + 1) {
            for r in 0..CONDITIONS {
                for s in 0..CONDITIONS {
                    system.set(base + CONDITIONS + s, base + r, dot(&j.right[r], &next.c[s]));
                }
            }
        }
        let gap: Vec<f64> = fits[k + 1]
            .coeffs
            .iter()
            .zip(&fits[k].coeffs)
            .map(|(b, a)| b - a)
            .collect();
        for r in 0..CONDITIONS {
            multipliers[base + r] = j.c[r].iter().zip(&gap).map(|(c, g)| c * g).sum();
        }
    }

    let status = solve(&mut system, &mut multipliers, SolveMode::Solve, policy);
    if !status.is_solved() {
        tracing::warn!(constraints = dim, ?policy, "continuity system not positive definite");
        if policy == CholeskyPolicy::Strict {
            return status;
        }
    }

    for (k, fit) in fits.iter_mut().enumerate() {
        let mut delta = [0.0; STRIP_UNKNOWNS];
        if let Some(j) = junctions.get(k) {
            accumulate(&mut delta, &j.left, &multipliers[CONDITIONS * k..CONDITIONS * (k + 1)]);
        }
        if k > 0 {
            let j = &junctions[k - 1];
            accumulate(
                &mut delta,
                &j.right,
                &multipliers[CONDITIONS * (k - 1)..CONDITIONS * k],
            );
        }
        for (c, d) in fit.coeffs.iter_mut().zip(delta) {
            *c += d;
        }
    }
    status
}

/// `delta += rowsᵀ · k`
fn accumulate(delta: &mut [f64; STRIP_UNKNOWNS], rows: &Rows, k: &[f64]) {
    for (row, &kr) in rows.iter().zip(k) {
        for (d, v) in delta.iter_mut().zip(row) {
            *d += v * kr;
        }
    }
}
