//! Packed lower-triangular storage for symmetric matrices.

use nalgebra::DMatrix;

/// Slot of element `(i, j)` in packed lower-triangular storage.
///
/// The row/column pair is symmetric: `(i, j)` and `(j, i)` share a slot.
/// For `row >= col` the slot is `col + row (row + 1) / 2`.
#[inline]
pub fn pack(i: usize, j: usize) -> usize {
    let (row, col) = if i >= j { (i, j) } else { (j, i) };
    col + row * (row + 1) / 2
}

/// Number of slots needed to store an `n x n` symmetric matrix.
#[inline]
pub const fn packed_len(n: usize) -> usize {
    n * (n + 1) / 2
}

/// Symmetric `n x n` matrix stored as its lower triangle in `n (n + 1) / 2` slots.
///
/// Every element access goes through [`pack`], so callers index with plain
/// 0-based `(row, col)` pairs in either order.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedSymmetric {
    dim: usize,
    data: Vec<f64>,
}

impl PackedSymmetric {
    /// All-zero matrix of dimension `dim`.
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            data: vec![0.0; packed_len(dim)],
        }
    }

    /// Wrap an existing packed buffer. Returns `None` if the length does not
    /// match `dim`.
    pub fn from_packed(dim: usize, data: Vec<f64>) -> Option<Self> {
        (data.len() == packed_len(dim)).then_some(Self { dim, data })
    }

    /// Pack the lower triangle of a square dense matrix.
    pub fn from_dense(m: &DMatrix<f64>) -> Option<Self> {
        if m.nrows() != m.ncols() {
            return None;
        }
        let dim = m.nrows();
        let mut out = Self::zeros(dim);
        for row in 0..dim {
            for col in 0..=row {
                out.set(row, col, m[(row, col)]);
            }
        }
        Some(out)
    }

    /// Matrix dimension `n`.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Element `(i, j)`, either order.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[pack(i, j)]
    }

    /// Overwrite element `(i, j)` and its mirror.
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[pack(i, j)] = value;
    }

    /// Add `value` to element `(i, j)`.
    #[inline]
    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        self.data[pack(i, j)] += value;
    }

    /// Accumulate `weight * row rowᵀ` (a rank-one normal-equation update).
    pub fn add_outer(&mut self, row: &[f64], weight: f64) {
        debug_assert_eq!(row.len(), self.dim);
        for i in 0..self.dim {
            if row[i] == 0.0 {
                continue;
            }
            let wi = weight * row[i];
            for j in 0..=i {
                self.data[pack(i, j)] += wi * row[j];
            }
        }
    }

    /// Reset every slot to zero, keeping the dimension.
    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Raw packed slots.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Expand to a full dense symmetric matrix.
    pub fn to_dense(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.dim, self.dim, |i, j| self.get(i, j))
    }

    /// Matrix-vector product with the symmetric matrix.
    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.dim);
        (0..self.dim)
            .map(|i| (0..self.dim).map(|j| self.get(i, j) * x[j]).sum())
            .collect()
    }
}
