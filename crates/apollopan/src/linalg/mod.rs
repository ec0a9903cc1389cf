//! Linear-algebra primitives: packed symmetric storage, packed Cholesky, and
//! the combinatorial helpers used for minimal-sample selection.

mod cholesky;
mod combinatorics;
mod packed;

pub use cholesky::{
    back_substitute, decompose, forward_substitute, invert, solve, CholeskyPolicy, SolveMode,
    SolveStatus,
};
pub use combinatorics::{binomial, indices_from_set};
pub use packed::{pack, packed_len, PackedSymmetric};

/// Errors from the linear-algebra helpers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinalgError {
    #[error("invalid solve mode {0}, expected 1..=3")]
    InvalidMode(i32),
    #[error("subset size {k} exceeds set size {n}")]
    SubsetTooLarge { k: usize, n: usize },
    #[error("subset rank {rank} outside 1..={total}")]
    RankOutOfRange { rank: u64, total: u64 },
}
