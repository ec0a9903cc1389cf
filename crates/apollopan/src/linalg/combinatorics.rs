//! Binomial coefficients and lexicographic subset unranking.

use super::LinalgError;

/// Number of `k`-subsets of an `n`-set.
///
/// Returns 0 when `k > n` or `n < 1`. Computed as the ratio of the falling
/// products `n (n-1) … (n-k+1)` and `k (k-1) … 1`, interleaved so every
/// partial quotient stays an integer. Saturates at `u64::MAX`.
pub fn binomial(n: u64, k: u64) -> u64 {
    if k > n || n < 1 {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        acc = acc * u128::from(n - i) / u128::from(i + 1);
        if acc > u128::from(u64::MAX) {
            return u64::MAX;
        }
    }
    acc as u64
}

/// Subsets of size zero exist for every `n`, including the empty set.
fn count_subsets(n: u64, k: u64) -> u64 {
    if k == 0 {
        1
    } else {
        binomial(n, k)
    }
}

/// Indices of the `rank`-th `k`-subset of `{0, …, n-1}` in lexicographic order.
///
/// `rank` is 1-based and must lie in `[1, C(n, k)]`. The returned indices are
/// ascending.
pub fn indices_from_set(rank: u64, k: usize, n: usize) -> Result<Vec<usize>, LinalgError> {
    if k > n {
        return Err(LinalgError::SubsetTooLarge { k, n });
    }
    let total = count_subsets(n as u64, k as u64);
    if rank == 0 || rank > total {
        return Err(LinalgError::RankOutOfRange { rank, total });
    }

    let mut remaining = rank - 1;
    let mut out = Vec::with_capacity(k);
    let mut next = 0usize;
    for slot in 0..k {
        let left = (k - slot - 1) as u64;
        loop {
            // Subsets starting with `next` at this slot.
            let block = count_subsets((n - next - 1) as u64, left);
            if remaining < block {
                break;
            }
            remaining -= block;
            next += 1;
        }
        out.push(next);
        next += 1;
    }
    Ok(out)
}
