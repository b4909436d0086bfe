//! The row-major upper-triangle enumeration shared by every dispatch mode:
//! pair `(i, j)` with `i < j` out of `n` sequences maps to a single linear
//! index. Grounded in `nw_16s.c`'s `sum_integers`/`triangular_index`.

/// `n * (n - 1) / 2`, i.e. the number of unordered pairs among `n` items.
#[must_use]
pub fn total_pairs(n: u64) -> u64 {
  n.saturating_mul(n.saturating_sub(1)) / 2
}

/// Linear row-major index of pair `(i, j)`, `i < j < n`, in the upper
/// triangle of an `n x n` matrix.
#[must_use]
pub fn triangular_index(i: u64, j: u64, n: u64) -> u64 {
  total_pairs(n) - total_pairs(n - i) + j - i - 1
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn enumerates_every_pair_of_a_small_set_in_order() {
    let n = 4;
    let mut pairs = Vec::new();
    for i in 0..n {
      for j in (i + 1)..n {
        pairs.push((i, j));
      }
    }
    for (expected, &(i, j)) in pairs.iter().enumerate() {
      assert_eq!(triangular_index(i, j, n), expected as u64, "pair ({i},{j})");
    }
  }

  #[test]
  fn total_pairs_matches_combination_count() {
    assert_eq!(total_pairs(5), 10);
    assert_eq!(total_pairs(1), 0);
    assert_eq!(total_pairs(0), 0);
  }
}
