//! Reassembling per-tile results into one flat, order-preserving output
//! vector. Every dispatch mode -- Pair, Set, All -- tags each pair with a
//! single global index at batch-construction time ([`crate::triangular`],
//! [`crate::balancer::set_pair_offsets`], [`crate::all_mode::expand_to_pairs`]),
//! so reassembly itself has no mode-specific logic left: it just scatters
//! [`pim_align_tile::PairResult`] values by index.
//!
//! Grounded in `App16S.hpp`/`AppSet.hpp`'s `dpu_to_cpu`, which walks back
//! every DPU's result buffer and writes each score/CIGAR into its
//! `(set_id, i, j)` slot of the caller-visible output; here that slot has
//! already been flattened into a single `usize` by the dispatch layer.

use pim_align_core::BatchError;
use pim_align_tile::{PairResult, TileResult};

/// Scatters every [`PairResult`] across all `tile_results` into a
/// `total_len`-long vector, indexed by [`PairResult::index`]. Returns an
/// error if any pair never reported back -- i.e. the tile pool silently
/// dropped work, which is always a bug rather than a legitimate outcome.
pub fn reassemble(tile_results: Vec<TileResult>, total_len: usize) -> Result<Vec<PairResult>, BatchError> {
  let mut slots: Vec<Option<PairResult>> = (0..total_len).map(|_| None).collect();

  let mut reported = 0usize;
  for tile_result in tile_results {
    for result in tile_result.results {
      let index = result.index;
      if index >= total_len {
        return Err(BatchError::TooManyPairs { count: index + 1, max: total_len });
      }
      if slots[index].is_none() {
        reported += 1;
      }
      slots[index] = Some(result);
    }
  }

  if reported != total_len {
    log::warn!("reassembly expected {total_len} pairs but only {reported} reported back");
    return Err(BatchError::TooManyPairs { count: reported, max: total_len });
  }

  Ok(slots.into_iter().map(|s| s.expect("checked above: every slot filled")).collect())
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn result(index: usize, score: i32) -> PairResult {
    PairResult { index, score, cigar: None }
  }

  #[test]
  fn reassembles_out_of_order_results_into_index_order() {
    let tile_a = TileResult { perf_counter: 10, results: vec![result(2, 20), result(0, 0)] };
    let tile_b = TileResult { perf_counter: 20, results: vec![result(1, 10)] };
    let out = reassemble(vec![tile_a, tile_b], 3).unwrap();
    assert_eq!(out.iter().map(|r| r.score).collect::<Vec<_>>(), vec![0, 10, 20]);
  }

  #[test]
  fn errors_when_a_pair_never_reports_back() {
    let tile_a = TileResult { perf_counter: 0, results: vec![result(0, 0)] };
    let err = reassemble(vec![tile_a], 3).unwrap_err();
    assert!(matches!(err, BatchError::TooManyPairs { .. }));
  }

  #[test]
  fn empty_input_with_zero_total_len_is_fine() {
    let out = reassemble(Vec::new(), 0).unwrap();
    assert!(out.is_empty());
  }
}
