//! Tile scheduler: a fixed pool of workers, organized into cooperating
//! groups of four, drains one tile batch's pairs and reports the tile's
//! aggregate result.
//!
//! Grounded in `nw_affine.c`'s `main`: a single mutex-protected counter
//! (`seq_id_mutex`/`score_offset`) is advanced as each group claims its next
//! pair, and a group drives the kernel for that pair while its three
//! followers cooperate on the diagonal sweep. This re-expresses the
//! original's worker-reads-a-tag wake/sleep primitive (`tasklet_params`,
//! `send_work`/`wait_for_work`) as a channel-based hand-off: the group's
//! leader is the only thread that claims pairs and sends results, and
//! intra-pair cooperation is delegated to
//! `pim_align_core::kernel::align_with_lanes`, whose per-diagonal sweep is
//! itself safe to split across workers because no cell depends on a sibling
//! cell in the same diagonal (see kernel.rs). The per-group "leader + 3
//! followers" OS-thread/barrier plumbing in the source collapses to this
//! because a CPU rewrite has no tasklet wake/sleep primitive to imitate
//! faithfully; see DESIGN.md for the tradeoff.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crossbeam_channel::unbounded;
use pim_align_core::kernel;

use crate::batch::{PairResult, TileBatch, TileResult};

/// Workers per cooperating group: one leader plus three followers, matching
/// the original's fixed four-tasklet group (`group() = me() / 4`).
pub const GROUP_SIZE: usize = 4;

/// Drains `batch`'s pairs across `groups_per_tile` cooperating groups of
/// [`GROUP_SIZE`] workers each (so `workers_per_tile = groups_per_tile *
/// GROUP_SIZE`), and returns the tile's aggregate result. Pairs are claimed
/// from a single shared atomic counter -- the per-tile analogue of
/// `nw_affine.c`'s `seq_id_mutex`-protected `score_offset` -- so result
/// ordering within the output is determined by `PairResult::index`, which
/// was assigned by the host balancer at dispatch time, not by completion
/// order.
#[must_use]
pub fn run_tile(batch: &TileBatch, groups_per_tile: usize) -> TileResult {
  let groups_per_tile = groups_per_tile.max(1);
  let start = Instant::now();
  let next_index = AtomicUsize::new(0);
  let (tx, rx) = unbounded::<PairResult>();

  log::info!(
    "tile launch: {} pairs across {groups_per_tile} groups (want_cigar={})",
    batch.len(),
    batch.want_cigar
  );

  crossbeam::scope(|scope| {
    for group_id in 0..groups_per_tile {
      let tx = tx.clone();
      let next_index = &next_index;
      scope.spawn(move |_| loop {
        let claimed = next_index.fetch_add(1, Ordering::SeqCst);
        let Some(pair) = batch.pairs.get(claimed) else {
          break;
        };
        log::debug!("group {group_id} claims pair index={}", pair.index);
        let (score, cigar) = kernel::align_with_lanes(&pair.a, &pair.b, &batch.params, batch.want_cigar, GROUP_SIZE);
        tx.send(PairResult { index: pair.index, score, cigar })
          .expect("collecting thread outlives every group");
      });
    }
    drop(tx);
  })
  .expect("a tile worker thread panicked");

  let results: Vec<PairResult> = rx.iter().collect();
  let perf_counter = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
  log::info!("tile complete: {} pairs in {perf_counter}ns", results.len());

  TileResult { perf_counter, results }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::batch::TilePair;
  use pim_align_core::{AlignParams, Sequence};
  use pretty_assertions::assert_eq;

  fn pair(index: usize, a: &str, b: &str) -> TilePair {
    TilePair {
      index,
      a: Sequence::from_ascii(a.as_bytes()).unwrap(),
      b: Sequence::from_ascii(b.as_bytes()).unwrap(),
    }
  }

  #[test]
  fn every_pair_produces_exactly_one_result() {
    let batch = TileBatch::new(
      vec![
        pair(0, "ACGT", "ACGT"),
        pair(1, "ACGT", "AGGT"),
        pair(2, "ACGT", "ACT"),
        pair(3, "ACGT", "ACCGT"),
      ],
      AlignParams::new(1, -1, -1, -1),
      true,
    );

    let result = run_tile(&batch, 2).sorted_by_index();
    assert_eq!(result.results.len(), 4);
    let scores: Vec<i32> = result.results.iter().map(|r| r.score).collect();
    assert_eq!(scores, vec![4, 2, 1, 2]);
    for r in &result.results {
      assert!(r.cigar.is_some());
    }
  }

  #[test]
  fn scores_only_mode_omits_cigars() {
    let batch = TileBatch::new(vec![pair(0, "ACGT", "ACGT")], AlignParams::new(1, -1, -1, -1), false);
    let result = run_tile(&batch, 1);
    assert_eq!(result.results.len(), 1);
    assert!(result.results[0].cigar.is_none());
  }

  #[test]
  fn empty_batch_produces_empty_result() {
    let batch = TileBatch::new(vec![], AlignParams::new(1, -1, -1, -1), false);
    let result = run_tile(&batch, 6);
    assert!(result.results.is_empty());
  }
}
