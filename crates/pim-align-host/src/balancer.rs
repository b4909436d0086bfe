//! Set-mode host balancer: greedy bin-packing of disjoint sets across tiles,
//! with an adaptively shrinking per-wave load threshold, plus Pair mode
//! (mechanically All mode's triangular split applied to a single set,
//! scores only).
//!
//! Grounded in `AppSet.hpp`: `sorted_map` (sort by descending load),
//! `get_bucket`/`take_load` (the threshold-decaying wave selection),
//! `bucket_sets` (greedy smallest-load-first tile assignment), and
//! `cpu_to_dpu` (per-tile batch construction with its packed-byte/pair/
//! CIGAR-byte budgets).

use pim_align_core::{pair_load, AlignPairwiseParams, BatchError, Set};
use pim_align_tile::{TileBatch, TilePair};

use crate::all_mode;
use crate::cost::{sorted_by_load_desc, SetLoad};
use crate::triangular::{total_pairs, triangular_index};

/// Per-set starting offset into the flat, caller-visible result vector: the
/// running sum of `comb(|set_i|)` over sets before this one, in the
/// caller's original ordering. Mirrors `dpu_to_cpu`'s per-set `res[set_id]`
/// layout, flattened into one vector instead of a vector of vectors.
#[must_use]
pub fn set_pair_offsets(sets: &[Set]) -> Vec<usize> {
  let mut offsets = Vec::with_capacity(sets.len());
  let mut running = 0usize;
  for set in sets {
    offsets.push(running);
    running += total_pairs(set.len() as u64) as usize;
  }
  offsets
}

/// Total number of pairs across every set, i.e. the length the flat result
/// vector must have.
#[must_use]
pub fn total_output_len(sets: &[Set]) -> usize {
  sets.iter().map(|s| total_pairs(s.len() as u64) as usize).sum()
}

/// Greedy smallest-load-first bin-packing of (already load-sorted) sets
/// across `n_tiles` buckets. Grounded in `bucket_sets`: each candidate set,
/// taken in descending-load order, goes to the tile with the currently
/// lowest accumulated load.
#[must_use]
pub fn bucket_sets(wave: &[SetLoad], n_tiles: usize) -> Vec<Vec<usize>> {
  let n_tiles = n_tiles.max(1);
  let mut tile_loads = vec![0u64; n_tiles];
  let mut tile_sets: Vec<Vec<usize>> = vec![Vec::new(); n_tiles];
  for sl in wave {
    let (min_tile, _) = tile_loads.iter().enumerate().min_by_key(|&(_, &load)| load).expect("n_tiles > 0");
    tile_sets[min_tile].push(sl.index);
    tile_loads[min_tile] += sl.load;
  }
  tile_sets
}

/// Iterative wave selector over a descending-load-sorted backlog of sets,
/// shrinking its per-tile threshold by a factor of `(1 - 1/45)` after each
/// wave. Grounded in `AppSet::get_bucket`/`take_load`.
pub struct SetBalancer<'a> {
  sets: &'a [Set],
  remaining: Vec<SetLoad>,
  n_tiles: usize,
  threshold: f64,
}

impl<'a> SetBalancer<'a> {
  #[must_use]
  pub fn new(sets: &'a [Set], n_tiles: usize, initial_threshold: f64) -> Self {
    Self {
      sets,
      remaining: sorted_by_load_desc(sets),
      n_tiles: n_tiles.max(1),
      threshold: initial_threshold,
    }
  }

  /// Whether every set has been assigned to a wave already.
  #[must_use]
  pub fn is_exhausted(&self) -> bool {
    self.remaining.is_empty()
  }

  /// Pulls the next wave: scans the remaining sets (already sorted by
  /// descending load) accumulating load until it reaches this wave's
  /// budget (`threshold * n_tiles`) *and* at least `n_tiles` sets have been
  /// scanned, then rounds the count down to a multiple of `n_tiles` so
  /// every tile in the wave gets an even share. Returns `None` once the
  /// backlog is empty.
  pub fn next_wave(&mut self) -> Option<Vec<SetLoad>> {
    if self.remaining.is_empty() {
      return None;
    }

    let threshold = self.threshold;
    self.threshold -= self.threshold / 45.0;
    let budget = threshold * self.n_tiles as f64;

    let mut taken = 0usize;
    let mut total_load = 0u64;
    for sl in &self.remaining {
      if (total_load as f64) >= budget && taken >= self.n_tiles {
        break;
      }
      total_load += sl.load;
      taken += 1;
    }
    if taken > self.n_tiles {
      taken -= taken % self.n_tiles;
    }
    taken = taken.min(self.remaining.len());

    Some(self.remaining.drain(..taken).collect())
  }
}

/// Builds one tile's CIGAR-bearing `TileBatch` from the sets assigned to
/// it, tagging every pair with its global flat-output index via `offsets`.
/// Validates the per-tile budgets from §4.3/§6 (set count, pair count,
/// packed-sequence bytes, CIGAR bytes) before returning.
fn build_tile_batch(
  set_indices: &[usize],
  sets: &[Set],
  offsets: &[usize],
  params: &AlignPairwiseParams,
) -> Result<TileBatch, BatchError> {
  if set_indices.len() > params.max_sets_per_batch {
    return Err(BatchError::TooManySets {
      count: set_indices.len(),
      max: params.max_sets_per_batch,
    });
  }

  let mut pairs = Vec::new();
  let mut packed_bytes = 0usize;
  let mut cigar_bytes = 0usize;

  for &set_idx in set_indices {
    let set = &sets[set_idx];
    let n = set.len() as u64;
    let offset = offsets[set_idx];

    for seq in set.sequences() {
      // 2 bits/nucleotide, rounded up to a byte, then padded to 8-byte
      // alignment as the packed sequence buffer requires (§6).
      let packed = (seq.len() * 2).div_ceil(8);
      packed_bytes += packed.div_ceil(8) * 8;
    }

    for i in 0..set.len() {
      for j in (i + 1)..set.len() {
        let a = &set.sequences()[i];
        let b = &set.sequences()[j];
        let max_cigar = a.len() + b.len();
        cigar_bytes += max_cigar.div_ceil(8) * 8;

        let index = offset + triangular_index(i as u64, j as u64, n) as usize;
        pairs.push(TilePair { index, a: a.clone(), b: b.clone() });
      }
    }
  }

  if pairs.len() > params.max_pairs_per_batch {
    return Err(BatchError::TooManyPairs {
      count: pairs.len(),
      max: params.max_pairs_per_batch,
    });
  }
  if packed_bytes >= params.max_packed_bytes_per_batch {
    return Err(BatchError::PackedSequenceOverflow {
      bytes: packed_bytes,
      max: params.max_packed_bytes_per_batch,
    });
  }
  if cigar_bytes > params.max_cigar_bytes_per_batch {
    return Err(BatchError::CigarBudgetExceeded {
      bytes: cigar_bytes,
      max: params.max_cigar_bytes_per_batch,
    });
  }

  Ok(TileBatch::new(pairs, params.align_params(), true))
}

/// Runs the full Set-mode balancer to completion: repeatedly pulls a wave
/// from `sets`, bin-packs it across `n_tiles`, and builds one `TileBatch`
/// per tile per wave (tiles with no sets assigned this wave get an empty
/// batch). Returns the waves of per-tile batches in dispatch order, plus
/// the offset table needed to reassemble the flat output vector.
pub fn dispatch_set_mode(sets: &[Set], params: &AlignPairwiseParams, n_tiles: usize) -> Result<Vec<Vec<TileBatch>>, BatchError> {
  let offsets = set_pair_offsets(sets);
  let mut balancer = SetBalancer::new(sets, n_tiles, params.batch_threshold_initial);
  let mut waves = Vec::new();

  while let Some(wave) = balancer.next_wave() {
    log::debug!("set-mode wave: {} sets", wave.len());
    let buckets = bucket_sets(&wave, n_tiles);
    let mut tile_batches = Vec::with_capacity(buckets.len());
    for bucket in &buckets {
      tile_batches.push(build_tile_batch(bucket, sets, &offsets, params)?);
    }
    waves.push(tile_batches);
  }

  Ok(waves)
}

/// Pair mode: one set, every pair, scores only. Mechanically All mode's
/// triangular split (`all_mode::build_batches`) with Pair mode's smaller
/// per-tile pair ceiling (§6: `P <= 4096`) and no CIGARs.
pub fn dispatch_pair_mode(set: &Set, params: &AlignPairwiseParams, n_tiles: usize) -> Result<Vec<TileBatch>, BatchError> {
  all_mode::build_batches(set, &params.align_params(), n_tiles, params.max_pairs_per_batch)
}

#[cfg(test)]
mod tests {
  use super::*;
  use pim_align_core::Sequence;
  use pretty_assertions::assert_eq;

  fn set_of(n: usize, len: usize) -> Set {
    Set::new((0..n).map(|_| Sequence::from_codes(vec![0; len])).collect()).unwrap()
  }

  #[test]
  fn bucket_sets_balances_load_across_tiles() {
    let sets = vec![set_of(2, 100), set_of(2, 10), set_of(2, 10), set_of(2, 10)];
    let wave = sorted_by_load_desc(&sets);
    let buckets = bucket_sets(&wave, 2);
    assert_eq!(buckets.len(), 2);
    let total_assigned: usize = buckets.iter().map(Vec::len).sum();
    assert_eq!(total_assigned, sets.len());
  }

  #[test]
  fn set_pair_offsets_accumulate_comb_of_set_sizes() {
    let sets = vec![set_of(3, 4), set_of(2, 4)];
    let offsets = set_pair_offsets(&sets);
    assert_eq!(offsets, vec![0, 3]);
    assert_eq!(total_output_len(&sets), 4);
  }

  #[test]
  fn dispatch_is_idempotent_given_the_same_input() {
    let sets = vec![set_of(3, 50), set_of(5, 20), set_of(2, 10)];
    let params = AlignPairwiseParams::default();
    let first = dispatch_set_mode(&sets, &params, 2).unwrap();
    let second = dispatch_set_mode(&sets, &params, 2).unwrap();
    assert_eq!(first.len(), second.len());
    for (wave_a, wave_b) in first.iter().zip(second.iter()) {
      assert_eq!(wave_a.len(), wave_b.len());
      for (a, b) in wave_a.iter().zip(wave_b.iter()) {
        assert_eq!(a.pairs.len(), b.pairs.len());
        let idx_a: Vec<usize> = a.pairs.iter().map(|p| p.index).collect();
        let idx_b: Vec<usize> = b.pairs.iter().map(|p| p.index).collect();
        assert_eq!(idx_a, idx_b);
      }
    }
  }

  #[test]
  fn three_sequence_set_mode_scenario_assigns_triangular_indices() {
    let set = Set::new(vec![
      Sequence::from_ascii(b"ACGT").unwrap(),
      Sequence::from_ascii(b"ACGT").unwrap(),
      Sequence::from_ascii(b"AGGT").unwrap(),
    ])
    .unwrap();
    let params = AlignPairwiseParams::default();
    let waves = dispatch_set_mode(&[set], &params, 1).unwrap();
    let pairs = &waves[0][0].pairs;
    let mut indices: Vec<usize> = pairs.iter().map(|p| p.index).collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![0, 1, 2]);
  }

  #[test]
  fn rejects_batches_exceeding_the_set_count_cap() {
    let sets: Vec<Set> = (0..40).map(|_| set_of(2, 4)).collect();
    let mut params = AlignPairwiseParams::default();
    params.max_sets_per_batch = 36;
    let err = dispatch_set_mode(&sets, &params, 1).unwrap_err();
    assert!(matches!(err, BatchError::TooManySets { .. }));
  }

  #[allow(clippy::float_cmp)]
  #[test]
  fn pair_load_approximates_band_steps() {
    let a = Sequence::from_codes(vec![0; 10]);
    let b = Sequence::from_codes(vec![0; 8]);
    assert_eq!(pair_load(&a, &b), 17);
  }
}
