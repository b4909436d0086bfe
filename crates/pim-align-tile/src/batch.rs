//! The tile-facing data model: a batch of independent alignment pairs
//! dispatched to one tile, and the per-pair results it returns. A tile has
//! no notion of sets, ranks, or triangular indices -- those belong to the
//! host balancer, which assigns each pair an opaque index before dispatch
//! and interprets that index again on the way back.

use pim_align_core::{AlignParams, Cigar, Sequence};

/// One pair of sequences to align, tagged with the opaque index the host
/// uses to route the result back to its set/rank position.
#[derive(Debug, Clone)]
pub struct TilePair {
  pub index: usize,
  pub a: Sequence,
  pub b: Sequence,
}

/// A unit of work sent to one tile: independent pairs plus the scoring
/// parameters and CIGAR flag shared by all of them.
#[derive(Debug, Clone)]
pub struct TileBatch {
  pub pairs: Vec<TilePair>,
  pub params: AlignParams,
  pub want_cigar: bool,
}

impl TileBatch {
  #[must_use]
  pub fn new(pairs: Vec<TilePair>, params: AlignParams, want_cigar: bool) -> Self {
    Self { pairs, params, want_cigar }
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.pairs.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.pairs.is_empty()
  }
}

/// The alignment outcome for one [`TilePair`], carrying its index forward.
#[derive(Debug, Clone)]
pub struct PairResult {
  pub index: usize,
  pub score: i32,
  pub cigar: Option<Cigar>,
}

/// The full set of results for one [`TileBatch`], in arbitrary completion
/// order -- callers route by [`PairResult::index`], not position.
#[derive(Debug, Clone, Default)]
pub struct TileResult {
  /// Wall-clock nanoseconds the tile spent draining its batch. Stands in
  /// for the original's cycle-count performance counter; a CPU rewrite has
  /// no `perfcounter_get()` equivalent, so elapsed time is the closest
  /// faithful substitute.
  pub perf_counter: u64,
  pub results: Vec<PairResult>,
}

impl TileResult {
  #[must_use]
  pub fn sorted_by_index(mut self) -> Self {
    self.results.sort_by_key(|r| r.index);
    self
  }
}

/// How the host is driving this tile: one explicit pair, an all-vs-all set,
/// or an all-vs-all comparison across every set in a rank. Carried alongside
/// a batch only for logging/diagnostics -- the tile itself treats every
/// batch as a flat list of independent pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
  Pair,
  Set,
  All,
}
