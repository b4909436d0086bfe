use clap::Parser;
use optfield::optfield;
use serde::{Deserialize, Serialize};

/// Fixed anti-diagonal band width. Not configurable: the kernel, the
/// bit-packed traceback streams, and the cooperative sub-task split into
/// quarters all assume exactly 128 cells per diagonal.
pub const BAND_WIDTH: usize = 128;

/// Neutral value for DP cells that are out of the band or out of bounds.
/// Half of `i32::MIN` so two such values can still be added without
/// overflowing.
pub const NEG_INF: i32 = i32::MIN / 2;

/// Maximum sequence length accepted by the kernel. Longer sequences are a
/// batch-precondition violation, not a kernel failure.
pub const MAX_SEQUENCE_LEN: usize = 80_000;

/// Maximum number of sequences in one set (fits an 8-bit count).
pub const MAX_SET_SIZE: usize = 255;

/// Scoring parameters for one alignment run. Match should be non-negative;
/// mismatch, gap-opening and gap-extension are conventionally non-positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignParams {
  pub score_match: i32,
  pub penalty_mismatch: i32,
  pub penalty_gap_open: i32,
  pub penalty_gap_extend: i32,
}

impl AlignParams {
  #[must_use]
  pub const fn new(
    score_match: i32,
    penalty_mismatch: i32,
    penalty_gap_open: i32,
    penalty_gap_extend: i32,
  ) -> Self {
    Self {
      score_match,
      penalty_mismatch,
      penalty_gap_open,
      penalty_gap_extend,
    }
  }
}

impl Default for AlignParams {
  fn default() -> Self {
    Self {
      score_match: 1,
      penalty_mismatch: -1,
      penalty_gap_open: -1,
      penalty_gap_extend: -1,
    }
  }
}

// NOTE: The `optfield` attribute creates a struct with the same fields, but
// wrapped into `Option`, as well as a method `.merge_opt(&opt)` that merges
// values from the optional counterpart into self (mutably). This is the
// overlay used to resolve defaults -> config file -> CLI flags.
#[optfield(pub AlignPairwiseParamsOptional, attrs, doc, field_attrs, field_doc, merge_fn = pub)]
#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
pub struct AlignPairwiseParams {
  /// Score for matching nucleotides during alignment.
  #[clap(long)]
  pub score_match: i32,

  /// Penalty for mismatching nucleotides during alignment.
  #[clap(long)]
  pub penalty_mismatch: i32,

  /// Penalty for opening a gap in alignment.
  #[clap(long)]
  pub penalty_gap_open: i32,

  /// Penalty for extending an already-open gap. If zero, all gaps
  /// regardless of length incur the same penalty.
  #[clap(long)]
  pub penalty_gap_extend: i32,

  /// Maximum sequence length accepted by the kernel.
  #[clap(long)]
  pub max_sequence_len: usize,

  /// Maximum number of sequences allowed in one set.
  #[clap(long)]
  pub max_set_size: usize,

  /// Maximum number of sets in one tile batch (Set mode).
  #[clap(long)]
  pub max_sets_per_batch: usize,

  /// Maximum number of pairs in one tile batch.
  #[clap(long)]
  pub max_pairs_per_batch: usize,

  /// Maximum packed-sequence bytes in one tile batch.
  #[clap(long)]
  pub max_packed_bytes_per_batch: usize,

  /// Maximum total CIGAR bytes in one tile batch.
  #[clap(long)]
  pub max_cigar_bytes_per_batch: usize,

  /// Starting per-tile load threshold for Set-mode adaptive batching.
  #[clap(long)]
  pub batch_threshold_initial: f64,

  /// Number of worker threads per tile.
  #[clap(long)]
  pub workers_per_tile: usize,

  /// Number of cooperative groups per tile (workers_per_tile / 4).
  #[clap(long)]
  pub groups_per_tile: usize,
}

impl AlignPairwiseParams {
  #[must_use]
  pub const fn align_params(&self) -> AlignParams {
    AlignParams {
      score_match: self.score_match,
      penalty_mismatch: self.penalty_mismatch,
      penalty_gap_open: self.penalty_gap_open,
      penalty_gap_extend: self.penalty_gap_extend,
    }
  }
}

impl Default for AlignPairwiseParams {
  fn default() -> Self {
    Self {
      score_match: 1,
      penalty_mismatch: -1,
      penalty_gap_open: -1,
      penalty_gap_extend: -1,
      max_sequence_len: MAX_SEQUENCE_LEN,
      max_set_size: MAX_SET_SIZE,
      max_sets_per_batch: 36,
      max_pairs_per_batch: 4_096,
      max_packed_bytes_per_batch: 3_840_000,
      max_cigar_bytes_per_batch: 32 * 1024 * 1024,
      batch_threshold_initial: 16_000_000.0,
      workers_per_tile: 24,
      groups_per_tile: 6,
    }
  }
}
