//! Banded affine-gap Needleman-Wunsch alignment kernel: the sequence/set
//! types, scoring parameters, bit-packed trace storage, and the `align()`
//! entry point shared by the tile scheduler and the host balancer.

pub mod bits;
pub mod error;
pub mod kernel;
pub mod params;
pub mod sequence;

pub use bits::{DirectionLog, PackedBits};
pub use error::BatchError;
pub use kernel::{align, align_with_lanes, Cigar};
pub use params::{
  AlignPairwiseParams, AlignPairwiseParamsOptional, AlignParams, BAND_WIDTH, MAX_SEQUENCE_LEN,
  MAX_SET_SIZE, NEG_INF,
};
pub use sequence::{pair_load, Sequence, Set};
