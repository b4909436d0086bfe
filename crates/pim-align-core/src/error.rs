use derive_more::Display;

/// Batch-precondition violations: caller bugs detected synchronously by the
/// host balancer before a tile is ever launched. The kernel itself never
/// returns this type -- by the time a pair reaches it, a batch has already
/// validated.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum BatchError {
  #[display("sequence of length {len} exceeds maximum of {max}")]
  SequenceTooLong { len: usize, max: usize },

  #[display("byte {byte:#04x} is not a valid nucleotide")]
  InvalidNucleotide { byte: u8 },

  #[display("set of size {size} exceeds maximum of {max}")]
  SetTooLarge { size: usize, max: u8 },

  #[display("batch has {count} sets, exceeding maximum of {max}")]
  TooManySets { count: usize, max: usize },

  #[display("batch has {count} pairs, exceeding maximum of {max}")]
  TooManyPairs { count: usize, max: usize },

  #[display("packed sequence buffer of {bytes} bytes exceeds maximum of {max}")]
  PackedSequenceOverflow { bytes: usize, max: usize },

  #[display("CIGAR buffer of {bytes} bytes exceeds maximum of {max}")]
  CigarBudgetExceeded { bytes: usize, max: usize },
}

impl std::error::Error for BatchError {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_messages_name_the_offending_values() {
    let e = BatchError::SequenceTooLong { len: 90_000, max: 80_000 };
    assert_eq!(e.to_string(), "sequence of length 90000 exceeds maximum of 80000");
  }
}
