//! The banded affine-gap Needleman-Wunsch kernel: computes a score and,
//! optionally, a CIGAR for one pair of sequences.
//!
//! Cells are organized by anti-diagonal (`d = i + j`), each diagonal holding
//! up to [`BAND_WIDTH`] cells. `h_at`/`e_at`/`f_at` treat any cell outside a
//! diagonal's stored window, or before diagonal 0, as the sentinel
//! `NEG_INF`, which reproduces the affine-gap boundary conditions
//! (`H(i,0)`, `H(0,j)`) through the same recurrence used for interior cells
//! rather than as special cases.

use crate::bits::{
  new_direction_log, DirectionLog, PackedBits, TRACE_DMATCH, TRACE_DMISS, TRACE_LEFT, TRACE_UP,
};
use crate::params::{AlignParams, BAND_WIDTH, NEG_INF};
use crate::sequence::{Sequence, SENTINEL_A, SENTINEL_B};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dir {
  Down,
  Right,
}

struct DiagRecord {
  lo: usize,
  h: Vec<i32>,
  e: Vec<i32>,
  f: Vec<i32>,
  trace: PackedBits,
  e_open: PackedBits,
  f_open: PackedBits,
}

fn h_at(diagonals: &[DiagRecord], d: isize, i: isize) -> i32 {
  cell_at(diagonals, d, i, |rec| &rec.h)
}

fn e_at(diagonals: &[DiagRecord], d: isize, i: isize) -> i32 {
  cell_at(diagonals, d, i, |rec| &rec.e)
}

fn f_at(diagonals: &[DiagRecord], d: isize, i: isize) -> i32 {
  cell_at(diagonals, d, i, |rec| &rec.f)
}

fn cell_at(diagonals: &[DiagRecord], d: isize, i: isize, pick: impl Fn(&DiagRecord) -> &Vec<i32>) -> i32 {
  if d < 0 || i < 0 {
    return NEG_INF;
  }
  let (d, i) = (d as usize, i as usize);
  let Some(rec) = diagonals.get(d) else {
    return NEG_INF;
  };
  if i < rec.lo || i >= rec.lo + rec.h.len() {
    return NEG_INF;
  }
  pick(rec)[i - rec.lo]
}

/// A CIGAR string over the alphabet `{=,X,I,D}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cigar(String);

impl Cigar {
  #[must_use]
  pub fn as_str(&self) -> &str {
    &self.0
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.0.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  #[must_use]
  pub fn reversed(&self) -> Self {
    Self(self.0.chars().rev().collect())
  }

  /// Recomputes a score from the CIGAR string alone. A contiguous run of `I`
  /// or `D` characters charges the gap-opening penalty once, on the first
  /// character of the run, plus the gap-extension penalty on every
  /// character of the run including the first. Switching between `I` and
  /// `D` (or back to a non-gap character) resets the run.
  #[must_use]
  pub fn count_score(&self, p: &AlignParams) -> i32 {
    let mut score = 0i32;
    let mut gap_char: u8 = 0;
    for c in self.0.bytes() {
      match c {
        b'=' => {
          score += p.score_match;
          gap_char = 0;
        }
        b'X' => {
          score += p.penalty_mismatch;
          gap_char = 0;
        }
        b'I' | b'D' => {
          if gap_char != c {
            score += p.penalty_gap_open;
            gap_char = c;
          }
          score += p.penalty_gap_extend;
        }
        _ => unreachable!("CIGAR byte outside {{=,X,I,D}}: {c}"),
      }
    }
    score
  }
}

/// Computes the Needleman-Wunsch affine-gap global alignment score of `a`
/// and `b`, and, if `want_cigar` is set, the optimal CIGAR.
///
/// Equivalent to [`align_with_lanes`] with a single lane; this is the
/// sequential entry point used directly by tests and by any caller that
/// does not need the tile scheduler's intra-pair parallelism.
#[must_use]
pub fn align(a: &Sequence, b: &Sequence, p: &AlignParams, want_cigar: bool) -> (i32, Option<Cigar>) {
  align_with_lanes(a, b, p, want_cigar, 1)
}

/// One cell of a diagonal: `(h, e, f, trace, e_open, f_open)`.
type Cell = (i32, i32, i32, u8, u8, u8);

fn compute_cell(diagonals: &[DiagRecord], a: &Sequence, b: &Sequence, p: &AlignParams, d: usize, lo: usize, w: usize) -> Cell {
  let i = lo + w;
  let j = d - i;

  let a_code = if i >= 1 { a.code_at(i - 1) } else { SENTINEL_A };
  let b_code = if j >= 1 { b.code_at(j - 1) } else { SENTINEL_B };
  let is_match = a_code == b_code;

  let diag_prev = h_at(diagonals, d as isize - 2, i as isize - 1);
  let d_score = diag_prev.saturating_add(if is_match { p.score_match } else { p.penalty_mismatch });

  let e_ext = e_at(diagonals, d as isize - 1, i as isize).saturating_add(p.penalty_gap_extend);
  let e_open_src = h_at(diagonals, d as isize - 1, i as isize).saturating_add(p.penalty_gap_open + p.penalty_gap_extend);
  let (e_new, e_is_open) = if e_open_src > e_ext { (e_open_src, true) } else { (e_ext, false) };

  let f_ext = f_at(diagonals, d as isize - 1, i as isize - 1).saturating_add(p.penalty_gap_extend);
  let f_open_src =
    h_at(diagonals, d as isize - 1, i as isize - 1).saturating_add(p.penalty_gap_open + p.penalty_gap_extend);
  let (f_new, f_is_open) = if f_open_src > f_ext { (f_open_src, true) } else { (f_ext, false) };

  let mut cell = d_score;
  let mut tr = if is_match { TRACE_DMATCH } else { TRACE_DMISS };
  if e_new > cell {
    cell = e_new;
    tr = TRACE_UP;
  }
  if f_new > cell {
    cell = f_new;
    tr = TRACE_LEFT;
  }

  (cell, e_new, f_new, tr, u8::from(e_is_open), u8::from(f_is_open))
}

/// Computes the same result as [`align`], but spreads each diagonal's cell
/// computation across up to `lanes` cooperating workers (the tile
/// scheduler's group of one leader plus `lanes - 1` followers, each taking a
/// contiguous slice of the diagonal). `lanes <= 1` runs the original
/// sequential sweep; every cell within one diagonal depends only on the two
/// previous diagonals, never on a sibling cell, so splitting the sweep this
/// way changes nothing about the result.
#[must_use]
pub fn align_with_lanes(a: &Sequence, b: &Sequence, p: &AlignParams, want_cigar: bool, lanes: usize) -> (i32, Option<Cigar>) {
  let l1 = a.len();
  let l2 = b.len();
  let total_diag = l1 + l2;

  let mut diagonals: Vec<DiagRecord> = Vec::with_capacity(total_diag + 1);
  let mut direction_log: DirectionLog = new_direction_log(total_diag.max(1));

  diagonals.push(seed_diagonal());

  for d in 1..=total_diag {
    let lo_nat = d.saturating_sub(l2);
    let hi_nat = d.min(l1);
    let width_nat = hi_nat - lo_nat + 1;

    let (prev_first, prev_last) = {
      let prev = &diagonals[d - 1];
      (prev.h[0], *prev.h.last().expect("diagonal is never empty"))
    };
    // Adaptive direction heuristic: DOWN (favor consuming more of B) unless
    // A is not yet exhausted and the band's leading edge score gradient
    // favors RIGHT. Tie break is deterministic: RIGHT wins.
    let dir = if (prev_first > prev_last || hi_nat >= l1) && lo_nat < l2 {
      Dir::Down
    } else {
      Dir::Right
    };
    direction_log.push(match dir {
      Dir::Down => 0,
      Dir::Right => 1,
    });

    let width = width_nat.min(BAND_WIDTH);
    let lo = if width == width_nat {
      lo_nat
    } else {
      let prev_lo = diagonals[d - 1].lo;
      let candidate = prev_lo + usize::from(dir == Dir::Down);
      candidate.clamp(lo_nat, hi_nat - width + 1)
    };

    let mut h = Vec::with_capacity(width);
    let mut e = Vec::with_capacity(width);
    let mut f = Vec::with_capacity(width);
    let mut trace = PackedBits::with_capacity(2, width);
    let mut e_open = PackedBits::with_capacity(1, width);
    let mut f_open = PackedBits::with_capacity(1, width);

    let cells: Vec<Cell> = if lanes > 1 && width >= lanes {
      use rayon::prelude::*;
      (0..width).into_par_iter().map(|w| compute_cell(&diagonals, a, b, p, d, lo, w)).collect()
    } else {
      (0..width).map(|w| compute_cell(&diagonals, a, b, p, d, lo, w)).collect()
    };

    for (cell, e_new, f_new, tr, e_is_open, f_is_open) in cells {
      h.push(cell);
      e.push(e_new);
      f.push(f_new);
      trace.push(tr);
      e_open.push(e_is_open);
      f_open.push(f_is_open);
    }

    log::trace!("diagonal d={d} lo={lo} width={width} dir={dir:?}");
    diagonals.push(DiagRecord { lo, h, e, f, trace, e_open, f_open });
  }

  let score = h_at(&diagonals, total_diag as isize, l1 as isize);
  let cigar = want_cigar.then(|| traceback(&diagonals, l1, l2));
  (score, cigar)
}

fn seed_diagonal() -> DiagRecord {
  let mut trace = PackedBits::with_capacity(2, 1);
  let mut e_open = PackedBits::with_capacity(1, 1);
  let mut f_open = PackedBits::with_capacity(1, 1);
  trace.push(TRACE_DMATCH);
  e_open.push(0);
  f_open.push(0);
  DiagRecord {
    lo: 0,
    h: vec![0],
    e: vec![NEG_INF],
    f: vec![NEG_INF],
    trace,
    e_open,
    f_open,
  }
}

#[derive(PartialEq, Eq)]
enum TraceState {
  H,
  E,
  F,
}

fn traceback(diagonals: &[DiagRecord], l1: usize, l2: usize) -> Cigar {
  let mut i = l1 as isize;
  let mut j = l2 as isize;
  let mut state = TraceState::H;
  let mut out: Vec<u8> = Vec::with_capacity(l1 + l2);

  while i > 0 || j > 0 {
    let d = (i + j) as usize;
    let rec = &diagonals[d];
    let w = (i as usize) - rec.lo;
    match state {
      TraceState::H => match rec.trace.get(w) {
        TRACE_DMATCH => {
          out.push(b'=');
          i -= 1;
          j -= 1;
        }
        TRACE_DMISS => {
          out.push(b'X');
          i -= 1;
          j -= 1;
        }
        TRACE_UP => state = TraceState::E,
        TRACE_LEFT => state = TraceState::F,
        other => unreachable!("trace code out of range: {other}"),
      },
      TraceState::E => {
        // E consumes a character of B alone (j decreases, i fixed): B has a
        // character with no counterpart in A, i.e. an insertion in A's
        // frame of reference.
        out.push(b'I');
        let is_open = rec.e_open.get(w) != 0;
        j -= 1;
        state = if is_open { TraceState::H } else { TraceState::E };
      }
      TraceState::F => {
        // F consumes a character of A alone (i decreases, j fixed): A has
        // a character with no counterpart in B, i.e. a deletion from A.
        out.push(b'D');
        let is_open = rec.f_open.get(w) != 0;
        i -= 1;
        state = if is_open { TraceState::H } else { TraceState::F };
      }
    }
  }

  out.reverse();
  Cigar(String::from_utf8(out).expect("CIGAR bytes are always ASCII"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use rstest::rstest;

  fn seq(s: &str) -> Sequence {
    Sequence::from_ascii(s.as_bytes()).unwrap()
  }

  fn scenario_params() -> AlignParams {
    AlignParams::new(1, -1, -1, -1)
  }

  #[rstest]
  #[case("ACGT", "ACGT", 4, "====")]
  #[case("ACGT", "AGGT", 2, "=X==")]
  #[case("ACGT", "ACCGT", 2, "==I==")]
  fn literal_scenarios(#[case] a: &str, #[case] b: &str, #[case] score: i32, #[case] cigar: &str) {
    let p = scenario_params();
    let (s, c) = align(&seq(a), &seq(b), &p, true);
    assert_eq!(s, score);
    assert_eq!(c.unwrap().as_str(), cigar);
  }

  #[test]
  fn scenario_with_tie_break_deletion() {
    let p = scenario_params();
    let (score, cigar) = align(&seq("ACGT"), &seq("ACT"), &p, true);
    assert_eq!(score, 1);
    assert_eq!(cigar.unwrap().as_str(), "==D=");
  }

  #[test]
  fn self_alignment_score_equals_length_times_match() {
    let p = scenario_params();
    let a = seq("ACGTACGTAC");
    let (score, cigar) = align(&a, &a, &p, true);
    assert_eq!(score, a.len() as i32 * p.score_match);
    assert_eq!(cigar.unwrap().as_str(), "=".repeat(a.len()));
  }

  #[test]
  fn reverse_symmetry_holds() {
    let p = scenario_params();
    let a = seq("ACGT");
    let b = seq("ACCGT");
    let (score, cigar) = align(&a, &b, &p, true);
    let (rscore, rcigar) = align(&a.reversed(), &b.reversed(), &p, true);
    assert_eq!(score, rscore);
    assert_eq!(rcigar.unwrap(), cigar.unwrap().reversed());
  }

  #[test]
  fn score_matches_cigar_count_score() {
    let p = scenario_params();
    let a = seq("ACGTACGT");
    let b = seq("ACGAACCT");
    let (score, cigar) = align(&a, &b, &p, true);
    assert_eq!(score, cigar.unwrap().count_score(&p));
  }

  #[test]
  fn cigar_length_within_bounds() {
    let p = scenario_params();
    let a = seq("ACGTACGTAC");
    let b = seq("ACGTAC");
    let (_, cigar) = align(&a, &b, &p, true);
    let len = cigar.unwrap().len();
    assert!(len >= a.len().max(b.len()));
    assert!(len <= a.len() + b.len());
  }

  #[test]
  fn single_nucleotide_pair() {
    let p = scenario_params();
    let (score, cigar) = align(&seq("A"), &seq("A"), &p, true);
    assert_eq!(score, 1);
    assert_eq!(cigar.unwrap().as_str(), "=");
  }

  #[test]
  fn single_nucleotide_mismatch() {
    let p = scenario_params();
    let (score, cigar) = align(&seq("A"), &seq("G"), &p, true);
    assert_eq!(score, -1);
    assert_eq!(cigar.unwrap().as_str(), "X");
  }

  #[test]
  fn lane_count_does_not_change_result() {
    let p = scenario_params();
    let a = seq("ACGTACGTACGTACGTACGT");
    let b = seq("ACGTACCGTACCGTACGTAC");
    let sequential = align_with_lanes(&a, &b, &p, true, 1);
    for lanes in [2, 4, 8] {
      let parallel = align_with_lanes(&a, &b, &p, true, lanes);
      assert_eq!(parallel, sequential, "lanes={lanes}");
    }
  }
}
