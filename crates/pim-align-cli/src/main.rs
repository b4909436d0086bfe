mod config;
mod logging;

use std::path::PathBuf;

use bio::io::fasta;
use clap::{Parser, Subcommand};
use eyre::{Result, WrapErr};
use log::LevelFilter;
use pim_align_core::{AlignPairwiseParams, AlignPairwiseParamsOptional, Sequence, Set};
use pim_align_host::{dispatch_pair_mode, dispatch_set_mode, reassemble, total_output_len};
use pim_align_tile::run_tile;

/// Massively-parallel pairwise DNA alignment: banded Needleman-Wunsch with
/// affine gaps, dispatched across tiles in set, pair, or all mode.
#[derive(Parser, Debug)]
#[clap(name = "pim-align", author, version)]
pub struct PimAlignArgs {
  #[clap(subcommand)]
  pub mode: Mode,

  /// Path to the input FASTA dataset. In set mode each record's id prefix
  /// up to the first '_' groups sequences into a set; in pair/all mode
  /// every record belongs to one implicit set.
  #[clap(long)]
  pub dataset: PathBuf,

  /// Number of tiles (ranks) to dispatch across.
  #[clap(long, default_value_t = num_cpus::get())]
  pub ranks: usize,

  /// Optional YAML config file overlaying the built-in defaults, itself
  /// overridden by any scoring flags passed below.
  #[clap(long)]
  pub config: Option<PathBuf>,

  /// Score for matching nucleotides.
  #[clap(long = "match")]
  pub score_match: Option<i32>,

  /// Penalty for mismatching nucleotides.
  #[clap(long)]
  pub mismatch: Option<i32>,

  /// Penalty for opening a gap.
  #[clap(long = "gap-opening")]
  pub gap_opening: Option<i32>,

  /// Penalty for extending an open gap.
  #[clap(long = "gap-extension")]
  pub gap_extension: Option<i32>,

  /// Set verbosity level (off, error, warn, info, debug, trace).
  #[clap(long, default_value = "info")]
  pub verbosity: LevelFilter,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  /// Many disjoint sets, all-vs-all within each set, CIGARs included.
  Set,
  /// One set, every pair, scores only.
  Pair,
  /// One set, every pair, scores only, triangular streaming dispatch.
  All,
}

fn resolve_params(args: &PimAlignArgs) -> Result<AlignPairwiseParams> {
  let mut params = AlignPairwiseParams::default();

  if let Some(overlay) = config::load_config_overlay(args.config.as_deref())? {
    params.merge_opt(overlay);
  }

  let cli_overlay = AlignPairwiseParamsOptional {
    score_match: args.score_match,
    penalty_mismatch: args.mismatch,
    penalty_gap_open: args.gap_opening,
    penalty_gap_extend: args.gap_extension,
    ..Default::default()
  };
  params.merge_opt(cli_overlay);

  Ok(params)
}

/// Reads every record from a FASTA file into `Sequence`s, tagged with the
/// set key implied by the part of the id before the first `_` (set mode
/// groups by this key; pair/all mode ignore it and treat the file as one
/// set).
fn read_fasta(path: &std::path::Path) -> Result<Vec<(String, Sequence)>> {
  let reader = fasta::Reader::from_file(path).wrap_err_with(|| format!("When opening FASTA file '{}'", path.display()))?;

  let mut records = Vec::new();
  for result in reader.records() {
    let record = result.wrap_err_with(|| format!("When reading a record from '{}'", path.display()))?;
    let seq = Sequence::from_ascii(record.seq()).wrap_err_with(|| format!("When encoding record '{}'", record.id()))?;
    records.push((record.id().to_owned(), seq));
  }
  Ok(records)
}

fn group_into_sets(records: Vec<(String, Sequence)>) -> Result<Vec<Set>> {
  use std::collections::BTreeMap;

  let mut by_key: BTreeMap<String, Vec<Sequence>> = BTreeMap::new();
  for (id, seq) in records {
    let key = id.split('_').next().unwrap_or(&id).to_owned();
    by_key.entry(key).or_default().push(seq);
  }

  by_key.into_values().map(Set::new).collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

fn main() -> Result<()> {
  let args = PimAlignArgs::parse();
  logging::setup_logger(args.verbosity);

  log::info!("pim-align starting: mode={:?} dataset={:?} ranks={}", args.mode, args.dataset, args.ranks);

  let params = resolve_params(&args)?;
  let records = read_fasta(&args.dataset)?;

  match args.mode {
    Mode::Set => {
      let sets = group_into_sets(records)?;
      log::info!("set mode: {} sets loaded", sets.len());
      let waves = dispatch_set_mode(&sets, &params, args.ranks)?;
      let mut tile_results = Vec::new();
      for wave in waves {
        for batch in wave {
          tile_results.push(run_tile(&batch, params.groups_per_tile));
        }
      }
      let out = reassemble(tile_results, total_output_len(&sets))?;
      for result in &out {
        match &result.cigar {
          Some(cigar) => println!("{}\t{}\t{}", result.index, result.score, cigar.as_str()),
          None => println!("{}\t{}", result.index, result.score),
        }
      }
    }
    Mode::Pair | Mode::All => {
      let set = Set::new(records.into_iter().map(|(_, seq)| seq).collect())?;
      log::info!("{:?} mode: {} sequences loaded", args.mode, set.len());
      let batches = dispatch_pair_mode(&set, &params, args.ranks)?;
      let total = batches.iter().map(pim_align_tile::TileBatch::len).sum();
      let tile_results: Vec<_> = batches.iter().map(|b| run_tile(b, params.groups_per_tile)).collect();
      let out = reassemble(tile_results, total)?;
      for result in &out {
        println!("{}\t{}", result.index, result.score);
      }
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn groups_sequences_by_id_prefix_before_the_first_underscore() {
    let records = vec![
      ("setA_1".to_owned(), Sequence::from_ascii(b"ACGT").unwrap()),
      ("setA_2".to_owned(), Sequence::from_ascii(b"ACGT").unwrap()),
      ("setB_1".to_owned(), Sequence::from_ascii(b"AGGT").unwrap()),
    ];
    let sets = group_into_sets(records).unwrap();
    assert_eq!(sets.len(), 2);
    assert_eq!(sets.iter().map(Set::len).sum::<usize>(), 3);
  }
}
