use std::path::Path;

use eyre::{Result, WrapErr};
use pim_align_core::AlignPairwiseParamsOptional;

/// Reads a YAML config file into the optional overlay, or `None` if no path
/// was given. Resolution order is `Default -> this overlay -> CLI flags`,
/// each narrower tier applied with `merge_opt` by the caller.
pub fn load_config_overlay(path: Option<&Path>) -> Result<Option<AlignPairwiseParamsOptional>> {
  let Some(path) = path else { return Ok(None) };

  let contents = std::fs::read_to_string(path).wrap_err_with(|| format!("When reading config file '{}'", path.display()))?;

  let overlay: AlignPairwiseParamsOptional =
    serde_yaml::from_str(&contents).wrap_err_with(|| format!("When parsing config file '{}'", path.display()))?;

  Ok(Some(overlay))
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn absent_path_yields_no_overlay() {
    assert!(load_config_overlay(None).unwrap().is_none());
  }

  #[test]
  fn parses_a_partial_overlay_from_yaml() {
    let dir = std::env::temp_dir().join("pim-align-cli-config-test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("overlay.yaml");
    std::fs::write(&path, "score_match: 5\npenalty_mismatch: -2\n").unwrap();

    let overlay = load_config_overlay(Some(&path)).unwrap().expect("overlay present");
    assert_eq!(overlay.score_match, Some(5));
    assert_eq!(overlay.penalty_mismatch, Some(-2));
    assert_eq!(overlay.penalty_gap_open, None);

    std::fs::remove_file(&path).ok();
  }
}
