use std::io::Write;

use log::LevelFilter;

/// Installs the process-wide logger once. Every core crate logs through the
/// `log` facade only; `env_logger` is a CLI-only concern, not a dependency
/// any of `pim-align-core`/`-tile`/`-host` carry.
pub fn setup_logger(filter_level: LevelFilter) {
  env_logger::Builder::new()
    .filter_level(filter_level)
    .format(|buf, record| {
      writeln!(buf, "[{}] {}", record.level(), record.args())
    })
    .format_timestamp(None)
    .init();
}
