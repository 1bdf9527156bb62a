//! User preferences, loaded from a TOML file.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config: {0}")]
  Io(#[from] std::io::Error),
  #[error("invalid config: {0}")]
  Parse(#[from] toml::de::Error),
}

/// Completion behavior toggles. Every field defaults to the behavior
/// the engine ships with, so a partial (or absent) file is fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Preferences {
  /// Append `", "` after a committed tag.
  pub insert_comma:           bool,
  /// Suppress an alias when the row for its target is already shown.
  pub hide_aliases_with_main: bool,
  /// Rank preset entries ahead of plain vocabulary tags.
  pub presets_first:          bool,
}

impl Default for Preferences {
  fn default() -> Self {
    Preferences {
      insert_comma:           true,
      hide_aliases_with_main: true,
      presets_first:          true,
    }
  }
}

impl Preferences {
  /// Load from `path`. A missing file is not an error; it yields the
  /// defaults.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
      Ok(contents) => contents,
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
        return Ok(Preferences::default());
      },
      Err(err) => return Err(err.into()),
    };
    Ok(toml::from_str(&contents)?)
  }
}
