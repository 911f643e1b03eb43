/// Sequencer tuning — timing constants, screen names and key bindings.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Runtime settings for a [`Sequencer`](crate::core::sequencer::Sequencer).
///
/// Every field has a default, so a config file only needs the values it
/// changes:
///
/// ```ron
/// SequencerConfig(
///     menu_screen: "MainMenu",
///     advance_keys: ["space", "enter"],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Max gap between presses that still counts as a double/triple press.
    pub debounce_window_ms: u64,
    /// Pause after each phase of an animated scene transition.
    pub phase_pause_ms: u64,
    /// Screen activated after a checkpoint.
    pub menu_screen: String,
    /// Preference key holding the saved snapshot.
    pub save_key: String,
    /// Keys that behave like a click.
    pub advance_keys: Vec<String>,
    /// Keys that behave like a right click.
    pub back_keys: Vec<String>,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            debounce_window_ms: 500,
            phase_pause_ms: 1000,
            menu_screen: "menu".to_string(),
            save_key: "savedGame".to_string(),
            advance_keys: Vec::new(),
            back_keys: Vec::new(),
        }
    }
}

impl SequencerConfig {
    /// Load a config from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<SequencerConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a config from a RON string.
    pub fn parse_ron(input: &str) -> Result<SequencerConfig, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    pub fn phase_pause(&self) -> Duration {
        Duration::from_millis(self.phase_pause_ms)
    }

    pub fn is_advance_key(&self, key: &str) -> bool {
        self.advance_keys.iter().any(|k| k.eq_ignore_ascii_case(key))
    }

    pub fn is_back_key(&self, key: &str) -> bool {
        self.back_keys.iter().any(|k| k.eq_ignore_ascii_case(key))
    }
}
