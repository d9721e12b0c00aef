//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available,
//! parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

use crate::endpoint::Endpoint;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // History persistence
  pub history_key: String,
  pub history_capacity: usize,

  // Playback flow
  pub play_delay_ms: u64,
  pub error_display_secs: u64,
  pub theme_poll_secs: u64,
  pub unknown_endpoint_label: String,

  // Display surface
  pub player_page_name: String,
  pub iframe_sandbox: String,
  pub iframe_allow: String,

  /// Built-in parsing endpoints, used when the user config does not list any.
  pub endpoints: Vec<Endpoint>,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; a malformed file fails the first test run.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
