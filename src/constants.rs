//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available,
//! with no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // Backend endpoints
  pub default_server_url: String,
  pub chat_path: String,
  pub search_path: String,
  pub upload_path: String,

  // Timing
  pub request_timeout_secs: u64,
  pub upload_timeout_secs: u64,
  pub tick_millis: u64,
  pub status_ttl_secs: u64,

  // Canned chat texts
  pub greeting_lead: String,
  pub greeting_tail: String,
  pub processing_apology: String,
  pub connection_apology: String,

  pub chat_suggestions: Vec<String>,
  pub search_suggestions: Vec<String>,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; a malformed file fails every test run.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
