use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ClientError;

/// A time-bounded span of the video returned by a search, as the server ranked it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
  pub start: f64,
  pub end: f64,
  /// 0–10 scale.
  pub relevance_score: f64,
  pub explanation: String,
  pub timestamp_display: String,
}

/// Colour band for a segment's confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
  High,
  Medium,
  Low,
}

impl Segment {
  /// Display confidence in `[0, 1]`. The server keeps scores on its 0–10 scale, so no clamping here.
  pub fn confidence(&self) -> f64 {
    self.relevance_score / 10.0
  }

  pub fn match_label(&self) -> String {
    format!("{}% match", (self.confidence() * 100.0).round() as i64)
  }

  pub fn tier(&self) -> MatchTier {
    let c = self.confidence();
    if c > 0.9 {
      MatchTier::High
    } else if c > 0.8 {
      MatchTier::Medium
    } else {
      MatchTier::Low
    }
  }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SearchState {
  #[default]
  Idle,
  Pending(String),
  Ready { query: String, segments: Vec<Segment> },
  Failed { query: String, error: String },
}

/// Owns the current query and the result set it produced.
///
/// The newest query always wins: a response is applied only while its query is the
/// one still pending, whatever order responses come back in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchSession {
  state: SearchState,
}

impl SearchSession {
  pub fn state(&self) -> &SearchState {
    &self.state
  }

  /// The query the current state belongs to, if any.
  pub fn query(&self) -> Option<&str> {
    match &self.state {
      SearchState::Idle => None,
      SearchState::Pending(q) | SearchState::Ready { query: q, .. } | SearchState::Failed { query: q, .. } => Some(q),
    }
  }

  pub fn is_pending(&self) -> bool {
    matches!(self.state, SearchState::Pending(_))
  }

  /// Move to `Pending` for a new query. Returns the trimmed query to dispatch,
  /// or `None` when the input is blank (no state change).
  pub fn begin(&mut self, raw: &str) -> Option<String> {
    let query = raw.trim();
    if query.is_empty() {
      return None;
    }
    if let SearchState::Pending(previous) = &self.state
      && previous != query
    {
      debug!(previous = %previous, query = %query, "search: superseding pending query");
    }
    self.state = SearchState::Pending(query.to_string());
    Some(query.to_string())
  }

  /// The query to re-issue from a failed state.
  pub fn retry_query(&self) -> Option<&str> {
    match &self.state {
      SearchState::Failed { query, .. } => Some(query),
      _ => None,
    }
  }

  /// Apply a response. Returns `false` when it was discarded as stale.
  pub fn resolve(&mut self, query: &str, outcome: Result<Vec<Segment>, ClientError>) -> bool {
    match &self.state {
      SearchState::Pending(current) if current == query => {}
      _ => {
        debug!(query = %query, current = ?self.query(), "search: discarding stale response");
        return false;
      }
    }
    self.state = match outcome {
      Ok(segments) => {
        info!(query = %query, segments = segments.len(), "search: results ready");
        SearchState::Ready { query: query.to_string(), segments }
      }
      Err(e) => {
        warn!(query = %query, kind = ?e.kind(), err = %e, "search: request failed");
        SearchState::Failed { query: query.to_string(), error: e.to_string() }
      }
    };
    true
  }
}
