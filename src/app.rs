use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::Config;
use crate::constants::constants;
use crate::search::SearchState;
use crate::session::{SessionController, SessionState};
use crate::theme::{THEMES, Theme, theme_index};
use crate::upload::{self, UploadStatus};

const WAITING_NOTICE: &str = "Still waiting for the previous reply.";

// --- Types ---

/// Which pane the input box feeds once a video is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
  Search,
  Chat,
}

impl Focus {
  pub fn label(self) -> &'static str {
    match self {
      Focus::Search => "Search",
      Focus::Chat => "Chat",
    }
  }
}

pub struct App {
  pub session: SessionController,
  pub config: Config,
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub focus: Focus,
  pub theme_index: usize,
  /// Highlighted row in the focused pane: a suggestion, or a search result.
  pub selected: Option<usize>,
  pub last_error: Option<String>,
  /// Informational message, lower priority than status and error.
  pub info_message: Option<String>,
  pub should_quit: bool,
  /// Drives spinner animation.
  pub started_at: Instant,
  error_time: Option<Instant>,
  changes: watch::Receiver<SessionState>,
}

impl App {
  pub fn new(session: SessionController, config: Config) -> Self {
    let theme_index = theme_index(config.theme_name.as_deref());
    let changes = session.subscribe();
    Self {
      session,
      config,
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      focus: Focus::Search,
      theme_index,
      selected: None,
      last_error: None,
      info_message: None,
      should_quit: false,
      started_at: Instant::now(),
      error_time: None,
      changes,
    }
  }

  pub fn theme(&self) -> &'static Theme {
    &THEMES[self.theme_index % THEMES.len()]
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.config.theme_name = Some(self.theme().name.to_string());
    self.config.save();
  }

  pub fn has_video(&self) -> bool {
    self.session.state().loaded().is_some()
  }

  // --- Messages ---

  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Clear stale error messages after the configured lifetime.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(constants().status_ttl_secs)
    {
      self.last_error = None;
      self.error_time = None;
    }
  }

  /// Progress line for whatever is in flight, most important first.
  pub fn status_message(&self) -> Option<String> {
    let loaded = self.session.state().loaded()?;
    if loaded.search.is_pending()
      && let Some(query) = loaded.search.query()
    {
      return Some(format!("Searching for '{}'…", query));
    }
    if loaded.chat.is_pending() {
      return Some("Waiting for a reply…".to_string());
    }
    if loaded.upload == UploadStatus::InFlight {
      return Some(format!("Uploading {}…", loaded.video.name()));
    }
    None
  }

  // --- Input ---

  fn take_input(&mut self) -> String {
    self.cursor_position = 0;
    self.input_scroll = 0;
    std::mem::take(&mut self.input)
  }

  pub fn insert_str(&mut self, text: &str) {
    let chars = text.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c });
    for c in chars.filter(|c| !c.is_control()) {
      let byte_idx = crate::input::char_to_byte_index(&self.input, self.cursor_position);
      self.input.insert(byte_idx, c);
      self.cursor_position += 1;
    }
  }

  /// Enter: open a file when nothing is loaded, otherwise search or chat depending on focus.
  /// An empty box with a highlighted suggestion submits the suggestion.
  pub fn submit_input(&mut self) {
    self.clear_error();
    if !self.has_video() {
      let text = self.input.clone();
      let paths = upload::parse_dropped_paths(&text);
      if paths.is_empty() {
        return;
      }
      if self.open_paths(&paths) {
        self.take_input();
      }
      return;
    }

    let text = if self.input.trim().is_empty() {
      match self.selected_suggestion() {
        Some(s) => s.to_string(),
        None => return,
      }
    } else {
      self.input.clone()
    };

    match self.focus {
      Focus::Search => {
        self.session.search(&text);
        self.take_input();
        self.selected = None;
      }
      Focus::Chat => {
        if self.session.state().loaded().is_some_and(|l| l.chat.is_pending()) {
          self.info_message = Some(WAITING_NOTICE.to_string());
          return;
        }
        self.session.send(&text);
        self.take_input();
        self.selected = None;
      }
    }
  }

  /// Load the first video among `paths`. Returns whether one was accepted.
  pub fn open_paths(&mut self, paths: &[PathBuf]) -> bool {
    let candidate = match upload::pick_video(paths) {
      Ok(candidate) => candidate,
      Err(reason) => {
        debug!(reason = %reason, "app: dropped files rejected");
        self.set_error(format!("Can't open that file: {}", reason));
        return false;
      }
    };
    match self.session.submit(candidate) {
      Ok(video) => {
        info!(name = %video.name(), "app: video opened");
        self.clear_error();
        self.info_message = None;
        self.focus = Focus::Search;
        self.selected = None;
        true
      }
      Err(reason) => {
        self.set_error(format!("Can't open that file: {}", reason));
        false
      }
    }
  }

  /// A paste with no video loaded is treated as dropped files; otherwise it is typed text.
  pub fn handle_paste(&mut self, text: &str) {
    if self.has_video() {
      self.insert_str(text);
      return;
    }
    let paths = upload::parse_dropped_paths(text);
    if paths.is_empty() {
      return;
    }
    self.open_paths(&paths);
  }

  pub fn reset(&mut self) {
    if !self.has_video() {
      return;
    }
    self.session.reset();
    self.take_input();
    self.focus = Focus::Search;
    self.selected = None;
    self.clear_error();
    self.info_message = Some("Ready for a new video.".to_string());
  }

  pub fn retry_search(&mut self) {
    self.session.retry_search();
  }

  pub fn toggle_focus(&mut self) {
    if !self.has_video() {
      return;
    }
    self.focus = match self.focus {
      Focus::Search => Focus::Chat,
      Focus::Chat => Focus::Search,
    };
    self.selected = None;
  }

  // --- Selection ---

  /// Starter prompts offered by the focused pane.
  pub fn suggestions(&self) -> &'static [String] {
    let Some(loaded) = self.session.state().loaded() else { return &[] };
    match self.focus {
      Focus::Chat => loaded.chat.suggestions(),
      Focus::Search if *loaded.search.state() == SearchState::Idle => constants().search_suggestions.as_slice(),
      Focus::Search => &[],
    }
  }

  fn selectable_count(&self) -> usize {
    let suggestions = self.suggestions();
    if !suggestions.is_empty() {
      return suggestions.len();
    }
    match (self.focus, self.session.state().loaded().map(|l| l.search.state())) {
      (Focus::Search, Some(SearchState::Ready { segments, .. })) => segments.len(),
      _ => 0,
    }
  }

  pub fn selected_suggestion(&self) -> Option<&'static str> {
    self.selected.and_then(|i| self.suggestions().get(i)).map(String::as_str)
  }

  pub fn select_next(&mut self) {
    let count = self.selectable_count();
    if count > 0 {
      self.selected = Some(self.selected.map_or(0, |i| (i + 1) % count));
    }
  }

  pub fn select_prev(&mut self) {
    let count = self.selectable_count();
    if count > 0 {
      self.selected = Some(self.selected.map_or(count - 1, |i| if i == 0 { count - 1 } else { i - 1 }));
    }
  }

  // --- Background work ---

  /// Apply finished requests and expire old messages. Called once per tick.
  pub fn check_pending(&mut self) {
    let failed_before = self.upload_failure().is_some();
    self.session.poll();
    if self.changes.has_changed().unwrap_or(false) {
      self.changes.mark_unchanged();
      if !failed_before && let Some(err) = self.upload_failure() {
        self.set_error(format!("Upload failed: {}", err));
      }
      if self.selected.is_some_and(|i| i >= self.selectable_count()) {
        self.selected = None;
      }
      let chat_pending = self.session.state().loaded().is_some_and(|l| l.chat.is_pending());
      if !chat_pending && self.info_message.as_deref() == Some(WAITING_NOTICE) {
        self.info_message = None;
      }
    }
    self.expire_error();
  }

  fn upload_failure(&self) -> Option<String> {
    match self.session.state() {
      SessionState::VideoLoaded(loaded) => match &loaded.upload {
        UploadStatus::Failed(err) => Some(err.clone()),
        _ => None,
      },
      SessionState::NoVideo => None,
    }
  }
}
