use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::constants::constants;
use crate::error::{ClientError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  User,
  Assistant,
}

impl Role {
  pub fn label(self) -> &'static str {
    match self {
      Role::User => "You",
      Role::Assistant => "Assistant",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
  pub id: u64,
  pub role: Role,
  pub text: String,
  pub created_at: DateTime<Local>,
}

/// Greeting that opens every transcript.
pub fn greeting(video_name: Option<&str>) -> String {
  let c = constants();
  match video_name {
    Some(name) => format!("{} \"{}\"{}", c.greeting_lead, name, c.greeting_tail),
    None => format!("{}{}", c.greeting_lead, c.greeting_tail),
  }
}

/// Fixed assistant text used in place of an answer when the request failed.
pub fn apology_for(error: &ClientError) -> &'static str {
  match error.kind() {
    ErrorKind::Protocol => constants().processing_apology.as_str(),
    ErrorKind::Transport => constants().connection_apology.as_str(),
  }
}

/// Append-only conversation about the loaded video.
///
/// At most one request is outstanding. Every user turn is eventually answered by
/// exactly one assistant turn, either the reply or an apology.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
  transcript: Vec<ChatTurn>,
  pending: bool,
  next_id: u64,
}

impl ChatSession {
  pub fn new(video_name: Option<&str>) -> Self {
    let mut session = Self { transcript: Vec::new(), pending: false, next_id: 1 };
    session.push(Role::Assistant, greeting(video_name));
    session
  }

  pub fn transcript(&self) -> &[ChatTurn] {
    &self.transcript
  }

  pub fn is_pending(&self) -> bool {
    self.pending
  }

  /// Starter questions, offered only until the user has said something.
  pub fn suggestions(&self) -> &'static [String] {
    if self.transcript.len() == 1 { constants().chat_suggestions.as_slice() } else { &[] }
  }

  fn push(&mut self, role: Role, text: String) {
    let id = self.next_id;
    self.next_id += 1;
    self.transcript.push(ChatTurn { id, role, text, created_at: Local::now() });
  }

  /// Record a user message and mark the session pending. Returns the message to
  /// dispatch, or `None` for blank input or while a reply is still outstanding.
  pub fn begin(&mut self, raw: &str) -> Option<String> {
    let text = raw.trim();
    if text.is_empty() {
      return None;
    }
    if self.pending {
      debug!("chat: send ignored while a reply is pending");
      return None;
    }
    self.push(Role::User, text.to_string());
    self.pending = true;
    Some(text.to_string())
  }

  /// Apply the reply to the outstanding message. Returns `false` if nothing was pending.
  pub fn resolve(&mut self, outcome: Result<String, ClientError>) -> bool {
    if !self.pending {
      debug!("chat: dropping reply with nothing pending");
      return false;
    }
    let text = match outcome {
      Ok(answer) => {
        info!(chars = answer.len(), "chat: reply received");
        answer
      }
      Err(e) => {
        warn!(kind = ?e.kind(), err = %e, "chat: request failed");
        apology_for(&e).to_string()
      }
    };
    self.push(Role::Assistant, text);
    self.pending = false;
    true
  }
}
