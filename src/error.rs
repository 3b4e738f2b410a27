use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Coarse class of a request failure. Both classes look the same to the user;
/// the split only matters for logs and for picking the chat apology text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// The request never produced a usable HTTP exchange (unreachable host, timeout).
  Transport,
  /// The server answered, but not with a success payload we could parse.
  Protocol,
}

#[derive(Error, Debug)]
pub enum ClientError {
  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("no response after {}s", .0.as_secs())]
  Timeout(Duration),

  #[error("server returned {0}")]
  Status(StatusCode),

  #[error("malformed response: {0}")]
  Decode(String),

  #[error("server reported {status}: {detail}")]
  Rejected { status: String, detail: String },

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}

impl ClientError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      ClientError::Transport(e) if e.is_decode() => ErrorKind::Protocol,
      ClientError::Transport(_) | ClientError::Timeout(_) | ClientError::Io(_) => ErrorKind::Transport,
      ClientError::Status(_) | ClientError::Decode(_) | ClientError::Rejected { .. } => ErrorKind::Protocol,
    }
  }
}

impl From<serde_json::Error> for ClientError {
  fn from(e: serde_json::Error) -> Self {
    ClientError::Decode(e.to_string())
  }
}

/// Why a file offered for upload was not accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectedReason {
  #[error("not a video file ({0})")]
  NotVideo(String),

  #[error("cannot read {}: {reason}", path.display())]
  Unreadable { path: PathBuf, reason: String },

  #[error("no file given")]
  NoFile,

  #[error("a video is already loaded; reset first")]
  VideoAlreadyLoaded,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timeout_is_transport() {
    assert_eq!(ClientError::Timeout(Duration::from_secs(3)).kind(), ErrorKind::Transport);
  }

  #[test]
  fn status_and_payload_errors_are_protocol() {
    assert_eq!(ClientError::Status(StatusCode::INTERNAL_SERVER_ERROR).kind(), ErrorKind::Protocol);
    assert_eq!(ClientError::Decode("missing field".into()).kind(), ErrorKind::Protocol);
    let rejected = ClientError::Rejected { status: "error".into(), detail: "boom".into() };
    assert_eq!(rejected.kind(), ErrorKind::Protocol);
  }

  #[test]
  fn messages_render() {
    assert_eq!(ClientError::Timeout(Duration::from_secs(60)).to_string(), "no response after 60s");
    assert_eq!(RejectedReason::NotVideo("image/png".into()).to_string(), "not a video file (image/png)");
  }
}
