use std::path::{Path, PathBuf};

use reqwest::Url;
use tracing::{debug, info};

use crate::error::RejectedReason;

/// A file offered by the user, before it has been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
  pub name: String,
  pub size: u64,
  pub media_type: String,
  /// Where the bytes live, when the candidate came from the local filesystem.
  pub path: Option<PathBuf>,
}

impl FileCandidate {
  #[cfg(test)]
  pub fn new(name: impl Into<String>, size: u64, media_type: impl Into<String>) -> Self {
    Self { name: name.into(), size, media_type: media_type.into(), path: None }
  }

  /// Build a candidate from a path on disk. The media type is guessed from the extension.
  pub fn from_path(path: &Path) -> Result<Self, RejectedReason> {
    let meta = std::fs::metadata(path)
      .map_err(|e| RejectedReason::Unreadable { path: path.to_path_buf(), reason: e.to_string() })?;
    if !meta.is_file() {
      return Err(RejectedReason::Unreadable { path: path.to_path_buf(), reason: "not a regular file".to_string() });
    }
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string());
    let media_type = mime_guess::from_path(path).first_or_octet_stream().essence_str().to_string();
    Ok(Self { name, size: meta.len(), media_type, path: Some(path.to_path_buf()) })
  }

  pub fn is_video(&self) -> bool {
    self.media_type.starts_with("video/")
  }
}

/// Identifies the loaded video. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRef {
  name: String,
  size: u64,
  media_type: String,
  path: Option<PathBuf>,
}

impl VideoRef {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn size(&self) -> u64 {
    self.size
  }

  pub fn media_type(&self) -> &str {
    &self.media_type
  }

  pub fn path(&self) -> Option<&Path> {
    self.path.as_deref()
  }

  /// Size in megabytes with one decimal, e.g. `"12.4 MB"`.
  pub fn size_label(&self) -> String {
    format!("{:.1} MB", self.size as f64 / (1024.0 * 1024.0))
  }
}

/// Validate a candidate. Non-video files are rejected without side effects.
pub fn submit(candidate: FileCandidate) -> Result<VideoRef, RejectedReason> {
  if !candidate.is_video() {
    debug!(name = %candidate.name, media_type = %candidate.media_type, "upload: rejected non-video file");
    return Err(RejectedReason::NotVideo(candidate.media_type));
  }
  info!(name = %candidate.name, size = candidate.size, "upload: accepted");
  let FileCandidate { name, size, media_type, path } = candidate;
  Ok(VideoRef { name, size, media_type, path })
}

/// Split text pasted into the terminal (what a file dropped on the window turns into)
/// into individual paths.
///
/// Handles `file://` URIs, single or double quoted paths, and backslash-escaped spaces.
pub fn parse_dropped_paths(pasted: &str) -> Vec<PathBuf> {
  let mut out = Vec::new();
  let mut current = String::new();
  let mut quote: Option<char> = None;
  let mut chars = pasted.trim().chars();

  while let Some(c) = chars.next() {
    match (quote, c) {
      (Some(q), c) if c == q => quote = None,
      (Some(_), c) => current.push(c),
      (None, '\'' | '"') => quote = Some(c),
      (None, '\\') => {
        if let Some(next) = chars.next() {
          current.push(next);
        }
      }
      (None, c) if c.is_whitespace() => {
        if !current.is_empty() {
          out.push(to_path(&std::mem::take(&mut current)));
        }
      }
      (None, c) => current.push(c),
    }
  }
  if !current.is_empty() {
    out.push(to_path(&current));
  }
  out
}

fn to_path(token: &str) -> PathBuf {
  if token.starts_with("file://")
    && let Ok(url) = Url::parse(token)
    && let Ok(path) = url.to_file_path()
  {
    return path;
  }
  PathBuf::from(token)
}

/// Pick the first video among several dropped paths.
///
/// Unreadable paths are skipped. When nothing qualifies, the reason for the first
/// path is returned so the caller has something to show.
pub fn pick_video(paths: &[PathBuf]) -> Result<FileCandidate, RejectedReason> {
  let mut first_err = None;
  for path in paths {
    match FileCandidate::from_path(path) {
      Ok(candidate) if candidate.is_video() => return Ok(candidate),
      Ok(candidate) => {
        first_err.get_or_insert(RejectedReason::NotVideo(candidate.media_type));
      }
      Err(e) => {
        first_err.get_or_insert(e);
      }
    }
  }
  Err(first_err.unwrap_or(RejectedReason::NoFile))
}

/// Progress of the background byte transfer that follows an accepted selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
  /// Nothing to transfer (the candidate had no local path).
  Local,
  InFlight,
  /// Transferred; holds the name the server stored it under.
  Done(String),
  Failed(String),
}
