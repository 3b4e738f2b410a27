use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::backend::{Backend, UploadReceipt};
use crate::chat::ChatSession;
use crate::error::{ClientError, RejectedReason};
use crate::search::{SearchSession, Segment};
use crate::upload::{self, FileCandidate, UploadStatus, VideoRef};

/// Everything that exists while a video is loaded. Dropped wholesale on reset.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSession {
  pub video: VideoRef,
  pub search: SearchSession,
  pub chat: ChatSession,
  pub upload: UploadStatus,
  generation: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
  #[default]
  NoVideo,
  VideoLoaded(LoadedSession),
}

impl SessionState {
  pub fn loaded(&self) -> Option<&LoadedSession> {
    match self {
      SessionState::NoVideo => None,
      SessionState::VideoLoaded(loaded) => Some(loaded),
    }
  }
}

/// Completion of a request dispatched by the controller.
///
/// Each carries the generation of the session that issued it, so a reply that
/// lands after a reset cannot leak into the next video's session.
#[derive(Debug)]
pub enum SessionEvent {
  SearchFinished { generation: u64, query: String, outcome: Result<Vec<Segment>, ClientError> },
  ChatFinished { generation: u64, outcome: Result<String, ClientError> },
  UploadFinished { generation: u64, outcome: Result<UploadReceipt, ClientError> },
}

impl SessionEvent {
  fn generation(&self) -> u64 {
    match self {
      SessionEvent::SearchFinished { generation, .. }
      | SessionEvent::ChatFinished { generation, .. }
      | SessionEvent::UploadFinished { generation, .. } => *generation,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
  /// Bound for search and chat requests.
  pub request: Duration,
  pub upload: Duration,
}

/// Owns the single `SessionState`. The public operations are the only way to change it;
/// observers get snapshots through [`SessionController::subscribe`].
pub struct SessionController {
  backend: Arc<dyn Backend>,
  timeouts: Timeouts,
  state: SessionState,
  next_generation: u64,
  events_tx: mpsc::UnboundedSender<SessionEvent>,
  events_rx: mpsc::UnboundedReceiver<SessionEvent>,
  snapshots: watch::Sender<SessionState>,
}

impl SessionController {
  pub fn new(backend: Arc<dyn Backend>, timeouts: Timeouts) -> Self {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (snapshots, _) = watch::channel(SessionState::NoVideo);
    Self { backend, timeouts, state: SessionState::NoVideo, next_generation: 1, events_tx, events_rx, snapshots }
  }

  pub fn state(&self) -> &SessionState {
    &self.state
  }

  pub fn subscribe(&self) -> watch::Receiver<SessionState> {
    self.snapshots.subscribe()
  }

  fn publish(&self) {
    self.snapshots.send_replace(self.state.clone());
  }

  /// Run `request` in the background, bounded by `timeout`, and report its outcome
  /// through the event channel.
  fn dispatch<T, F, W>(&self, timeout: Duration, request: F, wrap: W)
  where
    T: Send + 'static,
    F: Future<Output = Result<T, ClientError>> + Send + 'static,
    W: FnOnce(Result<T, ClientError>) -> SessionEvent + Send + 'static,
  {
    let tx = self.events_tx.clone();
    tokio::spawn(async move {
      let outcome = match tokio::time::timeout(timeout, request).await {
        Ok(outcome) => outcome,
        Err(_) => Err(ClientError::Timeout(timeout)),
      };
      // The receiver lives as long as the controller; a send error means it is gone.
      let _ = tx.send(wrap(outcome));
    });
  }

  /// Accept a file and load it. The transition happens immediately; the byte transfer,
  /// when there is a local file, runs in the background.
  pub fn submit(&mut self, candidate: FileCandidate) -> Result<VideoRef, RejectedReason> {
    if matches!(self.state, SessionState::VideoLoaded(_)) {
      debug!("session: submit ignored, video already loaded");
      return Err(RejectedReason::VideoAlreadyLoaded);
    }
    let video = upload::submit(candidate)?;
    let generation = self.next_generation;
    self.next_generation += 1;

    let upload = match video.path() {
      Some(path) => {
        let backend = Arc::clone(&self.backend);
        let path = path.to_path_buf();
        let name = video.name().to_string();
        let media_type = video.media_type().to_string();
        self.dispatch(
          self.timeouts.upload,
          async move { backend.upload(&path, &name, &media_type).await },
          move |outcome| SessionEvent::UploadFinished { generation, outcome },
        );
        UploadStatus::InFlight
      }
      None => UploadStatus::Local,
    };

    info!(name = %video.name(), size = video.size(), generation, "session: video loaded");
    self.state = SessionState::VideoLoaded(LoadedSession {
      chat: ChatSession::new(Some(video.name())),
      search: SearchSession::default(),
      video: video.clone(),
      upload,
      generation,
    });
    self.publish();
    Ok(video)
  }

  /// Start a search. Blank queries and searches without a video are no-ops.
  pub fn search(&mut self, query: &str) {
    let SessionState::VideoLoaded(loaded) = &mut self.state else { return };
    let Some(query) = loaded.search.begin(query) else { return };
    info!(query = %query, "search: dispatched");

    let backend = Arc::clone(&self.backend);
    let video = loaded.video.name().to_string();
    let generation = loaded.generation;
    let q = query.clone();
    self.dispatch(
      self.timeouts.request,
      async move { backend.search(&q, &video).await },
      move |outcome| SessionEvent::SearchFinished { generation, query, outcome },
    );
    self.publish();
  }

  /// Re-issue the query of a failed search.
  pub fn retry_search(&mut self) {
    let Some(query) = self.state.loaded().and_then(|l| l.search.retry_query()).map(str::to_string) else { return };
    self.search(&query);
  }

  /// Send a chat message. Blank text, no video, or a reply still pending make this a no-op.
  pub fn send(&mut self, text: &str) {
    let SessionState::VideoLoaded(loaded) = &mut self.state else { return };
    let Some(message) = loaded.chat.begin(text) else { return };
    info!(chars = message.len(), "chat: dispatched");

    let backend = Arc::clone(&self.backend);
    let video = loaded.video.name().to_string();
    let generation = loaded.generation;
    self.dispatch(
      self.timeouts.request,
      async move { backend.chat(&message, &video).await },
      move |outcome| SessionEvent::ChatFinished { generation, outcome },
    );
    self.publish();
  }

  /// Drop the video and both sessions. Outstanding requests are left to finish and ignored.
  pub fn reset(&mut self) {
    if let SessionState::VideoLoaded(loaded) = &self.state {
      info!(name = %loaded.video.name(), "session: reset");
    }
    self.state = SessionState::NoVideo;
    self.publish();
  }

  /// Apply every completion that has already arrived, without waiting.
  /// Returns how many changed the state.
  pub fn poll(&mut self) -> usize {
    let mut applied = 0;
    while let Ok(event) = self.events_rx.try_recv() {
      if self.apply(event) {
        applied += 1;
      }
    }
    applied
  }

  /// Wait for the next completion and apply it. Returns `false` if it was discarded.
  #[cfg(test)]
  pub async fn next_event(&mut self) -> bool {
    match self.events_rx.recv().await {
      Some(event) => self.apply(event),
      None => false,
    }
  }

  fn apply(&mut self, event: SessionEvent) -> bool {
    let SessionState::VideoLoaded(loaded) = &mut self.state else {
      debug!("session: dropping completion, no video loaded");
      return false;
    };
    if event.generation() != loaded.generation {
      debug!(
        event_generation = event.generation(),
        current = loaded.generation,
        "session: dropping completion from a reset session"
      );
      return false;
    }
    let changed = match event {
      SessionEvent::SearchFinished { query, outcome, .. } => loaded.search.resolve(&query, outcome),
      SessionEvent::ChatFinished { outcome, .. } => loaded.chat.resolve(outcome),
      SessionEvent::UploadFinished { outcome, .. } => {
        loaded.upload = match outcome {
          Ok(receipt) => {
            info!(saved_as = %receipt.saved_as, "upload: stored by server");
            UploadStatus::Done(receipt.saved_as)
          }
          Err(e) => {
            warn!(kind = ?e.kind(), err = %e, "upload: failed");
            UploadStatus::Failed(e.to_string())
          }
        };
        true
      }
    };
    if changed {
      self.publish();
    }
    changed
  }
}
