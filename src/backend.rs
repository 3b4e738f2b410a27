use std::path::Path;

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use reqwest::{Body, Client, StatusCode, Url, header::CONTENT_TYPE, multipart};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::constants::constants;
use crate::error::ClientError;
use crate::search::Segment;

/// What the server says about a stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
  pub filename: String,
  pub saved_as: String,
}

/// The analysis service, as seen by the session controller.
#[async_trait]
pub trait Backend: Send + Sync {
  /// Ranked segments of `video` matching `query`, in server order.
  async fn search(&self, query: &str, video: &str) -> Result<Vec<Segment>, ClientError>;

  /// Answer to `message` about `video`.
  async fn chat(&self, message: &str, video: &str) -> Result<String, ClientError>;

  async fn upload(&self, path: &Path, name: &str, media_type: &str) -> Result<UploadReceipt, ClientError>;
}

// --- Wire types ---

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
  pub message: &'a str,
  pub video_filename: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  status: String,
  #[serde(default)]
  response: Option<String>,
  #[serde(default)]
  error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
  status: String,
  #[serde(default)]
  segments: Option<Vec<Segment>>,
  #[serde(default)]
  error: Option<String>,
}

fn ensure_success(status: StatusCode) -> Result<(), ClientError> {
  if status.is_success() { Ok(()) } else { Err(ClientError::Status(status)) }
}

/// Parse a `/chat` reply. Anything but `status == "success"` with a `response` string is an error.
pub fn parse_chat_response(status: StatusCode, body: &str) -> Result<String, ClientError> {
  ensure_success(status)?;
  let parsed: ChatResponse = serde_json::from_str(body)?;
  if parsed.status != "success" {
    return Err(ClientError::Rejected {
      status: parsed.status,
      detail: parsed.error.or(parsed.response).unwrap_or_default(),
    });
  }
  parsed.response.ok_or_else(|| ClientError::Decode("missing `response` in chat reply".to_string()))
}

/// Parse a `/find-best-segments` reply into segments, keeping server order.
pub fn parse_search_response(status: StatusCode, body: &str) -> Result<Vec<Segment>, ClientError> {
  ensure_success(status)?;
  let parsed: SearchResponse = serde_json::from_str(body)?;
  if parsed.status != "success" {
    return Err(ClientError::Rejected { status: parsed.status, detail: parsed.error.unwrap_or_default() });
  }
  parsed.segments.ok_or_else(|| ClientError::Decode("missing `segments` in search reply".to_string()))
}

pub fn parse_upload_response(status: StatusCode, body: &str) -> Result<UploadReceipt, ClientError> {
  ensure_success(status)?;
  Ok(serde_json::from_str(body)?)
}

// --- HTTP implementation ---

/// `reqwest` client for the analysis service.
#[derive(Clone)]
pub struct HttpBackend {
  client: Client,
  chat_url: Url,
  search_url: Url,
  upload_url: Url,
}

fn endpoint(base: &str, path: &str) -> AnyResult<Url> {
  let joined = format!("{}{}", base.trim_end_matches('/'), path);
  Url::parse(&joined).with_context(|| format!("Invalid server URL: {}", joined))
}

impl HttpBackend {
  pub fn new(base_url: &str) -> AnyResult<Self> {
    let c = constants();
    let client = Client::builder()
      .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
      .build()
      .context("Failed to build HTTP client")?;
    Ok(Self {
      client,
      chat_url: endpoint(base_url, &c.chat_path)?,
      search_url: endpoint(base_url, &c.search_path)?,
      upload_url: endpoint(base_url, &c.upload_path)?,
    })
  }

  /// The search endpoint with the video identifier attached as a query parameter.
  /// The body carries the raw query text, which is what the server reads.
  pub fn search_url_for(&self, video: &str) -> Url {
    let mut url = self.search_url.clone();
    url.query_pairs_mut().append_pair("video_filename", video);
    url
  }
}

#[async_trait]
impl Backend for HttpBackend {
  async fn search(&self, query: &str, video: &str) -> Result<Vec<Segment>, ClientError> {
    let url = self.search_url_for(video);
    debug!(url = %url, query = %query, "backend: POST search");
    let response = self
      .client
      .post(url)
      .header(CONTENT_TYPE, "text/plain; charset=utf-8")
      .body(query.to_string())
      .send()
      .await?;
    let status = response.status();
    let body = response.text().await?;
    parse_search_response(status, &body)
  }

  async fn chat(&self, message: &str, video: &str) -> Result<String, ClientError> {
    debug!(url = %self.chat_url, "backend: POST chat");
    let response =
      self.client.post(self.chat_url.clone()).json(&ChatRequest { message, video_filename: video }).send().await?;
    let status = response.status();
    let body = response.text().await?;
    parse_chat_response(status, &body)
  }

  async fn upload(&self, path: &Path, name: &str, media_type: &str) -> Result<UploadReceipt, ClientError> {
    let file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();
    info!(name = %name, bytes = len, "backend: uploading video");
    let body = Body::wrap_stream(ReaderStream::new(file));
    let part = multipart::Part::stream_with_length(body, len).file_name(name.to_string()).mime_str(media_type)?;
    let form = multipart::Form::new().part("file", part);
    let response = self.client.post(self.upload_url.clone()).multipart(form).send().await?;
    let status = response.status();
    let body = response.text().await?;
    parse_upload_response(status, &body)
  }
}

#[cfg(test)]
mod tests {
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::TcpListener;

  use super::*;

  // --- request encoding ---

  #[test]
  fn chat_request_wire_shape() {
    let body = serde_json::to_value(ChatRequest { message: "hi", video_filename: "clip.mp4" }).unwrap();
    assert_eq!(body, serde_json::json!({ "message": "hi", "video_filename": "clip.mp4" }));
  }

  #[test]
  fn endpoints_join_without_double_slash() {
    let backend = HttpBackend::new("http://localhost:8000/").unwrap();
    assert_eq!(backend.chat_url.as_str(), "http://localhost:8000/chat");
    assert_eq!(backend.upload_url.as_str(), "http://localhost:8000/upload-video");
    assert_eq!(
      backend.search_url_for("my clip.mp4").as_str(),
      "http://localhost:8000/find-best-segments?video_filename=my+clip.mp4"
    );
  }

  #[test]
  fn bad_base_url_is_rejected() {
    assert!(HttpBackend::new("not a url").is_err());
  }

  // --- chat replies ---

  #[test]
  fn chat_success() {
    let body = r#"{"status":"success","response":"It is a dog.","message":"what?"}"#;
    assert_eq!(parse_chat_response(StatusCode::OK, body).unwrap(), "It is a dog.");
  }

  #[test]
  fn chat_error_status_field() {
    let body = r#"{"status":"error","response":"sorry","error":"quota"}"#;
    let err = parse_chat_response(StatusCode::OK, body).unwrap_err();
    assert!(matches!(err, ClientError::Rejected { ref status, ref detail } if status == "error" && detail == "quota"));
  }

  #[test]
  fn chat_http_failure() {
    let err = parse_chat_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").unwrap_err();
    assert!(matches!(err, ClientError::Status(StatusCode::INTERNAL_SERVER_ERROR)));
  }

  #[test]
  fn chat_malformed_json() {
    assert!(matches!(parse_chat_response(StatusCode::OK, "<html>"), Err(ClientError::Decode(_))));
    assert!(matches!(parse_chat_response(StatusCode::OK, r#"{"status":"success"}"#), Err(ClientError::Decode(_))));
  }

  // --- search replies ---

  #[test]
  fn search_success_keeps_order() {
    let body = r#"{
      "status": "success",
      "query": "people walking",
      "segments": [
        {"start": 40.0, "end": 60.0, "relevance_score": 7, "explanation": "later", "timestamp_display": "0:40 - 1:00"},
        {"start": 0.0, "end": 20.0, "relevance_score": 9.5, "explanation": "first", "timestamp_display": "0:00 - 0:20"}
      ]
    }"#;
    let segments = parse_search_response(StatusCode::OK, body).unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].explanation, "later");
    assert_eq!(segments[0].relevance_score, 7.0);
    assert_eq!(segments[1].timestamp_display, "0:00 - 0:20");
  }

  #[test]
  fn search_empty_is_ok() {
    let body = r#"{"status":"success","query":"x","segments":[]}"#;
    assert!(parse_search_response(StatusCode::OK, body).unwrap().is_empty());
  }

  #[test]
  fn search_backend_error() {
    let body = r#"{"status":"error","query":"x","error":"index missing","segments":[]}"#;
    let err = parse_search_response(StatusCode::OK, body).unwrap_err();
    assert_eq!(err.to_string(), "server reported error: index missing");
  }

  #[test]
  fn search_segment_shape_mismatch() {
    let body = r#"{"status":"success","segments":[{"start":"zero","end":1}]}"#;
    assert!(matches!(parse_search_response(StatusCode::OK, body), Err(ClientError::Decode(_))));
  }

  #[test]
  fn upload_receipt() {
    let body = r#"{"message":"ok","filename":"clip.mp4","saved_as":"1a2b3c4d_clip.mp4","transcript_file":"t.json"}"#;
    let receipt = parse_upload_response(StatusCode::OK, body).unwrap();
    assert_eq!(receipt, UploadReceipt { filename: "clip.mp4".into(), saved_as: "1a2b3c4d_clip.mp4".into() });
  }

  // --- over a socket ---

  /// Serve one canned HTTP response and hand back the raw request text.
  async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
      let (mut socket, _) = listener.accept().await.unwrap();
      let mut raw = Vec::new();
      let mut buf = [0u8; 4096];
      loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
          break;
        }
        raw.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&raw);
        if let Some(header_end) = text.find("\r\n\r\n") {
          let content_length = text[..header_end]
            .lines()
            .find_map(|l| {
              let (name, value) = l.split_once(':')?;
              name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok()).flatten()
            })
            .unwrap_or(0);
          if raw.len() >= header_end + 4 + content_length {
            break;
          }
        }
      }
      let reply = format!(
        "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
      );
      socket.write_all(reply.as_bytes()).await.unwrap();
      socket.shutdown().await.ok();
      String::from_utf8_lossy(&raw).into_owned()
    });
    (base, handle)
  }

  #[tokio::test]
  async fn chat_over_http() {
    let (base, server) = serve_once("200 OK", r#"{"status":"success","response":"Two people."}"#).await;
    let backend = HttpBackend::new(&base).unwrap();
    let answer = backend.chat("who is there?", "clip.mp4").await.unwrap();
    assert_eq!(answer, "Two people.");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /chat HTTP/1.1"));
    assert!(request.contains(r#"{"message":"who is there?","video_filename":"clip.mp4"}"#));
  }

  #[tokio::test]
  async fn chat_over_http_500() {
    let (base, server) = serve_once("500 Internal Server Error", r#"{"detail":"boom"}"#).await;
    let backend = HttpBackend::new(&base).unwrap();
    let err = backend.chat("hello", "clip.mp4").await.unwrap_err();
    assert!(matches!(err, ClientError::Status(StatusCode::INTERNAL_SERVER_ERROR)));
    server.await.unwrap();
  }

  #[tokio::test]
  async fn search_over_http_sends_raw_query() {
    let (base, server) = serve_once("200 OK", r#"{"status":"success","query":"red car","segments":[]}"#).await;
    let backend = HttpBackend::new(&base).unwrap();
    assert!(backend.search("red car", "clip.mp4").await.unwrap().is_empty());

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /find-best-segments?video_filename=clip.mp4 HTTP/1.1"));
    assert!(request.ends_with("\r\n\r\nred car"));
  }

  #[tokio::test]
  async fn upload_streams_file_as_multipart() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("clip.mp4");
    std::fs::write(&file, b"not-really-frames").unwrap();

    let (base, server) = serve_once("200 OK", r#"{"filename":"clip.mp4","saved_as":"1a2b_clip.mp4"}"#).await;
    let backend = HttpBackend::new(&base).unwrap();
    let receipt = backend.upload(&file, "clip.mp4", "video/mp4").await.unwrap();
    assert_eq!(receipt.saved_as, "1a2b_clip.mp4");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /upload-video HTTP/1.1"));
    let lower = request.to_ascii_lowercase();
    assert!(lower.contains("content-length:"));
    assert!(request.contains(r#"name="file"; filename="clip.mp4""#));
    assert!(lower.contains("content-type: video/mp4"));
    assert!(request.contains("not-really-frames"));
  }

  #[tokio::test]
  async fn upload_missing_file_is_io_error() {
    let backend = HttpBackend::new("http://127.0.0.1:9").unwrap();
    let err = backend.upload(Path::new("/definitely/not/here.mp4"), "here.mp4", "video/mp4").await.unwrap_err();
    assert!(matches!(err, ClientError::Io(_)));
  }

  #[tokio::test]
  async fn unreachable_server_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let backend = HttpBackend::new(&base).unwrap();
    let err = backend.chat("hello", "clip.mp4").await.unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::Transport);
  }
}
