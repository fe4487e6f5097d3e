// src/github/contents.rs
// =============================================================================
// Talks to the GitHub contents API.
//
// Two requests are all we need:
//   1. List a directory:  GET /repos/{owner}/{repo}/contents/{path}
//      -> JSON array of { "type": "file"|"dir"|..., "name": ..., "git_url": ... }
//   2. Fetch a file body: GET {git_url}
//      -> JSON object { "content": "<base64>", "encoding": "base64" }
//
// The listing is unauthenticated. File downloads send the user's token as a
// Bearer header when one is configured (needed for private repositories).
//
// Nothing here retries. A failed request is returned to the caller once.
//
// Rust concepts:
// - #[derive(Deserialize)]: serde builds our structs straight from JSON
// - #[serde(from = "String")]: custom conversion for unknown entry types
// - Cheap clones: reqwest::Client is reference counted internally
// =============================================================================

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::FetchError;

// GitHub rejects API requests that have no User-Agent
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Upper bound for one request, body included
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The `type` field of a listing entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum EntryKind {
    File,
    Dir,
    /// symlink, submodule, or anything GitHub adds later
    Other(String),
}

impl From<String> for EntryKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "file" => EntryKind::File,
            "dir" => EntryKind::Dir,
            _ => EntryKind::Other(value),
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => f.write_str("file"),
            EntryKind::Dir => f.write_str("dir"),
            EntryKind::Other(kind) => f.write_str(kind),
        }
    }
}

/// One child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Entry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Where the file body lives. GitHub sends null for some submodules.
    #[serde(default)]
    pub git_url: Option<String>,
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.name)
    }
}

#[derive(Debug, Deserialize)]
struct Blob {
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

/// HTTP client for one GitHub API host
#[derive(Debug, Clone)]
pub struct ContentsClient {
    http: Client,
    api_base: Url,
}

impl ContentsClient {
    pub fn new(api_base: Url) -> Result<Self, FetchError> {
        ContentsClient::with_timeout(api_base, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Like `new`, but a request that has not finished after `timeout`
    /// (a stalled body read included) fails with a Transport error
    pub fn with_timeout(api_base: Url, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(ContentsClient { http, api_base })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Lists one directory. Entries come back in whatever order GitHub sends them.
    pub async fn list_directory(&self, url: &Url) -> Result<Vec<Entry>, FetchError> {
        debug!(%url, "listing directory");
        let response = self.http.get(url.clone()).send().await?;
        read_json(response).await
    }

    /// Fetches a file body and decodes it from base64
    pub async fn fetch_blob(&self, url: &str, token: Option<&str>) -> Result<Vec<u8>, FetchError> {
        debug!(url, authenticated = token.is_some(), "fetching blob");
        let mut request = self.http.get(url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let blob: Blob = read_json(request.send().await?).await?;

        match blob.encoding.as_deref() {
            None | Some("base64") => decode_content(&blob.content),
            // The contents API answers "none" for files larger than 1 MB
            Some(other) => Err(FetchError::Decode(format!(
                "unsupported content encoding '{}'",
                other
            ))),
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::RemoteStatus {
            code: status.as_u16(),
        });
    }
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
}

/// Decodes GitHub's base64 content. GitHub wraps the text every 60 columns,
/// so whitespace is dropped before decoding.
pub fn decode_content(encoded: &str) -> Result<Vec<u8>, FetchError> {
    let compact: Vec<u8> = encoded
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(compact)
        .map_err(|e| FetchError::Decode(format!("invalid base64 content: {}", e)))
}

/// Writes `bytes` to `dest`, replacing any existing file
pub async fn write_file(dest: &Path, bytes: &[u8]) -> Result<(), FetchError> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FetchError::storage(parent, e))?;
    }
    tokio::fs::write(dest, bytes)
        .await
        .map_err(|e| FetchError::storage(dest, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> ContentsClient {
        ContentsClient::new(Url::parse(&server.uri()).unwrap()).unwrap()
    }

    #[test]
    fn test_decode_round_trip() {
        let original: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let encoded = STANDARD.encode(&original);
        assert_eq!(decode_content(&encoded).unwrap(), original);
    }

    #[test]
    fn test_decode_ignores_line_breaks() {
        let encoded = STANDARD.encode(b"hello world, this is a file body");
        let (head, tail) = encoded.split_at(10);
        let wrapped = format!("{}\n{}\n", head, tail);
        assert_eq!(
            decode_content(&wrapped).unwrap(),
            b"hello world, this is a file body"
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_content("not base64 at all!"),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn test_entry_kind_from_json() {
        let entries: Vec<Entry> = serde_json::from_value(json!([
            {"name": "a.txt", "type": "file", "git_url": "https://x/a"},
            {"name": "sub", "type": "dir", "git_url": "https://x/sub"},
            {"name": "link", "type": "symlink", "git_url": null},
        ]))
        .unwrap();
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[1].kind, EntryKind::Dir);
        assert_eq!(entries[2].kind, EntryKind::Other("symlink".to_string()));
        assert_eq!(entries[2].git_url, None);
    }

    #[tokio::test]
    async fn test_list_directory_keeps_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/contents/docs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "z.md", "type": "file", "git_url": "u1"},
                {"name": "a.md", "type": "file", "git_url": "u2"},
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let url = Url::parse(&format!("{}/repos/o/r/contents/docs", server.uri())).unwrap();
        let entries = client.list_directory(&url).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["z.md", "a.md"]);
    }

    #[tokio::test]
    async fn test_list_directory_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let url = Url::parse(&format!("{}/repos/o/r/contents/docs", server.uri())).unwrap();
        let result = client.list_directory(&url).await;
        assert!(matches!(result, Err(FetchError::RemoteStatus { code: 403 })));
    }

    #[tokio::test]
    async fn test_list_directory_on_a_file_is_decode_error() {
        // Listing a file path returns an object, not an array
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"name": "a.txt", "type": "file"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let url = Url::parse(&format!("{}/repos/o/r/contents/a.txt", server.uri())).unwrap();
        let result = client.list_directory(&url).await;
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_fetch_blob_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blobs/1"))
            .and(header("authorization", "Bearer s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": STANDARD.encode("private"),
                "encoding": "base64",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let bytes = client
            .fetch_blob(&format!("{}/blobs/1", server.uri()), Some("s3cret"))
            .await
            .unwrap();
        assert_eq!(bytes, b"private");
    }

    #[tokio::test]
    async fn test_fetch_blob_rejects_unknown_encoding() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": "",
                "encoding": "none",
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let result = client
            .fetch_blob(&format!("{}/blobs/big", server.uri()), None)
            .await;
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_request_timeout_covers_slow_responses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"content": STANDARD.encode("late")}))
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let client = ContentsClient::with_timeout(
            Url::parse(&server.uri()).unwrap(),
            Duration::from_millis(200),
        )
        .unwrap();
        let result = tokio::time::timeout(
            Duration::from_secs(10),
            client.fetch_blob(&format!("{}/blobs/slow", server.uri()), None),
        )
        .await
        .expect("request should time out on its own");

        match result {
            Err(FetchError::Transport(e)) => assert!(e.is_timeout()),
            other => panic!("expected a timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_file_creates_parents_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("deeper").join("file.txt");

        write_file(&dest, b"old content that is longer").await.unwrap();
        write_file(&dest, b"new").await.unwrap();

        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_write_file_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "i am a file").unwrap();

        // A file sits where the parent directory should be
        let result = write_file(&blocker.join("child.txt"), b"x").await;
        assert!(matches!(result, Err(FetchError::Storage { .. })));
    }
}
