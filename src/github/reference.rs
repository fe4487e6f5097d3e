// src/github/reference.rs
// =============================================================================
// Parses a GitHub URL into the pieces we need to talk to the contents API.
//
// Supported shape:
//   https://github.com/{owner}/{repo}/{blob|tree}/{branch}/{path...}
//
//   blob = the path points at a single file
//   tree = the path points at a directory
//
// The reference kind is NOT validated here. A URL like
// https://github.com/o/r/commits/main/src parses fine and the download
// engine reports the unknown kind when the download starts.
//
// Rust concepts:
// - url::Url: Real URL parsing instead of string slicing
// - Enums with data: RefKind::Other keeps the unknown value for the error
// =============================================================================

use std::fmt;
use url::Url;

use crate::error::FetchError;

/// What the last path segment of a GitHub URL points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefKind {
    /// `blob`: a single file
    Blob,
    /// `tree`: a directory
    Tree,
    /// Anything else GitHub puts in that position (commits, blame, ...)
    Other(String),
}

impl From<&str> for RefKind {
    fn from(value: &str) -> Self {
        match value {
            "blob" => RefKind::Blob,
            "tree" => RefKind::Tree,
            other => RefKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefKind::Blob => f.write_str("blob"),
            RefKind::Tree => f.write_str("tree"),
            RefKind::Other(kind) => f.write_str(kind),
        }
    }
}

/// A file or folder inside a GitHub repository, plus the optional API token
/// used when downloading its files.
///
/// Built once from the user's URL and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryReference {
    pub host: String,
    pub owner: String,
    pub repo: String,
    pub kind: RefKind,
    pub branch: String,
    /// Always at least one segment, already percent-decoded
    pub path: Vec<String>,
    pub token: Option<String>,
}

impl RepositoryReference {
    /// Parses a URL like `https://github.com/rust-lang/rust/tree/master/src/doc`
    ///
    /// Fails when the string is not a URL or when it has fewer than five
    /// path segments (owner, repo, kind, branch and at least one path element).
    pub fn parse(input: &str) -> Result<Self, FetchError> {
        let url = Url::parse(input.trim())
            .map_err(|e| FetchError::MalformedReference(format!("'{}': {}", input, e)))?;

        let host = url
            .host_str()
            .ok_or_else(|| FetchError::MalformedReference(format!("'{}' has no host", input)))?
            .to_string();

        // Empty segments come from doubled or trailing slashes, skip them
        let segments = url
            .path_segments()
            .map(|parts| parts.filter(|part| !part.is_empty()).collect::<Vec<_>>())
            .unwrap_or_default();

        if segments.len() < 5 {
            return Err(FetchError::MalformedReference(format!(
                "'{}' must contain user, repo name, blob or tree, branch and a file or folder name",
                input
            )));
        }

        let mut decoded = Vec::with_capacity(segments.len());
        for segment in segments {
            let segment = urlencoding::decode(segment).map_err(|e| {
                FetchError::MalformedReference(format!("bad escape in '{}': {}", segment, e))
            })?;
            decoded.push(segment.into_owned());
        }

        let mut parts = decoded.into_iter();
        // The length check above guarantees these four exist
        let owner = parts.next().unwrap_or_default();
        let repo = parts.next().unwrap_or_default();
        let kind = RefKind::from(parts.next().unwrap_or_default().as_str());
        let branch = parts.next().unwrap_or_default();

        Ok(RepositoryReference {
            host,
            owner,
            repo,
            kind,
            branch,
            path: parts.collect(),
            token: None,
        })
    }

    /// Attaches an API token. Empty strings count as "no token".
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Name of the last path segment, used as the file name for `blob` URLs
    pub fn file_name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }

    /// The API host matching the web host: github.com -> https://api.github.com
    pub fn default_api_base(&self) -> Result<Url, FetchError> {
        let host = self.host.trim_start_matches("www.");
        Url::parse(&format!("https://api.{}", host))
            .map_err(|e| FetchError::MalformedReference(format!("no API host for '{}': {}", host, e)))
    }

    /// `{api_base}/repos/{owner}/{repo}/contents/{path}?ref={branch}`
    pub fn contents_url(&self, api_base: &Url) -> Result<Url, FetchError> {
        let mut url = api_base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                FetchError::MalformedReference(format!("API base '{}' cannot take a path", api_base))
            })?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repo.as_str(), "contents"])
            .extend(self.path.iter());
        url.query_pairs_mut().append_pair("ref", &self.branch);
        Ok(url)
    }
}

impl fmt::Display for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({} '{}' on {})",
            self.owner,
            self.repo,
            self.kind,
            self.path.join("/"),
            self.branch
        )
    }
}

/// Address of a child listing: the parent's address with one more path segment.
/// Keeps the parent's query string (and with it the `ref` branch).
pub fn child_url(parent: &Url, name: &str) -> Result<Url, FetchError> {
    let mut url = parent.clone();
    url.path_segments_mut()
        .map_err(|_| FetchError::MalformedReference(format!("'{}' cannot take a path", parent)))?
        .pop_if_empty()
        .push(name);
    Ok(url)
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why keep RefKind::Other instead of failing right away?
//    - The download engine reports every problem as an Outcome
//    - Parsing only rejects URLs that can't be a repository path at all
//
// 2. What does path_segments_mut() do?
//    - Edits the path of a Url one segment at a time
//    - Each pushed segment is percent-encoded for us ("my dir" -> "my%20dir")
// -----------------------------------------------------------------------------
