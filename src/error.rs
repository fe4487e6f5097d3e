// src/error.rs
// =============================================================================
// Error types for the download engine.
//
// Every unit of work (one file download, one directory listing) can fail on
// its own without stopping the rest of the download. Each failure is one of
// the variants below and travels to the user inside an Outcome.
//
// Rust concepts:
// - thiserror: Derives std::error::Error and Display for our enum
// - #[from]: Lets the ? operator convert reqwest errors automatically
// =============================================================================

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The input URL is not a usable repository reference
    #[error("malformed repository URL: {0}")]
    MalformedReference(String),

    /// The URL asked for something other than `blob` or `tree`
    #[error("unknown git url schema, expected blob or tree, got '{0}'")]
    UnsupportedReferenceKind(String),

    /// The GitHub listing contained an entry we don't know how to download
    /// (symlinks and submodules end up here)
    #[error("unsupported entry type '{0}'")]
    UnsupportedEntryKind(String),

    /// GitHub answered with a non-2xx status code
    #[error("remote returned HTTP {code}")]
    RemoteStatus { code: u16 },

    /// The response body was not the JSON (or base64) we expected
    #[error("could not decode response: {0}")]
    Decode(String),

    /// Creating a directory or writing a file failed
    #[error("could not write {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request never got a response (DNS, TLS, connection reset, ...)
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The download was stopped before this unit of work finished
    #[error("cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Storage {
            path: path.into(),
            source,
        }
    }
}
