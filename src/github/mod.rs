// src/github/mod.rs
// =============================================================================
// This module handles everything that talks about GitHub.
//
// Currently implements:
// - Parsing GitHub URLs into owner/repo/branch/path (reference.rs)
// - Listing directories and downloading files via the contents API (contents.rs)
//
// Rust concepts:
// - Modules: Organizing related functionality
// - Public API: What other parts of the app can use
// =============================================================================

mod contents;
mod reference;

// Re-export the pieces the rest of the app uses
pub use contents::{write_file, ContentsClient, Entry, EntryKind};
pub use reference::{child_url, RefKind, RepositoryReference};
