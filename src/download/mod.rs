// src/download/mod.rs
// =============================================================================
// This module downloads a GitHub file or folder to local disk.
//
// Submodules:
// - outcome: Outcome (what happened to one file) and DepthBudget
// - traversal: The concurrent, recursive folder walk
//
// Usage:
//   let mut results = spawn_download(client, reference, out_dir, options, cancel);
//   while let Some(outcome) = results.recv().await { ... }
// =============================================================================

mod outcome;
mod traversal;

pub use outcome::{DepthBudget, Outcome};
pub use traversal::{spawn_download, TraversalOptions, DEFAULT_CONCURRENCY};
