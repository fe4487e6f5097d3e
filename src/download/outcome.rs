// src/download/outcome.rs
// =============================================================================
// The small value types the download engine hands around.
//
// - DepthBudget: how many more folder levels we may descend into
// - Outcome: what happened to one unit of work (usually one file)
// =============================================================================

use std::path::PathBuf;

use crate::error::FetchError;
use crate::github::Entry;

/// Remaining number of folder levels the download may descend into.
///
/// `Levels(0)` means: download the files of this folder, skip its subfolders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthBudget {
    #[default]
    Unbounded,
    Levels(u32),
}

impl DepthBudget {
    pub fn is_exhausted(self) -> bool {
        self == DepthBudget::Levels(0)
    }

    /// Budget for the next level down
    pub fn descend(self) -> Self {
        match self {
            DepthBudget::Unbounded => DepthBudget::Unbounded,
            DepthBudget::Levels(n) => DepthBudget::Levels(n.saturating_sub(1)),
        }
    }
}

// The command line uses -1 for "all subfolders", so any negative number
// means unbounded
impl From<i64> for DepthBudget {
    fn from(value: i64) -> Self {
        if value < 0 {
            DepthBudget::Unbounded
        } else {
            DepthBudget::Levels(u32::try_from(value).unwrap_or(u32::MAX))
        }
    }
}

/// The result of one unit of work: a file download, a failed folder listing,
/// or a rejected entry.
///
/// `entry` is only `None` when the failure happened before any entry existed
/// (the very first listing, or an unknown URL kind).
#[derive(Debug)]
pub struct Outcome {
    pub entry: Option<Entry>,
    /// On success, where the file was written
    pub result: Result<PathBuf, FetchError>,
}

impl Outcome {
    pub fn written(entry: Entry, path: PathBuf) -> Self {
        Outcome {
            entry: Some(entry),
            result: Ok(path),
        }
    }

    pub fn failed(entry: Option<Entry>, error: FetchError) -> Self {
        Outcome {
            entry,
            result: Err(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.result.as_ref().err()
    }
}
