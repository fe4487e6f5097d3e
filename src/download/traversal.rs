// src/download/traversal.rs
// =============================================================================
// The recursive, concurrent folder download.
//
// How it works:
// 1. Look at the reference kind
//    - blob: download that one file
//    - tree: list the folder, then fan out (below)
// 2. Fan out over a folder listing:
//    - every file gets its own task that downloads it
//    - every subfolder is listed right away (in this task), then gets its own
//      task that fans out over that listing one level deeper
// 3. Wait for all tasks started at this level before this level is done
//
// Every task reports what happened through one shared channel (the result
// stream). When the top-level fan out returns, every task below it has
// finished too, so dropping the last Sender closes the stream exactly once.
//
// Failures are local: a broken file or folder produces one failed Outcome
// and everything else keeps going. Only a failure of the very first listing
// ends the download early.
//
// Limits:
// - A semaphore caps how many requests run at once (0 = no cap).
//   Permits are only held around a single request + write, never while a
//   folder waits for its children, so the cap cannot deadlock.
// - The channel is bounded; a slow reader slows the download down instead
//   of losing results.
// - A CancellationToken stops everything early. Work that was in flight
//   reports FetchError::Cancelled, and a Cancelled file is never written.
//   Outcomes are still delivered after a cancel, so the reader must keep
//   reading until the stream closes.
//
// Rust concepts:
// - tokio::spawn / JoinSet: Independent tasks and waiting for a group of them
// - BoxFuture: async functions can't call themselves directly, the
//   recursive future has to live on the heap
// - mpsc::Sender clones: many producers, one consumer
// =============================================================================

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use super::outcome::{DepthBudget, Outcome};
use crate::error::FetchError;
use crate::github::{
    child_url, write_file, ContentsClient, Entry, EntryKind, RefKind, RepositoryReference,
};

/// Default cap on requests running at the same time
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Default number of outcomes that can wait in the channel for the reader
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct TraversalOptions {
    pub depth: DepthBudget,
    /// Maximum concurrent requests, 0 for no limit
    pub concurrency: usize,
    pub channel_capacity: usize,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        TraversalOptions {
            depth: DepthBudget::Unbounded,
            concurrency: DEFAULT_CONCURRENCY,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Starts downloading `reference` into `out_dir` in the background.
///
/// Read the returned receiver until it yields `None`; that happens once the
/// whole download (every subfolder included) has finished. Dropping the
/// receiver early makes the remaining tasks stop reporting, but only
/// `cancel` stops the requests themselves.
///
/// Must be called from inside a tokio runtime.
pub fn spawn_download(
    client: ContentsClient,
    reference: RepositoryReference,
    out_dir: PathBuf,
    options: TraversalOptions,
    cancel: CancellationToken,
) -> mpsc::Receiver<Outcome> {
    let (results, receiver) = mpsc::channel(options.channel_capacity.max(1));
    let limiter = match options.concurrency {
        0 => None,
        n => Some(Arc::new(Semaphore::new(n))),
    };
    let walker = Walker {
        client,
        token: reference.token.clone().map(Arc::from),
        limiter,
        results,
        cancel,
    };

    tokio::spawn(async move {
        walker.run(reference, out_dir, options.depth).await;
        // `walker` and its Sender are dropped here, closing the stream
    });

    receiver
}

/// Everything a task needs. Cloned once per spawned task.
#[derive(Clone)]
struct Walker {
    client: ContentsClient,
    token: Option<Arc<str>>,
    limiter: Option<Arc<Semaphore>>,
    results: mpsc::Sender<Outcome>,
    cancel: CancellationToken,
}

impl Walker {
    async fn run(&self, reference: RepositoryReference, out_dir: PathBuf, depth: DepthBudget) {
        debug!(%reference, out_dir = %out_dir.display(), ?depth, "starting download");

        let root_url = match reference.contents_url(self.client.api_base()) {
            Ok(url) => url,
            Err(e) => return self.emit(Outcome::failed(None, e)).await,
        };

        match &reference.kind {
            RefKind::Blob => {
                let entry = Entry {
                    name: reference.file_name().to_string(),
                    kind: EntryKind::File,
                    git_url: Some(root_url.to_string()),
                };
                // The name came from a percent-decoded URL segment
                if let Err(e) = check_name(&entry.name) {
                    return self.emit(Outcome::failed(Some(entry), e)).await;
                }
                self.ensure_dir(&out_dir).await;
                let dest = out_dir.join(&entry.name);
                self.fetch_file(entry, dest).await;
            }
            RefKind::Tree => match self.list(&root_url).await {
                Ok(entries) => {
                    self.clone()
                        .fan_out(entries, out_dir, depth, root_url)
                        .await
                }
                Err(e) => self.emit(Outcome::failed(None, e)).await,
            },
            RefKind::Other(kind) => {
                self.emit(Outcome::failed(
                    None,
                    FetchError::UnsupportedReferenceKind(kind.clone()),
                ))
                .await
            }
        }
    }

    /// Downloads one folder level and waits for everything it started.
    ///
    /// `base` is the listing address of this folder, child addresses are
    /// built from it.
    fn fan_out(
        self,
        entries: Vec<Entry>,
        out_dir: PathBuf,
        depth: DepthBudget,
        base: Url,
    ) -> BoxFuture<'static, ()> {
        async move {
            self.ensure_dir(&out_dir).await;

            let mut tasks = JoinSet::new();
            for entry in entries {
                if self.cancel.is_cancelled() {
                    debug!(dir = %out_dir.display(), "cancelled, not starting more work");
                    break;
                }
                if let Err(e) = check_name(&entry.name) {
                    self.emit(Outcome::failed(Some(entry), e)).await;
                    continue;
                }

                match &entry.kind {
                    EntryKind::File => {
                        let walker = self.clone();
                        let dest = out_dir.join(&entry.name);
                        tasks.spawn(async move { walker.fetch_file(entry, dest).await });
                    }
                    EntryKind::Dir => {
                        if depth.is_exhausted() {
                            debug!(name = %entry.name, "depth limit reached, skipping folder");
                            continue;
                        }
                        let url = match child_url(&base, &entry.name) {
                            Ok(url) => url,
                            Err(e) => {
                                self.emit(Outcome::failed(Some(entry), e)).await;
                                continue;
                            }
                        };
                        // The listing runs here, before the child task exists:
                        // a folder's children can't be started until we know them
                        match self.list(&url).await {
                            Ok(children) => {
                                let child_dir = out_dir.join(&entry.name);
                                tasks.spawn(self.clone().fan_out(
                                    children,
                                    child_dir,
                                    depth.descend(),
                                    url,
                                ));
                            }
                            Err(e) => self.emit(Outcome::failed(Some(entry), e)).await,
                        }
                    }
                    EntryKind::Other(kind) => {
                        let error = FetchError::UnsupportedEntryKind(kind.clone());
                        self.emit(Outcome::failed(Some(entry), error)).await;
                    }
                }
            }

            // Only the tasks spawned above; deeper levels join their own
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    warn!(dir = %out_dir.display(), "download task failed: {}", e);
                }
            }
        }
        .boxed()
    }

    async fn fetch_file(&self, entry: Entry, dest: PathBuf) {
        let outcome = match self.download(&entry, &dest).await {
            Ok(()) => {
                debug!(path = %dest.display(), "downloaded");
                Outcome::written(entry, dest)
            }
            Err(e) => Outcome::failed(Some(entry), e),
        };
        self.emit(outcome).await;
    }

    async fn download(&self, entry: &Entry, dest: &Path) -> Result<(), FetchError> {
        let url = entry
            .git_url
            .as_deref()
            .ok_or_else(|| FetchError::Decode(format!("'{}' has no git_url", entry.name)))?;
        let _permit = self.acquire().await?;
        let bytes = self
            .cancellable(self.client.fetch_blob(url, self.token.as_deref()))
            .await?;
        self.store(&bytes, dest).await
    }

    // The write itself is not raced against the token: a dropped tokio::fs
    // write keeps running on the blocking pool, so "Cancelled" could not
    // promise that nothing was written
    async fn store(&self, bytes: &[u8], dest: &Path) -> Result<(), FetchError> {
        if self.cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        write_file(dest, bytes).await
    }

    async fn list(&self, url: &Url) -> Result<Vec<Entry>, FetchError> {
        let _permit = self.acquire().await?;
        self.cancellable(self.client.list_directory(url)).await
    }

    async fn acquire(&self) -> Result<Option<OwnedSemaphorePermit>, FetchError> {
        let Some(limiter) = &self.limiter else {
            return Ok(None);
        };
        let permit = self
            .cancellable(async {
                limiter
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| FetchError::Cancelled)
            })
            .await?;
        Ok(Some(permit))
    }

    async fn cancellable<T>(
        &self,
        work: impl Future<Output = Result<T, FetchError>>,
    ) -> Result<T, FetchError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FetchError::Cancelled),
            result = work => result,
        }
    }

    // A missing folder is not reported on its own: every file below it fails
    // with a StorageError when it is written
    async fn ensure_dir(&self, dir: &Path) {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!(dir = %dir.display(), "could not create folder: {}", e);
        }
    }

    /// Sends one outcome, waiting for room in the channel.
    ///
    /// Cancellation does not skip this wait: a failure that finished before
    /// the cancel is still a failure the reader has to see. Only a closed
    /// stream (receiver dropped) discards the outcome.
    async fn emit(&self, outcome: Outcome) {
        if self.results.send(outcome).await.is_err() {
            debug!("result stream closed, dropping outcome");
        }
    }
}

/// Entry names become path components, so they must be a single plain name
fn check_name(name: &str) -> Result<(), FetchError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if bad {
        return Err(FetchError::Decode(format!("unsafe entry name '{}'", name)));
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why list subfolders before spawning their task?
//    - A folder's children are unknown until its listing comes back
//    - Doing the listing in the parent keeps "failed listing" a plain
//      Outcome for that folder entry, reported right where it happened
//
// 2. What does JoinSet do?
//    - It owns a group of spawned tasks
//    - join_next() hands back each task as it finishes
//    - When the loop ends, every task of this level is done
//
// 3. Why .boxed() on fan_out?
//    - An async fn that awaits itself would have an infinitely large type
//    - Putting the future in a Box gives it a fixed size
//
// 4. How does the channel know it's finished?
//    - Every task holds a clone of the Sender
//    - The receiver sees None once the last clone is dropped
//    - The last clone is the one in spawn_download's task, dropped after the
//      top-level fan_out returned
//
// 5. What is tokio::select!?
//    - Waits on several futures and runs the branch of whichever finishes first
//    - `biased;` checks the branches top to bottom instead of randomly
// -----------------------------------------------------------------------------
