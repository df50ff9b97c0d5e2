// src/watch/poll.rs

//! Change events synthesised from modification-time snapshots, for
//! filesystems where native notifications are missing or unreliable
//! (network mounts, some containers).

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use futures::StreamExt;
use futures::future::{BoxFuture, FutureExt, join_all};
use futures::stream::{self, BoxStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::process::relative_to_root;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::{DEFAULT_POLL_INTERVAL, WatchEvent};
use crate::watch::source::{EventSource, EventSourceOptions};

/// Relative path → last modification time.
pub type PollSnapshot = BTreeMap<String, SystemTime>;

#[derive(Debug, Clone)]
pub struct PollEventSource {
    fs: Arc<dyn FileSystem>,
    interval: Duration,
}

impl PollEventSource {
    pub fn new(fs: Arc<dyn FileSystem>, interval: Duration) -> Self {
        Self { fs, interval }
    }

    pub fn with_default_interval(fs: Arc<dyn FileSystem>) -> Self {
        Self::new(fs, DEFAULT_POLL_INTERVAL)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl EventSource for PollEventSource {
    fn events(&self, path: &Path, options: EventSourceOptions) -> BoxStream<'static, Result<WatchEvent>> {
        let state = PollState {
            fs: Arc::clone(&self.fs),
            root: path.to_path_buf(),
            recursive: options.recursive,
            interval: self.interval,
            cancel: options.cancel,
            snapshot: None,
            pending: VecDeque::new(),
            started: false,
        };
        info!(root = ?path, interval = ?self.interval, recursive = options.recursive, "polling for changes");
        stream::unfold(state, |mut state| async move {
            state.next_event().await.map(|item| (item, state))
        })
        .boxed()
    }
}

struct PollState {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    recursive: bool,
    interval: Duration,
    cancel: CancellationToken,
    snapshot: Option<PollSnapshot>,
    pending: VecDeque<WatchEvent>,
    started: bool,
}

impl PollState {
    async fn next_event(&mut self) -> Option<Result<WatchEvent>> {
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }

            // The first snapshot is taken immediately; every later one waits
            // for the interval.
            if self.started {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return None,
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }
            self.started = true;

            let next = match snapshot(self.fs.as_ref(), &self.root, self.recursive).await {
                Ok(next) => next,
                Err(err) => return Some(Err(err)),
            };
            if self.cancel.is_cancelled() {
                return None;
            }

            if let Some(prev) = self.snapshot.as_ref() {
                let events = diff_snapshots(prev, &next);
                if !events.is_empty() {
                    debug!(count = events.len(), "poll detected changes");
                }
                self.pending.extend(events);
            }
            self.snapshot = Some(next);
        }
    }
}

/// Record the modification time of everything under `root`.
///
/// With `recursive`, directories are descended and only their non-directory
/// entries are recorded; without it, every direct child of `root` is
/// recorded, directories included. A file `root` yields a one-entry snapshot
/// keyed by its file name.
pub async fn snapshot(fs: &dyn FileSystem, root: &Path, recursive: bool) -> Result<PollSnapshot> {
    let stat = fs.stat(root).await?;
    if !stat.is_dir {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Ok(PollSnapshot::from([(name, stat.modified)]));
    }

    let entries = scan(fs, root, root.to_path_buf(), recursive).await?;
    Ok(entries.into_iter().collect())
}

fn scan<'a>(
    fs: &'a dyn FileSystem,
    root: &'a Path,
    dir: PathBuf,
    recursive: bool,
) -> BoxFuture<'a, Result<Vec<(String, SystemTime)>>> {
    async move {
        let names = fs.read_dir(&dir).await?;
        let children = names.into_iter().map(|name| {
            let path = dir.join(name);
            async move {
                let stat = fs.stat(&path).await?;
                if stat.is_dir && recursive {
                    scan(fs, root, path, recursive).await
                } else {
                    Ok(vec![(relative_to_root(root, &path)?, stat.modified)])
                }
            }
        });
        let mut entries = Vec::new();
        for child in join_all(children).await {
            entries.extend(child?);
        }
        Ok(entries)
    }
    .boxed()
}

/// Events that turn `prev` into `next`.
///
/// Paths of `prev` come first, in path order: missing ones are reported as
/// `Renamed`, ones with a different timestamp as `Changed`. Paths only
/// present in `next` follow, in path order, as `Renamed`.
pub fn diff_snapshots(prev: &PollSnapshot, next: &PollSnapshot) -> Vec<WatchEvent> {
    let mut events = Vec::new();

    for (path, modified) in prev {
        match next.get(path) {
            None => events.push(WatchEvent::renamed(path.clone())),
            Some(now) if now != modified => events.push(WatchEvent::changed(path.clone())),
            Some(_) => {}
        }
    }

    for path in next.keys() {
        if !prev.contains_key(path) {
            events.push(WatchEvent::renamed(path.clone()));
        }
    }

    events
}
