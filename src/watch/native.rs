// src/watch/native.rs

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{PipelineError, Result};
use crate::path_utils::{parent_dir, relative_str};
use crate::types::{WatchEvent, WatchEventKind};
use crate::watch::source::{EventSource, EventSourceOptions};

/// Event source backed by the platform's native notifications
/// (`notify::RecommendedWatcher`).
///
/// The watcher lives as long as the returned stream; dropping the stream
/// stops watching.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEventSource;

impl EventSource for NativeEventSource {
    fn events(&self, path: &Path, options: EventSourceOptions) -> BoxStream<'static, Result<WatchEvent>> {
        match start_watcher(path, options.recursive) {
            Ok((watcher, event_rx, base)) => {
                let state = NativeState {
                    _watcher: watcher,
                    event_rx,
                    base,
                    cancel: options.cancel,
                    pending: VecDeque::new(),
                };
                stream::unfold(state, |mut state| async move {
                    state.next_event().await.map(|item| (item, state))
                })
                .boxed()
            }
            Err(err) => stream::once(async move { Err(err) }).boxed(),
        }
    }
}

fn start_watcher(
    path: &Path,
    recursive: bool,
) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<notify::Result<Event>>, PathBuf)> {
    // Canonicalize once so we have a stable base path.
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let base = if path.is_dir() {
        path.clone()
    } else {
        parent_dir(&path)
    };

    // Channel from the blocking notify callback into the async world.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            // The receiver is gone once the stream is dropped; nothing to do.
            let _ = event_tx.send(res);
        },
        Config::default(),
    )?;

    let mode = if recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    watcher.watch(&path, mode)?;

    info!("file watcher started on {:?}", path);
    Ok((watcher, event_rx, base))
}

struct NativeState {
    _watcher: RecommendedWatcher,
    event_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    base: PathBuf,
    cancel: CancellationToken,
    pending: VecDeque<WatchEvent>,
}

impl NativeState {
    async fn next_event(&mut self) -> Option<Result<WatchEvent>> {
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }

            let received = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("watch cancelled; closing native event stream");
                    return None;
                }
                received = self.event_rx.recv() => received,
            };

            match received {
                None => return None,
                Some(Err(err)) => return Some(Err(PipelineError::Watch(err))),
                Some(Ok(event)) => self.queue(event),
            }
        }
    }

    fn queue(&mut self, event: Event) {
        debug!(?event, "received notify event");
        let Some(kind) = classify(&event.kind) else {
            return;
        };

        for path in event.paths {
            match relative_str(&self.base, &path) {
                // The watched directory itself.
                Some(rel) if rel.is_empty() => {}
                Some(rel) => self.pending.push_back(WatchEvent { kind, path: rel }),
                None => warn!(
                    "could not relativize path {:?} against root {:?}",
                    path, self.base
                ),
            }
        }
    }
}

/// Map notify's event kinds onto the two-kind vocabulary of the pipeline.
///
/// Appearing, disappearing and renamed paths are `Renamed`; content and
/// metadata changes are `Changed`; plain accesses are dropped.
pub fn classify(kind: &EventKind) -> Option<WatchEventKind> {
    match kind {
        EventKind::Access(_) => None,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => {
            Some(WatchEventKind::Renamed)
        }
        EventKind::Modify(_) | EventKind::Any | EventKind::Other => Some(WatchEventKind::Changed),
    }
}
