// src/watch/session.rs

//! Watch session state machine.
//!
//! ```text
//! Initializing --compile--> Subscribing --> Listening --(event)--> Listening ... --> Closed
//! ```
//!
//! The session is driven by whoever polls the stream; it never spawns. A
//! failed initial compile leaves the session without manifests, and the next
//! event triggers a full recompile instead of an incremental update.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tracing::{debug, info};

use crate::engine::compile::{CompileRequest, EntryRoot, compile_manifests};
use crate::engine::process::process_file;
use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::path_utils::join_relative;
use crate::processor::ProcessorSpec;
use crate::types::{CompileOutput, Manifest, WatchEvent, WatchEventKind};
use crate::watch::native::NativeEventSource;
use crate::watch::poll::PollEventSource;
use crate::watch::source::{EventSource, EventSourceOptions};
use crate::watch::{WatchOptions, WatchSource};

/// Start a watch session; see [`crate::engine::Pipeline::watch`].
pub fn watch(
    fs: Arc<dyn FileSystem>,
    request: CompileRequest,
    options: WatchOptions,
) -> BoxStream<'static, Result<CompileOutput>> {
    let session = Session {
        fs,
        request,
        options,
        phase: Phase::Initializing,
        root: None,
        manifests: None,
        events: None,
    };

    stream::unfold(session, |mut session| async move {
        session.next_snapshot().await.map(|item| (item, session))
    })
    .boxed()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Initializing,
    Subscribing,
    Listening,
    Closed,
}

struct Session {
    fs: Arc<dyn FileSystem>,
    request: CompileRequest,
    options: WatchOptions,
    phase: Phase,
    /// Resolved once, by the first successful stat of the entry.
    root: Option<EntryRoot>,
    /// One map per processor; `None` until a full compile succeeds.
    manifests: Option<Vec<Manifest>>,
    events: Option<BoxStream<'static, Result<WatchEvent>>>,
}

impl Session {
    async fn next_snapshot(&mut self) -> Option<Result<CompileOutput>> {
        loop {
            match self.phase {
                Phase::Initializing => {
                    info!(entry = ?self.request.entry, "watch session starting");
                    self.phase = Phase::Subscribing;
                    match self.full_compile().await {
                        Ok(snapshot) => return Some(Ok(snapshot)),
                        Err(err) => {
                            if let Err(err) = self.options.on_error.report(err) {
                                return self.close_with(err);
                            }
                        }
                    }
                }
                Phase::Subscribing => match self.subscribe().await {
                    Ok(events) => {
                        self.events = Some(events);
                        self.phase = Phase::Listening;
                    }
                    Err(err) => return self.close_with(err),
                },
                Phase::Listening => {
                    let next = match self.events.as_mut() {
                        Some(events) => events.next().await,
                        None => None,
                    };
                    // Events still buffered by the source are dropped once
                    // the session is cancelled.
                    if self.options.cancel.is_cancelled() {
                        info!(entry = ?self.request.entry, "watch cancelled; session closed");
                        self.close();
                        return None;
                    }

                    let outcome = match next {
                        None => {
                            info!(entry = ?self.request.entry, "event source ended; watch session closed");
                            self.close();
                            return None;
                        }
                        Some(Err(err)) => Err(err),
                        Some(Ok(event)) => self.handle(event).await,
                    };

                    match outcome {
                        Ok(Some(snapshot)) => return Some(Ok(snapshot)),
                        Ok(None) => {}
                        Err(err) => {
                            if let Err(err) = self.options.on_error.report(err) {
                                return self.close_with(err);
                            }
                        }
                    }
                }
                Phase::Closed => return None,
            }
        }
    }

    fn close(&mut self) {
        self.phase = Phase::Closed;
        self.events = None;
        self.manifests = None;
    }

    fn close_with(&mut self, err: PipelineError) -> Option<Result<CompileOutput>> {
        info!(error = %err, "watch session terminated by error");
        self.close();
        Some(Err(err))
    }

    async fn full_compile(&mut self) -> Result<CompileOutput> {
        let (root, manifests) = compile_manifests(self.fs.as_ref(), &self.request).await?;
        if self.root.is_none() {
            self.root = Some(root);
        }
        self.manifests = Some(manifests);
        Ok(self.snapshot())
    }

    async fn subscribe(&mut self) -> Result<BoxStream<'static, Result<WatchEvent>>> {
        let root = match self.root.clone() {
            Some(root) => root,
            None => {
                let stat = self.fs.stat(&self.request.entry).await?;
                let root = EntryRoot::resolve(&self.request.entry, stat.is_dir);
                self.root = Some(root.clone());
                root
            }
        };

        // A single-file watch never recurses.
        let recursive = root.entry_is_dir && self.request.any_recursive();

        let source: Arc<dyn EventSource> = match &self.options.source {
            WatchSource::Native => Arc::new(NativeEventSource),
            WatchSource::Poll(interval) => {
                Arc::new(PollEventSource::new(Arc::clone(&self.fs), *interval))
            }
            WatchSource::Custom(source) => Arc::clone(source),
        };
        debug!(?source, recursive, "subscribing to change events");

        Ok(source.events(
            &root.entry,
            EventSourceOptions {
                recursive,
                cancel: self.options.cancel.clone(),
            },
        ))
    }

    async fn handle(&mut self, event: WatchEvent) -> Result<Option<CompileOutput>> {
        debug!(kind = ?event.kind, path = %event.path, "handling change event");

        let Some(manifests) = self.manifests.as_mut() else {
            // The last full compile failed; start over.
            return self.full_compile().await.map(Some);
        };

        if event.kind == WatchEventKind::Renamed {
            let tracked = manifests.iter().any(|m| m.contains_key(&event.path));
            if tracked {
                for manifest in manifests.iter_mut() {
                    manifest.remove(&event.path);
                }
                debug!(path = %event.path, "removed from manifests");
                return Ok(Some(self.snapshot()));
            }
            // An untracked path that appeared or moved: treat it as a
            // candidate addition below.
        }

        self.apply_change(&event.path).await
    }

    async fn apply_change(&mut self, rel_path: &str) -> Result<Option<CompileOutput>> {
        let active: Vec<Option<&ProcessorSpec>> = self
            .request
            .processors
            .iter()
            .map(|p| p.includes(rel_path, false).then_some(p))
            .collect();

        if active.iter().all(Option::is_none) {
            debug!(path = %rel_path, "no processor wants changed path; ignoring");
            return Ok(None);
        }

        let Some(root) = self.root.as_ref() else {
            return Err(PipelineError::Other(anyhow::anyhow!(
                "watch session has no entry root"
            )));
        };
        let file = join_relative(&root.dir, rel_path);
        let entries = process_file(self.fs.as_ref(), &file, &root.dir, &active).await?;

        if let Some(manifests) = self.manifests.as_mut() {
            for (manifest, entry) in manifests.iter_mut().zip(entries) {
                if let Some(entry) = entry {
                    manifest.insert(entry.source, entry.output);
                }
            }
        }

        Ok(Some(self.snapshot()))
    }

    /// An independent copy of the current manifests.
    fn snapshot(&self) -> CompileOutput {
        CompileOutput::from_manifests(self.manifests.clone().unwrap_or_default())
    }
}
