// src/watch/source.rs

use std::fmt::Debug;
use std::path::Path;

use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::errors::Result;
use crate::types::WatchEvent;

#[derive(Debug, Clone)]
pub struct EventSourceOptions {
    /// Also report changes below subdirectories of the watched path.
    pub recursive: bool,
    /// Ends the event stream once cancelled.
    pub cancel: CancellationToken,
}

/// Produces change events for a watched path.
///
/// Each call to [`EventSource::events`] starts an independent, lazy,
/// potentially infinite stream. Event paths are relative to the watched path
/// when it is a directory, and to its parent when it is a file. Errors are
/// reported as stream items; the stream ends when `options.cancel` fires.
pub trait EventSource: Send + Sync + Debug {
    fn events(&self, path: &Path, options: EventSourceOptions) -> BoxStream<'static, Result<WatchEvent>>;
}
