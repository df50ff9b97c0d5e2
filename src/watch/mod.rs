// src/watch/mod.rs

//! Live mode: keep the manifests correct while the source tree changes.
//!
//! - [`source`] defines the change-event source capability.
//! - [`native`] implements it on top of `notify`.
//! - [`poll`] implements it by diffing modification-time snapshots.
//! - [`session`] is the watch state machine that turns events into manifest
//!   snapshots.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::errors::{PipelineError, Result};

pub mod native;
pub mod poll;
pub mod session;
pub mod source;

pub use native::NativeEventSource;
pub use poll::{PollEventSource, PollSnapshot, diff_snapshots};
pub use source::{EventSource, EventSourceOptions};

/// Where a watch session gets its change events from.
#[derive(Clone)]
pub enum WatchSource {
    /// OS notifications through `notify`.
    Native,
    /// Modification-time polling at the given interval.
    Poll(Duration),
    /// Any other source, e.g. a scripted one in tests.
    Custom(Arc<dyn EventSource>),
}

impl WatchSource {
    /// `Some(interval)` polls, `None` uses native notifications.
    pub fn from_poll_interval(interval: Option<Duration>) -> Self {
        match interval {
            Some(interval) => WatchSource::Poll(interval),
            None => WatchSource::Native,
        }
    }
}

impl fmt::Debug for WatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchSource::Native => f.write_str("Native"),
            WatchSource::Poll(interval) => f.debug_tuple("Poll").field(interval).finish(),
            WatchSource::Custom(source) => f.debug_tuple("Custom").field(source).finish(),
        }
    }
}

/// Decides what happens to an error raised while a session is running.
///
/// Returning `Ok(())` reports and keeps watching; returning `Err` ends the
/// session with that error as the stream's last item.
#[derive(Clone)]
pub struct ErrorHook(Arc<dyn Fn(PipelineError) -> Result<()> + Send + Sync>);

impl ErrorHook {
    pub fn new<F>(hook: F) -> Self
    where
        F: Fn(PipelineError) -> Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(hook))
    }

    /// Log the error and keep watching.
    pub fn lenient() -> Self {
        Self::new(|err| {
            warn!(error = %err, "error while watching; continuing");
            Ok(())
        })
    }

    /// Stop the session on the first error.
    pub fn strict() -> Self {
        Self::new(|err| Err(err))
    }

    pub fn from_strictness(strict: bool) -> Self {
        if strict { Self::strict() } else { Self::lenient() }
    }

    pub fn report(&self, err: PipelineError) -> Result<()> {
        (self.0)(err)
    }
}

impl Default for ErrorHook {
    fn default() -> Self {
        Self::lenient()
    }
}

impl fmt::Debug for ErrorHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHook").finish_non_exhaustive()
    }
}

/// Options for [`crate::engine::Pipeline::watch`].
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub cancel: CancellationToken,
    pub source: WatchSource,
    pub on_error: ErrorHook,
}

impl WatchOptions {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            source: WatchSource::Native,
            on_error: ErrorHook::default(),
        }
    }

    pub fn source(mut self, source: WatchSource) -> Self {
        self.source = source;
        self
    }

    pub fn on_error(mut self, hook: ErrorHook) -> Self {
        self.on_error = hook;
        self
    }
}
