use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use assetpipe::errors::{PipelineError, Result};
use assetpipe::types::WatchEvent;
use assetpipe::watch::{EventSource, EventSourceOptions};
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// An `EventSource` whose events are pushed by the test through
/// [`ScriptedEvents`].
///
/// Only the first subscription receives events; later ones get an empty
/// stream. The stream ends when the `ScriptedEvents` handle is dropped or
/// the session is cancelled.
#[derive(Debug)]
pub struct ScriptedEventSource {
    rx: Mutex<Option<mpsc::UnboundedReceiver<Result<WatchEvent>>>>,
    subscriptions: Arc<Mutex<Vec<(PathBuf, bool)>>>,
}

/// Sending half of a [`ScriptedEventSource`].
#[derive(Debug, Clone)]
pub struct ScriptedEvents {
    tx: mpsc::UnboundedSender<Result<WatchEvent>>,
    subscriptions: Arc<Mutex<Vec<(PathBuf, bool)>>>,
}

impl ScriptedEventSource {
    pub fn new() -> (Arc<Self>, ScriptedEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriptions = Arc::new(Mutex::new(Vec::new()));
        let source = Arc::new(Self {
            rx: Mutex::new(Some(rx)),
            subscriptions: Arc::clone(&subscriptions),
        });
        (source, ScriptedEvents { tx, subscriptions })
    }
}

impl EventSource for ScriptedEventSource {
    fn events(&self, path: &Path, options: EventSourceOptions) -> BoxStream<'static, Result<WatchEvent>> {
        self.subscriptions
            .lock()
            .unwrap()
            .push((path.to_path_buf(), options.recursive));

        let Some(rx) = self.rx.lock().unwrap().take() else {
            return stream::empty().boxed();
        };

        stream::unfold((rx, options.cancel), |(mut rx, cancel): (_, CancellationToken)| async move {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = rx.recv() => next,
            };
            next.map(|item| (item, (rx, cancel)))
        })
        .boxed()
    }
}

impl ScriptedEvents {
    pub fn send(&self, event: WatchEvent) {
        self.tx.send(Ok(event)).expect("scripted source dropped");
    }

    pub fn renamed(&self, path: &str) {
        self.send(WatchEvent::renamed(path));
    }

    pub fn changed(&self, path: &str) {
        self.send(WatchEvent::changed(path));
    }

    /// Make the source report an error.
    pub fn fail(&self, message: &str) {
        self.tx
            .send(Err(PipelineError::Other(anyhow::anyhow!(message.to_string()))))
            .expect("scripted source dropped");
    }

    /// `(path, recursive)` for every subscription made so far.
    pub fn subscriptions(&self) -> Vec<(PathBuf, bool)> {
        self.subscriptions.lock().unwrap().clone()
    }
}
