// src/engine/mod.rs

//! Compile engine.
//!
//! - [`process`] is the single-file fan-out shared by full compiles and the
//!   watcher.
//! - [`compile`] is the recursive tree walk.
//!
//! [`Pipeline`] bundles the filesystem capability with both entry points
//! (`compile` and `watch`) so collaborators are wired once at construction.

use std::sync::Arc;

use futures::stream::BoxStream;

use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::CompileOutput;
use crate::watch::WatchOptions;

pub mod compile;
pub mod process;

pub use compile::{CompileRequest, EntryRoot};
pub use process::{ManifestEntry, process_file};

/// Entry point for one-shot compiles and watch sessions.
#[derive(Debug, Clone)]
pub struct Pipeline {
    fs: Arc<dyn FileSystem>,
}

impl Pipeline {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Pipeline on the real filesystem.
    pub fn on_disk() -> Self {
        Self::new(Arc::new(RealFileSystem))
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Compile every matching file under the request's entry.
    pub async fn compile(&self, request: &CompileRequest) -> Result<CompileOutput> {
        compile::compile(self.fs.as_ref(), request).await
    }

    /// Start a watch session.
    ///
    /// The returned stream is lazy: nothing happens until it is polled. Its
    /// first item is the initial compile, then one snapshot per observable
    /// change, until `options.cancel` is cancelled.
    pub fn watch(
        &self,
        request: CompileRequest,
        options: WatchOptions,
    ) -> BoxStream<'static, Result<CompileOutput>> {
        crate::watch::session::watch(Arc::clone(&self.fs), request, options)
    }
}
