// src/fs/mod.rs

//! Filesystem capability used by the compiler, the file processor and the
//! poll differ.
//!
//! Every operation is async and returns a boxed future so the trait stays
//! object safe; the pipeline only ever holds an `Arc<dyn FileSystem>`.

use std::fmt::Debug;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::SystemTime;

use crate::errors::{PipelineError, Result};

pub mod mock;

/// Boxed future returned by [`FileSystem`] operations.
pub type FsFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Result of a `stat` call: all the pipeline needs to know about a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub is_dir: bool,
    pub modified: SystemTime,
}

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    /// Return the names (not full paths) of the entries in a directory.
    fn read_dir<'a>(&'a self, path: &'a Path) -> FsFuture<'a, Vec<String>>;

    fn stat<'a>(&'a self, path: &'a Path) -> FsFuture<'a, FileStat>;

    fn read<'a>(&'a self, path: &'a Path) -> FsFuture<'a, Vec<u8>>;

    /// Recursively create a directory. Must succeed if it already exists,
    /// including when a concurrent caller created it first.
    fn create_dir_all<'a>(&'a self, path: &'a Path) -> FsFuture<'a, ()>;

    /// Create or overwrite a file.
    fn write<'a>(&'a self, path: &'a Path, contents: &'a [u8]) -> FsFuture<'a, ()>;
}

/// Implementation that uses `tokio::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_dir<'a>(&'a self, path: &'a Path) -> FsFuture<'a, Vec<String>> {
        Box::pin(async move {
            let mut entries = Vec::new();
            let mut dir = tokio::fs::read_dir(path)
                .await
                .map_err(|e| PipelineError::io("read_dir", path, e))?;
            while let Some(entry) = dir
                .next_entry()
                .await
                .map_err(|e| PipelineError::io("read_dir", path, e))?
            {
                entries.push(entry.file_name().to_string_lossy().into_owned());
            }
            Ok(entries)
        })
    }

    fn stat<'a>(&'a self, path: &'a Path) -> FsFuture<'a, FileStat> {
        Box::pin(async move {
            let meta = tokio::fs::metadata(path)
                .await
                .map_err(|e| PipelineError::io("stat", path, e))?;
            let modified = meta
                .modified()
                .map_err(|e| PipelineError::io("stat", path, e))?;
            Ok(FileStat {
                is_dir: meta.is_dir(),
                modified,
            })
        })
    }

    fn read<'a>(&'a self, path: &'a Path) -> FsFuture<'a, Vec<u8>> {
        Box::pin(async move {
            tokio::fs::read(path)
                .await
                .map_err(|e| PipelineError::io("read", path, e))
        })
    }

    fn create_dir_all<'a>(&'a self, path: &'a Path) -> FsFuture<'a, ()> {
        Box::pin(async move {
            tokio::fs::create_dir_all(path)
                .await
                .map_err(|e| PipelineError::io("create_dir_all", path, e))
        })
    }

    fn write<'a>(&'a self, path: &'a Path, contents: &'a [u8]) -> FsFuture<'a, ()> {
        Box::pin(async move {
            tokio::fs::write(path, contents)
                .await
                .map_err(|e| PipelineError::io("write", path, e))
        })
    }
}
