// src/processor.rs

//! Processor specifications: one independent output configuration each.
//!
//! A processor decides which files it wants (`include`, `recursive`), what
//! their bytes become (`transform`), what the output file is called
//! (`rename`) and where it goes (`out_root`). Processors never see each
//! other; the only thing they share is the single read of a source file.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::namer::BasenameNamer;

/// Outcome of a transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformed {
    /// Write these bytes.
    Keep(Vec<u8>),
    /// Exclude the file from this processor's output and manifest.
    Skip,
}

/// Byte transform applied to a file's contents before it is written.
pub trait Transform: Send + Sync {
    fn transform<'a>(
        &'a self,
        contents: &'a [u8],
        rel_path: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Transformed>>;
}

/// Chooses the output file name for a source file.
///
/// Receives the source path relative to the entry root and the already
/// transformed bytes; returns a bare file name.
pub trait Rename: Send + Sync {
    fn rename<'a>(
        &'a self,
        rel_path: &'a str,
        contents: &'a [u8],
    ) -> BoxFuture<'a, anyhow::Result<String>>;
}

/// Inclusion predicate: `(relative path, is directory) -> included`.
pub type IncludeFn = Arc<dyn Fn(&str, bool) -> bool + Send + Sync>;

struct FnTransform<F>(F);

impl<F> Transform for FnTransform<F>
where
    F: Fn(&[u8], &str) -> anyhow::Result<Transformed> + Send + Sync,
{
    fn transform<'a>(
        &'a self,
        contents: &'a [u8],
        rel_path: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Transformed>> {
        let out = (self.0)(contents, rel_path);
        Box::pin(async move { out })
    }
}

struct FnRename<F>(F);

impl<F> Rename for FnRename<F>
where
    F: Fn(&str, &[u8]) -> anyhow::Result<String> + Send + Sync,
{
    fn rename<'a>(
        &'a self,
        rel_path: &'a str,
        contents: &'a [u8],
    ) -> BoxFuture<'a, anyhow::Result<String>> {
        let out = (self.0)(rel_path, contents);
        Box::pin(async move { out })
    }
}

/// One output configuration.
///
/// Defaults: recursive, everything included, identity transform, output
/// named after the source file.
#[derive(Clone)]
pub struct ProcessorSpec {
    out_root: PathBuf,
    recursive: bool,
    include: Option<IncludeFn>,
    rename: Option<Arc<dyn Rename>>,
    transform: Option<Arc<dyn Transform>>,
}

impl fmt::Debug for ProcessorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorSpec")
            .field("out_root", &self.out_root)
            .field("recursive", &self.recursive)
            .field("include", &self.include.is_some())
            .field("rename", &self.rename.is_some())
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

impl ProcessorSpec {
    pub fn new(out_root: impl Into<PathBuf>) -> Self {
        Self {
            out_root: out_root.into(),
            recursive: true,
            include: None,
            rename: None,
            transform: None,
        }
    }

    /// With `false`, only files directly inside the entry directory are
    /// processed.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn include<F>(mut self, include: F) -> Self
    where
        F: Fn(&str, bool) -> bool + Send + Sync + 'static,
    {
        self.include = Some(Arc::new(include));
        self
    }

    pub fn rename_with(mut self, rename: impl Rename + 'static) -> Self {
        self.rename = Some(Arc::new(rename));
        self
    }

    pub fn rename_fn<F>(self, rename: F) -> Self
    where
        F: Fn(&str, &[u8]) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.rename_with(FnRename(rename))
    }

    pub fn transform_with(mut self, transform: impl Transform + 'static) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn transform_fn<F>(self, transform: F) -> Self
    where
        F: Fn(&[u8], &str) -> anyhow::Result<Transformed> + Send + Sync + 'static,
    {
        self.transform_with(FnTransform(transform))
    }

    pub fn out_root(&self) -> &PathBuf {
        &self.out_root
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Run the include predicate; a processor without one includes everything.
    pub fn includes(&self, rel_path: &str, is_dir: bool) -> bool {
        match &self.include {
            Some(include) => include(rel_path, is_dir),
            None => true,
        }
    }

    pub(crate) async fn apply_transform(
        &self,
        contents: &[u8],
        rel_path: &str,
    ) -> anyhow::Result<Transformed> {
        match &self.transform {
            Some(t) => t.transform(contents, rel_path).await,
            None => Ok(Transformed::Keep(contents.to_vec())),
        }
    }

    pub(crate) async fn output_name(
        &self,
        rel_path: &str,
        contents: &[u8],
    ) -> anyhow::Result<String> {
        match &self.rename {
            Some(r) => r.rename(rel_path, contents).await,
            None => BasenameNamer.rename(rel_path, contents).await,
        }
    }
}
