// src/engine/compile.rs

//! Full tree compile.
//!
//! The walk stats each node once, narrows the set of active processors at
//! every directory and file, prunes subtrees no processor wants, and fans out
//! over siblings concurrently. A failing sibling never cuts the others short.
//! Each branch returns its own partial manifests
//! which the parent merges, so no state is shared between branches.

use std::path::{Path, PathBuf};

use futures::future::{BoxFuture, FutureExt, join_all};
use tracing::{debug, info};

use crate::engine::process::{process_file, relative_to_root};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::path_utils::parent_dir;
use crate::processor::ProcessorSpec;
use crate::types::{CompileOutput, Manifest};

/// What to compile and with which processors.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub entry: PathBuf,
    pub processors: Vec<ProcessorSpec>,
}

impl CompileRequest {
    pub fn new(entry: impl Into<PathBuf>, processors: Vec<ProcessorSpec>) -> Self {
        Self {
            entry: entry.into(),
            processors,
        }
    }

    /// Whether any processor descends into subdirectories.
    pub fn any_recursive(&self) -> bool {
        self.processors.iter().any(ProcessorSpec::is_recursive)
    }
}

/// The base directory all relative paths of a session are computed against.
///
/// A directory entry is its own root; a file entry's root is its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRoot {
    pub entry: PathBuf,
    pub dir: PathBuf,
    pub entry_is_dir: bool,
}

impl EntryRoot {
    pub fn resolve(entry: &Path, entry_is_dir: bool) -> Self {
        let dir = if entry_is_dir {
            entry.to_path_buf()
        } else {
            parent_dir(entry)
        };
        Self {
            entry: entry.to_path_buf(),
            dir,
            entry_is_dir,
        }
    }
}

/// Compile `request` and shape the result for the caller.
pub async fn compile(fs: &dyn FileSystem, request: &CompileRequest) -> Result<CompileOutput> {
    let (_, manifests) = compile_manifests(fs, request).await?;
    Ok(CompileOutput::from_manifests(manifests))
}

/// Compile `request`, returning the resolved root and one manifest per
/// processor.
pub async fn compile_manifests(
    fs: &dyn FileSystem,
    request: &CompileRequest,
) -> Result<(EntryRoot, Vec<Manifest>)> {
    let stat = fs.stat(&request.entry).await?;
    let root = EntryRoot::resolve(&request.entry, stat.is_dir);
    info!(entry = ?request.entry, processors = request.processors.len(), "compiling");

    let walk = Walk {
        fs,
        root: &root.dir,
        width: request.processors.len(),
    };
    let active: Vec<Option<&ProcessorSpec>> = request.processors.iter().map(Some).collect();

    let manifests = if stat.is_dir {
        walk.directory(request.entry.clone(), true, active).await?
    } else {
        walk.file(request.entry.clone(), active).await?
    };

    let files: usize = manifests.iter().map(Manifest::len).sum();
    info!(entry = ?request.entry, outputs = files, "compile finished");
    Ok((root, manifests))
}

struct Walk<'a> {
    fs: &'a dyn FileSystem,
    root: &'a Path,
    width: usize,
}

impl<'a> Walk<'a> {
    fn empty(&self) -> Vec<Manifest> {
        vec![Manifest::new(); self.width]
    }

    fn visit<'s>(
        &'s self,
        path: PathBuf,
        active: Vec<Option<&'a ProcessorSpec>>,
    ) -> BoxFuture<'s, Result<Vec<Manifest>>> {
        async move {
            let stat = self.fs.stat(&path).await?;
            if stat.is_dir {
                self.directory(path, false, active).await
            } else {
                self.file(path, active).await
            }
        }
        .boxed()
    }

    async fn directory(
        &self,
        path: PathBuf,
        is_entry: bool,
        active: Vec<Option<&'a ProcessorSpec>>,
    ) -> Result<Vec<Manifest>> {
        let rel = relative_to_root(self.root, &path)?;
        let active: Vec<Option<&ProcessorSpec>> = active
            .iter()
            .map(|slot| slot.filter(|p| is_entry || (p.is_recursive() && p.includes(&rel, true))))
            .collect();

        if active.iter().all(Option::is_none) {
            debug!(dir = %rel, "no processor wants directory; pruning");
            return Ok(self.empty());
        }

        let children = self.fs.read_dir(&path).await?;
        let branches = children
            .into_iter()
            .map(|name| self.visit(path.join(name), active.clone()));
        // Every sibling runs to completion before the first failure, in child
        // order, is reported.
        let mut manifests = self.empty();
        let mut first_err = None;
        for result in join_all(branches).await {
            match result {
                Ok(partial) => {
                    for (into, from) in manifests.iter_mut().zip(partial) {
                        into.extend(from);
                    }
                }
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(manifests),
        }
    }

    async fn file(
        &self,
        path: PathBuf,
        active: Vec<Option<&'a ProcessorSpec>>,
    ) -> Result<Vec<Manifest>> {
        let rel = relative_to_root(self.root, &path)?;
        let active: Vec<Option<&ProcessorSpec>> = active
            .iter()
            .map(|slot| slot.filter(|p| p.includes(&rel, false)))
            .collect();

        if active.iter().all(Option::is_none) {
            debug!(file = %rel, "no processor wants file; skipping");
            return Ok(self.empty());
        }

        let entries = process_file(self.fs, &path, self.root, &active).await?;

        let mut manifests = self.empty();
        for (manifest, entry) in manifests.iter_mut().zip(entries) {
            if let Some(entry) = entry {
                manifest.insert(entry.source, entry.output);
            }
        }
        Ok(manifests)
    }
}
