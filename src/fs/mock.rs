// src/fs/mock.rs

//! In-memory [`FileSystem`] for tests.
//!
//! Besides storing files and directories it keeps a log of every operation
//! and can be told to fail the next matching operation, which is how the
//! error-path tests drive I/O failures without touching a real disk.

use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{FileStat, FileSystem, FsFuture};
use crate::errors::PipelineError;

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { contents: Vec<u8>, modified: SystemTime },
    Dir { children: BTreeSet<String>, modified: SystemTime },
}

/// Kind of operation recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsOpKind {
    ReadDir,
    Stat,
    Read,
    CreateDir,
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsOp {
    pub kind: FsOpKind,
    pub path: PathBuf,
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    clock: u64,
    ops: Vec<FsOp>,
    failures: Vec<(FsOpKind, PathBuf, String)>,
}

impl MockState {
    fn tick(&mut self) -> SystemTime {
        self.clock += 1;
        UNIX_EPOCH + Duration::from_millis(self.clock)
    }

    fn ensure_dir(&mut self, path: &Path) -> io::Result<()> {
        match self.entries.get(path) {
            Some(MockEntry::Dir { .. }) => return Ok(()),
            Some(MockEntry::File { .. }) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("not a directory: {:?}", path),
                ));
            }
            None => {}
        }

        if let Some(parent) = parent_of(path) {
            self.ensure_dir(&parent)?;
            self.link_child(&parent, path);
        }
        let modified = self.tick();
        self.entries.insert(
            path.to_path_buf(),
            MockEntry::Dir {
                children: BTreeSet::new(),
                modified,
            },
        );
        Ok(())
    }

    fn link_child(&mut self, parent: &Path, child: &Path) {
        if let Some(MockEntry::Dir { children, .. }) = self.entries.get_mut(parent) {
            if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
                children.insert(name.to_string());
            }
        }
    }

    fn record(&mut self, kind: FsOpKind, path: &Path) -> io::Result<()> {
        self.ops.push(FsOp {
            kind,
            path: path.to_path_buf(),
        });
        if let Some(pos) = self
            .failures
            .iter()
            .position(|(k, p, _)| *k == kind && p == path)
        {
            let (_, _, message) = self.failures.remove(pos);
            return Err(io::Error::other(message));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        // Ensure root exists
        fs.add_dir(".");
        fs
    }

    /// Add (or overwrite) a file, creating parent directories as needed.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = normalize(path.as_ref());
        let mut state = self.state.lock().unwrap();
        if let Some(parent) = parent_of(&path) {
            state.ensure_dir(&parent).unwrap();
            state.link_child(&parent, &path);
        }
        let modified = state.tick();
        state.entries.insert(
            path,
            MockEntry::File {
                contents: content.into(),
                modified,
            },
        );
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        self.state.lock().unwrap().ensure_dir(&path).unwrap();
    }

    /// Bump the modification time of an existing entry.
    pub fn touch(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        let mut state = self.state.lock().unwrap();
        let now = state.tick();
        match state.entries.get_mut(&path) {
            Some(MockEntry::File { modified, .. }) | Some(MockEntry::Dir { modified, .. }) => {
                *modified = now;
            }
            None => panic!("touch on missing mock entry {:?}", path),
        }
    }

    /// Remove an entry and everything below it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        let mut state = self.state.lock().unwrap();
        state.entries.retain(|p, _| !p.starts_with(&path));
        if let Some(parent) = parent_of(&path) {
            if let Some(MockEntry::Dir { children, .. }) = state.entries.get_mut(&parent) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    children.remove(name);
                }
            }
        }
    }

    /// Contents of a file, if it exists.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let path = normalize(path.as_ref());
        match self.state.lock().unwrap().entries.get(&path) {
            Some(MockEntry::File { contents, .. }) => Some(contents.clone()),
            _ => None,
        }
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        let path = normalize(path.as_ref());
        self.state.lock().unwrap().entries.contains_key(&path)
    }

    /// Make the next `kind` operation on `path` fail with `message`.
    pub fn fail_next(&self, kind: FsOpKind, path: impl AsRef<Path>, message: &str) {
        let path = normalize(path.as_ref());
        self.state
            .lock()
            .unwrap()
            .failures
            .push((kind, path, message.to_string()));
    }

    /// Every operation performed so far, in call order.
    pub fn ops(&self) -> Vec<FsOp> {
        self.state.lock().unwrap().ops.clone()
    }

    /// Operations of one kind, in call order.
    pub fn ops_of(&self, kind: FsOpKind) -> Vec<PathBuf> {
        self.ops()
            .into_iter()
            .filter(|op| op.kind == kind)
            .map(|op| op.path)
            .collect()
    }

    pub fn clear_ops(&self) {
        self.state.lock().unwrap().ops.clear();
    }

    fn op<T>(
        &self,
        kind: FsOpKind,
        path: &Path,
        f: impl FnOnce(&mut MockState, &Path) -> io::Result<T>,
    ) -> crate::errors::Result<T> {
        let norm = normalize(path);
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        state
            .record(kind, &norm)
            .and_then(|_| f(state, &norm))
            .map_err(|e| PipelineError::io(op_name(kind), path, e))
    }
}

impl FileSystem for MockFileSystem {
    fn read_dir<'a>(&'a self, path: &'a Path) -> FsFuture<'a, Vec<String>> {
        let res = self.op(FsOpKind::ReadDir, path, |state, p| match state.entries.get(p) {
            Some(MockEntry::Dir { children, .. }) => Ok(children.iter().cloned().collect::<Vec<_>>()),
            Some(MockEntry::File { .. }) => Err(io::Error::other(format!("not a directory: {:?}", p))),
            None => Err(not_found(p)),
        });
        Box::pin(async move { res })
    }

    fn stat<'a>(&'a self, path: &'a Path) -> FsFuture<'a, FileStat> {
        let res = self.op(FsOpKind::Stat, path, |state, p| match state.entries.get(p) {
            Some(MockEntry::Dir { modified, .. }) => Ok(FileStat {
                is_dir: true,
                modified: *modified,
            }),
            Some(MockEntry::File { modified, .. }) => Ok(FileStat {
                is_dir: false,
                modified: *modified,
            }),
            None => Err(not_found(p)),
        });
        Box::pin(async move { res })
    }

    fn read<'a>(&'a self, path: &'a Path) -> FsFuture<'a, Vec<u8>> {
        let res = self.op(FsOpKind::Read, path, |state, p| match state.entries.get(p) {
            Some(MockEntry::File { contents, .. }) => Ok(contents.clone()),
            Some(MockEntry::Dir { .. }) => Err(io::Error::other(format!("is a directory: {:?}", p))),
            None => Err(not_found(p)),
        });
        Box::pin(async move { res })
    }

    fn create_dir_all<'a>(&'a self, path: &'a Path) -> FsFuture<'a, ()> {
        let res = self.op(FsOpKind::CreateDir, path, |state, p| state.ensure_dir(p));
        Box::pin(async move { res })
    }

    fn write<'a>(&'a self, path: &'a Path, contents: &'a [u8]) -> FsFuture<'a, ()> {
        let res = self.op(FsOpKind::Write, path, |state, p| {
            // Like a real filesystem, the parent directory has to exist.
            if let Some(parent) = parent_of(p) {
                if !matches!(state.entries.get(&parent), Some(MockEntry::Dir { .. })) {
                    return Err(not_found(&parent));
                }
                state.link_child(&parent, p);
            }
            if let Some(MockEntry::Dir { .. }) = state.entries.get(p) {
                return Err(io::Error::other(format!("is a directory: {:?}", p)));
            }
            let modified = state.tick();
            state.entries.insert(
                p.to_path_buf(),
                MockEntry::File {
                    contents: contents.to_vec(),
                    modified,
                },
            );
            Ok(())
        });
        Box::pin(async move { res })
    }
}

/// Drop `.` components and fold `..` into its parent; the empty path maps
/// to `.`.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir if matches!(out.components().next_back(), Some(Component::Normal(_))) => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}

fn parent_of(path: &Path) -> Option<PathBuf> {
    if path == Path::new(".") {
        return None;
    }
    match path.parent() {
        Some(p) if p.as_os_str().is_empty() => Some(PathBuf::from(".")),
        Some(p) => Some(p.to_path_buf()),
        // Absolute root.
        None => None,
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such entry: {:?}", path))
}

fn op_name(kind: FsOpKind) -> &'static str {
    match kind {
        FsOpKind::ReadDir => "read_dir",
        FsOpKind::Stat => "stat",
        FsOpKind::Read => "read",
        FsOpKind::CreateDir => "create_dir_all",
        FsOpKind::Write => "write",
    }
}
