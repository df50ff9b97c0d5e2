// src/namer.rs

//! Built-in output namers.

use std::path::Path;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::hash::{ContentHasher, Sha256Hasher};
use crate::processor::Rename;

/// Default hash length used by [`ContentHashNamer::default`].
pub const DEFAULT_HASH_LENGTH: usize = 8;

/// Keeps the final segment of the source path.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasenameNamer;

impl Rename for BasenameNamer {
    fn rename<'a>(
        &'a self,
        rel_path: &'a str,
        _contents: &'a [u8],
    ) -> BoxFuture<'a, anyhow::Result<String>> {
        let name = basename(rel_path).to_string();
        Box::pin(async move { Ok(name) })
    }
}

/// Content-addressed names: `{stem}-{HASH}{.ext}`.
///
/// `HASH` is the first `length` hex characters of the digest of the
/// (transformed) contents, uppercased. With the default SHA-256 hasher
/// `a.json` containing `{"hi":"ho"}` becomes `a-DF67FD3A.json`.
#[derive(Debug, Clone)]
pub struct ContentHashNamer {
    length: usize,
    hasher: Arc<dyn ContentHasher>,
}

impl ContentHashNamer {
    pub fn new(length: usize) -> Self {
        Self::with_hasher(length, Arc::new(Sha256Hasher))
    }

    pub fn with_hasher(length: usize, hasher: Arc<dyn ContentHasher>) -> Self {
        Self { length, hasher }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Compute the hashed name for `original_name` synchronously.
    pub fn name(&self, original_name: &str, contents: &[u8]) -> String {
        let digest = self.hasher.hex_digest(contents);
        let hash: String = digest.chars().take(self.length).collect::<String>().to_uppercase();

        let name = basename(original_name);
        let path = Path::new(name);
        match (path.file_stem(), path.extension()) {
            (Some(stem), Some(ext)) => {
                format!("{}-{}.{}", stem.to_string_lossy(), hash, ext.to_string_lossy())
            }
            _ => format!("{name}-{hash}"),
        }
    }
}

impl Default for ContentHashNamer {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_LENGTH)
    }
}

impl Rename for ContentHashNamer {
    fn rename<'a>(
        &'a self,
        rel_path: &'a str,
        contents: &'a [u8],
    ) -> BoxFuture<'a, anyhow::Result<String>> {
        let name = self.name(rel_path, contents);
        Box::pin(async move { Ok(name) })
    }
}

fn basename(rel_path: &str) -> &str {
    rel_path.rsplit('/').next().unwrap_or(rel_path)
}
