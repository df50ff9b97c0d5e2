// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{PollSetting, RenameMode};
use crate::namer::DEFAULT_HASH_LENGTH;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// entry = "assets"
///
/// [config]
/// poll = 500
/// strict_errors = false
/// manifest = "dist/manifest.json"
///
/// [[processor]]
/// out_dir = "dist"
/// include = ["**/*.json"]
/// rename = "content-hash"
/// ```
///
/// Not validated; convert into [`ConfigFile`] with `TryFrom`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Source file or directory to compile.
    #[serde(default = "default_entry")]
    pub entry: String,

    /// Global behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All `[[processor]]` sections, in order.
    #[serde(default)]
    pub processor: Vec<ProcessorConfig>,
}

fn default_entry() -> String {
    ".".to_string()
}

/// `[config]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigSection {
    /// `false`, `true` (default interval) or an interval in milliseconds.
    ///
    /// `None` leaves the choice to `ASSETPIPE_USE_POLLING`.
    #[serde(default)]
    pub poll: Option<PollSetting>,

    /// Stop watching on the first error instead of logging it.
    ///
    /// `None` leaves the choice to `CI`.
    #[serde(default)]
    pub strict_errors: Option<bool>,

    /// Where the CLI writes the manifest JSON.
    #[serde(default)]
    pub manifest: Option<String>,
}

/// `[[processor]]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    /// Output root for this processor.
    pub out_dir: String,

    /// Descend into subdirectories of the entry.
    #[serde(default = "default_recursive")]
    pub recursive: bool,

    /// Glob patterns a file must match; empty means every file.
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns excluding files and pruning directories.
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub rename: RenameMode,

    /// Hex characters of the content hash kept by `rename = "content-hash"`.
    #[serde(default = "default_hash_length")]
    pub hash_length: usize,
}

fn default_recursive() -> bool {
    true
}

fn default_hash_length() -> usize {
    DEFAULT_HASH_LENGTH
}

impl ProcessorConfig {
    pub fn new(out_dir: impl Into<String>) -> Self {
        Self {
            out_dir: out_dir.into(),
            recursive: default_recursive(),
            include: Vec::new(),
            exclude: Vec::new(),
            rename: RenameMode::default(),
            hash_length: default_hash_length(),
        }
    }
}

/// A validated configuration.
///
/// Relative paths are resolved against `base_dir`, the directory holding the
/// config file.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    entry: String,
    config: ConfigSection,
    processors: Vec<ProcessorConfig>,
    base_dir: PathBuf,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile, base_dir: PathBuf) -> Self {
        Self {
            entry: raw.entry,
            config: raw.config,
            processors: raw.processor,
            base_dir,
        }
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn processors(&self) -> &[ProcessorConfig] {
        &self.processors
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory relative paths in this config are resolved against.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() || self.base_dir.as_os_str().is_empty() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn entry_path(&self) -> PathBuf {
        self.resolve(&self.entry)
    }

    pub fn manifest_path(&self) -> Option<PathBuf> {
        self.config.manifest.as_ref().map(|m| self.resolve(m))
    }
}
