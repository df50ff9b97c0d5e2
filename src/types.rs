// src/types.rs

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::time::Duration;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

/// Source-relative path → output-relative path, for one processor.
///
/// Unordered: callers must not rely on iteration order.
pub type Manifest = HashMap<String, String>;

/// Result of a compile, and the shape of every watch snapshot.
///
/// A request with exactly one processor yields `Single`; anything else yields
/// `Multiple` in processor order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutput {
    Single(Manifest),
    Multiple(Vec<Manifest>),
}

impl CompileOutput {
    pub fn from_manifests(mut manifests: Vec<Manifest>) -> Self {
        if manifests.len() == 1 {
            CompileOutput::Single(manifests.remove(0))
        } else {
            CompileOutput::Multiple(manifests)
        }
    }

    /// Normalise back to one map per processor.
    pub fn into_manifests(self) -> Vec<Manifest> {
        match self {
            CompileOutput::Single(m) => vec![m],
            CompileOutput::Multiple(ms) => ms,
        }
    }

    /// The single manifest, if this output came from a one-processor request.
    pub fn single(&self) -> Option<&Manifest> {
        match self {
            CompileOutput::Single(m) => Some(m),
            CompileOutput::Multiple(_) => None,
        }
    }

    pub fn manifests(&self) -> &[Manifest] {
        match self {
            CompileOutput::Single(m) => std::slice::from_ref(m),
            CompileOutput::Multiple(ms) => ms,
        }
    }
}

// Keys are sorted on output so the JSON written to disk is stable.
impl Serialize for CompileOutput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CompileOutput::Single(m) => sorted(m).serialize(serializer),
            CompileOutput::Multiple(ms) => {
                let mut seq = serializer.serialize_seq(Some(ms.len()))?;
                for m in ms {
                    seq.serialize_element(&sorted(m))?;
                }
                seq.end()
            }
        }
    }
}

fn sorted(m: &Manifest) -> BTreeMap<&String, &String> {
    m.iter().collect()
}

/// Kind of a filesystem change, in the vocabulary of the event sources.
///
/// - `Renamed`: the path appeared or disappeared (creation, deletion, rename).
/// - `Changed`: the contents of an existing path changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    Renamed,
    Changed,
}

/// A change to one path, relative to the watched root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: String,
}

impl WatchEvent {
    pub fn renamed(path: impl Into<String>) -> Self {
        Self {
            kind: WatchEventKind::Renamed,
            path: path.into(),
        }
    }

    pub fn changed(path: impl Into<String>) -> Self {
        Self {
            kind: WatchEventKind::Changed,
            path: path.into(),
        }
    }
}

/// Interval between two poll snapshots when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Polling switch as written in config (`poll = true` / `poll = 500`) or in
/// `ASSETPIPE_USE_POLLING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PollSetting {
    Enabled(bool),
    IntervalMs(u64),
}

impl PollSetting {
    /// Effective poll interval, or `None` for native notifications.
    ///
    /// An interval of `0` counts as disabled.
    pub fn interval(self) -> Option<Duration> {
        match self {
            PollSetting::Enabled(false) | PollSetting::IntervalMs(0) => None,
            PollSetting::Enabled(true) => Some(DEFAULT_POLL_INTERVAL),
            PollSetting::IntervalMs(ms) => Some(Duration::from_millis(ms)),
        }
    }
}

impl Default for PollSetting {
    fn default() -> Self {
        PollSetting::Enabled(false)
    }
}

impl FromStr for PollSetting {
    type Err = String;

    /// A number is an interval in milliseconds; `false`/`0`/empty disable
    /// polling; anything else enables it with the default interval.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(ms) = s.parse::<u64>() {
            return Ok(PollSetting::IntervalMs(ms));
        }
        match s.to_lowercase().as_str() {
            "" | "false" | "no" | "off" => Ok(PollSetting::Enabled(false)),
            _ => Ok(PollSetting::Enabled(true)),
        }
    }
}

/// Which renamer a configured processor uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenameMode {
    /// Keep the source file name.
    #[default]
    Basename,
    /// `{stem}-{HASH}{.ext}`, see [`crate::namer::ContentHashNamer`].
    ContentHash,
}

impl FromStr for RenameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basename" => Ok(RenameMode::Basename),
            "content-hash" | "content_hash" | "hash" => Ok(RenameMode::ContentHash),
            other => Err(format!(
                "invalid rename mode: {other} (expected \"basename\" or \"content-hash\")"
            )),
        }
    }
}
