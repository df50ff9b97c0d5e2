// src/config/patterns.rs

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::model::{ConfigFile, ProcessorConfig};
use crate::engine::CompileRequest;
use crate::namer::ContentHashNamer;
use crate::processor::ProcessorSpec;
use crate::types::RenameMode;

/// Compiled include/exclude glob patterns for one processor.
///
/// Paths passed to [`GlobFilter::matches`] are relative to the entry root,
/// with `/` separators (e.g. `"img/logo.svg"`).
#[derive(Clone)]
pub struct GlobFilter {
    include_set: Option<GlobSet>,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for GlobFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobFilter")
            .field("include", &self.include_set.as_ref().map(GlobSet::len))
            .field("exclude", &self.exclude_set.as_ref().map(GlobSet::len))
            .finish()
    }
}

impl GlobFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include_set = if include.is_empty() {
            None
        } else {
            Some(build_globset(include).context("building include globset")?)
        };
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("building exclude globset")?)
        };
        Ok(Self {
            include_set,
            exclude_set,
        })
    }

    /// Directories are kept unless excluded; files must also match an
    /// include pattern when there are any.
    pub fn matches(&self, rel_path: &str, is_dir: bool) -> bool {
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        if is_dir {
            return true;
        }
        match &self.include_set {
            Some(include) => include.is_match(rel_path),
            None => true,
        }
    }

    fn is_empty(&self) -> bool {
        self.include_set.is_none() && self.exclude_set.is_none()
    }
}

impl ProcessorConfig {
    /// Build the runtime processor, resolving `out_dir` against `cfg`.
    pub fn to_spec(&self, cfg: &ConfigFile) -> Result<ProcessorSpec> {
        let filter = GlobFilter::new(&self.include, &self.exclude)
            .with_context(|| format!("processor with out_dir {}", self.out_dir))?;

        let mut spec = ProcessorSpec::new(cfg.resolve(&self.out_dir)).recursive(self.recursive);
        if !filter.is_empty() {
            spec = spec.include(move |rel, is_dir| filter.matches(rel, is_dir));
        }
        if self.rename == RenameMode::ContentHash {
            spec = spec.rename_with(ContentHashNamer::new(self.hash_length));
        }
        Ok(spec)
    }
}

/// Build the compile request described by `cfg`.
///
/// `entry` overrides the configured entry (e.g. `--entry` on the CLI).
pub fn build_compile_request(cfg: &ConfigFile, entry: Option<&Path>) -> Result<CompileRequest> {
    let processors = cfg
        .processors()
        .iter()
        .map(|p| p.to_spec(cfg))
        .collect::<Result<Vec<_>>>()?;

    let entry = match entry {
        Some(entry) => entry.to_path_buf(),
        None => cfg.entry_path(),
    };
    Ok(CompileRequest::new(entry, processors))
}

/// Build a GlobSet from simple string patterns.
pub(crate) fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
