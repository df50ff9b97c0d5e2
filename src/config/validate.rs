// src/config/validate.rs

use std::path::PathBuf;

use crate::config::model::{ConfigFile, ProcessorConfig, RawConfigFile};
use crate::config::patterns::build_globset;
use crate::errors::{PipelineError, Result};

/// Longest content hash a SHA-256 hex digest can provide.
pub const MAX_HASH_LENGTH: usize = 64;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipelineError;

    /// Validate without a base directory; paths stay as written.
    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw, PathBuf::new()))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_processors(cfg)?;
    validate_entry(cfg)?;
    for (index, processor) in cfg.processor.iter().enumerate() {
        validate_processor(index, processor)?;
    }
    Ok(())
}

fn ensure_has_processors(cfg: &RawConfigFile) -> Result<()> {
    if cfg.processor.is_empty() {
        return Err(PipelineError::ConfigError(
            "config must contain at least one [[processor]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_entry(cfg: &RawConfigFile) -> Result<()> {
    if cfg.entry.trim().is_empty() {
        return Err(PipelineError::ConfigError(
            "`entry` must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_processor(index: usize, processor: &ProcessorConfig) -> Result<()> {
    if processor.out_dir.trim().is_empty() {
        return Err(PipelineError::ConfigError(format!(
            "processor #{index}: `out_dir` must not be empty"
        )));
    }

    if !(1..=MAX_HASH_LENGTH).contains(&processor.hash_length) {
        return Err(PipelineError::ConfigError(format!(
            "processor #{index}: `hash_length` must be between 1 and {MAX_HASH_LENGTH} (got {})",
            processor.hash_length
        )));
    }

    build_globset(&processor.include).map_err(|e| {
        PipelineError::ConfigError(format!("processor #{index}: include: {e:#}"))
    })?;
    build_globset(&processor.exclude).map_err(|e| {
        PipelineError::ConfigError(format!("processor #{index}: exclude: {e:#}"))
    })?;

    Ok(())
}
