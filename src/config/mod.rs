// src/config/mod.rs

//! Configuration loading and validation for assetpipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it into a [`ConfigFile`] (`validate.rs`).
//! - Turn processor sections into runtime [`crate::processor::ProcessorSpec`]s
//!   (`patterns.rs`).
//! - Read the environment overrides used at the CLI boundary (`env.rs`).

pub mod env;
pub mod loader;
pub mod model;
pub mod patterns;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, ProcessorConfig, RawConfigFile};
pub use patterns::GlobFilter;
