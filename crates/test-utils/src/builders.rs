#![allow(dead_code)]

use assetpipe::config::{ConfigFile, ConfigSection, ProcessorConfig, RawConfigFile};
use assetpipe::types::{PollSetting, RenameMode};

/// Builder for `RawConfigFile` / `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(entry: &str) -> Self {
        Self {
            config: RawConfigFile {
                entry: entry.to_string(),
                config: ConfigSection::default(),
                processor: Vec::new(),
            },
        }
    }

    pub fn with_processor(mut self, processor: ProcessorConfig) -> Self {
        self.config.processor.push(processor);
        self
    }

    pub fn with_poll(mut self, poll: PollSetting) -> Self {
        self.config.config.poll = Some(poll);
        self
    }

    pub fn with_strict_errors(mut self, strict: bool) -> Self {
        self.config.config.strict_errors = Some(strict);
        self
    }

    pub fn with_manifest(mut self, path: &str) -> Self {
        self.config.config.manifest = Some(path.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

/// Builder for `ProcessorConfig`.
pub struct ProcessorConfigBuilder {
    processor: ProcessorConfig,
}

impl ProcessorConfigBuilder {
    pub fn new(out_dir: &str) -> Self {
        Self {
            processor: ProcessorConfig::new(out_dir),
        }
    }

    pub fn include(mut self, pattern: &str) -> Self {
        self.processor.include.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.processor.exclude.push(pattern.to_string());
        self
    }

    pub fn non_recursive(mut self) -> Self {
        self.processor.recursive = false;
        self
    }

    pub fn content_hash(mut self, length: usize) -> Self {
        self.processor.rename = RenameMode::ContentHash;
        self.processor.hash_length = length;
        self
    }

    pub fn build(self) -> ProcessorConfig {
        self.processor
    }
}
