//! Configuration for the extraction pipeline

use crate::error::ExtractorError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How attribute keys present on both sides of a merge are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttributeConflictPolicy {
    /// The value from the later pass (or later chunk in the same pass) wins
    #[default]
    LaterPassWins,
    /// The value already held by the kept extraction wins
    EarlierPassWins,
}

/// Duplicate detection settings for the aggregator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Two same-class spans are duplicates when their shared characters,
    /// divided by the shorter span's length, exceed this value.
    /// `0.0` treats any overlap as a duplicate.
    #[serde(default)]
    pub overlap_threshold: f64,

    /// Attribute merge policy
    #[serde(default)]
    pub attribute_conflict: AttributeConflictPolicy,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.0,
            attribute_conflict: AttributeConflictPolicy::LaterPassWins,
        }
    }
}

/// Configuration for the extraction pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum chunk size (characters)
    pub max_char_buffer: usize,

    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,

    /// Maximum number of in-flight model calls
    pub max_workers: usize,

    /// Number of independent passes over the document
    pub extraction_passes: usize,

    /// Retries per work item after a transient failure
    pub retry_limit: usize,

    /// Base delay for exponential backoff between retries (milliseconds)
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Maximum time for a single model call (seconds)
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Duplicate detection
    #[serde(default)]
    pub dedup: DedupConfig,
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_call_timeout_secs() -> u64 {
    120
}

impl PipelineConfig {
    /// Get the call timeout as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ExtractorError> {
        if self.max_char_buffer == 0 {
            return Err(ExtractorError::Config(
                "max_char_buffer must be greater than 0".to_string(),
            ));
        }
        if self.chunk_overlap >= self.max_char_buffer {
            return Err(ExtractorError::Config(format!(
                "chunk_overlap ({}) must be smaller than max_char_buffer ({})",
                self.chunk_overlap, self.max_char_buffer
            )));
        }
        if self.max_workers == 0 {
            return Err(ExtractorError::Config(
                "max_workers must be greater than 0".to_string(),
            ));
        }
        if self.extraction_passes == 0 {
            return Err(ExtractorError::Config(
                "extraction_passes must be at least 1".to_string(),
            ));
        }
        if self.call_timeout_secs == 0 {
            return Err(ExtractorError::Config(
                "call_timeout_secs must be greater than 0".to_string(),
            ));
        }
        let threshold = self.dedup.overlap_threshold;
        if !(0.0..1.0).contains(&threshold) {
            return Err(ExtractorError::Config(format!(
                "dedup.overlap_threshold must be in [0, 1), got {}",
                threshold
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            max_char_buffer: 1_000,
            chunk_overlap: 100,
            max_workers: 10,
            extraction_passes: 1,
            retry_limit: 2,
            retry_base_delay_ms: default_retry_base_delay_ms(),
            call_timeout_secs: default_call_timeout_secs(),
            dedup: DedupConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Conservative preset: few workers and larger chunks to stay under rate limits
    pub fn conservative() -> Self {
        Self {
            max_char_buffer: 2_000,
            chunk_overlap: 200,
            max_workers: 2,
            extraction_passes: 1,
            retry_limit: 3,
            retry_base_delay_ms: 1_000,
            call_timeout_secs: 300,
            dedup: DedupConfig::default(),
        }
    }

    /// Thorough preset: several passes over smaller chunks for better recall
    pub fn thorough() -> Self {
        Self {
            max_char_buffer: 800,
            chunk_overlap: 150,
            max_workers: 10,
            extraction_passes: 3,
            retry_limit: 2,
            retry_base_delay_ms: default_retry_base_delay_ms(),
            call_timeout_secs: default_call_timeout_secs(),
            dedup: DedupConfig::default(),
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ExtractorError> {
        toml::from_str(toml_str)
            .map_err(|e| ExtractorError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ExtractorError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ExtractorError> {
        toml::to_string_pretty(self)
            .map_err(|e| ExtractorError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}
