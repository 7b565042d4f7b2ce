//! Sync layer configuration
//!
//! Timing constants for the debounced save path and the ingestion poll
//! loop, plus query parameters. All sections have defaults and can be
//! overridden from TOML:
//!
//! ```toml
//! [save]
//! quiet_period_ms = 1000
//! saved_display_ms = 2000
//!
//! [ingest]
//! accepted_extension = "pdf"
//! initial_delay_ms = 1000
//! poll_interval_ms = 2000
//!
//! [query]
//! top_k = 5
//! ```

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Sync layer configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Debounced persistence timings
    pub save: SaveTimings,
    /// Ingestion tracking
    pub ingest: IngestConfig,
    /// Query session
    pub query: QueryConfig,
}

impl SyncConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text; missing keys keep their defaults
    ///
    /// # Errors
    /// - `SyncError::Config` on malformed TOML or wrong value types
    pub fn from_toml_str(text: &str) -> Result<Self, SyncError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// - `SyncError::Config` if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| SyncError::Config(format!("failed to read {}: {err}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// With save timings
    #[inline]
    #[must_use]
    pub fn with_save(mut self, save: SaveTimings) -> Self {
        self.save = save;
        self
    }

    /// With ingestion settings
    #[inline]
    #[must_use]
    pub fn with_ingest(mut self, ingest: IngestConfig) -> Self {
        self.ingest = ingest;
        self
    }
}

/// Debounced persistence timings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveTimings {
    /// Quiet interval after the last edit before a write is dispatched
    pub quiet_period_ms: u64,
    /// How long `Saved` is displayed before reverting to `Idle`
    pub saved_display_ms: u64,
}

impl SaveTimings {
    /// Quiet interval as a duration
    #[inline]
    #[must_use]
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    /// Saved display interval as a duration
    #[inline]
    #[must_use]
    pub fn saved_display(&self) -> Duration {
        Duration::from_millis(self.saved_display_ms)
    }
}

impl Default for SaveTimings {
    fn default() -> Self {
        Self {
            quiet_period_ms: 1000,
            saved_display_ms: 2000,
        }
    }
}

/// Ingestion tracking settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Only files with this extension (no dot) are accepted
    pub accepted_extension: String,
    /// Delay between successful submission and the first poll
    pub initial_delay_ms: u64,
    /// Delay between consecutive polls
    pub poll_interval_ms: u64,
}

impl IngestConfig {
    /// Initial poll delay as a duration
    #[inline]
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Poll interval as a duration
    #[inline]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            accepted_extension: "pdf".to_string(),
            initial_delay_ms: 1000,
            poll_interval_ms: 2000,
        }
    }
}

/// Query session settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Number of context passages requested per question
    pub top_k: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}
