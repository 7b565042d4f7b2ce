//! CLI configuration file
//!
//! ```toml
//! access_token = "..."
//!
//! [remote]
//! base_url = "http://localhost:8000"
//! timeout_secs = 90
//!
//! [save]
//! quiet_period_ms = 1000
//! ```
//!
//! `WB_API_URL` and `WB_ACCESS_TOKEN` (or the matching flags) override the file,
//! as do `--timeout-secs`, `--quiet-ms` and `--poll-interval-ms`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use wb_core::{IngestConfig, SaveTimings, SyncConfig};
use wb_remote::RemoteConfig;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct CliConfig {
    pub(crate) access_token: Option<String>,
    pub(crate) remote: RemoteConfig,
    #[serde(flatten)]
    pub(crate) sync: SyncConfig,
}

impl CliConfig {
    /// Read the file if one was given, otherwise start from defaults
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub(crate) fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub(crate) fn with_overrides(mut self, api_url: Option<String>, token: Option<String>) -> Self {
        if let Some(url) = api_url {
            self.remote = self.remote.with_base_url(url);
        }
        if token.is_some() {
            self.access_token = token;
        }
        self
    }

    pub(crate) fn with_timeout_secs(mut self, secs: Option<u64>) -> Self {
        if let Some(secs) = secs {
            self.remote = self.remote.with_timeout_secs(secs);
        }
        self
    }

    /// Override the debounce interval, keeping the rest of `[save]`
    pub(crate) fn with_quiet_period_ms(mut self, ms: Option<u64>) -> Self {
        if let Some(quiet_period_ms) = ms {
            let save = SaveTimings {
                quiet_period_ms,
                ..self.sync.save
            };
            self.sync = self.sync.with_save(save);
        }
        self
    }

    /// Override the poll interval, keeping the rest of `[ingest]`
    pub(crate) fn with_poll_interval_ms(mut self, ms: Option<u64>) -> Self {
        if let Some(poll_interval_ms) = ms {
            let ingest = IngestConfig {
                poll_interval_ms,
                ..self.sync.ingest.clone()
            };
            self.sync = self.sync.with_ingest(ingest);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn sections_map_onto_remote_and_sync() {
        let config = CliConfig::parse(
            r#"
            access_token = "tok"

            [remote]
            base_url = "https://boards.example.com"

            [save]
            quiet_period_ms = 400

            [query]
            top_k = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.access_token.as_deref(), Some("tok"));
        assert_eq!(config.remote.base_url, "https://boards.example.com");
        assert_eq!(config.remote.timeout_secs, 90);
        assert_eq!(config.sync.save.quiet_period_ms, 400);
        assert_eq!(config.sync.query.top_k, 8);
        assert_eq!(config.sync.ingest.accepted_extension, "pdf");
    }

    #[test]
    fn overrides_win_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "access_token = \"from-file\"").unwrap();

        let config = CliConfig::load(Some(file.path()))
            .unwrap()
            .with_overrides(Some("http://10.0.0.2:9000/".into()), Some("from-env".into()));
        assert_eq!(config.remote.base_url, "http://10.0.0.2:9000");
        assert_eq!(config.access_token.as_deref(), Some("from-env"));

        let config = CliConfig::default().with_overrides(None, None);
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn flag_overrides_touch_only_their_field() {
        let config = CliConfig::parse(
            r#"
            [save]
            saved_display_ms = 700

            [ingest]
            initial_delay_ms = 10
            "#,
        )
        .unwrap()
        .with_timeout_secs(Some(3))
        .with_quiet_period_ms(Some(150))
        .with_poll_interval_ms(Some(400));

        assert_eq!(config.remote.timeout_secs, 3);
        assert_eq!(config.sync.save.quiet_period_ms, 150);
        assert_eq!(config.sync.save.saved_display_ms, 700);
        assert_eq!(config.sync.ingest.poll_interval_ms, 400);
        assert_eq!(config.sync.ingest.initial_delay_ms, 10);

        let untouched = CliConfig::default()
            .with_timeout_secs(None)
            .with_quiet_period_ms(None)
            .with_poll_interval_ms(None);
        assert_eq!(untouched, CliConfig::default());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = CliConfig::load(Some(Path::new("/nonexistent/wb.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read config"));
    }
}
