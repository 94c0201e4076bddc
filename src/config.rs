use crate::adapters::SourceSpec;
use crate::merge::MatchPolicy;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime configuration, loaded from a JSON file. The path comes
/// from `ODDSMERGE_CONFIG` (dotenv is honored), defaulting to
/// `config/sources.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// The collectors to ingest each cycle.
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Start-time bucket for cross-source event matching, in minutes.
    #[serde(default = "default_match_bucket_minutes")]
    pub match_bucket_minutes: i64,
    /// Bounded wait applied to every query's snapshot read.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// When set, every published snapshot is also written here
    /// (atomically) and reloaded at startup.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_match_bucket_minutes() -> i64 {
    5
}

fn default_read_timeout_ms() -> u64 {
    3000
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            poll_interval_secs: default_poll_interval_secs(),
            match_bucket_minutes: default_match_bucket_minutes(),
            read_timeout_ms: default_read_timeout_ms(),
            bind_addr: default_bind_addr(),
            snapshot_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let path = std::env::var("ODDSMERGE_CONFIG")
            .unwrap_or_else(|_| "config/sources.json".to_string());
        Self::from_file(Path::new(&path))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn match_policy(&self) -> MatchPolicy {
        MatchPolicy {
            bucket_secs: self.match_bucket_minutes * 60,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SourceFormat;

    #[test]
    fn test_parses_sources_and_applies_defaults() {
        let json = r#"{
            "sources": [
                { "id": "oddsfeed", "format": "oddsfeed_json", "path": "data/oddsfeed.json" },
                { "id": "sharpline", "format": "sharpline_csv", "path": "data/sharpline.csv" }
            ],
            "match_bucket_minutes": 10
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].format, SourceFormat::OddsfeedJson);
        assert_eq!(config.match_policy().bucket_secs, 600);
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.read_timeout(), Duration::from_millis(3000));
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert!(config.snapshot_path.is_none());
    }
}
