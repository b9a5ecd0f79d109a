//! RosterWatch configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, RosterWatchError};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterWatchConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

impl RosterWatchConfig {
    /// Load config from `ROSTERWATCH_CONFIG` or the default path, falling back to defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var("ROSTERWATCH_CONFIG")
            .map(|p| PathBuf::from(shellexpand::tilde(&p).to_string()))
            .unwrap_or_else(|_| Self::default_path());
        if path.exists() {
            tracing::info!("📄 Loading config from {}", path.display());
            Self::load_from(&path)
        } else {
            tracing::info!("📄 No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RosterWatchError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RosterWatchError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate()
    }

    /// Get the default config path (~/.rosterwatch/config.toml).
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the RosterWatch home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".rosterwatch")
    }
}

/// Admin gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    3100
}

fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Task scheduler tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Minimum gap between ordinary outbound calls.
    #[serde(default = "default_general_delay")]
    pub general_delay_ms: u64,
    /// Minimum gap after full-page parses.
    #[serde(default = "default_heavy_delay")]
    pub heavy_delay_ms: u64,
    /// Pages fetched by the nightly bulk refresh.
    #[serde(default = "default_refresh_pages")]
    pub refresh_pages: u32,
    #[serde(default)]
    pub refresh_detailed: bool,
    /// Register the cron triggers on `init()`.
    #[serde(default = "bool_true")]
    pub triggers_enabled: bool,
}

fn bool_true() -> bool {
    true
}

fn default_max_concurrent() -> usize {
    2
}

fn default_tick_interval() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    3
}

fn default_general_delay() -> u64 {
    2000
}

fn default_heavy_delay() -> u64 {
    30_000
}

fn default_refresh_pages() -> u32 {
    10
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent(),
            tick_interval_ms: default_tick_interval(),
            max_retries: default_max_retries(),
            general_delay_ms: default_general_delay(),
            heavy_delay_ms: default_heavy_delay(),
            refresh_pages: default_refresh_pages(),
            refresh_detailed: false,
            triggers_enabled: true,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_requests == 0 {
            return Err(RosterWatchError::Config(
                "scheduler.max_concurrent_requests must be at least 1".into(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(RosterWatchError::Config(
                "scheduler.tick_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn general_delay(&self) -> Duration {
        Duration::from_millis(self.general_delay_ms)
    }

    pub fn heavy_delay(&self) -> Duration {
        Duration::from_millis(self.heavy_delay_ms)
    }
}

/// Where the host web service's internal API lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000".into()
}

fn default_timeout() -> u64 {
    60
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RosterWatchConfig::default();
        assert_eq!(config.scheduler.max_concurrent_requests, 2);
        assert_eq!(config.scheduler.max_retries, 3);
        assert_eq!(config.scheduler.tick_interval(), Duration::from_secs(5));
        assert_eq!(config.scheduler.general_delay(), Duration::from_secs(2));
        assert_eq!(config.scheduler.heavy_delay(), Duration::from_secs(30));
        assert_eq!(config.gateway.port, 3100);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [scheduler]
            max_concurrent_requests = 4
            heavy_delay_ms = 10000

            [sources]
            base_url = "http://backend:8080"
        "#;

        let config: RosterWatchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scheduler.max_concurrent_requests, 4);
        assert_eq!(config.scheduler.heavy_delay_ms, 10_000);
        assert_eq!(config.scheduler.general_delay_ms, 2000);
        assert_eq!(config.sources.base_url, "http://backend:8080");
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: RosterWatchConfig = toml::from_str("").unwrap();
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert!(config.scheduler.triggers_enabled);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = RosterWatchConfig::default();
        config.scheduler.max_concurrent_requests = 0;
        assert!(matches!(config.validate(), Err(RosterWatchError::Config(_))));
    }

    #[test]
    fn test_zero_tick_interval_rejected() {
        let scheduler = SchedulerConfig {
            tick_interval_ms: 0,
            ..SchedulerConfig::default()
        };
        assert!(matches!(scheduler.validate(), Err(RosterWatchError::Config(_))));
        assert!(SchedulerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_home_dir() {
        let home = RosterWatchConfig::home_dir();
        assert!(home.to_string_lossy().contains("rosterwatch"));
    }
}
