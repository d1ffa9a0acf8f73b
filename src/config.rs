use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::blockchain::MonitorConfig;
use crate::error::ConfigError;
use crate::models::WatchedWallet;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub monitor: MonitorSection,
    #[serde(default)]
    pub watermark: WatermarkSection,
    #[serde(default)]
    pub telegram: Option<TelegramSection>,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// The watch-list: an explicit, validated set of wallets.
    #[serde(default)]
    pub wallets: Vec<WalletEntry>,
}

/// RPC provider endpoints and query parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Primary RPC endpoint URL. Mandatory.
    pub primary_url: String,
    /// Optional secondary endpoint used after failover.
    pub secondary_url: Option<String>,
    /// Commitment level fixed for all queries.
    pub commitment: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

/// Monitor loop timing and concurrency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSection {
    /// Minimum poll sleep in milliseconds.
    pub poll_min_ms: u64,
    /// Maximum poll sleep in milliseconds.
    pub poll_max_ms: u64,
    /// Concurrent block fetches per batch.
    pub fetch_concurrency: usize,
    /// Sleep after a transient provider failure in milliseconds.
    pub failure_backoff_ms: u64,
}

/// Watermark persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkSection {
    /// Path of the JSON watermark file.
    pub path: String,
}

/// Telegram bot credentials. When absent, alerts only hit the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramSection {
    pub bot_token: String,
    pub chat_id: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

/// One watch-list entry as configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletEntry {
    pub label: String,
    pub address: String,
    /// Range specification, e.g. `"17-21,50-100"`.
    pub ranges: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            primary_url: String::new(),
            secondary_url: None,
            commitment: "finalized".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            poll_min_ms: 400,
            poll_max_ms: 800,
            fetch_concurrency: 16,
            failure_backoff_ms: 5000,
        }
    }
}

impl Default for WatermarkSection {
    fn default() -> Self {
        Self {
            path: "./watermark.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl MonitorSection {
    pub fn to_monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            poll_min_ms: self.poll_min_ms,
            poll_max_ms: self.poll_max_ms,
            fetch_concurrency: self.fetch_concurrency,
            failure_backoff_ms: self.failure_backoff_ms,
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables.
    /// Environment variables take precedence over file values.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file. A missing default file falls
    /// back to defaults; an explicitly named file must exist.
    pub fn load_from_file(path: Option<&str>) -> Result<Self, ConfigError> {
        let explicit = path.is_some();
        let config_path = path
            .map(|p| p.to_string())
            .or_else(|| env::var("CONFIG_FILE").ok())
            .unwrap_or_else(|| "monitor.toml".to_string());

        if !Path::new(&config_path).exists() {
            if explicit {
                return Err(ConfigError::FileNotFound(config_path));
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ConfigError::FileNotFound(config_path.clone()))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parsing(e.to_string()))
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var("SOLANA_RPC_URL") {
            self.provider.primary_url = url;
        }
        if let Ok(url) = env::var("SOLANA_RPC_URL_SECONDARY") {
            self.provider.secondary_url = Some(url);
        }
        if let Ok(commitment) = env::var("SOLANA_COMMITMENT") {
            self.provider.commitment = commitment;
        }
        if let Ok(timeout) = env::var("RPC_TIMEOUT_SECONDS") {
            self.provider.timeout_seconds = parse_env("RPC_TIMEOUT_SECONDS", timeout)?;
        }

        if let Ok(min) = env::var("POLL_MIN_MS") {
            self.monitor.poll_min_ms = parse_env("POLL_MIN_MS", min)?;
        }
        if let Ok(max) = env::var("POLL_MAX_MS") {
            self.monitor.poll_max_ms = parse_env("POLL_MAX_MS", max)?;
        }
        if let Ok(concurrency) = env::var("FETCH_CONCURRENCY") {
            self.monitor.fetch_concurrency = parse_env("FETCH_CONCURRENCY", concurrency)?;
        }
        if let Ok(backoff) = env::var("FAILURE_BACKOFF_MS") {
            self.monitor.failure_backoff_ms = parse_env("FAILURE_BACKOFF_MS", backoff)?;
        }

        if let Ok(path) = env::var("WATERMARK_PATH") {
            self.watermark.path = path;
        }

        if let (Ok(bot_token), Ok(chat_id)) =
            (env::var("TELEGRAM_BOT_TOKEN"), env::var("TELEGRAM_CHAT_ID"))
        {
            self.telegram = Some(TelegramSection { bot_token, chat_id });
        }

        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration values. Any error here is fatal at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.primary_url.trim().is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }

        for url in std::iter::once(&self.provider.primary_url)
            .chain(self.provider.secondary_url.iter())
        {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidValue {
                    key: "provider url".to_string(),
                    value: url.clone(),
                });
            }
        }

        let valid_commitments = ["processed", "confirmed", "finalized"];
        if !valid_commitments.contains(&self.provider.commitment.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "provider.commitment".to_string(),
                value: self.provider.commitment.clone(),
            });
        }

        if self.provider.timeout_seconds == 0 || self.provider.timeout_seconds > 300 {
            return Err(ConfigError::InvalidValue {
                key: "provider.timeout_seconds".to_string(),
                value: self.provider.timeout_seconds.to_string(),
            });
        }

        if self.monitor.poll_min_ms == 0 || self.monitor.poll_min_ms > self.monitor.poll_max_ms {
            return Err(ConfigError::InvalidValue {
                key: "monitor.poll_min_ms".to_string(),
                value: self.monitor.poll_min_ms.to_string(),
            });
        }

        if self.monitor.fetch_concurrency == 0 || self.monitor.fetch_concurrency > 256 {
            return Err(ConfigError::InvalidValue {
                key: "monitor.fetch_concurrency".to_string(),
                value: self.monitor.fetch_concurrency.to_string(),
            });
        }

        if self.watermark.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "watermark.path".to_string(),
                value: self.watermark.path.clone(),
            });
        }

        // Duplicate addresses would double-alert; reject outright rather
        // than silently allowing them.
        let mut seen = std::collections::HashSet::new();
        for wallet in &self.wallets {
            if !seen.insert(wallet.address.as_str()) {
                return Err(ConfigError::DuplicateWallet(wallet.address.clone()));
            }
        }

        Ok(())
    }

    /// Materialize the watch-list. Range parsing degrades silently per
    /// wallet, so this cannot fail.
    pub fn watched_wallets(&self) -> Vec<WatchedWallet> {
        self.wallets
            .iter()
            .map(|entry| WatchedWallet::new(entry.label.clone(), entry.address.clone(), &entry.ranges))
            .collect()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.provider.primary_url = "https://api.mainnet-beta.solana.com".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider.commitment, "finalized");
        assert_eq!(config.monitor.poll_min_ms, 400);
        assert_eq!(config.monitor.poll_max_ms, 800);
        assert_eq!(config.monitor.fetch_concurrency, 16);
        assert_eq!(config.watermark.path, "./watermark.json");
        assert_eq!(config.logging.level, "info");
        assert!(config.telegram.is_none());
        assert!(config.wallets.is_empty());
    }

    #[test]
    fn test_validate_requires_primary_endpoint() {
        let config = AppConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingEndpoint)
        ));

        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = valid_config();
        config.provider.commitment = "eventual".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.monitor.poll_min_ms = 900; // above poll_max_ms
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.monitor.fetch_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.provider.primary_url = "not-a-url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_wallets() {
        let mut config = valid_config();
        config.wallets = vec![
            WalletEntry {
                label: "OKX".to_string(),
                address: "ACC1".to_string(),
                ranges: "17-21".to_string(),
            },
            WalletEntry {
                label: "OKX-2".to_string(),
                address: "ACC1".to_string(),
                ranges: "1-2".to_string(),
            },
        ];

        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateWallet(addr)) if addr == "ACC1"
        ));
    }

    #[test]
    fn test_config_file_loading() {
        let config_content = r#"
[provider]
primary_url = "https://rpc.example.com"
secondary_url = "https://fallback.example.com"
commitment = "confirmed"
timeout_seconds = 20

[monitor]
poll_min_ms = 250
poll_max_ms = 500
fetch_concurrency = 8
failure_backoff_ms = 3000

[watermark]
path = "/tmp/wm.json"

[telegram]
bot_token = "token"
chat_id = "-100123"

[logging]
level = "debug"

[[wallets]]
label = "OKX"
address = "ACC1"
ranges = "17-21,50-100"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(config_content.as_bytes()).unwrap();

        let config = AppConfig::load_from_file(temp_file.path().to_str()).unwrap();

        assert_eq!(config.provider.primary_url, "https://rpc.example.com");
        assert_eq!(
            config.provider.secondary_url.as_deref(),
            Some("https://fallback.example.com")
        );
        assert_eq!(config.provider.commitment, "confirmed");
        assert_eq!(config.monitor.poll_min_ms, 250);
        assert_eq!(config.monitor.fetch_concurrency, 8);
        assert_eq!(config.watermark.path, "/tmp/wm.json");
        assert_eq!(config.telegram.as_ref().unwrap().chat_id, "-100123");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.wallets.len(), 1);
        assert_eq!(config.wallets[0].label, "OKX");

        let wallets = config.watched_wallets();
        assert_eq!(wallets[0].ranges.len(), 2);
        assert!(wallets[0].matches(19.5));
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[provider]\nprimary_url = \"https://rpc.example.com\"\nsecondary_url = \"https://b.example.com\"\ncommitment = \"finalized\"\ntimeout_seconds = 30\n")
            .unwrap();

        let config = AppConfig::load_from_file(temp_file.path().to_str()).unwrap();
        assert_eq!(config.monitor.fetch_concurrency, 16);
        assert!(config.wallets.is_empty());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let result = AppConfig::load_from_file(Some("/nonexistent/monitor.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        env::set_var("SOLANA_RPC_URL", "https://env-rpc.example.com");
        env::set_var("POLL_MIN_MS", "100");
        env::set_var("POLL_MAX_MS", "200");
        env::set_var("WATERMARK_PATH", "/tmp/env-wm.json");
        env::set_var("LOG_LEVEL", "trace");

        let mut config = AppConfig::default();
        config.apply_env_overrides().unwrap();

        assert_eq!(config.provider.primary_url, "https://env-rpc.example.com");
        assert_eq!(config.monitor.poll_min_ms, 100);
        assert_eq!(config.monitor.poll_max_ms, 200);
        assert_eq!(config.watermark.path, "/tmp/env-wm.json");
        assert_eq!(config.logging.level, "trace");

        env::remove_var("SOLANA_RPC_URL");
        env::remove_var("POLL_MIN_MS");
        env::remove_var("POLL_MAX_MS");
        env::remove_var("WATERMARK_PATH");
        env::remove_var("LOG_LEVEL");
    }

    #[test]
    #[serial]
    fn test_invalid_env_value() {
        env::set_var("FETCH_CONCURRENCY", "many");

        let mut config = AppConfig::default();
        let result = config.apply_env_overrides();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        env::remove_var("FETCH_CONCURRENCY");
    }

    #[test]
    #[serial]
    fn test_telegram_env_requires_both_vars() {
        env::set_var("TELEGRAM_BOT_TOKEN", "token-only");
        env::remove_var("TELEGRAM_CHAT_ID");

        let mut config = AppConfig::default();
        config.apply_env_overrides().unwrap();
        assert!(config.telegram.is_none());

        env::remove_var("TELEGRAM_BOT_TOKEN");
    }
}
