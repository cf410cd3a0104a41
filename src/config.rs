use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::workflow::ContactLayout;

/// Deployment configuration for a kiosk
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct KioskEngineConfig {
    /// Kiosk behaviour
    pub kiosk: KioskConfig,
    /// Completion side effects
    pub completion: CompletionConfig,
    /// Catalog persistence
    pub storage: StorageConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct KioskConfig {
    /// Inactivity after which a session is cancelled
    pub idle_timeout_seconds: u64,
    /// How often the idle watchdog checks
    pub idle_poll_millis: u64,
    pub contact_layout: ContactLayout,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            idle_timeout_seconds: 90,
            idle_poll_millis: 1000,
            contact_layout: ContactLayout::SingleScreen,
        }
    }
}

impl KioskConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_millis.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Upper bound for each of photo, badge and notification
    pub side_effect_timeout_ms: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            side_effect_timeout_ms: 10_000,
        }
    }
}

impl CompletionConfig {
    pub fn side_effect_timeout(&self) -> Duration {
        Duration::from_millis(self.side_effect_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding buttons and workflows
    pub catalog_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(".kiosk-checkin/catalog.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,
    /// Structured JSON lines instead of the compact format
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl KioskEngineConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (kiosk-checkin.toml)
    /// 3. Environment variables (prefixed with KIOSK_CHECKIN, `__` between sections)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("kiosk-checkin.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut builder = Config::builder();

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("KIOSK_CHECKIN")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<KioskEngineConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = KioskEngineConfig::load_env_file();
        KioskEngineConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static KioskEngineConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<&'static KioskEngineConfig> {
    let config = config()?;
    tracing::debug!("Configuration loaded successfully");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KioskEngineConfig::default();
        assert_eq!(config.kiosk.idle_timeout(), Duration::from_secs(90));
        assert_eq!(config.kiosk.contact_layout, ContactLayout::SingleScreen);
        assert_eq!(config.completion.side_effect_timeout(), Duration::from_secs(10));
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_file_overrides_defaults_and_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("kiosk-checkin.toml");
        std::fs::write(
            &path,
            "[kiosk]\nidle_timeout_seconds = 30\ncontact_layout = \"one_field_per_screen\"\n",
        )
        .unwrap();

        let loaded = KioskEngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded.kiosk.idle_timeout_seconds, 30);
        assert_eq!(loaded.kiosk.contact_layout, ContactLayout::OneFieldPerScreen);
        assert_eq!(loaded.kiosk.idle_poll_millis, 1000);
        assert_eq!(loaded.completion, CompletionConfig::default());

        let saved = dir.path().join("saved.toml");
        loaded.save_to_file(&saved).unwrap();
        assert_eq!(KioskEngineConfig::load_from(&saved).unwrap(), loaded);
    }
}
