//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/fanline/config.toml`.
//!
//! Each provider's credential and enabled flag can also be supplied through
//! deployment-time environment variables (`FANLINE_<PROVIDER>_*`); when
//! neither the file nor the environment provides a value, the literal
//! defaults below apply.
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/fanline/` (~/.config/fanline/)
//! - State/Logs: `$XDG_STATE_HOME/fanline/` (~/.local/state/fanline/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Environment override with a literal fallback default.
fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

/// Boolean environment override ("0"/"false"/"off" disable).
fn env_flag_or(var: &str, default: bool) -> bool {
    match std::env::var(var) {
        Ok(value) => !matches!(value.to_ascii_lowercase().as_str(), "0" | "false" | "off"),
        Err(_) => default,
    }
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Per-provider credentials and enable flags
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for one analytics provider.
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderSettings {
    /// Opaque vendor credential (API key, token, account id)
    pub credential: String,

    /// Whether the router should target this provider
    pub enabled: bool,

    /// Override for the vendor endpoint (testing, proxies)
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// One [`ProviderSettings`] block per supported backend.
#[derive(Debug, Deserialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default = "default_amplitude")]
    pub amplitude: ProviderSettings,

    #[serde(default = "default_mixpanel")]
    pub mixpanel: ProviderSettings,

    #[serde(default = "default_blitzllama")]
    pub blitzllama: ProviderSettings,

    #[serde(default = "default_vwo")]
    pub vwo: ProviderSettings,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            amplitude: default_amplitude(),
            mixpanel: default_mixpanel(),
            blitzllama: default_blitzllama(),
            vwo: default_vwo(),
        }
    }
}

fn default_amplitude() -> ProviderSettings {
    ProviderSettings {
        credential: env_or(
            "FANLINE_AMPLITUDE_API_KEY",
            "43f7b07dcb7fcfe58a8091a289990c30",
        ),
        enabled: env_flag_or("FANLINE_AMPLITUDE_ENABLED", true),
        endpoint: None,
    }
}

fn default_mixpanel() -> ProviderSettings {
    ProviderSettings {
        // Placeholder token keeps the adapter in loopback mode
        credential: env_or("FANLINE_MIXPANEL_TOKEN", "YOUR_MIXPANEL_TOKEN"),
        enabled: env_flag_or("FANLINE_MIXPANEL_ENABLED", false),
        endpoint: None,
    }
}

fn default_blitzllama() -> ProviderSettings {
    ProviderSettings {
        credential: env_or("FANLINE_BLITZLLAMA_API_KEY", "key_BJMzppuLgKVPseZ"),
        enabled: env_flag_or("FANLINE_BLITZLLAMA_ENABLED", true),
        endpoint: None,
    }
}

fn default_vwo() -> ProviderSettings {
    ProviderSettings {
        credential: env_or("FANLINE_VWO_ACCOUNT_ID", "3000655"),
        enabled: env_flag_or("FANLINE_VWO_ENABLED", true),
        endpoint: None,
    }
}

impl ProvidersConfig {
    /// Validate provider settings, returning an error message if invalid.
    ///
    /// A disabled provider may carry any credential; an enabled one must
    /// carry something non-empty (placeholders are allowed; the adapter
    /// downgrades itself to loopback mode).
    pub fn validate(&self) -> Result<()> {
        for (name, settings) in [
            ("amplitude", &self.amplitude),
            ("mixpanel", &self.mixpanel),
            ("blitzllama", &self.blitzllama),
            ("vwo", &self.vwo),
        ] {
            if settings.enabled && settings.credential.is_empty() {
                return Err(Error::Config(format!(
                    "providers.{} is enabled but has no credential",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.providers.validate()?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/fanline/config.toml` (~/.config/fanline/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("fanline").join("config.toml")
    }

    /// Returns the state directory path (for logs and the auth session)
    ///
    /// `$XDG_STATE_HOME/fanline/` (~/.local/state/fanline/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("fanline")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/fanline/fanline.log` (~/.local/state/fanline/fanline.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("fanline.log")
    }

    /// Returns the persisted auth session path
    ///
    /// `$XDG_STATE_HOME/fanline/session.json`
    pub fn auth_session_path() -> PathBuf {
        Self::state_dir().join("session.json")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path
    /// behavior before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
