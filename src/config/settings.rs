//! Configuration settings for mecal.
//!
//! Settings are loaded from `~/.mecal/config.yaml` and then overlaid with
//! environment variables.

use serde::{Deserialize, Serialize};

use crate::cli::args::OutputFormat;
use crate::error::MecalError;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,
    /// Managed backend connection.
    pub backend: BackendConfig,
    /// Acting user.
    pub auth: AuthConfig,
    /// Sync queue behaviour.
    pub sync: SyncConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default output format.
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    /// Color output setting.
    #[serde(default = "default_color")]
    pub color: ColorSetting,
}

/// Color output setting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColorSetting {
    /// Auto-detect based on terminal.
    #[default]
    Auto,
    /// Always use colors.
    Always,
    /// Never use colors.
    Never,
}

/// Managed backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend, e.g. `https://xyz.supabase.co`.
    pub url: Option<String>,
    /// Service-role key. Bypasses row-level security.
    pub service_key: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Acting user settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Access token of the acting user. Without one, requests run unscoped.
    pub access_token: Option<String>,
}

/// Sync queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Drain the queue right after enqueueing.
    #[serde(default = "default_true")]
    pub auto_sync: bool,
    /// Park an operation as failed after this many attempts. Unset retries forever.
    pub max_attempts: Option<u32>,
    /// Stop a sync run at the first failure.
    pub stop_on_error: bool,
}

/// Keep the first four characters of a secret.
fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}****")
}

const fn default_output_format() -> OutputFormat {
    OutputFormat::Pretty
}

const fn default_color() -> ColorSetting {
    ColorSetting::Auto
}

const fn default_timeout() -> u64 {
    15
}

const fn default_true() -> bool {
    true
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: default_output_format(),
            color: default_color(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            service_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: default_true(),
            max_attempts: None,
            stop_on_error: false,
        }
    }
}

impl BackendConfig {
    /// Get the base URL and service key, both required to talk to the backend.
    ///
    /// # Errors
    ///
    /// Returns `MecalError::Misconfigured` if either is missing.
    pub fn credentials(&self) -> Result<(&str, &str), MecalError> {
        let url = self.url.as_deref().filter(|s| !s.trim().is_empty());
        let key = self.service_key.as_deref().filter(|s| !s.trim().is_empty());

        match (url, key) {
            (Some(url), Some(key)) => Ok((url, key)),
            _ => Err(MecalError::Misconfigured(
                "missing backend url or service key. Set MECAL_BACKEND_URL and \
                 MECAL_SERVICE_KEY, or backend.url and backend.service_key in config.yaml"
                    .to_string(),
            )),
        }
    }
}

impl Config {
    /// Load configuration from a specific path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, MecalError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            MecalError::Config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            MecalError::Config(format!(
                "Failed to parse config file {}: {e}",
                path.display()
            ))
        })
    }

    /// Overlay environment variables looked up through `lookup`.
    #[must_use]
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| lookup(k).filter(|v| !v.trim().is_empty()))
        };

        if let Some(url) = first(&["MECAL_BACKEND_URL", "SUPABASE_URL"]) {
            self.backend.url = Some(url);
        }
        if let Some(key) = first(&["MECAL_SERVICE_KEY", "SUPABASE_SERVICE_ROLE_KEY"]) {
            self.backend.service_key = Some(key);
        }
        if let Some(token) = first(&["MECAL_ACCESS_TOKEN"]) {
            self.auth.access_token = Some(token);
        }
        self
    }

    /// Copy of the configuration with secrets masked for display.
    #[must_use]
    pub fn masked(&self) -> Self {
        let mut config = self.clone();
        config.backend.service_key = config.backend.service_key.as_deref().map(mask);
        config.auth.access_token = config.auth.access_token.as_deref().map(mask);
        config
    }

    /// Save configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<(), MecalError> {
        let contents = serde_yaml::to_string(self)
            .map_err(|e| MecalError::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, contents).map_err(|e| {
            MecalError::Config(format!(
                "Failed to write config file {}: {e}",
                path.display()
            ))
        })
    }
}
