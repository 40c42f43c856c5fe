use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const DEFAULT_API_URL: &str = "http://commitintentdetector.runasp.net/api/Commit/analyze";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_DEBOUNCE_MS: u64 = 1_000;
pub const MAX_DIFF_SIZE: usize = 5 * 1024 * 1024;

const CONFIG_DIR_ENV: &str = "COMMITECT_CONFIG_DIR";
const CONFIG_FILE_NAME: &str = "config.json";

/// Snapshot of the settings one analysis runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_url: String,
    pub timeout_ms: u64,
    pub enabled: bool,
    pub debounce_delay_ms: u64,
    pub show_status_bar: bool,
    pub allow_insecure_ssl: bool,
    pub max_diff_bytes: usize,
    pub clipboard_command: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            enabled: true,
            debounce_delay_ms: DEFAULT_DEBOUNCE_MS,
            show_status_bar: true,
            allow_insecure_ssl: false,
            max_diff_bytes: MAX_DIFF_SIZE,
            clipboard_command: None,
        }
    }
}

/// Settings the classification client needs for one request.
#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    pub api_url: String,
    pub timeout: Duration,
    pub allow_insecure_tls: bool,
}

impl AppConfig {
    pub fn load() -> AppResult<Self> {
        let stored = StoredConfig::load()?;
        Self::resolve(&stored, |key| env::var(key).ok())
    }

    /// Layers defaults, the stored file and environment overrides, in that order.
    pub fn resolve(
        stored: &StoredConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(url) = non_empty(&stored.api_url) {
            config.api_url = url;
        }
        if let Some(timeout) = stored.timeout_ms {
            config.timeout_ms = timeout;
        }
        if let Some(enabled) = stored.enabled {
            config.enabled = enabled;
        }
        if let Some(delay) = stored.debounce_delay_ms {
            config.debounce_delay_ms = delay;
        }
        if let Some(show) = stored.show_status_bar {
            config.show_status_bar = show;
        }
        if let Some(insecure) = stored.allow_insecure_ssl {
            config.allow_insecure_ssl = insecure;
        }
        config.clipboard_command = non_empty(&stored.clipboard_command);

        if let Some(url) = lookup("COMMITECT_API_URL").filter(|v| !v.trim().is_empty()) {
            config.api_url = url.trim().to_string();
        }
        if let Some(raw) = lookup("COMMITECT_TIMEOUT_MS") {
            config.timeout_ms = parse_number("COMMITECT_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("COMMITECT_ENABLED") {
            config.enabled = parse_flag("COMMITECT_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("COMMITECT_DEBOUNCE_MS") {
            config.debounce_delay_ms = parse_number("COMMITECT_DEBOUNCE_MS", &raw)?;
        }
        if let Some(raw) = lookup("COMMITECT_SHOW_STATUS") {
            config.show_status_bar = parse_flag("COMMITECT_SHOW_STATUS", &raw)?;
        }
        if let Some(raw) = lookup("COMMITECT_ALLOW_INSECURE_SSL") {
            config.allow_insecure_ssl = parse_flag("COMMITECT_ALLOW_INSECURE_SSL", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_api_url(mut self, api_url: Option<String>) -> AppResult<Self> {
        if let Some(url) = api_url {
            self.api_url = url.trim().to_string();
            self.validate()?;
        }
        Ok(self)
    }

    pub fn classifier_settings(&self) -> ClassifierSettings {
        ClassifierSettings {
            api_url: self.api_url.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            allow_insecure_tls: self.allow_insecure_ssl,
        }
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }

    fn validate(&self) -> AppResult<()> {
        let lower = self.api_url.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(AppError::Configuration(format!(
                "api url must start with http:// or https://, got '{}'",
                self.api_url
            )));
        }
        if self.timeout_ms == 0 {
            return Err(AppError::Configuration(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// On-disk configuration. Every field is optional so a partial file only
/// overrides what it names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_status_bar: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_insecure_ssl: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clipboard_command: Option<String>,
}

impl StoredConfig {
    pub fn load() -> AppResult<Self> {
        let path = config_file_path()?;
        match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|err| {
                AppError::Configuration(format!("invalid config file {}: {err}", path.display()))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    pub fn save(&self) -> AppResult<()> {
        let path = config_file_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|err| AppError::Configuration(format!("failed to write config: {err}")))?;
        fs::write(&path, data)?;
        Ok(())
    }
}

pub fn config_directory() -> AppResult<PathBuf> {
    if let Some(dir) = env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|dir| dir.join("commitect"))
        .ok_or_else(|| {
            AppError::Configuration("could not determine the user config directory".to_string())
        })
}

pub fn config_file_path() -> AppResult<PathBuf> {
    Ok(config_directory()?.join(CONFIG_FILE_NAME))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_number(key: &str, raw: &str) -> AppResult<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| AppError::Configuration(format!("{key} must be a whole number, got '{raw}'")))
}

fn parse_flag(key: &str, raw: &str) -> AppResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Configuration(format!(
            "{key} must be true or false, got '{raw}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let config = AppConfig::resolve(&StoredConfig::default(), env_of(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.debounce_delay_ms, 1_000);
        assert_eq!(config.max_diff_bytes, 5 * 1024 * 1024);
        assert!(config.enabled);
        assert!(config.show_status_bar);
        assert!(!config.allow_insecure_ssl);
    }

    #[test]
    fn environment_overrides_stored_values() {
        let stored = StoredConfig {
            api_url: Some("http://stored.example/api".to_string()),
            timeout_ms: Some(5_000),
            allow_insecure_ssl: Some(false),
            ..StoredConfig::default()
        };
        let config = AppConfig::resolve(
            &stored,
            env_of(&[
                ("COMMITECT_API_URL", "https://env.example/api"),
                ("COMMITECT_ALLOW_INSECURE_SSL", "yes"),
            ]),
        )
        .unwrap();

        assert_eq!(config.api_url, "https://env.example/api");
        assert_eq!(config.timeout_ms, 5_000);
        assert!(config.allow_insecure_ssl);
    }

    #[test]
    fn rejects_invalid_values() {
        let bad_timeout =
            AppConfig::resolve(&StoredConfig::default(), env_of(&[("COMMITECT_TIMEOUT_MS", "soon")]));
        assert!(matches!(bad_timeout, Err(AppError::Configuration(_))));

        let zero_timeout = AppConfig::resolve(
            &StoredConfig {
                timeout_ms: Some(0),
                ..StoredConfig::default()
            },
            env_of(&[]),
        );
        assert!(matches!(zero_timeout, Err(AppError::Configuration(_))));

        let bad_url = AppConfig::default().with_api_url(Some("ftp://example".to_string()));
        assert!(matches!(bad_url, Err(AppError::Configuration(_))));
    }

    #[test]
    fn stored_config_ignores_missing_fields() {
        let stored: StoredConfig = serde_json::from_str(r#"{"debounce_delay_ms": 250}"#).unwrap();
        let config = AppConfig::resolve(&stored, env_of(&[])).unwrap();
        assert_eq!(config.debounce_delay(), Duration::from_millis(250));
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }
}
