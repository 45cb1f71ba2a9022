//! Application configuration.
//!
//! Layering, lowest to highest precedence: defaults, `budget-eagle.toml`,
//! `BUDGET_EAGLE_*` environment variables. The result is validated once.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub use budget_eagle_observability::{LogFormat, LoggingConfig};

const DEFAULT_CONFIG_FILE: &str = "budget-eagle.toml";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub notifications: NotificationConfig,
    pub logging: LoggingConfig,
}

/// How notification sends relate to the operation that triggered them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Spawned onto the runtime; the operation returns without waiting.
    #[default]
    Detached,
    /// Awaited before the operation returns. Failures are still swallowed.
    Inline,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationConfig {
    pub delivery: DeliveryMode,
    /// Reviewer used when the directory has no managers.
    pub fallback_reviewer_email: String,
    pub fallback_reviewer_name: String,
    /// Email function URL. Without one, notifications are only logged.
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            delivery: DeliveryMode::Detached,
            fallback_reviewer_email: "managerlogin2025@gmail.com".to_string(),
            fallback_reviewer_name: "Vikram Singh".to_string(),
            endpoint: None,
            api_key: None,
        }
    }
}

impl std::str::FromStr for DeliveryMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "detached" => Ok(Self::Detached),
            "inline" => Ok(Self::Inline),
            other => Err(ConfigError::Validation(format!(
                "unsupported notification delivery `{other}` (expected detached|inline)"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    notifications: Option<NotificationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NotificationPatch {
    delivery: Option<DeliveryMode>,
    fallback_reviewer_email: Option<String>,
    fallback_reviewer_name: Option<String>,
    endpoint: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = resolve_config_path(options.config_path.as_deref()) {
            config.apply_patch(read_patch(&path)?);
        } else if options.require_file {
            let expected = options
                .config_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document on top of the defaults (no env, no file lookup).
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let patch = toml::from_str::<ConfigPatch>(raw).map_err(|source| ConfigError::ParseFile {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        let mut config = Self::default();
        config.apply_patch(patch);
        config.validate()?;
        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(n) = patch.notifications {
            if let Some(delivery) = n.delivery {
                self.notifications.delivery = delivery;
            }
            if let Some(email) = n.fallback_reviewer_email {
                self.notifications.fallback_reviewer_email = email;
            }
            if let Some(name) = n.fallback_reviewer_name {
                self.notifications.fallback_reviewer_name = name;
            }
            if let Some(endpoint) = n.endpoint {
                self.notifications.endpoint = Some(endpoint);
            }
            if let Some(api_key) = n.api_key {
                self.notifications.api_key = Some(api_key);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(read_env)
    }

    /// Shared by the real environment and tests, which pass a map lookup.
    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup("BUDGET_EAGLE_NOTIFICATIONS_DELIVERY") {
            self.notifications.delivery = value.parse()?;
        }
        if let Some(value) = lookup("BUDGET_EAGLE_FALLBACK_REVIEWER_EMAIL") {
            self.notifications.fallback_reviewer_email = value;
        }
        if let Some(value) = lookup("BUDGET_EAGLE_FALLBACK_REVIEWER_NAME") {
            self.notifications.fallback_reviewer_name = value;
        }
        if let Some(value) = lookup("BUDGET_EAGLE_EMAIL_ENDPOINT") {
            self.notifications.endpoint = Some(value);
        }
        if let Some(value) = lookup("BUDGET_EAGLE_EMAIL_API_KEY") {
            self.notifications.api_key = Some(value);
        }
        if let Some(value) = lookup("BUDGET_EAGLE_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = lookup("BUDGET_EAGLE_LOG_FORMAT") {
            self.logging.format = value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "BUDGET_EAGLE_LOG_FORMAT".to_string(),
                value,
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_notifications(&self.notifications)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [
        PathBuf::from(DEFAULT_CONFIG_FILE),
        PathBuf::from("config").join(DEFAULT_CONFIG_FILE),
    ]
    .into_iter()
    .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<ConfigPatch>(&raw).map_err(|source| ConfigError::ParseFile {
        path: path.to_path_buf(),
        source,
    })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn validate_notifications(n: &NotificationConfig) -> Result<(), ConfigError> {
    if !n.fallback_reviewer_email.contains('@') {
        return Err(ConfigError::Validation(
            "notifications.fallback_reviewer_email must be an email address".to_string(),
        ));
    }
    if n.fallback_reviewer_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "notifications.fallback_reviewer_name cannot be empty".to_string(),
        ));
    }
    if let Some(endpoint) = &n.endpoint {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Validation(
                "notifications.endpoint must be an http(s) URL".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    if logging.level.trim().is_empty() {
        return Err(ConfigError::Validation("logging.level cannot be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.notifications.delivery, DeliveryMode::Detached);
        assert_eq!(config.notifications.fallback_reviewer_name, "Vikram Singh");
        assert!(config.notifications.endpoint.is_none());
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [notifications]
            delivery = "inline"
            endpoint = "https://example.supabase.co/functions/v1/send-email"

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.notifications.delivery, DeliveryMode::Inline);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.notifications.fallback_reviewer_name, "Vikram Singh");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = AppConfig::from_toml_str("[notifications]\nretries = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseFile { .. }));
    }

    #[test]
    fn invalid_endpoint_fails_validation() {
        let err = AppConfig::from_toml_str("[notifications]\nendpoint = \"ftp://x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BUDGET_EAGLE_NOTIFICATIONS_DELIVERY", "inline"),
            ("BUDGET_EAGLE_FALLBACK_REVIEWER_EMAIL", "ops@example.com"),
            ("BUDGET_EAGLE_LOG_FORMAT", "json"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.notifications.delivery, DeliveryMode::Inline);
        assert_eq!(config.notifications.fallback_reviewer_email, "ops@example.com");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn bad_env_value_is_reported() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(|key| (key == "BUDGET_EAGLE_LOG_FORMAT").then(|| "pretty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvOverride { .. }));
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let err = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/budget-eagle.toml")),
            require_file: true,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingConfigFile(_)));
    }
}
