use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Prefix for environment overrides, e.g. `RAINCHECK__CHAT__NICK`.
const ENV_PREFIX: &str = "RAINCHECK";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// All errors joined into a single line
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat connection settings
    #[serde(default)]
    pub chat: ChatConfig,

    /// Geocoding and weather API settings
    #[serde(default)]
    pub providers: ProviderConfig,

    /// Anti-spam cooldowns
    #[serde(default)]
    pub throttle: ThrottleConfig,

    /// Outbound message queue
    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Websocket endpoint of the chat server
    #[serde(default = "default_chat_address")]
    pub address: String,

    /// Session token, sent as the `jwt` cookie when connecting
    pub auth_token: String,

    /// The bot's own nick; public messages starting with it are requests
    pub nick: String,
}

fn default_chat_address() -> String {
    "wss://chat.strims.gg/ws".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            address: default_chat_address(),
            auth_token: "YOUR_CHAT_AUTH_TOKEN".to_string(),
            nick: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// OpenWeatherMap API key
    pub weather_api_key: String,

    /// LocationIQ API key
    pub geo_api_key: String,

    /// Upper bound on a single geocoding or weather call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            weather_api_key: "YOUR_WEATHER_API_KEY".to_string(),
            geo_api_key: "YOUR_GEO_API_KEY".to_string(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Minimum gap between any two public replies
    #[serde(default = "default_global_cooldown_secs")]
    pub global_cooldown_secs: u64,

    /// Minimum gap between two public replies to the same sender
    #[serde(default = "default_sender_cooldown_secs")]
    pub sender_cooldown_secs: u64,

    /// Nick exempt from the per-sender cooldown (matched case-insensitively)
    #[serde(default)]
    pub exempt_sender: Option<String>,
}

fn default_global_cooldown_secs() -> u64 {
    10
}

fn default_sender_cooldown_secs() -> u64 {
    60
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_cooldown_secs: default_global_cooldown_secs(),
            sender_cooldown_secs: default_sender_cooldown_secs(),
            exempt_sender: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Replies buffered before producers wait
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Pause after every send
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,
}

fn default_queue_capacity() -> usize {
    100
}

fn default_send_interval_ms() -> u64 {
    450
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            send_interval_ms: default_send_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// File that log lines are appended to, in addition to stdout
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("log.txt"))
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: default_log_file(),
        }
    }
}

impl Config {
    /// Default location of the config file, relative to the working directory
    pub fn default_path() -> PathBuf {
        PathBuf::from("config").join("config.toml")
    }

    /// Load configuration from a TOML file, with `RAINCHECK__*` environment overrides
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; any error fails the load.
    pub fn load_validated(path: &Path) -> Result<(Self, ValidationResult), ConfigError> {
        let config = Self::load(path)?;
        let validation = config.ensure_valid()?;
        Ok((config, validation))
    }

    /// Validate, failing on errors and logging warnings
    pub fn ensure_valid(&self) -> Result<ValidationResult, ConfigError> {
        let validation = self.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(validation)
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_address(&mut result);

        if self.chat.nick.trim().is_empty() {
            result.add_error("chat.nick", "Nick must not be empty");
        }

        check_secret(&self.chat.auth_token, "chat.auth_token", &mut result);
        check_secret(
            &self.providers.weather_api_key,
            "providers.weather_api_key",
            &mut result,
        );
        check_secret(&self.providers.geo_api_key, "providers.geo_api_key", &mut result);

        if self.providers.request_timeout_secs == 0 {
            result.add_error(
                "providers.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        }

        if self.throttle.global_cooldown_secs == 0 {
            result.add_warning(
                "throttle.global_cooldown_secs",
                "Global cooldown disabled (0 seconds)",
            );
        }
        if self.throttle.sender_cooldown_secs == 0 {
            result.add_warning(
                "throttle.sender_cooldown_secs",
                "Per-sender cooldown disabled (0 seconds)",
            );
        }
        if let Some(exempt) = &self.throttle.exempt_sender {
            if exempt.trim().is_empty() {
                result.add_warning("throttle.exempt_sender", "Exempt sender is blank");
            }
        }

        if self.dispatch.queue_capacity == 0 {
            result.add_error(
                "dispatch.queue_capacity",
                "Queue capacity must be greater than 0",
            );
        }
        if self.dispatch.send_interval_ms == 0 {
            result.add_warning(
                "dispatch.send_interval_ms",
                "Send pacing disabled (0 ms); the chat server may drop messages",
            );
        }

        result
    }

    fn validate_address(&self, result: &mut ValidationResult) {
        let field = "chat.address";
        match Url::parse(&self.chat.address) {
            Ok(url) => {
                if url.scheme() != "ws" && url.scheme() != "wss" {
                    result.add_error(
                        field,
                        format!("URL must use ws or wss scheme, got: {}", url.scheme()),
                    );
                }
                if url.host().is_none() {
                    result.add_error(field, "URL must have a host");
                }
            }
            Err(e) => result.add_error(field, format!("Invalid URL: {}", e)),
        }
    }
}

/// Credentials must be set and not left at a `YOUR_*` placeholder
fn check_secret(value: &str, field: &str, result: &mut ValidationResult) {
    if value.trim().is_empty() {
        result.add_error(field, "Must not be empty");
    } else if value.starts_with("YOUR_") {
        result.add_error(field, "Still set to the placeholder value");
    }
}
