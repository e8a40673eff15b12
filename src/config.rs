use std::time::Duration;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "FillSense";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Timeout for one backend request when `OLLAMA_TIMEOUT` is unset.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Extra attempts after the first when `OLLAMA_RETRIES` is unset.
pub const DEFAULT_RETRIES: u32 = 2;

pub const ENV_BASE_URL: &str = "OLLAMA_BASE_URL";
pub const ENV_MODEL: &str = "OLLAMA_MODEL";
pub const ENV_TEMPERATURE: &str = "OLLAMA_DEFAULT_TEMPERATURE";
pub const ENV_SEED: &str = "OLLAMA_DEFAULT_SEED";
pub const ENV_MAX_TOKENS: &str = "OLLAMA_MAX_TOKENS";
pub const ENV_TIMEOUT: &str = "OLLAMA_TIMEOUT";
pub const ENV_RETRIES: &str = "OLLAMA_RETRIES";
pub const ENV_JSON_FORMAT: &str = "OLLAMA_JSON_FORMAT";

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,reqwest=warn,hyper=warn"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Cannot build HTTP client: {0}")]
    Client(String),
}

/// Generation backend settings, read once and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub seed: i64,
    /// Output-token cap (`num_predict`).
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Additional attempts after the first failed one.
    pub retries: u32,
    /// Send the `format: "json"` hint.
    pub json_format: bool,
}

impl GenerationConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let timeout_secs = match get(ENV_TIMEOUT) {
            Some(raw) => parse_value::<u64>(ENV_TIMEOUT, &raw)?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        let retries = match get(ENV_RETRIES) {
            Some(raw) => parse_value::<u32>(ENV_RETRIES, &raw)?,
            None => DEFAULT_RETRIES,
        };
        let json_format = match get(ENV_JSON_FORMAT) {
            Some(raw) => parse_flag(ENV_JSON_FORMAT, &raw)?,
            None => true,
        };

        let temperature_raw = required(ENV_TEMPERATURE)?;
        let temperature = parse_value::<f32>(ENV_TEMPERATURE, &temperature_raw)?;
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(ConfigError::Invalid {
                var: ENV_TEMPERATURE,
                value: temperature_raw,
                reason: "must be a non-negative number".into(),
            });
        }

        Ok(Self {
            base_url: required(ENV_BASE_URL)?.trim_end_matches('/').to_string(),
            model: required(ENV_MODEL)?,
            temperature,
            seed: parse_value(ENV_SEED, &required(ENV_SEED)?)?,
            max_tokens: parse_value(ENV_MAX_TOKENS, &required(ENV_MAX_TOKENS)?)?,
            timeout: Duration::from_secs(timeout_secs),
            retries,
            json_format,
        })
    }

    /// `{base_url}/api/chat`
    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }
}

fn parse_value<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
            reason: "expected true or false".into(),
        }),
    }
}
