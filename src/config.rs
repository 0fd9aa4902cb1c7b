//! Configuration for the chat relay.
//!
//! Values come from the process environment (optionally seeded from a `.env`
//! file) and fall back to the defaults below.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::conversation::eviction::EvictionConfig;
use crate::conversation::trimmer::DEFAULT_HISTORY_WINDOW;

/// Fixed behavioral instructions seeded as the first turn of every conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = r"Tu es un chatbot complètement déjanté et absurde.
Tu ne réponds JAMAIS directement aux questions posées.
À la place, tu réponds avec des choses hors sujet, pas trop longues, drôles, absurdes et sarcastiques, en glissant quelques synonymes du thème demandé dans un contexte différent.
Exemples:
- Si on te demande la météo, tu parles de pandas qui font du skateboard
- Si on te demande une recette, tu parles de philosophie extraterrestre
- Si on te demande de l'aide, tu racontes une histoire sur des chaussettes rebelles
- Si on te salue, dis qu'on fera un camping
- Quand on parle de sport et d'équipe préférée, crie juste « riiiiiiceeee » ou « fratessi fratessi » sans autre information
- Si on parle d'IA, parle des livres de Freud et de Nietzsche

Sois créatif, drôle et complètement à côté de la plaque.
Utilise de l'humour absurde, des comparaisons ridicules et des situations impossibles.
Ne sois jamais utile ou pertinent. Ton travail est d'être hilarant et décalé !";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5000;
/// Default maximum message length, in characters.
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 1000;
/// Default request body limit (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

const ENV_API_KEY: &str = "GROQ_API_KEY";
const ENV_PROVIDER_URL: &str = "RELAY_PROVIDER_URL";
const ENV_MODEL: &str = "RELAY_MODEL";
const ENV_TEMPERATURE: &str = "RELAY_TEMPERATURE";
const ENV_MAX_TOKENS: &str = "RELAY_MAX_TOKENS";
const ENV_REQUEST_TIMEOUT: &str = "RELAY_REQUEST_TIMEOUT_SECS";
const ENV_MAX_MESSAGE_CHARS: &str = "RELAY_MAX_MESSAGE_CHARS";
const ENV_HISTORY_WINDOW: &str = "RELAY_HISTORY_WINDOW";
const ENV_IDLE_TTL: &str = "RELAY_IDLE_TTL_SECS";
const ENV_EVICTION_INTERVAL: &str = "RELAY_EVICTION_INTERVAL_SECS";
const ENV_PORT: &str = "RELAY_PORT";
const ENV_STATIC_DIR: &str = "RELAY_STATIC_DIR";
const ENV_SYSTEM_PROMPT: &str = "RELAY_SYSTEM_PROMPT";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid value for {name}: {value}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },
    /// Out-of-range or inconsistent settings.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Provider URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Top-level relay configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelayConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Directory holding `index.html` and other static assets.
    pub static_dir: PathBuf,
    /// Instructions seeded as the system turn.
    pub system_prompt: String,
    /// Request and history bounds.
    pub limits: LimitsConfig,
    /// Completion provider settings.
    pub provider: ProviderConfig,
    /// Idle conversation eviction.
    pub eviction: EvictionConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            static_dir: PathBuf::from("static"),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            limits: LimitsConfig::default(),
            provider: ProviderConfig::default(),
            eviction: EvictionConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from the environment, after reading `.env` if present.
    ///
    /// # Errors
    /// Returns an error if a variable is malformed or the result fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is the normal production case.
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        let config = Self {
            port: env_parse(ENV_PORT)?.unwrap_or(defaults.port),
            static_dir: env_string(ENV_STATIC_DIR).map_or(defaults.static_dir, PathBuf::from),
            system_prompt: env_string(ENV_SYSTEM_PROMPT).unwrap_or(defaults.system_prompt),
            limits: LimitsConfig {
                max_message_chars: env_parse(ENV_MAX_MESSAGE_CHARS)?
                    .unwrap_or(defaults.limits.max_message_chars),
                history_window: env_parse(ENV_HISTORY_WINDOW)?
                    .unwrap_or(defaults.limits.history_window),
                max_body_bytes: defaults.limits.max_body_bytes,
            },
            provider: ProviderConfig {
                api_key: env_string(ENV_API_KEY),
                base_url: env_string(ENV_PROVIDER_URL).unwrap_or(defaults.provider.base_url),
                model: env_string(ENV_MODEL).unwrap_or(defaults.provider.model),
                temperature: env_parse(ENV_TEMPERATURE)?.unwrap_or(defaults.provider.temperature),
                max_tokens: env_parse(ENV_MAX_TOKENS)?.unwrap_or(defaults.provider.max_tokens),
                request_timeout: env_parse(ENV_REQUEST_TIMEOUT)?
                    .map_or(defaults.provider.request_timeout, Duration::from_secs),
                connect_timeout: defaults.provider.connect_timeout,
            },
            eviction: EvictionConfig {
                idle_ttl_seconds: env_parse(ENV_IDLE_TTL)?
                    .unwrap_or(defaults.eviction.idle_ttl_seconds),
                interval_seconds: env_parse(ENV_EVICTION_INTERVAL)?
                    .unwrap_or(defaults.eviction.interval_seconds),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Set the provider API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.provider.api_key = Some(key.into());
        self
    }

    /// Set the history window.
    #[must_use]
    pub const fn with_history_window(mut self, window: usize) -> Self {
        self.limits.history_window = window;
        self
    }

    /// Set the maximum message length.
    #[must_use]
    pub const fn with_max_message_chars(mut self, max: usize) -> Self {
        self.limits.max_message_chars = max;
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_message_chars == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_message_chars must be > 0".to_string(),
            ));
        }

        if self.limits.max_body_bytes < self.limits.max_message_chars {
            return Err(ConfigError::Invalid(
                "limits.max_body_bytes must hold at least one full message".to_string(),
            ));
        }

        if self.system_prompt.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "system_prompt must not be empty".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::Invalid(
                "provider.temperature must be within 0.0..=2.0".to_string(),
            ));
        }

        if self.provider.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "provider.max_tokens must be > 0".to_string(),
            ));
        }

        if self.provider.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "provider.request_timeout must be > 0".to_string(),
            ));
        }

        Url::parse(&self.provider.base_url)?;

        Ok(())
    }
}

/// Request and history bounds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum message length in characters, after trimming whitespace.
    pub max_message_chars: usize,
    /// Maximum retained non-system turns per conversation.
    pub history_window: usize,
    /// Maximum accepted request body size.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            history_window: DEFAULT_HISTORY_WINDOW,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Completion provider settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider credential; `None` means the gateway is unavailable.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum generated tokens per reply.
    pub max_tokens: u32,
    /// Total timeout for one completion call.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 1.2,
            max_tokens: 300,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Non-blank value of an environment variable.
fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    env_string(name)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { name, value })
        })
        .transpose()
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
