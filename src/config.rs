//! Client configuration, validated eagerly at construction

use std::fmt;
use std::time::Duration;
use log::{debug, error};
use serde::Deserialize;
use crate::error::ClientError;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_APP_TITLE: &str = "Flashcards App";

pub const ENV_API_KEY: &str = "OPENROUTER_API_KEY";
pub const ENV_API_URL: &str = "OPENROUTER_API_URL";
pub const ENV_TIMEOUT_MS: &str = "OPENROUTER_TIMEOUT_MS";
pub const ENV_MAX_RETRIES: &str = "OPENROUTER_MAX_RETRIES";

/// Immutable settings for one client instance.
/// Deserialize only: the key must never be written back out.
#[derive(Clone, Deserialize)]
pub struct ClientConfig
{   /// Bearer key for the gateway
    pub api_key: String
  , /// Gateway base URL; `/chat/completions` is appended
    #[serde(default = "default_base_url")]
    pub base_url: String
  , /// Per-attempt deadline in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64
  , /// Total attempts per send, the first one included
    #[serde(default = "default_max_retries")]
    pub max_retries: u32
  , /// Sent as the client-identifying `X-Title` header
    #[serde(default = "default_app_title")]
    pub app_title: String
}

fn default_base_url() -> String
{   DEFAULT_BASE_URL.to_string()
}

fn default_timeout_ms() -> u64
{   DEFAULT_TIMEOUT_MS
}

fn default_max_retries() -> u32
{   DEFAULT_MAX_RETRIES
}

fn default_app_title() -> String
{   DEFAULT_APP_TITLE.to_string()
}

impl ClientConfig
{   /// Config with the given key and every other field defaulted
    pub fn new(api_key: impl Into<String>) -> Self
    {   ClientConfig
        {   api_key: api_key.into()
          , base_url: default_base_url()
          , timeout_ms: DEFAULT_TIMEOUT_MS
          , max_retries: DEFAULT_MAX_RETRIES
          , app_title: default_app_title()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self
    {   self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self
    {   self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self
    {   self.max_retries = max_retries;
        self
    }

    pub fn with_app_title(mut self, app_title: impl Into<String>) -> Self
    {   self.app_title = app_title.into();
        self
    }

    /// Per-attempt deadline as a Duration
    pub fn timeout(&self) -> Duration
    {   Duration::from_millis(self.timeout_ms)
    }

    /// Reject configurations that could only fail later
    pub fn validate(&self) -> Result<(), ClientError>
    {   let result = self.check();
        if let Err(e) = &result
        {   error!("Rejected client config: {} ({:?})", e, self);
        }
        result
    }

    fn check(&self) -> Result<(), ClientError>
    {   if self.api_key.trim().is_empty()
        {   return Err(ClientError::Config(
              "API key is required".to_string()
            ));
        }
        let url = reqwest::Url::parse(&self.base_url)
          .map_err(|e| {
            ClientError::Config(
              format!("Invalid base URL {:?}: {}", self.base_url, e)
            )
          })?;
        if url.cannot_be_a_base()
        {   return Err(ClientError::Config(
              format!("Base URL is not absolute: {}", self.base_url)
            ));
        }
        if self.timeout_ms == 0
        {   return Err(ClientError::Config(
              "Timeout must be a positive number of milliseconds"
                .to_string()
            ));
        }
        if self.max_retries == 0
        {   return Err(ClientError::Config(
              "Max retries must be a positive number".to_string()
            ));
        }
        Ok(())
    }

    /// Load from the process environment, reading a `.env` file
    /// first when one exists
    pub fn from_env() -> Result<Self, ClientError>
    {   match dotenvy::dotenv()
        {   Ok(path) => debug!("Loaded environment from {:?}", path)
          , Err(e) => debug!("No .env file loaded: {}", e)
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset optional keys fall back
    /// to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where F: Fn(&str) -> Option<String>
    {   let api_key = lookup(ENV_API_KEY)
          .ok_or_else(|| {
            ClientError::Config(format!("{} is not set", ENV_API_KEY))
          })?;
        let mut config = ClientConfig::new(api_key);
        if let Some(url) = lookup(ENV_API_URL)
        {   config.base_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS)
        {   config.timeout_ms = parse_number(ENV_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_RETRIES)
        {   config.max_retries = parse_number(ENV_MAX_RETRIES, &raw)?;
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_number<N: std::str::FromStr>(
  key: &str
, raw: &str
) -> Result<N, ClientError>
{   raw.trim().parse::<N>()
      .map_err(|_| {
        ClientError::Config(
          format!("{} must be a positive integer, got {:?}", key, raw)
        )
      })
}

impl fmt::Debug for ClientConfig
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.debug_struct("ClientConfig")
          .field("api_key", &"[REDACTED]")
          .field("base_url", &self.base_url)
          .field("timeout_ms", &self.timeout_ms)
          .field("max_retries", &self.max_retries)
          .field("app_title", &self.app_title)
          .finish()
    }
}
