//! Error taxonomy for the completion gateway client

use std::fmt;
use serde::Serialize;
use thiserror::Error;

/// Machine-readable error code. Callers branch on this, never on
/// the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode
{   ConfigError
  , InvalidSystemMessage
  , InvalidUserMessage
  , InvalidModelName
  , InvalidResponseFormat
  , MissingUserMessage
  , ValidationError
  , ApiError
  , RateLimited
  , Timeout
  , NetworkError
  , InvalidResponse
  , EmptyResponse
  , MaxRetriesExceeded
  , UnexpectedError
}

impl ErrorCode
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   ErrorCode::ConfigError => "CONFIG_ERROR"
          , ErrorCode::InvalidSystemMessage => "INVALID_SYSTEM_MESSAGE"
          , ErrorCode::InvalidUserMessage => "INVALID_USER_MESSAGE"
          , ErrorCode::InvalidModelName => "INVALID_MODEL_NAME"
          , ErrorCode::InvalidResponseFormat => "INVALID_RESPONSE_FORMAT"
          , ErrorCode::MissingUserMessage => "MISSING_USER_MESSAGE"
          , ErrorCode::ValidationError => "VALIDATION_ERROR"
          , ErrorCode::ApiError => "API_ERROR"
          , ErrorCode::RateLimited => "RATE_LIMITED"
          , ErrorCode::Timeout => "TIMEOUT"
          , ErrorCode::NetworkError => "NETWORK_ERROR"
          , ErrorCode::InvalidResponse => "INVALID_RESPONSE"
          , ErrorCode::EmptyResponse => "EMPTY_RESPONSE"
          , ErrorCode::MaxRetriesExceeded => "MAX_RETRIES_EXCEEDED"
          , ErrorCode::UnexpectedError => "UNEXPECTED_ERROR"
        }
    }
}

impl fmt::Display for ErrorCode
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(self.as_str())
    }
}

/// Every failure the client can report.
/// Implements Clone so the retry engine can keep the last error
/// and wrap it once the budget is spent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError
{   /// Client configuration was rejected at construction
    #[error("Invalid configuration: {0}")]
    Config(String)
  , #[error("System message cannot be empty")]
    InvalidSystemMessage
  , #[error("User message cannot be empty")]
    InvalidUserMessage
  , #[error("Model name cannot be empty")]
    InvalidModelName
  , /// Structured-output schema was not a JSON object
    #[error("Invalid JSON schema provided: {0}")]
    InvalidResponseFormat(String)
  , #[error("User message is required")]
    MissingUserMessage
  , /// Outbound payload failed its shape check
    #[error("Validation error: {0}")]
    Validation(String)
  , /// Gateway answered with an error status or an error body.
    /// `status` is the upstream status, `upstream_code` any
    /// non-numeric code the body carried.
    #[error("{message}")]
    Api
    {   message: String
      , status: Option<u16>
      , upstream_code: Option<String>
    }
  , /// Per-attempt deadline elapsed; the call was aborted
    #[error("Request timed out after {0} ms")]
    Timeout(u64)
  , /// Connection-level failure before a response arrived
    #[error("Network error: {0}")]
    Network(String)
  , /// Decoded body did not match the response contract
    #[error("Invalid response format: {0}")]
    InvalidResponse(String)
  , #[error("No response received from the model")]
    EmptyResponse
  , /// Retry budget spent; carries the last underlying error
    #[error("Maximum retry attempts exceeded after {attempts} attempts: {last}")]
    MaxRetriesExceeded
    {   attempts: u32
      , last: Box<ClientError>
    }
  , #[error("Unexpected error: {0}")]
    Unexpected(String)
}

impl ClientError
{   /// Machine-readable code for this error
    pub fn code(&self) -> ErrorCode
    {   match self
        {   ClientError::Config(_) => ErrorCode::ConfigError
          , ClientError::InvalidSystemMessage => {
              ErrorCode::InvalidSystemMessage
            }
          , ClientError::InvalidUserMessage => {
              ErrorCode::InvalidUserMessage
            }
          , ClientError::InvalidModelName => ErrorCode::InvalidModelName
          , ClientError::InvalidResponseFormat(_) => {
              ErrorCode::InvalidResponseFormat
            }
          , ClientError::MissingUserMessage => {
              ErrorCode::MissingUserMessage
            }
          , ClientError::Validation(_) => ErrorCode::ValidationError
          , ClientError::Api { status: Some(429), .. } => {
              ErrorCode::RateLimited
            }
          , ClientError::Api { .. } => ErrorCode::ApiError
          , ClientError::Timeout(_) => ErrorCode::Timeout
          , ClientError::Network(_) => ErrorCode::NetworkError
          , ClientError::InvalidResponse(_) => ErrorCode::InvalidResponse
          , ClientError::EmptyResponse => ErrorCode::EmptyResponse
          , ClientError::MaxRetriesExceeded { .. } => {
              ErrorCode::MaxRetriesExceeded
            }
          , ClientError::Unexpected(_) => ErrorCode::UnexpectedError
        }
    }

    /// Upstream HTTP status, if the failure came from the gateway
    pub fn status(&self) -> Option<u16>
    {   match self
        {   ClientError::Api { status, .. } => *status
          , ClientError::MaxRetriesExceeded { last, .. } => last.status()
          , _ => None
        }
    }

    /// Whether another attempt could plausibly succeed.
    /// 400 and 401 point at a caller or config defect and are final.
    pub fn is_retryable(&self) -> bool
    {   match self
        {   ClientError::Api { status: Some(400), .. }
          | ClientError::Api { status: Some(401), .. } => false
          , ClientError::Api { .. }
          | ClientError::Timeout(_)
          | ClientError::Network(_)
          | ClientError::InvalidResponse(_) => true
          , _ => false
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
