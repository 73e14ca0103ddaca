//! Retry policy and the attempt loop around a [`Transport`]

use std::time::Duration;
use log::{debug, warn};
use serde_json::Value;
use crate::error::ClientError;
use crate::request::{ChatRequest, ChatResponse};
use crate::transport::{RawResponse, Transport};
use crate::validation::validate_response;

pub const INITIAL_BACKOFF_MS: u64 = 1_000;
pub const MAX_BACKOFF_MS: u64 = 8_000;

/// Bounded exponential backoff.
/// `max_retries` counts every attempt, the first one included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy
{   pub max_retries: u32
  , pub initial_backoff: Duration
  , pub max_backoff: Duration
}

impl RetryPolicy
{   /// Policy with the standard 1s initial / 8s capped backoff
    pub fn new(max_retries: u32) -> Self
    {   RetryPolicy
        {   max_retries
          , initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS)
          , max_backoff: Duration::from_millis(MAX_BACKOFF_MS)
        }
    }

    /// `min(initial * 2^attempt, max)` for a zero-based attempt index
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration
    {   Duration::from_millis(capped_backoff_ms(
          millis(self.initial_backoff),
          millis(self.max_backoff),
          attempt
        ))
    }

    /// Reject a policy that could never make an attempt or never wait
    pub fn validate(&self) -> Result<(), ClientError>
    {   if self.max_retries == 0
        {   return Err(ClientError::Config(
              "max_retries must be a positive integer".to_string()
            ));
        }
        if self.initial_backoff.is_zero()
        {   return Err(ClientError::Config(
              "initial_backoff must be positive".to_string()
            ));
        }
        Ok(())
    }
}

pub(crate) fn millis(duration: Duration) -> u64
{   u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn capped_backoff_ms(initial_ms: u64, cap_ms: u64, attempt: u32) -> u64
{   initial_ms
      .saturating_mul(2u64.saturating_pow(attempt))
      .min(cap_ms)
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy::new(crate::config::DEFAULT_MAX_RETRIES)
    }
}

/// Backoff in milliseconds under the standard constants
pub fn backoff_ms(attempt: u32) -> u64
{   capped_backoff_ms(INITIAL_BACKOFF_MS, MAX_BACKOFF_MS, attempt)
}

/// Turn one raw reply into a validated response or a classified error.
///
/// An error status or an `error` field in the body is an API error,
/// described by the body when it can be. Otherwise the body must pass
/// the inbound contract.
pub fn classify_response(raw: RawResponse) -> Result<ChatResponse, ClientError>
{   let error_body = raw.body.get("error").filter(|e| is_truthy(e));
    if !raw.is_success() || error_body.is_some()
    {   return Err(api_error(raw.status, error_body));
    }
    validate_response(&raw.body)
}

// `false`, `0`, `""` and `null` do not mark a failure
fn is_truthy(value: &Value) -> bool
{   match value
    {   Value::Null => false
      , Value::Bool(b) => *b
      , Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(true)
      , Value::String(s) => !s.is_empty()
      , Value::Array(_) | Value::Object(_) => true
    }
}

fn api_error(http_status: u16, error_body: Option<&Value>) -> ClientError
{   let message = error_body
      .and_then(|e| match e
      {   Value::String(s) => Some(s.as_str())
        , _ => e.get("message").and_then(Value::as_str)
      })
      .map(str::to_string)
      .unwrap_or_else(|| format!("HTTP error {}", http_status));

    // The gateway reports the real status as a numeric `error.code`
    let (status, upstream_code) = match error_body.and_then(|e| e.get("code"))
    {   Some(Value::Number(n)) => {
          let status = n.as_u64()
            .and_then(|v| u16::try_from(v).ok())
            .unwrap_or(http_status);
          (status, None)
        }
      , Some(Value::String(s)) => (http_status, Some(s.clone()))
      , _ => (http_status, None)
    };

    ClientError::Api
    {   message
      , status: Some(status)
      , upstream_code
    }
}

/// Run attempts until one succeeds, one fails for good, or the
/// budget is spent. Backoff is only slept when another attempt follows.
pub async fn send_with_retry<T>(
  transport: &T
, request: &ChatRequest
, policy: &RetryPolicy
, timeout: Duration
) -> Result<ChatResponse, ClientError>
where T: Transport + ?Sized
{   let mut last_error: Option<ClientError> = None;
    let mut attempt: u32 = 0;

    while attempt < policy.max_retries
    {   let outcome = match transport.post_chat(request, timeout).await
        {   Ok(raw) => classify_response(raw)
          , Err(e) => Err(e)
        };

        match outcome
        {   Ok(response) => {
              if attempt > 0
              {   debug!(
                    "Request succeeded on attempt {} of {}",
                    attempt + 1, policy.max_retries
                  );
              }
              return Ok(response);
            }
          , Err(err) => {
              warn!(
                "Request failed, attempt {} of {} (code {}, status {:?}): {}",
                attempt + 1, policy.max_retries,
                err.code(), err.status(), err
              );

              if !err.is_retryable()
              {   debug!(
                    "Not retrying {} (status {:?})",
                    err.code(), err.status()
                  );
                  return Err(err);
              }

              let delay = policy.backoff_for_attempt(attempt);
              attempt += 1;
              last_error = Some(err);

              if attempt < policy.max_retries
              {   debug!("Backing off for {} ms", delay.as_millis());
                  tokio::time::sleep(delay).await;
              }
            }
        }
    }

    let last = last_error.unwrap_or_else(|| {
      ClientError::Unexpected(
        "retry loop ended without making an attempt".to_string()
      )
    });
    debug!(
      "Giving up after {} of {} attempts, last error {}: {}",
      attempt, policy.max_retries, last.code(), last
    );
    Err(ClientError::MaxRetriesExceeded
    {   attempts: attempt
      , last: Box::new(last)
    })
}
