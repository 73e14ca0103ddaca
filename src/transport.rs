//! Network seam for the completion gateway.
//!
//! A [`Transport`] performs exactly one attempt: it posts the request,
//! enforces the per-attempt deadline by aborting the call, and decodes
//! the body as JSON whatever the status. Classifying the reply is the
//! retry engine's job.

use std::time::Duration;
use async_trait::async_trait;
use log::{debug, error, trace};
use serde_json::Value;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::request::ChatRequest;

/// Status and decoded body of one gateway reply
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse
{   pub status: u16
  , pub body: Value
}

impl RawResponse
{   pub fn new(status: u16, body: Value) -> Self
    {   RawResponse { status, body }
    }

    pub fn is_success(&self) -> bool
    {   is_success_status(self.status)
    }
}

fn is_success_status(status: u16) -> bool
{   (200..300).contains(&status)
}

#[async_trait]
pub trait Transport: Send + Sync
{   /// Send one attempt. Must give up, and release the connection,
    /// once `timeout` has elapsed.
    async fn post_chat(
      &self
    , request: &ChatRequest
    , timeout: Duration
    ) -> Result<RawResponse, ClientError>;
}

/// reqwest-backed transport for `POST {base_url}/chat/completions`
pub struct HttpTransport
{   http_client: reqwest::Client
  , endpoint: String
  , api_key: String
  , app_title: String
}

impl HttpTransport
{   pub fn new(config: &ClientConfig) -> Result<Self, ClientError>
    {   let http_client = reqwest::Client::builder()
          .build()
          .map_err(|e| {
            error!("Failed to build HTTP client: {}", e);
            ClientError::Config(
              format!("HTTP client could not be built: {}", e)
            )
          })?;
        Ok(HttpTransport
        {   http_client
          , endpoint: format!(
              "{}/chat/completions",
              config.base_url.trim_end_matches('/')
            )
          , api_key: config.api_key.clone()
          , app_title: config.app_title.clone()
        })
    }

    pub fn endpoint(&self) -> &str
    {   &self.endpoint
    }
}

fn map_send_error(e: reqwest::Error, timeout: Duration) -> ClientError
{   if e.is_timeout()
    {   ClientError::Timeout(crate::retry::millis(timeout))
    } else
    {   ClientError::Network(e.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport
{   async fn post_chat(
      &self
    , request: &ChatRequest
    , timeout: Duration
    ) -> Result<RawResponse, ClientError>
    {   debug!(
          "POST {} (model {}, {} messages)",
          self.endpoint, request.model, request.messages.len()
        );

        // The deadline covers the whole attempt, body included; on
        // expiry reqwest drops the connection.
        let response = self.http_client
          .post(&self.endpoint)
          .header("Content-Type", "application/json")
          .header("Authorization", format!("Bearer {}", self.api_key))
          .header("X-Title", &self.app_title)
          .timeout(timeout)
          .json(request)
          .send()
          .await
          .map_err(|e| map_send_error(e, timeout))?;

        let status = response.status().as_u16();
        trace!("Gateway response status: {}", status);

        let bytes = response.bytes()
          .await
          .map_err(|e| map_send_error(e, timeout))?;

        trace!("Gateway response body: {} bytes", bytes.len());

        match serde_json::from_slice::<Value>(&bytes)
        {   Ok(body) => Ok(RawResponse::new(status, body))
            // An error status still classifies by status alone
          , Err(_) if !is_success_status(status) => {
              Ok(RawResponse::new(status, Value::Null))
            }
          , Err(e) => Err(ClientError::InvalidResponse(format!(
              "body is not valid JSON (status {}): {}", status, e
            )))
        }
    }
}
