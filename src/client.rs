//! The client facade: staged conversation, validation, retried send

use std::fmt;
use log::{debug, error};
use serde_json::Value;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::request::{ChatResponse, Conversation, ModelParameters};
use crate::retry::{send_with_retry, RetryPolicy};
use crate::transport::{HttpTransport, Transport};
use crate::validation::validate_request;

/// Non-sensitive description of a request, for failure logs.
/// Lengths and flags only, never message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext
{   pub model: String
  , pub has_system_message: bool
  , pub system_message_length: usize
  , pub has_user_message: bool
  , pub user_message_length: usize
  , pub has_response_format: bool
}

impl RequestContext
{   pub fn of(conversation: &Conversation) -> Self
    {   RequestContext
        {   model: conversation.model().to_string()
          , has_system_message: conversation.system_message().is_some()
          , system_message_length: conversation.system_message()
              .map(str::len)
              .unwrap_or(0)
          , has_user_message: conversation.user_message().is_some()
          , user_message_length: conversation.user_message()
              .map(str::len)
              .unwrap_or(0)
          , has_response_format: conversation.response_format().is_some()
        }
    }
}

impl fmt::Display for RequestContext
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   write!(
          f,
          "model={} has_system_message={} system_message_length={} \
           has_user_message={} user_message_length={} has_response_format={}",
          self.model,
          self.has_system_message,
          self.system_message_length,
          self.has_user_message,
          self.user_message_length,
          self.has_response_format
        )
    }
}

/// Client for the completion gateway.
///
/// Holds a staged [`Conversation`] for the setter-style API. For
/// concurrent use, build a `Conversation` per call and pass it to
/// [`OpenRouterClient::send`] instead.
pub struct OpenRouterClient<T: Transport = HttpTransport>
{   config: ClientConfig
  , transport: T
  , retry_policy: RetryPolicy
  , conversation: Conversation
}

impl OpenRouterClient<HttpTransport>
{   /// Validate the config and set up the HTTP transport
    pub fn new(config: ClientConfig) -> Result<Self, ClientError>
    {   config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(config, transport)
    }

    /// Config from `OPENROUTER_*` environment variables
    pub fn from_env() -> Result<Self, ClientError>
    {   Self::new(ClientConfig::from_env()?)
    }
}

impl<T: Transport> OpenRouterClient<T>
{   pub fn with_transport(
      config: ClientConfig
    , transport: T
    ) -> Result<Self, ClientError>
    {   config.validate()?;
        debug!("Creating OpenRouterClient with {:?}", config);
        let retry_policy = RetryPolicy::new(config.max_retries);
        Ok(OpenRouterClient
        {   config
          , transport
          , retry_policy
          , conversation: Conversation::default()
        })
    }

    /// Replace the backoff settings derived from the config.
    /// The config's `max_retries` follows the new policy.
    pub fn with_retry_policy(
      mut self
    , policy: RetryPolicy
    ) -> Result<Self, ClientError>
    {   if let Err(e) = policy.validate()
        {   error!("Rejected retry policy {:?}: {}", policy, e);
            return Err(e);
        }
        self.config.max_retries = policy.max_retries;
        self.retry_policy = policy;
        Ok(self)
    }

    pub fn config(&self) -> &ClientConfig
    {   &self.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy
    {   &self.retry_policy
    }

    pub fn transport(&self) -> &T
    {   &self.transport
    }

    pub fn conversation(&self) -> &Conversation
    {   &self.conversation
    }

    pub fn set_system_message(
      &mut self
    , text: &str
    ) -> Result<&mut Self, ClientError>
    {   self.conversation.set_system_message(text)?;
        Ok(self)
    }

    pub fn set_user_message(
      &mut self
    , text: &str
    ) -> Result<&mut Self, ClientError>
    {   self.conversation.set_user_message(text)?;
        Ok(self)
    }

    pub fn set_response_format(
      &mut self
    , schema: Value
    ) -> Result<&mut Self, ClientError>
    {   self.conversation.set_response_format(schema)?;
        Ok(self)
    }

    pub fn set_model(
      &mut self
    , name: &str
    , parameters: Option<&ModelParameters>
    ) -> Result<&mut Self, ClientError>
    {   self.conversation.set_model(name, parameters)?;
        Ok(self)
    }

    /// Send the staged conversation
    pub async fn send_chat_message(&self) -> Result<String, ClientError>
    {   self.send(&self.conversation).await
    }

    /// Send an explicit conversation and return the first choice's text
    pub async fn send(
      &self
    , conversation: &Conversation
    ) -> Result<String, ClientError>
    {   match self.dispatch(conversation).await
        {   Ok(text) => Ok(text)
          , Err(err) => {
              error!(
                "Chat completion failed [{}] status={:?}: {} ({})",
                err.code(), err.status(), err,
                RequestContext::of(conversation)
              );
              Err(err)
            }
        }
    }

    async fn dispatch(
      &self
    , conversation: &Conversation
    ) -> Result<String, ClientError>
    {   let request = conversation.build()?;

        if let Err(issues) = validate_request(&request)
        {   for issue in &issues
            {   debug!("Request validation: {}", issue);
            }
            let summary = issues.first()
              .map(|i| i.to_string())
              .unwrap_or_else(|| "request failed validation".to_string());
            return Err(ClientError::Validation(summary));
        }

        let response = send_with_retry(
          &self.transport,
          &request,
          &self.retry_policy,
          self.config.timeout()
        ).await?;

        extract_content(response)
    }
}

/// First choice's text; no choices, or an empty one, is an empty answer
pub fn extract_content(response: ChatResponse) -> Result<String, ClientError>
{   let choice = response.choices
      .into_iter()
      .next()
      .ok_or(ClientError::EmptyResponse)?;
    if choice.message.content.is_empty()
    {   return Err(ClientError::EmptyResponse);
    }
    Ok(choice.message.content)
}
