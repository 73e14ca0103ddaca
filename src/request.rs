//! Chat request/response wire types and the staged conversation

use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::error::ClientError;

pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
pub const RESPONSE_FORMAT_TYPE: &str = "json_schema";

// ===== Outbound =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role
{   System
  , User
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: Role
  , pub content: String
}

impl ChatMessage
{   pub fn system(content: impl Into<String>) -> Self
    {   ChatMessage { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self
    {   ChatMessage { role: Role::User, content: content.into() }
    }
}

/// Sampling parameters. Unset fields are left off the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters
{   #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>
}

impl ModelParameters
{   /// No parameters at all; useful as a merge overlay
    pub fn none() -> Self
    {   ModelParameters
        {   temperature: None
          , top_p: None
          , frequency_penalty: None
          , presence_penalty: None
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self
    {   self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self
    {   self.top_p = Some(top_p);
        self
    }

    pub fn with_frequency_penalty(mut self, penalty: f64) -> Self
    {   self.frequency_penalty = Some(penalty);
        self
    }

    pub fn with_presence_penalty(mut self, penalty: f64) -> Self
    {   self.presence_penalty = Some(penalty);
        self
    }

    /// Shallow merge: fields set in `overlay` win, the rest are kept
    pub fn merge(&mut self, overlay: &ModelParameters)
    {   if overlay.temperature.is_some()
        {   self.temperature = overlay.temperature;
        }
        if overlay.top_p.is_some()
        {   self.top_p = overlay.top_p;
        }
        if overlay.frequency_penalty.is_some()
        {   self.frequency_penalty = overlay.frequency_penalty;
        }
        if overlay.presence_penalty.is_some()
        {   self.presence_penalty = overlay.presence_penalty;
        }
    }
}

impl Default for ModelParameters
{   fn default() -> Self
    {   ModelParameters
        {   temperature: Some(0.7)
          , top_p: Some(1.0)
          , frequency_penalty: Some(0.0)
          , presence_penalty: Some(0.0)
        }
    }
}

/// Structured-output descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat
{   #[serde(rename = "type")]
    pub format_type: String
  , pub json_schema: Value
}

impl ResponseFormat
{   pub fn json_schema(schema: Value) -> Self
    {   ResponseFormat
        {   format_type: RESPONSE_FORMAT_TYPE.to_string()
          , json_schema: schema
        }
    }
}

/// One request to `/chat/completions`, built fresh per send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest
{   pub messages: Vec<ChatMessage>
  , pub model: String
  , #[serde(flatten)]
    pub parameters: ModelParameters
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>
}

// ===== Inbound =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage
{   pub role: String
  , pub content: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice
{   pub message: ResponseMessage
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse
{   pub choices: Vec<Choice>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>
}

// ===== Staged conversation =====

/// Message, model and schema state for one request.
/// Setters overwrite, nothing accumulates as history.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation
{   system_message: String
  , user_message: String
  , model: String
  , parameters: ModelParameters
  , response_format: Option<Value>
}

impl Default for Conversation
{   fn default() -> Self
    {   Conversation
        {   system_message: String::new()
          , user_message: String::new()
          , model: DEFAULT_MODEL.to_string()
          , parameters: ModelParameters::default()
          , response_format: None
        }
    }
}

impl Conversation
{   pub fn new() -> Self
    {   Self::default()
    }

    pub fn set_system_message(
      &mut self
    , text: &str
    ) -> Result<&mut Self, ClientError>
    {   let trimmed = text.trim();
        if trimmed.is_empty()
        {   error!(
              "Rejected system message (length {})", text.len()
            );
            return Err(ClientError::InvalidSystemMessage);
        }
        self.system_message = trimmed.to_string();
        Ok(self)
    }

    pub fn set_user_message(
      &mut self
    , text: &str
    ) -> Result<&mut Self, ClientError>
    {   let trimmed = text.trim();
        if trimmed.is_empty()
        {   error!(
              "Rejected user message (length {})", text.len()
            );
            return Err(ClientError::InvalidUserMessage);
        }
        self.user_message = trimmed.to_string();
        Ok(self)
    }

    /// Require a JSON-schema-shaped reply. The schema must be an
    /// object; anything else is refused.
    pub fn set_response_format(
      &mut self
    , schema: Value
    ) -> Result<&mut Self, ClientError>
    {   if !schema.is_object()
        {   let kind = json_kind(&schema);
            error!("Rejected response format: schema is {}", kind);
            return Err(ClientError::InvalidResponseFormat(
              format!("schema must be an object, got {}", kind)
            ));
        }
        self.response_format = Some(schema);
        Ok(self)
    }

    /// Switch model and shallow-merge any supplied parameters
    pub fn set_model(
      &mut self
    , name: &str
    , parameters: Option<&ModelParameters>
    ) -> Result<&mut Self, ClientError>
    {   let trimmed = name.trim();
        if trimmed.is_empty()
        {   error!(
              "Rejected model name {:?} with parameters {:?}",
              name, parameters
            );
            return Err(ClientError::InvalidModelName);
        }
        self.model = trimmed.to_string();
        if let Some(overlay) = parameters
        {   self.parameters.merge(overlay);
        }
        Ok(self)
    }

    pub fn system_message(&self) -> Option<&str>
    {   if self.system_message.is_empty()
        {   None
        } else
        {   Some(&self.system_message)
        }
    }

    pub fn user_message(&self) -> Option<&str>
    {   if self.user_message.is_empty()
        {   None
        } else
        {   Some(&self.user_message)
        }
    }

    pub fn model(&self) -> &str
    {   &self.model
    }

    pub fn parameters(&self) -> &ModelParameters
    {   &self.parameters
    }

    pub fn response_format(&self) -> Option<&Value>
    {   self.response_format.as_ref()
    }

    /// Assemble the wire request: system first when present,
    /// then exactly one user message
    pub fn build(&self) -> Result<ChatRequest, ClientError>
    {   let user_message = match self.user_message()
        {   Some(text) => text
          , None => {
              debug!(
                "Cannot build request without a user message \
                 (model {}, has_system_message {})",
                self.model,
                self.system_message().is_some()
              );
              return Err(ClientError::MissingUserMessage);
            }
        };

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = self.system_message()
        {   messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(user_message));

        let request = ChatRequest
        {   messages
          , model: self.model.clone()
          , parameters: self.parameters.clone()
          , response_format: self.response_format
              .clone()
              .map(ResponseFormat::json_schema)
        };
        debug!(
          "Built request for {} with {} messages",
          request.model, request.messages.len()
        );
        Ok(request)
    }
}

/// Name of a JSON value's type, for diagnostics
pub(crate) fn json_kind(value: &Value) -> &'static str
{   match value
    {   Value::Null => "null"
      , Value::Bool(_) => "a boolean"
      , Value::Number(_) => "a number"
      , Value::String(_) => "a string"
      , Value::Array(_) => "an array"
      , Value::Object(_) => "an object"
    }
}
