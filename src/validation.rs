//! Shape contracts checked at both network boundaries.
//!
//! Outbound: the serialized request must look like something the
//! gateway accepts. Inbound: the decoded body must carry a usable
//! `choices` array before anything reads from it. Both fail closed
//! and never repair a value.

use std::fmt;
use serde_json::{Map, Value};
use crate::error::ClientError;
use crate::request::{ChatRequest, ChatResponse, json_kind, RESPONSE_FORMAT_TYPE};

/// Inclusive ranges for the optional sampling parameters
pub const PARAMETER_RANGES: [(&str, f64, f64); 4] = [
  ("temperature", 0.0, 2.0)
, ("top_p", 0.0, 1.0)
, ("frequency_penalty", -2.0, 2.0)
, ("presence_penalty", -2.0, 2.0)
];

/// One failed check, addressed by a JSON-path-like location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue
{   pub path: String
  , pub message: String
}

impl ValidationIssue
{   fn new(path: impl Into<String>, message: impl Into<String>) -> Self
    {   ValidationIssue
        {   path: path.into()
          , message: message.into()
        }
    }
}

impl fmt::Display for ValidationIssue
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   write!(f, "{}: {}", self.path, self.message)
    }
}

// ===== Outbound =====

/// Check a built request in its wire form
pub fn validate_request(
  request: &ChatRequest
) -> Result<(), Vec<ValidationIssue>>
{   let value = serde_json::to_value(request)
      .map_err(|e| {
        vec![ValidationIssue::new("$", format!("not serializable: {}", e))]
      })?;
    validate_request_value(&value)
}

/// Check an arbitrary JSON value against the request contract,
/// collecting every issue rather than stopping at the first
pub fn validate_request_value(
  value: &Value
) -> Result<(), Vec<ValidationIssue>>
{   let mut issues = Vec::new();
    let object = match value.as_object()
    {   Some(object) => object
      , None => {
          return Err(vec![ValidationIssue::new(
            "$",
            format!("expected an object, got {}", json_kind(value))
          )]);
        }
    };

    check_messages(object, &mut issues);

    match object.get("model")
    {   Some(Value::String(model)) if !model.is_empty() => {}
      , Some(Value::String(_)) => {
          issues.push(ValidationIssue::new("model", "must not be empty"));
        }
      , Some(other) => {
          issues.push(ValidationIssue::new(
            "model",
            format!("expected a string, got {}", json_kind(other))
          ));
        }
      , None => issues.push(ValidationIssue::new("model", "is required"))
    }

    for (name, min, max) in PARAMETER_RANGES
    {   match object.get(name)
        {   None => {}
          , Some(Value::Number(n)) => {
              let in_range = n.as_f64()
                .map(|v| v >= min && v <= max)
                .unwrap_or(false);
              if !in_range
              {   issues.push(ValidationIssue::new(
                    name,
                    format!("must be between {} and {}, got {}", min, max, n)
                  ));
              }
            }
          , Some(other) => {
              issues.push(ValidationIssue::new(
                name,
                format!("expected a number, got {}", json_kind(other))
              ));
            }
        }
    }

    if let Some(format) = object.get("response_format")
    {   check_response_format(format, &mut issues);
    }

    if issues.is_empty()
    {   Ok(())
    } else
    {   Err(issues)
    }
}

fn check_messages(
  object: &Map<String, Value>
, issues: &mut Vec<ValidationIssue>
)
{   let messages = match object.get("messages")
    {   Some(Value::Array(messages)) => messages
      , Some(other) => {
          issues.push(ValidationIssue::new(
            "messages",
            format!("expected an array, got {}", json_kind(other))
          ));
          return;
        }
      , None => {
          issues.push(ValidationIssue::new("messages", "is required"));
          return;
        }
    };

    if messages.is_empty()
    {   issues.push(ValidationIssue::new(
          "messages", "must contain at least one message"
        ));
        return;
    }

    for (i, message) in messages.iter().enumerate()
    {   let path = format!("messages[{}]", i);
        match message.get("role").and_then(Value::as_str)
        {   Some("user") => {}
          , Some("system") if i == 0 => {}
          , Some("system") => {
              issues.push(ValidationIssue::new(
                format!("{}.role", path),
                "system message must come first"
              ));
            }
          , Some(other) => {
              issues.push(ValidationIssue::new(
                format!("{}.role", path),
                format!("expected \"system\" or \"user\", got {:?}", other)
              ));
            }
          , None => {
              issues.push(ValidationIssue::new(
                format!("{}.role", path), "is required"
              ));
            }
        }
        match message.get("content").and_then(Value::as_str)
        {   Some(content) if !content.is_empty() => {}
          , Some(_) => {
              issues.push(ValidationIssue::new(
                format!("{}.content", path), "must not be empty"
              ));
            }
          , None => {
              issues.push(ValidationIssue::new(
                format!("{}.content", path), "must be a string"
              ));
            }
        }
    }

    let has_user = messages.iter()
      .any(|m| m.get("role").and_then(Value::as_str) == Some("user"));
    if !has_user
    {   issues.push(ValidationIssue::new(
          "messages", "a user message is required"
        ));
    }
}

fn check_response_format(
  format: &Value
, issues: &mut Vec<ValidationIssue>
)
{   let object = match format.as_object()
    {   Some(object) => object
      , None => {
          issues.push(ValidationIssue::new(
            "response_format",
            format!("expected an object, got {}", json_kind(format))
          ));
          return;
        }
    };
    if object.get("type").and_then(Value::as_str)
      != Some(RESPONSE_FORMAT_TYPE)
    {   issues.push(ValidationIssue::new(
          "response_format.type",
          format!("must be {:?}", RESPONSE_FORMAT_TYPE)
        ));
    }
    match object.get("json_schema")
    {   Some(Value::Object(_)) => {}
      , Some(other) => {
          issues.push(ValidationIssue::new(
            "response_format.json_schema",
            format!("expected an object, got {}", json_kind(other))
          ));
        }
      , None => {
          issues.push(ValidationIssue::new(
            "response_format.json_schema", "is required"
          ));
        }
    }
}

// ===== Inbound =====

/// Check a decoded gateway body and convert it. Any mismatch is
/// `InvalidResponse`; an empty `choices` array is well-formed and
/// passes through.
pub fn validate_response(body: &Value) -> Result<ChatResponse, ClientError>
{   let choices = match body.get("choices")
    {   Some(Value::Array(choices)) => choices
      , Some(other) => {
          return Err(ClientError::InvalidResponse(format!(
            "choices must be an array, got {}", json_kind(other)
          )));
        }
      , None => {
          return Err(ClientError::InvalidResponse(
            "missing choices array".to_string()
          ));
        }
    };

    for (i, choice) in choices.iter().enumerate()
    {   let message = choice.get("message")
          .filter(|m| m.is_object())
          .ok_or_else(|| {
            ClientError::InvalidResponse(
              format!("choices[{}].message must be an object", i)
            )
          })?;
        for field in ["role", "content"]
        {   if !message.get(field).map(Value::is_string).unwrap_or(false)
            {   return Err(ClientError::InvalidResponse(format!(
                  "choices[{}].message.{} must be a string", i, field
                )));
            }
        }
    }

    serde_json::from_value(body.clone())
      .map_err(|e| ClientError::InvalidResponse(e.to_string()))
}
