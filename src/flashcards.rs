//! Flashcard generation on top of the gateway client.
//!
//! Sends the whole source text in one request with a structured-output
//! schema, then checks the reply before handing back suggestions.
//! Storing them is the caller's business.

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use crate::client::OpenRouterClient;
use crate::error::ClientError;
use crate::request::Conversation;
use crate::transport::Transport;

pub const GENERATION_MODEL: &str = "openai/gpt-4o-mini";
pub const MIN_SOURCE_CHARS: usize = 1_000;
pub const MAX_SOURCE_CHARS: usize = 15_000;

const SYSTEM_PROMPT: &str = "\
You are an expert educational content creator specializing in creating high-quality flashcards.
Create concise, clear, and accurate flashcards based on the provided text. Each flashcard should:
- Have a clear question or concept on the front
- Have a precise and complete answer on the back
- Be self-contained and understandable without external context
- Focus on one specific concept or piece of information
- Use clear, simple language
Return ONLY a JSON object with a 'flashcards' array of objects with 'front' and 'back' properties.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestionSource
{   AiFull
  , AiEdited
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardSuggestion
{   pub front: String
  , pub back: String
  , pub source: SuggestionSource
}

#[derive(Debug, Deserialize)]
struct RawCard
{   front: String
  , back: String
}

#[derive(Debug, Error)]
pub enum GenerationError
{   #[error("Source text must be {min} to {max} characters, got {actual}")]
    SourceTextLength
    {   actual: usize
      , min: usize
      , max: usize
    }
  , #[error(transparent)]
    Client(#[from] ClientError)
  , #[error("Invalid JSON in API response: {0}")]
    InvalidJson(String)
  , #[error("Invalid flashcards in API response: {0}")]
    InvalidSuggestions(String)
}

impl GenerationError
{   /// Code recorded against a failed generation
    pub fn error_code(&self) -> &'static str
    {   match self
        {   GenerationError::Client(e) => e.code().as_str()
          , _ => "UNKNOWN_ERROR"
        }
    }
}

/// JSON schema the model's reply must follow
pub fn flashcards_schema() -> Value
{   json!({
      "name": "flashcards",
      "schema": {
        "type": "object",
        "properties": {
          "flashcards": {
            "type": "array",
            "items": {
              "type": "object",
              "properties": {
                "front": { "type": "string" },
                "back": { "type": "string" }
              },
              "required": ["front", "back"]
            }
          }
        },
        "required": ["flashcards"]
      }
    })
}

/// Parse the model's reply into suggestions
pub fn parse_suggestions(
  content: &str
) -> Result<Vec<FlashcardSuggestion>, GenerationError>
{   let parsed: Value = serde_json::from_str(content)
      .map_err(|e| GenerationError::InvalidJson(e.to_string()))?;
    let cards = parsed.get("flashcards")
      .cloned()
      .ok_or_else(|| {
        GenerationError::InvalidSuggestions(
          "missing flashcards field".to_string()
        )
      })?;
    let cards: Vec<RawCard> = serde_json::from_value(cards)
      .map_err(|e| GenerationError::InvalidSuggestions(e.to_string()))?;
    Ok(cards
      .into_iter()
      .map(|card| FlashcardSuggestion
      {   front: card.front
        , back: card.back
        , source: SuggestionSource::AiFull
      })
      .collect())
}

/// One generator per generation request
pub struct FlashcardGenerator<T: Transport>
{   client: OpenRouterClient<T>
}

impl<T: Transport> FlashcardGenerator<T>
{   pub fn new(client: OpenRouterClient<T>) -> Self
    {   FlashcardGenerator { client }
    }

    pub fn client(&self) -> &OpenRouterClient<T>
    {   &self.client
    }

    /// The conversation sent for `source_text`
    pub fn conversation_for(
      &self
    , source_text: &str
    ) -> Result<Conversation, ClientError>
    {   let mut conversation = Conversation::new();
        conversation
          .set_system_message(SYSTEM_PROMPT)?
          .set_model(GENERATION_MODEL, None)?
          .set_response_format(flashcards_schema())?
          .set_user_message(&format!(
            "Create flashcards from this text. Return ONLY a JSON object \
             with a 'flashcards' array of objects with 'front' and 'back' \
             properties: {}",
            source_text
          ))?;
        Ok(conversation)
    }

    pub async fn generate(
      &self
    , source_text: &str
    ) -> Result<Vec<FlashcardSuggestion>, GenerationError>
    {   let chars = source_text.chars().count();
        info!("Starting flashcard generation (text length {})", chars);
        if !(MIN_SOURCE_CHARS..=MAX_SOURCE_CHARS).contains(&chars)
        {   return Err(GenerationError::SourceTextLength
            {   actual: chars
              , min: MIN_SOURCE_CHARS
              , max: MAX_SOURCE_CHARS
            });
        }

        let conversation = self.conversation_for(source_text)?;
        let content = self.client.send(&conversation).await?;
        debug!("Completion received ({} bytes)", content.len());

        match parse_suggestions(&content)
        {   Ok(suggestions) => {
              info!("Generated {} suggestions", suggestions.len());
              Ok(suggestions)
            }
          , Err(e) => {
              error!(
                "Could not use completion ({} bytes): {}",
                content.len(), e
              );
              Err(e)
            }
        }
    }
}
