//! Resilient client for an OpenRouter-style chat-completion gateway.
//!
//! ```text
//! Conversation ──build──▶ ChatRequest ──validate──▶ send_with_retry
//!                                                     │  (Transport, per-attempt
//!                                                     │   timeout, backoff)
//!                                                     ▼
//!                        String ◀──extract── ChatResponse ◀──classify
//! ```
//!
//! Every failure is a [`ClientError`]; branch on [`ClientError::code`].
//!
//! ```no_run
//! # async fn demo() -> Result<(), openrouter_gateway::ClientError> {
//! use openrouter_gateway::{ClientConfig, OpenRouterClient};
//!
//! let mut client = OpenRouterClient::new(
//!   ClientConfig::new("sk-or-...").with_max_retries(2)
//! )?;
//! client
//!   .set_system_message("Answer in one word.")?
//!   .set_user_message("Capital of France?")?;
//! let answer = client.send_chat_message().await?;
//! # let _ = answer;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod config;
pub mod request;
pub mod validation;
pub mod transport;
pub mod retry;
pub mod client;
pub mod flashcards;

pub use client::{OpenRouterClient, RequestContext};
pub use config::ClientConfig;
pub use error::{ClientError, ErrorCode};
pub use request::{
  ChatMessage, ChatRequest, ChatResponse, Conversation, ModelParameters,
  ResponseFormat, Role,
};
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, RawResponse, Transport};
