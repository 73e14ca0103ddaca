#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::Instant;
use openrouter_gateway::{
  ChatRequest, ClientConfig, ClientError, OpenRouterClient, RawResponse,
  Transport,
};

pub type Reply = Result<RawResponse, ClientError>;

/// Scripted transport: hands out queued replies in order, then
/// repeats the fallback. Records when each call arrived.
pub struct MockTransport
{   replies: Mutex<VecDeque<Reply>>
  , fallback: Reply
  , calls: Mutex<Vec<Instant>>
  , requests: Mutex<Vec<ChatRequest>>
}

impl MockTransport
{   pub fn new(replies: Vec<Reply>, fallback: Reply) -> Self
    {   MockTransport
        {   replies: Mutex::new(replies.into())
          , fallback
          , calls: Mutex::new(Vec::new())
          , requests: Mutex::new(Vec::new())
        }
    }

    /// Every call gets the same reply
    pub fn always(reply: Reply) -> Self
    {   Self::new(vec![], reply)
    }

    pub fn call_count(&self) -> usize
    {   self.calls.lock().unwrap().len()
    }

    /// Milliseconds between consecutive calls
    pub fn gaps_ms(&self) -> Vec<u128>
    {   let calls = self.calls.lock().unwrap();
        calls.windows(2)
          .map(|w| (w[1] - w[0]).as_millis())
          .collect()
    }

    pub fn requests(&self) -> Vec<ChatRequest>
    {   self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport
{   async fn post_chat(
      &self
    , request: &ChatRequest
    , _timeout: Duration
    ) -> Result<RawResponse, ClientError>
    {   self.calls.lock().unwrap().push(Instant::now());
        self.requests.lock().unwrap().push(request.clone());
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

pub fn init_logging()
{   let _ = env_logger::builder().is_test(true).try_init();
}

pub fn ok_body(content: &str) -> Value
{   json!({
      "choices": [
        { "message": { "role": "assistant", "content": content } }
      ]
    })
}

pub fn ok_reply(content: &str) -> Reply
{   Ok(RawResponse::new(200, ok_body(content)))
}

pub fn status_reply(status: u16) -> Reply
{   Ok(RawResponse::new(
      status,
      json!({ "error": { "message": format!("upstream said {}", status) } })
    ))
}

pub fn config(max_retries: u32) -> ClientConfig
{   ClientConfig::new("test-api-key")
      .with_max_retries(max_retries)
      .with_timeout_ms(1_000)
}

/// Client with a staged user message, ready to send
pub fn ready_client(
  max_retries: u32
, transport: MockTransport
) -> OpenRouterClient<MockTransport>
{   let mut client = OpenRouterClient::with_transport(
      config(max_retries),
      transport
    ).unwrap();
    client.set_user_message("What is six times seven?").unwrap();
    client
}
