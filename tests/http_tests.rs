//! The reqwest transport against a local wiremock gateway

mod common;

use std::time::Duration;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use openrouter_gateway::{
  ClientConfig, ClientError, ErrorCode, HttpTransport, OpenRouterClient,
  RetryPolicy, Transport,
};
use common::{init_logging, ok_body};

fn fast_policy(max_retries: u32) -> RetryPolicy
{   RetryPolicy
    {   max_retries
      , initial_backoff: Duration::from_millis(5)
      , max_backoff: Duration::from_millis(20)
    }
}

fn client_for(
  server: &MockServer
, max_retries: u32
) -> OpenRouterClient
{   let config = ClientConfig::new("sk-mock-key")
      .with_base_url(server.uri())
      .with_max_retries(max_retries)
      .with_timeout_ms(2_000);
    let mut client = OpenRouterClient::new(config)
      .unwrap()
      .with_retry_policy(fast_policy(max_retries))
      .unwrap();
    client
      .set_system_message("S").unwrap()
      .set_user_message("U").unwrap()
      .set_model("m", None).unwrap();
    client
}

#[tokio::test]
async fn test_request_shape_and_headers()
{   init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(header("Authorization", "Bearer sk-mock-key"))
      .and(header("Content-Type", "application/json"))
      .and(header("X-Title", "Flashcards App"))
      .and(body_json(json!({
        "messages": [
          { "role": "system", "content": "S" },
          { "role": "user", "content": "U" }
        ],
        "model": "m",
        "temperature": 0.7,
        "top_p": 1.0,
        "frequency_penalty": 0.0,
        "presence_penalty": 0.0
      })))
      .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("Hello!")))
      .expect(1)
      .mount(&server)
      .await;

    let client = client_for(&server, 3);
    assert_eq!(client.send_chat_message().await.unwrap(), "Hello!");
}

#[tokio::test]
async fn test_trailing_slash_in_base_url()
{   let config = ClientConfig::new("k").with_base_url("http://localhost:1/api/v1/");
    let transport = HttpTransport::new(&config).unwrap();
    assert_eq!(transport.endpoint(), "http://localhost:1/api/v1/chat/completions");
}

#[tokio::test]
async fn test_unauthorized_stops_after_one_call()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .respond_with(ResponseTemplate::new(401).set_body_json(json!({
        "error": { "message": "No auth credentials found", "code": 401 }
      })))
      .expect(1)
      .mount(&server)
      .await;

    let err = client_for(&server, 3).send_chat_message().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ApiError);
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.to_string(), "No auth credentials found");
}

#[tokio::test]
async fn test_server_error_uses_whole_budget()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .respond_with(ResponseTemplate::new(500).set_body_json(json!({
        "error": { "message": "Internal server error" }
      })))
      .expect(3)
      .mount(&server)
      .await;

    let err = client_for(&server, 3).send_chat_message().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::MaxRetriesExceeded);
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_slow_attempt_is_aborted_then_retried()
{   init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(ok_body("too late"))
          .set_delay(Duration::from_millis(1_500))
      )
      .up_to_n_times(1)
      .with_priority(1)
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("42")))
      .mount(&server)
      .await;

    let config = ClientConfig::new("sk-mock-key")
      .with_base_url(server.uri())
      .with_max_retries(2)
      .with_timeout_ms(100);
    let mut client = OpenRouterClient::new(config)
      .unwrap()
      .with_retry_policy(fast_policy(2))
      .unwrap();
    client.set_user_message("What is six times seven?").unwrap();

    assert_eq!(client.send_chat_message().await.unwrap(), "42");
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
}

#[tokio::test]
async fn test_transport_reports_timeout()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(ok_body("slow"))
          .set_delay(Duration::from_millis(1_000))
      )
      .mount(&server)
      .await;

    let config = ClientConfig::new("k").with_base_url(server.uri());
    let transport = HttpTransport::new(&config).unwrap();
    let mut conversation = openrouter_gateway::Conversation::new();
    conversation.set_user_message("hi").unwrap();
    let request = conversation.build().unwrap();

    let err = transport
      .post_chat(&request, Duration::from_millis(50))
      .await
      .unwrap_err();
    assert_eq!(err, ClientError::Timeout(50));
}

#[tokio::test]
async fn test_non_json_bodies()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
      .up_to_n_times(1)
      .with_priority(1)
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
      .mount(&server)
      .await;

    let err = client_for(&server, 2).send_chat_message().await.unwrap_err();
    match err
    {   ClientError::MaxRetriesExceeded { attempts, last } => {
          assert_eq!(attempts, 2);
          assert_eq!(last.code(), ErrorCode::InvalidResponse);
        }
      , other => panic!("unexpected error: {:?}", other)
    }

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
}

#[tokio::test]
async fn test_unreachable_gateway_is_network_error()
{   // Nothing listens on port 9 locally
    let config = ClientConfig::new("k")
      .with_base_url("http://127.0.0.1:9")
      .with_max_retries(1);
    let mut client = OpenRouterClient::new(config).unwrap();
    client.set_user_message("hi").unwrap();

    match client.send_chat_message().await.unwrap_err()
    {   ClientError::MaxRetriesExceeded { last, .. } => {
          assert_eq!(last.code(), ErrorCode::NetworkError);
        }
      , other => panic!("unexpected error: {:?}", other)
    }
}
