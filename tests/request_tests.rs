use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use openrouter_gateway::request::DEFAULT_MODEL;
use openrouter_gateway::{
  ChatMessage, ClientError, Conversation, ErrorCode, ModelParameters, Role,
};

#[test]
fn test_user_message_is_last_and_trimmed()
{   for text in ["hello", "  padded  ", "multi\nline", "ünïcödé"]
    {   let mut conversation = Conversation::new();
        assert_ok!(conversation.set_user_message(text));
        let request = conversation.build().unwrap();
        let last = request.messages.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, text.trim());
    }
}

#[test]
fn test_blank_user_message_rejected()
{   for text in ["", " ", "\t\n  "]
    {   let mut conversation = Conversation::new();
        let err = conversation.set_user_message(text).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidUserMessage);
    }
}

#[test]
fn test_blank_system_message_and_model_rejected()
{   let mut conversation = Conversation::new();
    assert_eq!(
      conversation.set_system_message("   ").unwrap_err(),
      ClientError::InvalidSystemMessage
    );
    assert_eq!(
      conversation.set_model("  ", None).unwrap_err().code(),
      ErrorCode::InvalidModelName
    );
    // Failed setters leave the previous state alone
    assert_eq!(conversation.model(), DEFAULT_MODEL);
    assert!(conversation.system_message().is_none());
}

#[test]
fn test_build_without_user_message_fails()
{   let mut with_system = Conversation::new();
    with_system.set_system_message("be brief").unwrap();

    let mut with_model = Conversation::new();
    with_model
      .set_model("anthropic/claude-3-haiku", Some(&ModelParameters::none()
        .with_temperature(0.1)))
      .unwrap()
      .set_response_format(json!({ "type": "object" }))
      .unwrap();

    for conversation in [Conversation::new(), with_system, with_model]
    {   let err = conversation.build().unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingUserMessage);
    }
}

#[test]
fn test_setters_overwrite_rather_than_append()
{   let mut conversation = Conversation::new();
    conversation
      .set_system_message("first system").unwrap()
      .set_system_message("second system").unwrap()
      .set_user_message("first user").unwrap()
      .set_user_message("second user").unwrap();

    let request = conversation.build().unwrap();
    assert_eq!(
      request.messages,
      vec![
        ChatMessage::system("second system"),
        ChatMessage::user("second user"),
      ]
    );
}

#[test]
fn test_round_trip_serialization()
{   let mut conversation = Conversation::new();
    conversation
      .set_system_message("S").unwrap()
      .set_user_message("U").unwrap()
      .set_model("m", None).unwrap();

    let value = serde_json::to_value(conversation.build().unwrap()).unwrap();
    assert_eq!(
      value["messages"],
      json!([
        { "role": "system", "content": "S" },
        { "role": "user", "content": "U" }
      ])
    );
    assert_eq!(value["model"], json!("m"));
    assert_eq!(value["temperature"], json!(0.7));
    assert_eq!(value["top_p"], json!(1.0));
    assert_eq!(value["frequency_penalty"], json!(0.0));
    assert_eq!(value["presence_penalty"], json!(0.0));
    assert!(value.get("response_format").is_none());
}

#[test]
fn test_model_parameters_shallow_merge()
{   let mut conversation = Conversation::new();
    conversation
      .set_model("test-model", Some(&ModelParameters::none()
        .with_temperature(0.8)))
      .unwrap();
    assert_eq!(
      conversation.parameters(),
      &ModelParameters::default().with_temperature(0.8)
    );

    conversation
      .set_model("test-model", Some(&ModelParameters::none()
        .with_presence_penalty(1.5)))
      .unwrap();
    let params = conversation.parameters();
    assert_eq!(params.temperature, Some(0.8));
    assert_eq!(params.top_p, Some(1.0));
    assert_eq!(params.frequency_penalty, Some(0.0));
    assert_eq!(params.presence_penalty, Some(1.5));
}

#[test]
fn test_response_format_attached_when_set()
{   let schema = json!({
      "type": "object",
      "properties": { "test": { "type": "string" } }
    });
    let mut conversation = Conversation::new();
    conversation
      .set_user_message("U").unwrap()
      .set_response_format(schema.clone()).unwrap();

    let value = serde_json::to_value(conversation.build().unwrap()).unwrap();
    assert_eq!(
      value["response_format"],
      json!({ "type": "json_schema", "json_schema": schema })
    );
}

#[test]
fn test_non_object_response_format_rejected()
{   let mut conversation = Conversation::new();
    for schema in [json!(null), json!("not an object"), json!([1, 2]), json!(3)]
    {   let err = assert_err!(conversation.set_response_format(schema));
        assert_eq!(err.code(), ErrorCode::InvalidResponseFormat);
    }
    assert!(conversation.response_format().is_none());
}
