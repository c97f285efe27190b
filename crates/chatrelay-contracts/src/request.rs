//! Chat request body and its boundary validation.
//!
//! A [`ChatRequest`] can only be built through [`ChatRequest::new`],
//! [`ChatRequest::from_value`] or [`ChatRequest::from_slice`], so holding one
//! means the message list is within bounds.

use serde::Serialize;
use serde_json::Value;

use crate::error::ValidationError;
use crate::message::{ChatMessage, Role};

/// Maximum number of messages accepted in one request
pub const MAX_MESSAGES: usize = 50;

/// Maximum length of one message, in characters
pub const MAX_CONTENT_CHARS: usize = 10_000;

/// Validated `{ "messages": [...] }` request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// Validate already-typed messages.
    pub fn new(messages: Vec<ChatMessage>) -> Result<Self, ValidationError> {
        check_count(messages.len())?;
        for (index, message) in messages.iter().enumerate() {
            check_content(index, &message.content)?;
        }
        Ok(Self { messages })
    }

    /// Validate a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|_| ValidationError::InvalidJson)?;
        Self::from_value(&value)
    }

    /// Validate a decoded JSON body, reporting the first offending message.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let items = value
            .get("messages")
            .and_then(Value::as_array)
            .ok_or(ValidationError::MessagesNotArray)?;
        check_count(items.len())?;

        let mut messages = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let role = item
                .get("role")
                .and_then(Value::as_str)
                .and_then(Role::parse)
                .ok_or(ValidationError::InvalidRole(index))?;
            let content = item
                .get("content")
                .and_then(Value::as_str)
                .ok_or(ValidationError::InvalidContent(index))?;
            check_content(index, content)?;
            messages.push(ChatMessage::new(role, content));
        }

        Ok(Self { messages })
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }
}

fn check_count(count: usize) -> Result<(), ValidationError> {
    if count == 0 {
        return Err(ValidationError::EmptyMessages);
    }
    if count > MAX_MESSAGES {
        return Err(ValidationError::TooManyMessages(count));
    }
    Ok(())
}

fn check_content(index: usize, content: &str) -> Result<(), ValidationError> {
    // Byte length bounds the char count from above, so most messages skip the scan.
    if content.len() > MAX_CONTENT_CHARS && content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ValidationError::ContentTooLong(index));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_messages(count: usize) -> Value {
        let messages: Vec<Value> = (0..count)
            .map(|i| json!({"role": "user", "content": format!("message {i}")}))
            .collect();
        json!({ "messages": messages })
    }

    #[test]
    fn test_accepts_bounds() {
        assert_eq!(
            ChatRequest::from_value(&user_messages(1)).unwrap().messages().len(),
            1
        );
        assert_eq!(
            ChatRequest::from_value(&user_messages(MAX_MESSAGES))
                .unwrap()
                .messages()
                .len(),
            MAX_MESSAGES
        );
    }

    #[test]
    fn test_rejects_empty_and_oversized_arrays() {
        assert_eq!(
            ChatRequest::from_value(&user_messages(0)),
            Err(ValidationError::EmptyMessages)
        );
        assert_eq!(
            ChatRequest::from_value(&user_messages(51)),
            Err(ValidationError::TooManyMessages(51))
        );
    }

    #[test]
    fn test_rejects_missing_or_non_array_messages() {
        for body in [json!({}), json!({"messages": "hi"}), json!([1, 2])] {
            assert_eq!(
                ChatRequest::from_value(&body),
                Err(ValidationError::MessagesNotArray)
            );
        }
    }

    #[test]
    fn test_rejects_bad_role_with_index() {
        let body = json!({"messages": [
            {"role": "user", "content": "a"},
            {"role": "tool", "content": "b"},
        ]});
        assert_eq!(
            ChatRequest::from_value(&body),
            Err(ValidationError::InvalidRole(1))
        );

        let body = json!({"messages": ["just text"]});
        assert_eq!(
            ChatRequest::from_value(&body),
            Err(ValidationError::InvalidRole(0))
        );
    }

    #[test]
    fn test_rejects_non_string_content() {
        let body = json!({"messages": [{"role": "user", "content": 42}]});
        assert_eq!(
            ChatRequest::from_value(&body),
            Err(ValidationError::InvalidContent(0))
        );
    }

    #[test]
    fn test_content_limit_counts_characters() {
        let at_limit = "é".repeat(MAX_CONTENT_CHARS);
        assert!(ChatRequest::new(vec![ChatMessage::user(at_limit)]).is_ok());

        let over = "a".repeat(MAX_CONTENT_CHARS + 1);
        assert_eq!(
            ChatRequest::new(vec![ChatMessage::user("ok"), ChatMessage::user(over)]),
            Err(ValidationError::ContentTooLong(1))
        );
    }

    #[test]
    fn test_preserves_order_and_content() {
        let body = json!({"messages": [
            {"role": "system", "content": "  spaced  "},
            {"role": "user", "content": "Hi"},
            {"role": "assistant", "content": ""},
        ], "extra": true});
        let request = ChatRequest::from_value(&body).unwrap();
        assert_eq!(
            request.messages(),
            &[
                ChatMessage::system("  spaced  "),
                ChatMessage::user("Hi"),
                ChatMessage::assistant(""),
            ]
        );
    }

    #[test]
    fn test_from_slice_rejects_invalid_json() {
        assert_eq!(
            ChatRequest::from_slice(b"{not json"),
            Err(ValidationError::InvalidJson)
        );
    }
}
