//! Streaming chat-completion chunk, as carried in `data: <json>` SSE lines.

use serde::{Deserialize, Serialize};

/// Prefix of an SSE data line
pub const DATA_PREFIX: &str = "data: ";

/// Payload that ends a completion stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// `{ "choices": [ { "delta": { "content": "..." } } ] }`
///
/// Only the fields the relay protocol relies on are modelled; anything else
/// the upstream sends (ids, finish reasons, usage) is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl CompletionChunk {
    /// Chunk carrying a single text delta.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChunkChoice {
                delta: ChunkDelta {
                    content: Some(content.into()),
                },
            }],
        }
    }

    /// `choices[0].delta.content`, if present and non-empty.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .filter(|content| !content.is_empty())
    }
}
