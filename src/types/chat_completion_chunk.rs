use serde::{Deserialize, Serialize};

/// One `data: ` record of a streamed chat completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionChunk {
    /// Incremental choices; chatline reads the first.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

/// One incremental choice of a [`ChatCompletionChunk`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkChoice {
    /// The increment carried by this chunk.
    #[serde(default)]
    pub delta: ChunkDelta,
}

/// The incremental content of a [`ChunkChoice`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkDelta {
    /// The next fragment of assistant text, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// The non-empty text at `choices[0].delta.content`, if present.
    pub fn token(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .filter(|content| !content.is_empty())
    }
}
