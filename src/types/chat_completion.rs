use serde::{Deserialize, Serialize};

/// A complete (non-streamed) chat completion response.
///
/// Only the fields chatline reads are modelled; everything else in the body
/// is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletion {
    /// Unique identifier assigned by the endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The model that produced the reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Candidate replies; chatline uses the first.
    #[serde(default)]
    pub choices: Vec<Choice>,

    /// Token accounting, when the endpoint reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<CompletionUsage>,
}

/// One candidate reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    /// Position of this choice in `choices`.
    #[serde(default)]
    pub index: u32,

    /// The reply itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<ChoiceMessage>,

    /// Why generation stopped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// The message carried by a [`Choice`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChoiceMessage {
    /// The author role reported by the endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// The reply text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Token usage reported with a completion.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionUsage {
    /// Tokens in the request.
    #[serde(default)]
    pub prompt_tokens: u64,

    /// Tokens in the reply.
    #[serde(default)]
    pub completion_tokens: u64,

    /// Sum of both.
    #[serde(default)]
    pub total_tokens: u64,
}

impl ChatCompletion {
    /// The text at `choices[0].message.content`, if present.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.as_ref())
            .and_then(|message| message.content.as_deref())
    }
}
