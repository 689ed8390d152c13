use serde::{Deserialize, Serialize};
use std::fmt;

/// How assistant replies are requested and displayed.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Request a streamed reply and echo each token as it arrives.
    #[default]
    Streaming,

    /// Request the whole reply at once and display it formatted as markdown.
    Rendered,
}

impl Mode {
    /// The mode selected by a "start in markdown mode" flag.
    pub fn from_markdown_flag(markdown: bool) -> Self {
        if markdown {
            Mode::Rendered
        } else {
            Mode::Streaming
        }
    }

    /// Returns true if replies are streamed token by token.
    pub fn is_streaming(self) -> bool {
        matches!(self, Mode::Streaming)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Streaming => write!(f, "streaming"),
            Mode::Rendered => write!(f, "markdown"),
        }
    }
}
