// Public modules
pub mod chat_completion;
pub mod chat_completion_chunk;
pub mod chat_completion_request;
pub mod message;
pub mod mode;
pub mod stream_event;

// Re-exports
pub use chat_completion::{ChatCompletion, Choice, ChoiceMessage, CompletionUsage};
pub use chat_completion_chunk::{ChatCompletionChunk, ChunkChoice, ChunkDelta};
pub use chat_completion_request::ChatCompletionRequest;
pub use message::{Message, Role};
pub use mode::Mode;
pub use stream_event::StreamEvent;
