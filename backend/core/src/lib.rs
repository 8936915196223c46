pub mod error;
pub mod message;
pub mod property;
pub mod traits;

pub use error::AtlasError;
pub use message::{filter_history, ChatMessage, ChatRequest, ChatRole, HistoryEntry};
pub use property::{catalog, find_property, Property, PropertyFocus, PropertyStatus};
pub use traits::{CompletionRequest, FragmentStream, LlmProvider, PromptMessage, PromptRole};
