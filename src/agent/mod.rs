pub mod backend;
pub mod langgraph;
pub mod types;

pub use backend::{BackendError, ResearchBackend, RunInput};
pub use langgraph::LangGraphClient;
pub use types::{Effort, Message, MessageType, ProcessedEvent, ResearchProgress, RunRequest, StreamEvent, SUPPORTED_MODELS};
