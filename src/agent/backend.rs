use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use super::types::{Effort, StreamEvent};

/// Errors that can occur while talking to the agent runtime.
#[derive(Debug)]
pub enum BackendError {
    /// Backend misconfigured (bad URL, empty assistant id).
    Config(String),
    /// Network-level failure (timeout, DNS, connection refused).
    Network(String),
    /// Server returned an error response.
    Api { status: u16, message: String },
    /// Failed to parse the server's response.
    Parse(String),
    /// The UI dropped the receiving end of the event channel.
    ChannelClosed,
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Config(msg) => write!(f, "config error: {msg}"),
            BackendError::Network(msg) => write!(f, "network error: {msg}"),
            BackendError::Api { status, message } => {
                write!(f, "API error (HTTP {status}): {message}")
            }
            BackendError::Parse(msg) => write!(f, "parse error: {msg}"),
            BackendError::ChannelClosed => write!(f, "channel closed"),
        }
    }
}

impl std::error::Error for BackendError {}

/// Everything a backend needs to start one research run.
pub struct RunInput<'a> {
    pub thread_id: &'a str,
    pub message_id: &'a str,
    pub query: &'a str,
    pub effort: Effort,
    pub model: &'a str,
}

#[async_trait]
pub trait ResearchBackend: Send + Sync {
    /// Returns the name of the backend.
    fn name(&self) -> &str;

    /// Creates a server-side conversation thread and returns its id.
    async fn create_thread(&self) -> Result<String, BackendError>;

    /// Starts a run on `input.thread_id` and forwards decoded stream events to `sender`
    /// until the server closes the stream.
    async fn stream_run(
        &self,
        input: RunInput<'_>,
        sender: Sender<StreamEvent>,
    ) -> Result<(), BackendError>;

    /// Asks the server to stop a run in progress.
    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::NoopBackend;
    use std::sync::Arc;

    #[test]
    fn backend_is_usable_as_shared_trait_object() {
        let backend: Arc<dyn ResearchBackend> = Arc::new(NoopBackend);
        assert_eq!(backend.name(), "noop");
        let thread_id = tokio_test::block_on(backend.create_thread()).unwrap();
        assert_eq!(thread_id, "noop-thread");
        tokio_test::block_on(backend.cancel_run(&thread_id, "r-1")).unwrap();
    }

    #[test]
    fn api_error_display_includes_status() {
        let err = BackendError::Api {
            status: 409,
            message: "run already finished".to_string(),
        };
        assert_eq!(err.to_string(), "API error (HTTP 409): run already finished");
    }
}
