//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::agent::{BackendError, ResearchBackend, RunInput, StreamEvent};

/// A no-op backend for tests that don't need a LangGraph server.
pub struct NoopBackend;

#[async_trait]
impl ResearchBackend for NoopBackend {
    fn name(&self) -> &str {
        "noop"
    }

    async fn create_thread(&self) -> Result<String, BackendError> {
        Ok("noop-thread".to_string())
    }

    async fn stream_run(
        &self,
        _input: RunInput<'_>,
        _sender: Sender<StreamEvent>,
    ) -> Result<(), BackendError> {
        Ok(())
    }

    async fn cancel_run(&self, _thread_id: &str, _run_id: &str) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Creates a test App with a NoopBackend.
pub fn test_app() -> crate::core::state::App {
    crate::core::state::App::new(Arc::new(NoopBackend))
}

/// Flattens a rendered buffer into one string per row.
pub fn buffer_rows(buffer: &ratatui::buffer::Buffer) -> Vec<String> {
    let width = buffer.area.width as usize;
    buffer
        .content()
        .chunks(width.max(1))
        .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
        .collect()
}
