//! # Application State
//!
//! Core business state for Scout. Domain data only; presentation state
//! (scroll offsets, the form being typed into) lives in the `tui` module.
//!
//! ```text
//! App
//! ├── backend: Arc<dyn ResearchBackend>        // LangGraph client
//! ├── messages: Vec<Message>                   // transcript
//! ├── is_loading: bool                         // a run is in flight
//! ├── live_events: Vec<ProcessedEvent>         // timeline of the in-flight run
//! ├── historical_activities: HashMap<id, Vec>  // timelines of finished runs, by AI message id
//! ├── thread_id / run_id: Option<String>       // server-side handles
//! ├── last_request: Option<RunRequest>         // settings of the current turn
//! ├── run_started_at: Option<DateTime<Local>>  // when the current turn was submitted
//! ├── progress: Option<ResearchProgress>       // loop counters of the current turn
//! ├── awaiting_snapshot: bool                  // submitted, server hasn't sent messages yet
//! ├── status_message / error
//! └── export_dir: Option<PathBuf>
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::agent::{Message, ProcessedEvent, ResearchBackend, ResearchProgress, RunRequest};
use crate::core::config::ResolvedConfig;

pub const WELCOME_STATUS: &str = "Ready";

pub struct App {
    pub backend: Arc<dyn ResearchBackend>,
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub live_events: Vec<ProcessedEvent>,
    pub historical_activities: HashMap<String, Vec<ProcessedEvent>>,
    pub thread_id: Option<String>,
    pub run_id: Option<String>,
    pub last_request: Option<RunRequest>,
    pub run_started_at: Option<DateTime<Local>>,
    pub progress: Option<ResearchProgress>,
    pub awaiting_snapshot: bool,
    pub status_message: String,
    pub error: Option<String>,
    pub export_dir: Option<PathBuf>,
}

impl App {
    pub fn new(backend: Arc<dyn ResearchBackend>) -> Self {
        Self {
            backend,
            messages: Vec::new(),
            is_loading: false,
            live_events: Vec::new(),
            historical_activities: HashMap::new(),
            thread_id: None,
            run_id: None,
            last_request: None,
            run_started_at: None,
            progress: None,
            awaiting_snapshot: false,
            status_message: String::from(WELCOME_STATUS),
            error: None,
            export_dir: None,
        }
    }

    pub fn from_config(backend: Arc<dyn ResearchBackend>, config: &ResolvedConfig) -> Self {
        Self {
            export_dir: config.export_dir.clone(),
            ..Self::new(backend)
        }
    }

    /// Drop everything tied to the current conversation; keeps backend and settings.
    pub fn reset_session(&mut self) {
        self.messages.clear();
        self.is_loading = false;
        self.live_events.clear();
        self.historical_activities.clear();
        self.thread_id = None;
        self.run_id = None;
        self.last_request = None;
        self.run_started_at = None;
        self.progress = None;
        self.awaiting_snapshot = false;
        self.status_message = String::from(WELCOME_STATUS);
        self.error = None;
    }

    pub fn has_visible_messages(&self) -> bool {
        self.messages.iter().any(Message::is_visible)
    }

    /// The opening query of a session is in flight and the server has not
    /// reported any messages or activity for it yet.
    pub fn is_opening_run_pending(&self) -> bool {
        self.is_loading
            && self.awaiting_snapshot
            && self.live_events.is_empty()
            && self.messages.iter().filter(|m| m.is_visible()).count() <= 1
    }

    /// The newest AI-authored message, if any.
    pub fn last_ai_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_ai())
    }
}

#[cfg(test)]
mod tests {
    use crate::agent::Message;
    use crate::test_support::test_app;

    #[test]
    fn test_app_new_defaults() {
        let app = test_app();
        assert_eq!(app.status_message, "Ready");
        assert!(!app.is_loading);
        assert!(app.messages.is_empty());
        assert!(app.thread_id.is_none());
    }

    #[test]
    fn test_last_ai_message_skips_trailing_human() {
        let mut app = test_app();
        app.messages.push(Message::human("h1".into(), "q".into()));
        app.messages.push(Message::ai(Some("a1".into()), "answer".into()));
        app.messages.push(Message::human("h2".into(), "follow-up".into()));
        assert_eq!(app.last_ai_message().and_then(|m| m.id.as_deref()), Some("a1"));
    }

    #[test]
    fn test_opening_run_pending_only_before_server_reports() {
        let mut app = test_app();
        app.messages.push(Message::human("h1".into(), "q".into()));
        app.is_loading = true;
        app.awaiting_snapshot = true;
        assert!(app.is_opening_run_pending());

        app.awaiting_snapshot = false;
        assert!(!app.is_opening_run_pending());

        // A follow-up in an existing conversation never counts as opening
        app.awaiting_snapshot = true;
        app.messages.push(Message::ai(Some("a1".into()), "answer".into()));
        app.messages.push(Message::human("h2".into(), "more".into()));
        assert!(!app.is_opening_run_pending());
    }
}
