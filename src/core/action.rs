//! # Actions
//!
//! Everything that can happen in Scout becomes an `Action`.
//! User submits a query? That's `Action::Submit { .. }`.
//! The graph finishes a node? That's `Action::Activity(event)`.
//!
//! The `update()` function takes the current state and an action, mutates
//! the state, and returns an `Effect` describing any I/O the event loop must
//! perform. No network or disk access happens here.
//!
//! ```text
//! State + Action  →  update()  →  New State + Effect
//! ```

use log::{debug, info, warn};

use crate::agent::{Effort, Message, ProcessedEvent, ResearchProgress, RunRequest};
use crate::core::state::App;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// User submitted a query from the welcome screen or the chat view.
    Submit {
        query: String,
        effort: Effort,
        model: String,
    },
    /// The backend created the conversation thread for this session.
    ThreadCreated(String),
    /// The server accepted the run.
    RunStarted { run_id: String },
    /// A graph node finished and produced a timeline entry.
    Activity(ProcessedEvent),
    /// Latest full message list reported by the server.
    MessagesSnapshot(Vec<Message>),
    /// Latest research loop counters reported by the server.
    Progress(ResearchProgress),
    /// The run's stream closed normally.
    RunFinished,
    RunFailed(String),
    /// User pressed Stop/Cancel.
    Cancel,
    /// User asked to start over with an empty session.
    NewResearch,
    Quit,
}

/// I/O the event loop performs after an update.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    SpawnRun(RunRequest),
    CancelRun { thread_id: String, run_id: String },
    ExportResult,
    Quit,
}

pub fn update(app: &mut App, action: Action) -> Effect {
    match action {
        Action::Submit {
            query,
            effort,
            model,
        } => {
            if app.is_loading || query.trim().is_empty() {
                debug!("Ignoring submit (loading={})", app.is_loading);
                return Effect::None;
            }

            let message_id = uuid::Uuid::new_v4().to_string();
            app.messages
                .push(Message::human(message_id.clone(), query.clone()));
            app.is_loading = true;
            app.live_events.clear();
            app.run_id = None;
            app.error = None;
            app.run_started_at = Some(chrono::Local::now());
            app.progress = None;
            app.awaiting_snapshot = true;
            app.status_message = format!("Researching ({} effort, {})", effort.label(), model);

            let request = RunRequest {
                thread_id: app.thread_id.clone(),
                message_id,
                query,
                effort,
                model,
            };
            info!("Submitting query (effort={:?}, model={})", effort, request.model);
            app.last_request = Some(request.clone());
            Effect::SpawnRun(request)
        }
        Action::ThreadCreated(thread_id) => {
            if let Some(request) = app.last_request.as_mut() {
                request.thread_id = Some(thread_id.clone());
            }
            app.thread_id = Some(thread_id);
            Effect::None
        }
        Action::RunStarted { run_id } => {
            if app.is_loading {
                app.run_id = Some(run_id);
            }
            Effect::None
        }
        Action::Activity(event) => {
            if app.is_loading {
                app.status_message = event.title.clone();
                app.live_events.push(event);
            }
            Effect::None
        }
        Action::MessagesSnapshot(messages) => {
            if app.is_loading {
                app.messages = messages;
                app.awaiting_snapshot = false;
            }
            Effect::None
        }
        Action::Progress(progress) => {
            if app.is_loading {
                app.progress = Some(progress);
            }
            Effect::None
        }
        Action::RunFinished => {
            if !app.is_loading {
                return Effect::None;
            }
            app.is_loading = false;
            app.run_id = None;

            let events = std::mem::take(&mut app.live_events);
            match current_answer_id(app) {
                Some(id) => {
                    info!("Run finished; {} activity events attached to {}", events.len(), id);
                    app.historical_activities.insert(id, events);
                    app.status_message = String::from("Done");
                    if app.export_dir.is_some() {
                        Effect::ExportResult
                    } else {
                        Effect::None
                    }
                }
                None => {
                    warn!("Run finished without an answer");
                    app.status_message = String::from("Finished without an answer");
                    Effect::None
                }
            }
        }
        Action::RunFailed(message) => {
            if !app.is_loading {
                return Effect::None;
            }
            warn!("Run failed: {}", message);
            app.is_loading = false;
            app.run_id = None;
            app.live_events.clear();
            app.status_message = format!("Error: {message}");
            app.error = Some(message);
            Effect::None
        }
        Action::Cancel => {
            if !app.is_loading {
                return Effect::None;
            }
            info!("Cancelling current run");
            app.is_loading = false;
            app.live_events.clear();
            app.status_message = String::from("Cancelled");
            match (app.thread_id.clone(), app.run_id.take()) {
                (Some(thread_id), Some(run_id)) => Effect::CancelRun { thread_id, run_id },
                _ => Effect::None,
            }
        }
        Action::NewResearch => {
            info!("Starting new research session");
            app.reset_session();
            Effect::None
        }
        Action::Quit => Effect::Quit,
    }
}

/// Id of the AI message answering the current request: the newest AI message
/// that comes after the request's human message.
fn current_answer_id(app: &App) -> Option<String> {
    let asked_at = app
        .last_request
        .as_ref()
        .and_then(|r| {
            app.messages
                .iter()
                .position(|m| m.id.as_deref() == Some(r.message_id.as_str()))
        })
        .unwrap_or(0);

    app.messages[asked_at..]
        .iter()
        .rev()
        .find(|m| m.is_ai())
        .and_then(|m| m.id.clone())
}
