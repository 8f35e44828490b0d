//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the UI,
//! translates keyboard events into `core::Action` values and performs the
//! `Effect`s the reducer asks for (spawning runs, cancelling them on the
//! server, exporting results).
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Redraw Strategy
//!
//! - **Animating** (a run is in flight): draws every ~80ms so the timeline
//!   indicator and loading dots pulse.
//! - **Idle**: sleeps up to 500ms, only redraws on events or terminal resize.
//!
//! A `SteadyBlock` cursor style is used instead of a blinking cursor because
//! ratatui's `set_cursor_position` resets the terminal's blink timer on every
//! `draw()` call, making blinking cursors appear erratic during continuous redraws.

pub mod component;
pub mod components;
pub mod event;
pub mod markdown;
mod ui;

use log::{debug, info, warn};
use std::io::stdout;
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use tokio::task::AbortHandle;

use crate::agent::{LangGraphClient, ResearchBackend, RunInput, RunRequest, StreamEvent};
use crate::core::action::{Action, Effect, update};
use crate::core::activity;
use crate::core::config::ResolvedConfig;
use crate::core::export;
use crate::core::state::App;
use crate::tui::component::EventHandler;
use crate::tui::components::{ChatEvent, ChatViewState, QueryForm, WelcomeEvent, WelcomeScreen};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

/// Buffered stream events between the HTTP task and the forwarding task.
const STREAM_CHANNEL_CAPACITY: usize = 100;

/// TUI-specific presentation state (not part of core business logic)
pub struct TuiState {
    pub welcome: WelcomeScreen,
    pub chat: ChatViewState,
    // Animation state
    pub pulse_value: f32,
    pub spinner_frame: usize,
}

impl TuiState {
    /// Fresh screens with the configured default effort and model.
    pub fn new(config: &ResolvedConfig) -> Self {
        let form = || QueryForm::new(config.effort, config.models.clone(), &config.model);
        Self {
            welcome: WelcomeScreen::new(form()),
            chat: ChatViewState::new(form()),
            pulse_value: 0.0,
            spinner_frame: 0,
        }
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        // Kitty keyboard protocol lets Shift+Enter be told apart from Enter;
        // terminals that don't support it ignore the request
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,
            SetCursorStyle::SteadyBlock,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, steady block cursor, keyboard enhancement)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            PopKeyboardEnhancementFlags,
            DisableMouseCapture,
            DisableBracketedPaste,
            Hide
        );
    }
}

/// Build the research backend described by a resolved config.
pub fn build_backend(config: &ResolvedConfig) -> Arc<dyn ResearchBackend> {
    Arc::new(LangGraphClient::new(
        config.server_url.clone(),
        config.assistant_id.clone(),
        config.api_key.clone(),
    ))
}

pub fn run(config: ResolvedConfig) -> std::io::Result<()> {
    let backend = build_backend(&config);
    info!("Using {} backend at {}", backend.name(), config.server_url);
    let mut app = App::from_config(backend, &config);
    let mut tui = TuiState::new(&config);

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    // Channel for actions from background tasks
    let (tx, rx) = mpsc::channel();

    // Abort handles for the run in flight (used by Esc and New Research)
    let mut active_abort_handles: Vec<AbortHandle> = Vec::new();

    let start_time = Instant::now();
    let mut needs_redraw = true; // Force first frame

    loop {
        // Sync component props with App state
        tui.welcome.set_props(app.is_loading, tui.spinner_frame);
        tui.chat.set_props(app.is_loading, tui.spinner_frame);

        let animating = app.is_loading;
        if animating {
            needs_redraw = true;
        }

        if needs_redraw {
            let elapsed = start_time.elapsed().as_secs_f32();
            tui.pulse_value = (elapsed * 5.0).sin() * 0.5 + 0.5;
            tui.spinner_frame = (elapsed * 4.0) as usize;
            terminal.draw(|f| ui::draw_ui(f, &app, &mut tui))?;
            needs_redraw = false;
        }

        // Dynamic poll timeout: short when animating (~12fps), long when idle
        let timeout = if animating {
            Duration::from_millis(80)
        } else {
            Duration::from_millis(500)
        };
        let first_event = poll_event_timeout(timeout);

        // Process first event + drain ALL pending events before next draw
        let mut should_quit = false;
        if first_event.is_some() {
            needs_redraw = true;
        }
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            match event {
                // Resize just needs a redraw (already flagged above)
                TuiEvent::Resize => continue,
                TuiEvent::ForceQuit => {
                    should_quit |= dispatch(&mut app, Action::Quit, &tx, &mut active_abort_handles);
                    continue;
                }
                _ => {}
            }

            let action = if ui::shows_welcome(&app) {
                tui.welcome.handle_event(&event).map(|e| match e {
                    WelcomeEvent::Submit {
                        query,
                        effort,
                        model,
                    } => {
                        // The chat view continues with the settings used to start
                        tui.chat.form.effort = effort;
                        tui.chat.form.select_model(&model);
                        Action::Submit {
                            query,
                            effort,
                            model,
                        }
                    }
                    WelcomeEvent::Cancel => Action::Cancel,
                })
            } else {
                tui.chat.handle_event(&event).map(|e| match e {
                    ChatEvent::Submit {
                        query,
                        effort,
                        model,
                    } => Action::Submit {
                        query,
                        effort,
                        model,
                    },
                    ChatEvent::Cancel => Action::Cancel,
                    ChatEvent::NewResearch => Action::NewResearch,
                })
            };

            let Some(action) = action else {
                continue;
            };

            if matches!(action, Action::NewResearch) {
                // Stop whatever is running before the session is dropped
                should_quit |= dispatch(&mut app, Action::Cancel, &tx, &mut active_abort_handles);
                should_quit |= dispatch(&mut app, action, &tx, &mut active_abort_handles);
                tui = TuiState::new(&config);
                continue;
            }
            should_quit |= dispatch(&mut app, action, &tx, &mut active_abort_handles);
        }

        if should_quit {
            break;
        }

        // Handle background task actions (stream events, thread ids)
        while let Ok(action) = rx.try_recv() {
            needs_redraw = true;
            debug!("Event loop received: {:?}", action);
            should_quit |= dispatch(&mut app, action, &tx, &mut active_abort_handles);
        }

        if should_quit {
            break;
        }
    }

    for handle in active_abort_handles.drain(..) {
        handle.abort();
    }

    ratatui::restore();
    Ok(())
}

/// Run `action` through the reducer and perform the resulting effect.
/// Returns true when the app should quit.
fn dispatch(
    app: &mut App,
    action: Action,
    tx: &mpsc::Sender<Action>,
    active_abort_handles: &mut Vec<AbortHandle>,
) -> bool {
    if matches!(action, Action::Cancel) && app.is_loading {
        for handle in active_abort_handles.drain(..) {
            handle.abort();
        }
    }

    match update(app, action) {
        Effect::None => false,
        Effect::Quit => true,
        Effect::SpawnRun(request) => {
            *active_abort_handles = spawn_run(app.backend.clone(), request, tx.clone());
            false
        }
        Effect::CancelRun { thread_id, run_id } => {
            spawn_cancel(app.backend.clone(), thread_id, run_id);
            false
        }
        Effect::ExportResult => {
            match export::save_result(app) {
                Ok(Some(path)) => app.status_message = format!("Saved to {}", path.display()),
                Ok(None) => {}
                Err(e) => {
                    warn!("Failed to export research result: {}", e);
                    app.status_message = format!("Export failed: {e}");
                }
            }
            false
        }
    }
}

fn spawn_cancel(backend: Arc<dyn ResearchBackend>, thread_id: String, run_id: String) {
    info!("Cancelling run {} on thread {}", run_id, thread_id);
    tokio::spawn(async move {
        if let Err(e) = backend.cancel_run(&thread_id, &run_id).await {
            warn!("Failed to cancel run {}: {}", run_id, e);
        }
    });
}

fn spawn_run(
    backend: Arc<dyn ResearchBackend>,
    request: RunRequest,
    tx: mpsc::Sender<Action>,
) -> Vec<AbortHandle> {
    info!("Spawning research run (message_id={})", request.message_id);

    // Async channel for decoded stream events
    let (event_tx, mut event_rx) = tokio::sync::mpsc::channel::<StreamEvent>(STREAM_CHANNEL_CAPACITY);

    let tx_stream = tx.clone();
    let stream_handle = tokio::spawn(async move {
        let thread_id = match request.thread_id.clone() {
            Some(id) => id,
            None => match backend.create_thread().await {
                Ok(id) => {
                    if tx_stream.send(Action::ThreadCreated(id.clone())).is_err() {
                        warn!("Failed to send ThreadCreated: receiver dropped");
                        return;
                    }
                    id
                }
                Err(e) => {
                    warn!("Thread creation failed: {}", e);
                    if tx_stream.send(Action::RunFailed(e.to_string())).is_err() {
                        warn!("Failed to send RunFailed: receiver dropped");
                    }
                    return;
                }
            },
        };

        let input = RunInput {
            thread_id: &thread_id,
            message_id: &request.message_id,
            query: &request.query,
            effort: request.effort,
            model: &request.model,
        };

        // A clone goes to the backend so the forwarder can't observe the
        // channel closing before a failure has been reported
        let result = backend.stream_run(input, event_tx.clone()).await;
        if let Err(e) = result {
            info!("Stream error: {}", e);
            if tx_stream.send(Action::RunFailed(e.to_string())).is_err() {
                warn!("Failed to send RunFailed: receiver dropped");
            }
        }
        drop(event_tx);
    });

    let forward_handle = tokio::spawn(async move {
        let mut forwarded_count = 0usize;
        let run_start = Instant::now();

        while let Some(event) = event_rx.recv().await {
            forwarded_count += 1;
            let action = match event {
                StreamEvent::Metadata { run_id } => Action::RunStarted { run_id },
                StreamEvent::Update { node, output } => {
                    match activity::processed_event(&node, &output) {
                        Some(processed) => Action::Activity(processed),
                        None => {
                            debug!("No timeline entry for node {}", node);
                            continue;
                        }
                    }
                }
                StreamEvent::Messages(messages) => Action::MessagesSnapshot(messages),
                StreamEvent::Progress(progress) => Action::Progress(progress),
                StreamEvent::Error(message) => {
                    if tx.send(Action::RunFailed(message)).is_err() {
                        warn!("Failed to forward RunFailed: receiver dropped");
                    }
                    return;
                }
                StreamEvent::End => break,
            };
            if tx.send(action).is_err() {
                warn!("Failed to forward stream action: receiver dropped");
                return;
            }
        }

        info!(
            "Run stream finished: {} events in {}ms",
            forwarded_count,
            run_start.elapsed().as_millis()
        );
        if tx.send(Action::RunFinished).is_err() {
            warn!("Failed to send RunFinished: receiver dropped");
        }
    });

    vec![stream_handle.abort_handle(), forward_handle.abort_handle()]
}
