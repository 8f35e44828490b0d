//! # ChatMessagesView Component
//!
//! The conversation screen: scrollable transcript on top, the follow-up
//! query form below it, and a "New Research" hint at the bottom.
//!
//! Like `MessageList`, the view is transient and wraps persistent
//! `ChatViewState` (scroll position, the form being typed into).

use std::collections::HashMap;

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::Paragraph;

use crate::agent::{Effort, Message, ProcessedEvent};
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::message_list::{MessageList, MessageListState};
use crate::tui::components::query_form::{FormEvent, QueryForm};
use crate::tui::event::TuiEvent;

pub const NEW_RESEARCH_HINT: &str = "New Research (Ctrl+N)";

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Submit {
        query: String,
        effort: Effort,
        model: String,
    },
    Cancel,
    NewResearch,
}

pub struct ChatViewState {
    pub list: MessageListState,
    pub form: QueryForm,
}

impl ChatViewState {
    pub fn new(mut form: QueryForm) -> Self {
        form.cancel_label = "Stop";
        form.loading_overlay = false;
        Self {
            list: MessageListState::new(),
            form,
        }
    }

    /// Sync props from the application state.
    pub fn set_props(&mut self, is_loading: bool, spinner_frame: usize) {
        self.form.is_loading = is_loading;
        self.form.spinner_frame = spinner_frame;
    }

    pub fn has_unseen_content(&self) -> bool {
        self.list.has_unseen_content()
    }
}

impl EventHandler for ChatViewState {
    type Event = ChatEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::NewResearch => Some(ChatEvent::NewResearch),
            TuiEvent::ScrollUp
            | TuiEvent::ScrollDown
            | TuiEvent::ScrollPageUp
            | TuiEvent::ScrollPageDown => {
                self.list.handle_event(event);
                None
            }
            _ => match self.form.handle_event(event)? {
                FormEvent::Submit {
                    query,
                    effort,
                    model,
                } => {
                    // Follow the answer that's about to stream in
                    self.list.stick_to_bottom = true;
                    Some(ChatEvent::Submit {
                        query,
                        effort,
                        model,
                    })
                }
                FormEvent::Cancel => Some(ChatEvent::Cancel),
                FormEvent::ContentChanged | FormEvent::SettingsChanged => None,
            },
        }
    }
}

pub struct ChatMessagesView<'a> {
    pub state: &'a mut ChatViewState,
    pub messages: &'a [Message],
    pub historical_activities: &'a HashMap<String, Vec<ProcessedEvent>>,
    pub live_events: &'a [ProcessedEvent],
    pub is_loading: bool,
    pub pulse_value: f32,
}

impl<'a> Component for ChatMessagesView<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let form_height = self.state.form.calculate_height(area.width);
        let [list_area, form_area, hint_area] = Layout::vertical([
            Constraint::Min(0),
            Constraint::Length(form_height),
            Constraint::Length(1),
        ])
        .areas(area);

        MessageList::new(
            &mut self.state.list,
            self.messages,
            self.historical_activities,
            self.live_events,
            self.is_loading,
            self.pulse_value,
        )
        .render(frame, list_area);

        self.state.form.render(frame, form_area);

        frame.render_widget(
            Paragraph::new(NEW_RESEARCH_HINT)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            hint_area,
        );
    }
}
