//! # WelcomeScreen Component
//!
//! Shown while the transcript is empty: a centered title block, the query
//! form and a short footer. While the first run is in flight the form's text
//! box is covered by pulsing dots and its action hint reads "Cancel".

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Paragraph, Wrap};

use crate::agent::Effort;
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::query_form::{FormEvent, QueryForm};
use crate::tui::event::TuiEvent;

pub const TITLE: &str = "Professional Research Agent";
pub const SUBTITLE: &str = "Your AI-powered research assistant";
pub const FOOTER: &str = "This is a research agent powered by LangGraph. It can perform web \
                          searches and generate comprehensive reports on a given topic.";

/// Widest the centered column gets on large terminals.
const MAX_COLUMN_WIDTH: u16 = 80;

#[derive(Debug, Clone, PartialEq)]
pub enum WelcomeEvent {
    Submit {
        query: String,
        effort: Effort,
        model: String,
    },
    Cancel,
}

pub struct WelcomeScreen {
    pub form: QueryForm,
}

impl WelcomeScreen {
    pub fn new(mut form: QueryForm) -> Self {
        form.cancel_label = "Cancel";
        form.loading_overlay = true;
        Self { form }
    }

    /// Sync props from the application state.
    pub fn set_props(&mut self, is_loading: bool, spinner_frame: usize) {
        self.form.is_loading = is_loading;
        self.form.spinner_frame = spinner_frame;
    }
}

impl Component for WelcomeScreen {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let column_width = area.width.min(MAX_COLUMN_WIDTH);
        let [column] = Layout::horizontal([Constraint::Length(column_width)])
            .flex(Flex::Center)
            .areas(area);

        let footer = Paragraph::new(FOOTER)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        let footer_height = footer.line_count(column.width) as u16;

        let [title_area, _, form_area, _, footer_area] = Layout::vertical([
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Length(self.form.calculate_height(column.width)),
            Constraint::Length(1),
            Constraint::Length(footer_height),
        ])
        .flex(Flex::Center)
        .areas(column);

        let title = Paragraph::new(vec![
            Line::styled(TITLE, Style::default().add_modifier(Modifier::BOLD)),
            Line::styled(SUBTITLE, Style::default().fg(Color::DarkGray)),
        ])
        .alignment(Alignment::Center);

        frame.render_widget(title, title_area);
        self.form.render(frame, form_area);
        frame.render_widget(footer, footer_area);
    }
}

impl EventHandler for WelcomeScreen {
    type Event = WelcomeEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match self.form.handle_event(event)? {
            FormEvent::Submit {
                query,
                effort,
                model,
            } => Some(WelcomeEvent::Submit {
                query,
                effort,
                model,
            }),
            FormEvent::Cancel => Some(WelcomeEvent::Cancel),
            FormEvent::ContentChanged | FormEvent::SettingsChanged => None,
        }
    }
}
