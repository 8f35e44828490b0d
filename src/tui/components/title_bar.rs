//! # TitleBar Component
//!
//! Top status line: app name, the server being talked to, the current run
//! status, and a "↓ New" marker when the transcript has content below the
//! viewport.
//!
//! Stateless and props-driven; the parent fills the fields each frame:
//!
//! ```rust,ignore
//! let mut title_bar = TitleBar::new(&app.status_message, tui.chat.has_unseen_content());
//! title_bar.render(frame, title_area);
//! ```

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::tui::component::Component;

pub struct TitleBar<'a> {
    pub status_message: &'a str,
    /// Whether there's content below the current scroll position
    pub has_unseen_content: bool,
    /// Error from the last run, shown in place of the status
    pub error: Option<&'a str>,
}

impl<'a> TitleBar<'a> {
    pub fn new(status_message: &'a str, has_unseen_content: bool) -> Self {
        Self {
            status_message,
            has_unseen_content,
            error: None,
        }
    }

    fn line(&self) -> Line<'a> {
        let mut spans = vec![Span::styled("Scout", Style::default().fg(Color::Cyan))];
        if let Some(error) = self.error {
            spans.push(Span::raw(" | "));
            spans.push(Span::styled(error, Style::default().fg(Color::Red)));
        } else if !self.status_message.is_empty() {
            spans.push(Span::raw(" | "));
            spans.push(Span::raw(self.status_message));
        }
        if self.has_unseen_content {
            spans.push(Span::styled(" | ↓ New", Style::default().fg(Color::Yellow)));
        }
        Line::from(spans)
    }
}

impl<'a> Component for TitleBar<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(self.line(), area);
    }
}
