//! # QueryForm Component
//!
//! The research query box shared by the welcome screen and the chat view.
//!
//! ## Responsibilities
//!
//! - Capture and edit the query text (multi-line, paste preserves newlines)
//! - Hold the effort and model selections for the next submission
//! - Emit `Submit` on Enter when the query has non-whitespace content
//! - While a run is in flight, ignore edits and emit `Cancel` on Esc
//!
//! ## State Management
//!
//! Query, cursor, effort and model are internal state owned by the form.
//! `is_loading` is a prop synced from the application state every frame.

mod text_wrap;

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Padding, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
};

use crate::agent::{Effort, SUPPORTED_MODELS};
use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

use text_wrap::{
    CONTENT_OFFSET_X, CONTENT_OFFSET_Y, MAX_VISIBLE_LINES, VERTICAL_OVERHEAD, cursor_row_col,
    inner_width, next_char_boundary, prev_char_boundary, visual_rows,
};

pub const PLACEHOLDER: &str = "What topic do you want to research?";

/// Rows below the text box used by the effort/model/action line
const CONTROLS_HEIGHT: u16 = 1;

/// High-level events emitted by the QueryForm
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    /// Enter pressed on a non-blank query. The form has already cleared itself.
    Submit {
        query: String,
        effort: Effort,
        model: String,
    },
    /// Esc pressed while a run is in flight
    Cancel,
    /// Query text or cursor changed
    ContentChanged,
    /// Effort or model selection changed
    SettingsChanged,
}

pub struct QueryForm {
    pub query: String,
    /// Byte offset into `query`, always on a char boundary
    cursor: usize,
    /// First visible wrapped row
    scroll_offset: u16,
    pub effort: Effort,
    models: Vec<String>,
    model_index: usize,
    /// Prop: a run is in flight
    pub is_loading: bool,
    /// Word shown on the action hint while loading ("Cancel" or "Stop")
    pub cancel_label: &'static str,
    /// Replace the text box with pulsing dots while loading
    pub loading_overlay: bool,
    /// Prop: animation frame counter
    pub spinner_frame: usize,
}

impl QueryForm {
    /// `models` falls back to the built-in list when empty; an unknown `model`
    /// selects the first entry.
    pub fn new(effort: Effort, models: Vec<String>, model: &str) -> Self {
        let models = if models.is_empty() {
            SUPPORTED_MODELS.iter().map(|m| m.to_string()).collect()
        } else {
            models
        };
        let model_index = models.iter().position(|m| m == model).unwrap_or(0);
        Self {
            query: String::new(),
            cursor: 0,
            scroll_offset: 0,
            effort,
            models,
            model_index,
            is_loading: false,
            cancel_label: "Cancel",
            loading_overlay: false,
            spinner_frame: 0,
        }
    }

    pub fn model(&self) -> &str {
        self.models
            .get(self.model_index)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Select `model` if it is one of the form's options.
    pub fn select_model(&mut self, model: &str) {
        if let Some(index) = self.models.iter().position(|m| m == model) {
            self.model_index = index;
        }
    }

    pub fn can_submit(&self) -> bool {
        !self.query.trim().is_empty()
    }

    /// Total height (text box + controls row) for the given width.
    /// The text box grows with content up to `MAX_VISIBLE_LINES` rows.
    pub fn calculate_height(&self, width: u16) -> u16 {
        let rows = visual_rows(&self.query, inner_width(width)).len() as u16;
        rows.clamp(1, MAX_VISIBLE_LINES) + VERTICAL_OVERHEAD + CONTROLS_HEIGHT
    }

    fn clear(&mut self) {
        self.query.clear();
        self.cursor = 0;
        self.scroll_offset = 0;
    }

    fn insert_str(&mut self, text: &str) {
        self.query.insert_str(self.cursor, text);
        self.cursor += text.len();
    }

    /// Keep the cursor row inside the visible window.
    fn update_scroll_offset(&mut self, total_rows: usize, cursor_row: usize) {
        let visible = usize::from(MAX_VISIBLE_LINES);
        let mut offset = usize::from(self.scroll_offset);
        if cursor_row < offset {
            offset = cursor_row;
        } else if cursor_row >= offset + visible {
            offset = cursor_row + 1 - visible;
        }
        offset = offset.min(total_rows.saturating_sub(visible));
        self.scroll_offset = offset as u16;
    }

    fn action_span(&self) -> Span<'static> {
        if self.is_loading {
            Span::styled(
                format!("■ {} (Esc)", self.cancel_label),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )
        } else if self.can_submit() {
            Span::styled(
                "↑ Submit (Enter)",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled("↑ Submit (Enter)", Style::default().fg(Color::DarkGray))
        }
    }

    fn controls_line(&self) -> Line<'static> {
        let (value_style, hint_style) = if self.is_loading {
            (
                Style::default().fg(Color::DarkGray),
                Style::default().fg(Color::DarkGray),
            )
        } else {
            (
                Style::default().fg(Color::Yellow),
                Style::default().fg(Color::DarkGray),
            )
        };
        Line::from(vec![
            Span::raw(" Effort: "),
            Span::styled(self.effort.label(), value_style),
            Span::styled(" ^E", hint_style),
            Span::raw("   Model: "),
            Span::styled(self.model().to_string(), value_style),
            Span::styled(" ^T", hint_style),
        ])
    }

    fn loading_dots(&self) -> Line<'static> {
        let lit = self.spinner_frame % 3;
        let spans: Vec<Span> = (0..3)
            .flat_map(|i| {
                let style = if i == lit {
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                [Span::styled("●", style), Span::raw(" ")]
            })
            .collect();
        Line::from(spans)
    }

    fn render_scrollbar(&self, frame: &mut Frame, area: Rect, total_rows: usize) {
        let visible = usize::from(MAX_VISIBLE_LINES);
        if total_rows <= visible {
            return;
        }

        // ScrollbarState content_length is max scrollable position, not total items
        let mut scrollbar_state = ScrollbarState::default()
            .content_length(total_rows - visible)
            .position(usize::from(self.scroll_offset));

        let scrollbar_area = Rect {
            x: area.x + area.width.saturating_sub(1),
            y: area.y + 1,
            width: 1,
            height: area.height.saturating_sub(2),
        };

        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            scrollbar_area,
            &mut scrollbar_state,
        );
    }
}

impl Component for QueryForm {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let [box_area, controls_area] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(CONTROLS_HEIGHT)])
                .areas(area);

        let width = inner_width(box_area.width);
        let rows = visual_rows(&self.query, width);
        let (cursor_row, cursor_col) = cursor_row_col(&self.query, &rows, self.cursor);
        self.update_scroll_offset(rows.len(), cursor_row);

        let border_style = if self.is_loading {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Green)
        };
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .padding(Padding::horizontal(1));
        let inner = block.inner(box_area);
        frame.render_widget(block, box_area);

        if self.is_loading && self.loading_overlay {
            let dots_area = Rect {
                y: inner.y + inner.height / 2,
                height: inner.height.min(1),
                ..inner
            };
            frame.render_widget(
                Paragraph::new(self.loading_dots()).alignment(Alignment::Center),
                dots_area,
            );
        } else if self.query.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    PLACEHOLDER,
                    Style::default().fg(Color::DarkGray),
                )),
                inner,
            );
        } else {
            let text_style = if self.is_loading {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            let lines: Vec<Line> = rows
                .iter()
                .skip(usize::from(self.scroll_offset))
                .take(usize::from(MAX_VISIBLE_LINES))
                .map(|r| Line::raw(self.query[r.clone()].to_string()))
                .collect();
            frame.render_widget(Paragraph::new(lines).style(text_style), inner);
        }
        self.render_scrollbar(frame, box_area, rows.len());

        let action = self.action_span();
        let action_width = action.width() as u16 + 1;
        let [settings_area, action_area] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(action_width)])
                .areas(controls_area);
        frame.render_widget(Paragraph::new(self.controls_line()), settings_area);
        frame.render_widget(
            Paragraph::new(action).alignment(Alignment::Right),
            action_area,
        );

        if !self.is_loading {
            let visible_row = cursor_row.saturating_sub(usize::from(self.scroll_offset)) as u16;
            let x = box_area.x + CONTENT_OFFSET_X + cursor_col.min(width);
            let y = box_area.y + CONTENT_OFFSET_Y + visible_row;
            frame.set_cursor_position((x, y));
        }
    }
}

impl EventHandler for QueryForm {
    type Event = FormEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        if self.is_loading {
            return matches!(event, TuiEvent::Escape).then_some(FormEvent::Cancel);
        }

        match event {
            TuiEvent::InputChar(c) => {
                self.query.insert(self.cursor, *c);
                self.cursor += c.len_utf8();
                Some(FormEvent::ContentChanged)
            }
            TuiEvent::Newline => {
                self.insert_str("\n");
                Some(FormEvent::ContentChanged)
            }
            TuiEvent::Paste(text) => {
                let text = text.replace("\r\n", "\n").replace('\r', "\n");
                self.insert_str(&text);
                Some(FormEvent::ContentChanged)
            }
            TuiEvent::Backspace => (self.cursor > 0).then(|| {
                let prev = prev_char_boundary(&self.query, self.cursor);
                self.query.drain(prev..self.cursor);
                self.cursor = prev;
                FormEvent::ContentChanged
            }),
            TuiEvent::Delete => (self.cursor < self.query.len()).then(|| {
                let next = next_char_boundary(&self.query, self.cursor);
                self.query.drain(self.cursor..next);
                FormEvent::ContentChanged
            }),
            TuiEvent::CursorLeft => (self.cursor > 0).then(|| {
                self.cursor = prev_char_boundary(&self.query, self.cursor);
                FormEvent::ContentChanged
            }),
            TuiEvent::CursorRight => (self.cursor < self.query.len()).then(|| {
                self.cursor = next_char_boundary(&self.query, self.cursor);
                FormEvent::ContentChanged
            }),
            TuiEvent::CursorHome => {
                let line_start = self.query[..self.cursor]
                    .rfind('\n')
                    .map(|i| i + 1)
                    .unwrap_or(0);
                (self.cursor != line_start).then(|| {
                    self.cursor = line_start;
                    FormEvent::ContentChanged
                })
            }
            TuiEvent::CursorEnd => {
                let line_end = self.query[self.cursor..]
                    .find('\n')
                    .map(|i| self.cursor + i)
                    .unwrap_or(self.query.len());
                (self.cursor != line_end).then(|| {
                    self.cursor = line_end;
                    FormEvent::ContentChanged
                })
            }
            TuiEvent::Submit => {
                if !self.can_submit() {
                    return None;
                }
                let query = std::mem::take(&mut self.query);
                self.clear();
                Some(FormEvent::Submit {
                    query,
                    effort: self.effort,
                    model: self.model().to_string(),
                })
            }
            TuiEvent::CycleEffort => {
                self.effort = self.effort.next();
                Some(FormEvent::SettingsChanged)
            }
            TuiEvent::CycleModel => {
                self.model_index = (self.model_index + 1) % self.models.len().max(1);
                Some(FormEvent::SettingsChanged)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::buffer_rows;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn form() -> QueryForm {
        QueryForm::new(
            Effort::Low,
            SUPPORTED_MODELS.iter().map(|m| m.to_string()).collect(),
            "gemini-1.5-pro-latest",
        )
    }

    fn type_text(form: &mut QueryForm, text: &str) {
        for c in text.chars() {
            form.handle_event(&TuiEvent::InputChar(c));
        }
    }

    fn render(form: &mut QueryForm, width: u16) -> Vec<String> {
        let height = form.calculate_height(width);
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| form.render(f, f.area())).unwrap();
        buffer_rows(terminal.backend().buffer())
    }

    #[test]
    fn submit_emits_settings_and_resets_query() {
        let mut form = form();
        form.effort = Effort::High;
        type_text(&mut form, "fusion energy");

        let event = form.handle_event(&TuiEvent::Submit);
        assert_eq!(
            event,
            Some(FormEvent::Submit {
                query: "fusion energy".into(),
                effort: Effort::High,
                model: "gemini-1.5-pro-latest".into(),
            })
        );
        assert!(form.query.is_empty());
        assert!(form.handle_event(&TuiEvent::Submit).is_none());
    }

    #[test]
    fn blank_query_cannot_submit() {
        let mut form = form();
        type_text(&mut form, "   ");
        form.handle_event(&TuiEvent::Newline);
        assert!(!form.can_submit());
        assert_eq!(form.handle_event(&TuiEvent::Submit), None);
        assert_eq!(form.query, "   \n");
    }

    #[test]
    fn newline_never_submits() {
        let mut form = form();
        type_text(&mut form, "line one");
        assert_eq!(
            form.handle_event(&TuiEvent::Newline),
            Some(FormEvent::ContentChanged)
        );
        type_text(&mut form, "two");
        assert_eq!(form.query, "line one\ntwo");
    }

    #[test]
    fn loading_ignores_edits_and_escape_cancels() {
        let mut form = form();
        type_text(&mut form, "draft");
        form.is_loading = true;

        assert_eq!(form.handle_event(&TuiEvent::InputChar('x')), None);
        assert_eq!(form.handle_event(&TuiEvent::Submit), None);
        assert_eq!(form.handle_event(&TuiEvent::CycleEffort), None);
        assert_eq!(form.query, "draft");
        assert_eq!(form.effort, Effort::Low);
        assert_eq!(form.handle_event(&TuiEvent::Escape), Some(FormEvent::Cancel));
    }

    #[test]
    fn escape_when_idle_does_nothing() {
        let mut form = form();
        assert_eq!(form.handle_event(&TuiEvent::Escape), None);
    }

    #[test]
    fn cycling_selectors_wraps() {
        let mut form = form();
        form.handle_event(&TuiEvent::CycleEffort);
        form.handle_event(&TuiEvent::CycleEffort);
        assert_eq!(form.effort, Effort::High);
        form.handle_event(&TuiEvent::CycleEffort);
        assert_eq!(form.effort, Effort::Low);

        form.handle_event(&TuiEvent::CycleModel);
        assert_eq!(form.model(), "gemini-1.5-flash-latest");
        form.handle_event(&TuiEvent::CycleModel);
        assert_eq!(form.model(), "gemini-1.5-pro-latest");
    }

    #[test]
    fn unknown_model_selects_first_option() {
        let form = QueryForm::new(Effort::Low, vec!["a".into(), "b".into()], "zzz");
        assert_eq!(form.model(), "a");

        let fallback = QueryForm::new(Effort::Low, Vec::new(), "");
        assert_eq!(fallback.model(), SUPPORTED_MODELS[0]);
    }

    #[test]
    fn editing_in_the_middle_respects_utf8() {
        let mut form = form();
        type_text(&mut form, "cafe");
        form.handle_event(&TuiEvent::Backspace);
        type_text(&mut form, "é");
        form.handle_event(&TuiEvent::CursorLeft);
        form.handle_event(&TuiEvent::CursorLeft);
        form.handle_event(&TuiEvent::Delete);
        assert_eq!(form.query, "caé");
        form.handle_event(&TuiEvent::CursorHome);
        type_text(&mut form, ">");
        assert_eq!(form.query, ">caé");
    }

    #[test]
    fn paste_normalizes_line_endings() {
        let mut form = form();
        form.handle_event(&TuiEvent::Paste("a\r\nb".into()));
        assert_eq!(form.query, "a\nb");
    }

    #[test]
    fn height_grows_with_lines_and_clamps() {
        let mut form = form();
        assert_eq!(form.calculate_height(40), 1 + VERTICAL_OVERHEAD + CONTROLS_HEIGHT);
        form.query = "a\nb\nc".into();
        assert_eq!(form.calculate_height(40), 3 + VERTICAL_OVERHEAD + CONTROLS_HEIGHT);
        form.query = "x\n".repeat(20);
        assert_eq!(
            form.calculate_height(40),
            MAX_VISIBLE_LINES + VERTICAL_OVERHEAD + CONTROLS_HEIGHT
        );
    }

    #[test]
    fn render_idle_shows_placeholder_and_controls() {
        let mut form = form();
        let text = render(&mut form, 80).join("\n");
        assert!(text.contains(PLACEHOLDER));
        assert!(text.contains("Effort: Low"));
        assert!(text.contains("Model: gemini-1.5-pro-latest"));
        assert!(text.contains("Submit (Enter)"));
    }

    #[test]
    fn render_loading_shows_stop_hint() {
        let mut form = form();
        form.cancel_label = "Stop";
        form.is_loading = true;
        let text = render(&mut form, 80).join("\n");
        assert!(text.contains("■ Stop (Esc)"));
        assert!(!text.contains("Submit"));
    }

    #[test]
    fn render_loading_overlay_hides_text_box_content() {
        let mut form = form();
        form.loading_overlay = true;
        form.is_loading = true;
        let rows = render(&mut form, 80);
        assert!(rows[1].contains('●'));
        assert!(!rows[1].contains(PLACEHOLDER));
        assert!(rows.join("\n").contains("Cancel (Esc)"));
    }
}
