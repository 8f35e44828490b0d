//! # ActivityTimeline Component
//!
//! Ordered log of the research graph's steps: one entry per `ProcessedEvent`
//! (title, then its description) followed by a single trailing
//! "Thinking..." indicator.
//!
//! Stateless and transient like `Message`: built each frame from a borrowed
//! event slice. Heights are computed from the same lines that get rendered,
//! so the parent can lay out the transcript without drawing first.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};

use crate::agent::ProcessedEvent;

pub const THINKING_LABEL: &str = "Thinking...";

const DATA_INDENT: &str = "   ";
/// Pulse intensity above which the trailing indicator is drawn bright.
const PULSE_BRIGHT_THRESHOLD: f32 = 0.5;

#[derive(Clone, Copy)]
pub struct ActivityTimeline<'a> {
    pub events: &'a [ProcessedEvent],
    /// 0.0 for a finished timeline; animated 0.0..=1.0 while the run is live
    pub pulse_intensity: f32,
}

impl<'a> ActivityTimeline<'a> {
    pub fn new(events: &'a [ProcessedEvent], pulse_intensity: f32) -> Self {
        Self {
            events,
            pulse_intensity,
        }
    }

    /// Entry titles in render order, trailing indicator included.
    pub fn entries(&self) -> Vec<&str> {
        self.events
            .iter()
            .map(|e| e.title.as_str())
            .chain(std::iter::once(THINKING_LABEL))
            .collect()
    }

    pub fn height(&self, width: u16) -> u16 {
        self.lines(width).len() as u16
    }

    fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let wrap_width = usize::from(width).max(DATA_INDENT.len() + 1);
        let data_options = textwrap::Options::new(wrap_width)
            .initial_indent(DATA_INDENT)
            .subsequent_indent(DATA_INDENT)
            .break_words(true);

        let mut lines = Vec::new();
        for event in self.events {
            lines.push(Line::from(vec![
                Span::styled("● ", Style::default().fg(Color::Cyan)),
                Span::styled(
                    event.title.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
            ]));
            if !event.data.trim().is_empty() {
                lines.extend(
                    textwrap::wrap(event.data.trim(), &data_options)
                        .into_iter()
                        .map(|row| {
                            Line::styled(row.into_owned(), Style::default().fg(Color::DarkGray))
                        }),
                );
            }
        }

        let indicator_style = if self.pulse_intensity > PULSE_BRIGHT_THRESHOLD {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC)
        };
        lines.push(Line::from(vec![
            Span::styled("◌ ", indicator_style),
            Span::styled(THINKING_LABEL, indicator_style),
        ]));
        lines
    }
}

impl<'a> Widget for ActivityTimeline<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.lines(area.width)).render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events() -> Vec<ProcessedEvent> {
        vec![
            ProcessedEvent::new("Generating Search Queries", "fusion, tokamak"),
            ProcessedEvent::new("Web Research", "Gathered 4 sources. Related to: iter."),
            ProcessedEvent::new("Reflection", ""),
        ]
    }

    #[test]
    fn entries_keep_order_and_add_one_trailing_indicator() {
        let events = events();
        let timeline = ActivityTimeline::new(&events, 0.0);
        assert_eq!(
            timeline.entries(),
            vec![
                "Generating Search Queries",
                "Web Research",
                "Reflection",
                THINKING_LABEL
            ]
        );
    }

    #[test]
    fn empty_timeline_is_only_the_indicator() {
        let timeline = ActivityTimeline::new(&[], 1.0);
        assert_eq!(timeline.entries(), vec![THINKING_LABEL]);
        assert_eq!(timeline.height(40), 1);
    }

    #[test]
    fn height_counts_titles_wrapped_data_and_indicator() {
        let events = events();
        let timeline = ActivityTimeline::new(&events, 0.0);
        // 3 titles + 2 data lines (empty data skipped) + indicator
        assert_eq!(timeline.height(80), 6);
        // "   Gathered 4 sources. Related to: iter." no longer fits on one row
        assert!(timeline.height(20) > 6);
    }

    #[test]
    fn render_draws_titles_with_indented_data() {
        let events = vec![ProcessedEvent::new("Searching", "web")];
        let timeline = ActivityTimeline::new(&events, 0.0);
        let area = Rect::new(0, 0, 20, timeline.height(20));
        let mut buf = Buffer::empty(area);
        timeline.render(area, &mut buf);

        let rows = crate::test_support::buffer_rows(&buf);
        assert!(rows[0].starts_with("● Searching"));
        assert!(rows[1].starts_with("   web"));
        assert!(rows[2].contains(THINKING_LABEL));
    }
}
