use std::collections::HashMap;

use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Text;
use ratatui::widgets::{Block, BorderType, Padding, Paragraph, Widget, Wrap};

use crate::agent::{Message, MessageType, ProcessedEvent};
use crate::tui::component::Component;
use crate::tui::components::activity_timeline::ActivityTimeline;
use crate::tui::markdown;

/// Horizontal padding (per side) between the border and text content.
const CONTENT_PAD_H: u16 = 1;
/// Total horizontal space consumed by borders (1 left + 1 right) and padding.
const HORIZONTAL_OVERHEAD: u16 = 2 + CONTENT_PAD_H * 2;
/// Total vertical space consumed by borders (1 top + 1 bottom).
const VERTICAL_OVERHEAD: u16 = 2;

/// Pulse intensity threshold above which the border transitions from normal to BOLD.
const PULSE_BOLD_THRESHOLD: f32 = 0.6;
/// Pulse intensity threshold above which the border transitions from DIM to normal.
const PULSE_NORMAL_THRESHOLD: f32 = 0.2;

pub const HUMAN_LABEL: &str = "You";
pub const AGENT_LABEL: &str = "Research Agent";

/// Timeline to show under `message`: only AI messages with a non-empty
/// recorded sequence get one.
pub fn attached_timeline<'a>(
    message: &Message,
    historical: &'a HashMap<String, Vec<ProcessedEvent>>,
) -> Option<&'a [ProcessedEvent]> {
    if message.kind != MessageType::Ai {
        return None;
    }
    message
        .id
        .as_ref()
        .and_then(|id| historical.get(id))
        .filter(|events| !events.is_empty())
        .map(Vec::as_slice)
}

/// A single transcript entry: a rounded card titled with its author.
///
/// # Design
///
/// `MessageCard` is a **transient component**: built each frame from borrowed
/// data, holding no state of its own. AI answers are rendered as markdown,
/// human queries as plain wrapped text. An activity timeline, when given,
/// sits above the answer.
///
/// # Height Calculation
///
/// [`calculate_height`](Self::calculate_height) uses `Paragraph::line_count`
/// with the same wrapping the renderer uses, so the parent `MessageList`
/// can lay out scroll positions without rendering.
#[derive(Clone, Copy)]
pub struct MessageCard<'a> {
    pub author: MessageType,
    pub content: &'a str,
    pub timeline: Option<&'a [ProcessedEvent]>,
    /// Current pulse intensity (0.0 to 1.0) for the in-progress entry
    pub pulse_intensity: f32,
}

impl<'a> MessageCard<'a> {
    pub fn new(message: &'a Message, timeline: Option<&'a [ProcessedEvent]>) -> Self {
        Self {
            author: message.kind,
            content: message.content.trim(),
            timeline,
            pulse_intensity: 0.0,
        }
    }

    /// The synthetic "Research Agent" entry shown while a run is in flight.
    pub fn in_progress(live_events: &'a [ProcessedEvent], pulse_intensity: f32) -> Self {
        Self {
            author: MessageType::Ai,
            content: "",
            timeline: Some(live_events),
            pulse_intensity,
        }
    }

    fn label(&self) -> &'static str {
        match self.author {
            MessageType::Human => HUMAN_LABEL,
            _ => AGENT_LABEL,
        }
    }

    fn style(&self) -> Style {
        match self.author {
            MessageType::Human => Style::default().fg(Color::Green),
            _ => Style::default().fg(Color::Blue),
        }
    }

    fn body(&self) -> Paragraph<'static> {
        let text = match self.author {
            MessageType::Human => Text::raw(self.content.to_string()),
            _ => markdown::render(self.content, Color::Reset),
        };
        Paragraph::new(text).wrap(Wrap { trim: false })
    }

    fn body_height(&self, content_width: u16) -> u16 {
        if self.content.is_empty() {
            return 0;
        }
        self.body().line_count(content_width) as u16
    }

    fn timeline_height(&self, content_width: u16) -> u16 {
        self.timeline
            .map(|events| ActivityTimeline::new(events, self.pulse_intensity).height(content_width))
            .unwrap_or(0)
    }

    /// Blank row between timeline and answer when both are present.
    fn gap(&self) -> u16 {
        u16::from(self.timeline.is_some() && !self.content.is_empty())
    }

    pub fn calculate_height(&self, width: u16) -> u16 {
        let content_width = width.saturating_sub(HORIZONTAL_OVERHEAD);
        if content_width == 0 {
            // Too narrow for borders + padding; still occupy a row
            return 1;
        }
        let inner = self.timeline_height(content_width) + self.gap() + self.body_height(content_width);
        inner.max(1) + VERTICAL_OVERHEAD
    }
}

impl<'a> Widget for MessageCard<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = self.style();

        // Three-phase breathing: DIM → normal → BOLD using the author's color
        let mut border_style = style.add_modifier(Modifier::DIM);
        if self.pulse_intensity > PULSE_BOLD_THRESHOLD {
            border_style = style.add_modifier(Modifier::BOLD);
        } else if self.pulse_intensity > PULSE_NORMAL_THRESHOLD {
            border_style = style;
        }

        let block = Block::bordered()
            .title(self.label())
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title_style(style.add_modifier(Modifier::BOLD))
            .padding(Padding::horizontal(CONTENT_PAD_H));
        let inner = block.inner(area);
        block.render(area, buf);

        let mut y = inner.y;
        if let Some(events) = self.timeline {
            let timeline = ActivityTimeline::new(events, self.pulse_intensity);
            let height = timeline.height(inner.width).min(inner.height);
            timeline.render(Rect { y, height, ..inner }, buf);
            y += height + self.gap();
        }

        let remaining = (inner.y + inner.height).saturating_sub(y);
        if !self.content.is_empty() && remaining > 0 {
            self.body().render(
                Rect {
                    y,
                    height: remaining,
                    ..inner
                },
                buf,
            );
        }
    }
}

impl<'a> Component for MessageCard<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(*self, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::buffer_rows;

    fn rows_of(card: MessageCard, width: u16) -> Vec<String> {
        let area = Rect::new(0, 0, width, card.calculate_height(width));
        let mut buf = Buffer::empty(area);
        card.render(area, &mut buf);
        buffer_rows(&buf)
    }

    fn history(id: &str, events: Vec<ProcessedEvent>) -> HashMap<String, Vec<ProcessedEvent>> {
        HashMap::from([(id.to_string(), events)])
    }

    #[test]
    fn ai_message_gets_its_recorded_timeline() {
        let message = Message::ai(Some("m1".into()), "answer".into());
        let historical = history("m1", vec![ProcessedEvent::new("Searching", "web")]);

        let timeline = attached_timeline(&message, &historical).unwrap();
        assert_eq!(timeline, &[ProcessedEvent::new("Searching", "web")]);

        let text = rows_of(MessageCard::new(&message, Some(timeline)), 40).join("\n");
        assert!(text.contains("Research Agent"));
        assert!(text.contains("● Searching"));
        assert!(text.contains("web"));
        assert!(text.contains("answer"));
    }

    #[test]
    fn human_message_never_gets_a_timeline() {
        let message = Message::human("m1".into(), "question".into());
        let historical = history("m1", vec![ProcessedEvent::new("Searching", "web")]);
        assert!(attached_timeline(&message, &historical).is_none());

        let text = rows_of(MessageCard::new(&message, None), 40).join("\n");
        assert!(text.contains("You"));
        assert!(text.contains("question"));
        assert!(!text.contains("Searching"));
    }

    #[test]
    fn empty_or_missing_sequence_attaches_nothing() {
        let message = Message::ai(Some("m1".into()), "answer".into());
        assert!(attached_timeline(&message, &history("m1", vec![])).is_none());
        assert!(attached_timeline(&message, &history("other", vec![])).is_none());
        let anonymous = Message::ai(None, "answer".into());
        assert!(attached_timeline(&anonymous, &history("m1", vec![])).is_none());
    }

    #[test]
    fn height_includes_borders_timeline_and_gap() {
        let message = Message::ai(Some("m1".into()), "answer".into());
        let events = vec![ProcessedEvent::new("Searching", "web")];
        // borders 2 + timeline (title, data, indicator) 3 + gap 1 + body 1
        assert_eq!(MessageCard::new(&message, Some(&events)).calculate_height(40), 7);
        assert_eq!(MessageCard::new(&message, None).calculate_height(40), 3);
    }

    #[test]
    fn in_progress_entry_shows_live_events() {
        let events = vec![ProcessedEvent::new("Generating Search Queries", "rust")];
        let text = rows_of(MessageCard::in_progress(&events, 1.0), 50).join("\n");
        assert!(text.contains("Research Agent"));
        assert!(text.contains("Generating Search Queries"));
        assert!(text.contains("Thinking..."));
    }

    #[test]
    fn narrow_width_returns_minimum() {
        let message = Message::human("h".into(), "hello".into());
        assert_eq!(MessageCard::new(&message, None).calculate_height(HORIZONTAL_OVERHEAD), 1);
    }
}
