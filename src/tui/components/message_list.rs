//! # MessageList Component
//!
//! Scrollable view of the research transcript.
//!
//! ## Responsibilities
//!
//! - Display the transcript as `MessageCard`s with attached timelines
//! - Append the synthetic in-progress entry while a run is in flight
//! - Manage scrolling (stick-to-bottom while new content arrives)
//! - Cache card heights between frames
//!
//! ## Architecture
//!
//! `MessageList` is a transient component (created each frame) that wraps
//! `&'a mut MessageListState` (persistent state) and the transcript (props).
//!
//! Since `Component::render` takes `&mut self`, we can safely mutate the state
//! (including layout cache and scroll state) during the render pass, aligning
//! with Ratatui's `StatefulWidget` pattern.

use std::collections::HashMap;

use ratatui::Frame;
use ratatui::layout::{Position, Rect, Size};
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::agent::{Message, ProcessedEvent};
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::message::{MessageCard, attached_timeline};
use crate::tui::event::TuiEvent;

/// Layout and scroll state for the message list.
/// Must be persisted in the parent view state.
pub struct MessageListState {
    /// Scroll offset and view state
    pub scroll_state: ScrollViewState,
    /// Cached layout measurements
    pub layout: LayoutCache,
    /// When true, auto-scroll to bottom on new content
    pub stick_to_bottom: bool,
    /// Last known viewport height (for scroll clamping between frames)
    pub viewport_height: u16,
}

impl Default for MessageListState {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageListState {
    pub fn new() -> Self {
        Self {
            scroll_state: ScrollViewState::default(),
            layout: LayoutCache::new(),
            stick_to_bottom: true, // Start attached to bottom
            viewport_height: 0,
        }
    }

    /// Offset at which the last row of content touches the viewport bottom.
    fn max_scroll(&self) -> u16 {
        self.layout
            .total_height()
            .saturating_sub(self.viewport_height)
    }

    /// Clamp scroll offset so it never exceeds the content bounds.
    pub fn clamp_scroll(&mut self) {
        let max_y = self.max_scroll();
        let current = self.scroll_state.offset();
        if current.y > max_y {
            self.scroll_state.set_offset(Position {
                x: current.x,
                y: max_y,
            });
        }
    }

    /// Clamp scroll and re-engage auto-scroll if the user has reached the bottom.
    /// Called on scroll-down events so that scrolling past the end re-pins to bottom.
    pub fn repin_if_at_bottom(&mut self) {
        let max_y = self.max_scroll();
        let current = self.scroll_state.offset();
        if current.y >= max_y {
            self.stick_to_bottom = true;
            self.scroll_state.set_offset(Position {
                x: current.x,
                y: max_y,
            });
        }
    }

    /// Content exists below the viewport.
    pub fn has_unseen_content(&self) -> bool {
        self.scroll_state.offset().y < self.max_scroll()
    }
}

/// Scrollable transcript component.
/// Created fresh each frame with references to state and data.
pub struct MessageList<'a> {
    // Mutable reference to persistent state
    pub state: &'a mut MessageListState,
    pub messages: &'a [Message],
    pub historical_activities: &'a HashMap<String, Vec<ProcessedEvent>>,
    pub live_events: &'a [ProcessedEvent],
    pub is_loading: bool,
    pub pulse_value: f32,
}

impl<'a> MessageList<'a> {
    pub fn new(
        state: &'a mut MessageListState,
        messages: &'a [Message],
        historical_activities: &'a HashMap<String, Vec<ProcessedEvent>>,
        live_events: &'a [ProcessedEvent],
        is_loading: bool,
        pulse_value: f32,
    ) -> Self {
        Self {
            state,
            messages,
            historical_activities,
            live_events,
            is_loading,
            pulse_value,
        }
    }

    fn card(&self, message: &'a Message) -> MessageCard<'a> {
        MessageCard::new(message, attached_timeline(message, self.historical_activities))
    }

    /// The in-progress entry, present only while loading with a non-empty transcript.
    fn in_progress_card(&self) -> Option<MessageCard<'a>> {
        (self.is_loading && !self.messages.is_empty())
            .then(|| MessageCard::in_progress(self.live_events, self.pulse_value))
    }
}

impl<'a> Component for MessageList<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let content_width = area.width.saturating_sub(1); // -1 for scrollbar safe area

        // 1. Update Layout Cache (Internal Mutation)
        let fingerprints: Vec<Fingerprint> = self
            .messages
            .iter()
            .map(|m| Fingerprint::of(m, attached_timeline(m, self.historical_activities)))
            .collect();
        let reusable = self.state.layout.reusable_count(&fingerprints, content_width);
        self.state.layout.heights.truncate(reusable);

        for message in self.messages.iter().skip(reusable) {
            let height = if message.is_visible() {
                self.card(message).calculate_height(content_width)
            } else {
                0
            };
            self.state.layout.heights.push(height);
        }

        let in_progress = self.in_progress_card();
        self.state.layout.trailing_height = in_progress
            .map(|card| card.calculate_height(content_width))
            .unwrap_or(0);
        self.state.layout.rebuild_prefix_heights();
        self.state.layout.update_metadata(fingerprints, content_width);

        let total_height = self.state.layout.total_height();

        // 2. Clamp scroll offset to prevent overscrolling past content.
        self.state.viewport_height = area.height;
        if !self.state.stick_to_bottom {
            self.state.clamp_scroll();
        }

        let scroll_offset = self.state.scroll_state.offset().y;
        let visible_range = self.state.layout.visible_range(scroll_offset, area.height);

        // 3. Render visible cards into a ScrollView
        let mut scroll_view = ScrollView::new(Size::new(content_width, total_height))
            .vertical_scrollbar_visibility(ScrollbarVisibility::Always)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);

        let mut y_offset: u16 = if visible_range.start > 0 {
            self.state.layout.prefix_heights[visible_range.start - 1]
        } else {
            0
        };

        for i in visible_range {
            let height = self.state.layout.heights[i];
            // Hidden (tool/system) messages take no space
            if height == 0 {
                continue;
            }
            let segment_rect = Rect::new(0, y_offset, content_width, height);
            scroll_view.render_widget(self.card(&self.messages[i]), segment_rect);
            y_offset = y_offset.saturating_add(height);
        }

        if let Some(card) = in_progress {
            let height = self.state.layout.trailing_height;
            let top = self.state.layout.messages_height();
            scroll_view.render_widget(card, Rect::new(0, top, content_width, height));
        }

        // Auto-scroll logic (Mutation)
        if self.state.stick_to_bottom {
            let bottom = self.state.max_scroll();
            self.state.scroll_state.set_offset(Position { x: 0, y: bottom });
        }

        frame.render_stateful_widget(scroll_view, area, &mut self.state.scroll_state);
    }
}

/// EventHandler is implemented on `MessageListState` rather than `MessageList` because:
/// 1. Event handling requires persistent state (scroll position, stick_to_bottom flag)
/// 2. `MessageList` is recreated each frame with fresh props, so it can't hold state
impl EventHandler for MessageListState {
    type Event = (); // Scrolling is handled internally

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::ScrollUp => {
                self.scroll_state.scroll_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollDown => {
                self.scroll_state.scroll_down();
                self.repin_if_at_bottom();
            }
            TuiEvent::ScrollPageUp => {
                self.scroll_state.scroll_page_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollPageDown => {
                self.scroll_state.scroll_page_down();
                self.repin_if_at_bottom();
            }
            _ => {}
        }
        None
    }
}

/// What a cached height depends on besides the width.
#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint {
    id: Option<String>,
    content_len: usize,
    timeline_len: usize,
}

impl Fingerprint {
    fn of(message: &Message, timeline: Option<&[ProcessedEvent]>) -> Self {
        Self {
            id: message.id.clone(),
            content_len: message.content.len(),
            timeline_len: timeline.map(<[ProcessedEvent]>::len).unwrap_or(0),
        }
    }
}

/// Cached layout measurements
pub struct LayoutCache {
    /// One entry per transcript message (0 for hidden messages)
    pub heights: Vec<u16>,
    pub prefix_heights: Vec<u16>,
    /// Height of the in-progress entry (0 when absent)
    pub trailing_height: u16,
    fingerprints: Vec<Fingerprint>,
    content_width: u16,
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutCache {
    pub fn new() -> Self {
        Self {
            heights: Vec::new(),
            prefix_heights: Vec::new(),
            trailing_height: 0,
            fingerprints: Vec::new(),
            content_width: 0,
        }
    }

    /// Number of leading cached heights still valid for `fingerprints` at `content_width`.
    /// Snapshots can replace the transcript wholesale, so reuse stops at the
    /// first message that differs from what was measured.
    pub fn reusable_count(&self, fingerprints: &[Fingerprint], content_width: u16) -> usize {
        if self.content_width != content_width {
            return 0;
        }
        self.fingerprints
            .iter()
            .zip(fingerprints)
            .take_while(|(cached, current)| cached == current)
            .count()
            .min(self.heights.len())
    }

    pub fn update_metadata(&mut self, fingerprints: Vec<Fingerprint>, content_width: u16) {
        self.fingerprints = fingerprints;
        self.content_width = content_width;
    }

    pub fn rebuild_prefix_heights(&mut self) {
        self.prefix_heights = self
            .heights
            .iter()
            .scan(0u16, |acc, &h| {
                *acc = acc.saturating_add(h);
                Some(*acc)
            })
            .collect();
    }

    pub fn messages_height(&self) -> u16 {
        self.prefix_heights.last().copied().unwrap_or(0)
    }

    pub fn total_height(&self) -> u16 {
        self.messages_height().saturating_add(self.trailing_height)
    }

    pub fn visible_range(&self, scroll_offset: u16, viewport_height: u16) -> std::ops::Range<usize> {
        let buffer = viewport_height / 2;
        let buffered_start = scroll_offset.saturating_sub(buffer);
        let buffered_end = scroll_offset
            .saturating_add(viewport_height)
            .saturating_add(buffer);

        let start = self
            .prefix_heights
            .partition_point(|&end| end <= buffered_start);
        let end = self
            .prefix_heights
            .partition_point(|&end| end < buffered_end)
            .saturating_add(1)
            .min(self.prefix_heights.len());

        start..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::buffer_rows;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn fp(id: &str, content_len: usize) -> Fingerprint {
        Fingerprint {
            id: Some(id.to_string()),
            content_len,
            timeline_len: 0,
        }
    }

    fn render_list(
        state: &mut MessageListState,
        messages: &[Message],
        historical: &HashMap<String, Vec<ProcessedEvent>>,
        live: &[ProcessedEvent],
        is_loading: bool,
        size: (u16, u16),
    ) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(size.0, size.1)).unwrap();
        terminal
            .draw(|f| {
                MessageList::new(state, messages, historical, live, is_loading, 0.0)
                    .render(f, f.area())
            })
            .unwrap();
        buffer_rows(terminal.backend().buffer())
    }

    #[test]
    fn test_layout_cache_reusable() {
        let mut cache = LayoutCache::new();
        cache.heights = vec![3, 5];
        cache.update_metadata(vec![fp("a", 1), fp("b", 2)], 80);

        // Same transcript -> all reusable
        assert_eq!(cache.reusable_count(&[fp("a", 1), fp("b", 2)], 80), 2);
        // New message appended -> existing two still valid
        assert_eq!(
            cache.reusable_count(&[fp("a", 1), fp("b", 2), fp("c", 3)], 80),
            2
        );
        // Width changed -> nothing reusable
        assert_eq!(cache.reusable_count(&[fp("a", 1), fp("b", 2)], 40), 0);
        // Second message replaced by the snapshot -> only the first survives
        assert_eq!(cache.reusable_count(&[fp("a", 1), fp("x", 2)], 80), 1);
        // Transcript cleared
        assert_eq!(cache.reusable_count(&[], 80), 0);
    }

    #[test]
    fn test_timeline_attachment_invalidates_height() {
        let mut cache = LayoutCache::new();
        cache.heights = vec![3];
        cache.update_metadata(vec![fp("m1", 6)], 80);

        let with_timeline = Fingerprint {
            timeline_len: 2,
            ..fp("m1", 6)
        };
        assert_eq!(cache.reusable_count(&[with_timeline], 80), 0);
    }

    #[test]
    fn test_visible_range() {
        let mut cache = LayoutCache::new();
        cache.heights = vec![10, 10, 10, 10];
        cache.rebuild_prefix_heights();
        assert_eq!(cache.visible_range(0, 10), 0..2);
        assert_eq!(cache.messages_height(), 40);
    }

    #[test]
    fn in_progress_entry_appears_only_while_loading_with_messages() {
        let messages = vec![Message::human("h1".into(), "what is fusion?".into())];
        let live = vec![ProcessedEvent::new("Web Research", "Gathered 3 sources.")];
        let historical = HashMap::new();

        let mut state = MessageListState::new();
        let text = render_list(&mut state, &messages, &historical, &live, true, (60, 20)).join("\n");
        assert!(text.contains("Research Agent"));
        assert!(text.contains("Web Research"));

        let mut state = MessageListState::new();
        let text = render_list(&mut state, &messages, &historical, &live, false, (60, 20)).join("\n");
        assert!(!text.contains("Research Agent"));

        let mut state = MessageListState::new();
        render_list(&mut state, &[], &historical, &live, true, (60, 20));
        assert_eq!(state.layout.total_height(), 0);
    }

    #[test]
    fn hidden_messages_take_no_space() {
        let tool: Message = serde_json::from_value(serde_json::json!({
            "type": "tool", "id": "t1", "content": "raw tool output"
        }))
        .unwrap();
        let messages = vec![Message::human("h1".into(), "q".into()), tool];
        let mut state = MessageListState::new();
        let text =
            render_list(&mut state, &messages, &HashMap::new(), &[], false, (40, 10)).join("\n");
        assert_eq!(state.layout.heights[1], 0);
        assert!(!text.contains("raw tool output"));
    }

    #[test]
    fn prefix_heights_saturate_on_huge_transcripts() {
        let mut cache = LayoutCache::default();
        cache.heights = vec![u16::MAX - 5, 10, 3];
        cache.trailing_height = 7;
        cache.rebuild_prefix_heights();
        assert_eq!(cache.prefix_heights, vec![u16::MAX - 5, u16::MAX, u16::MAX]);
        assert_eq!(cache.messages_height(), u16::MAX);
        assert_eq!(cache.total_height(), u16::MAX);
    }

    #[test]
    fn scroll_up_unpins_and_scroll_down_repins() {
        let messages: Vec<Message> = (0..10)
            .map(|i| Message::human(format!("h{i}"), format!("question {i}")))
            .collect();
        let mut state = MessageListState::new();
        render_list(&mut state, &messages, &HashMap::new(), &[], false, (40, 10));
        assert!(state.stick_to_bottom);

        state.handle_event(&TuiEvent::ScrollUp);
        assert!(!state.stick_to_bottom);
        assert!(state.has_unseen_content());

        for _ in 0..5 {
            state.handle_event(&TuiEvent::ScrollDown);
        }
        assert!(state.stick_to_bottom);
    }
}
