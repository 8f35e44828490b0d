//! # TUI Components
//!
//! All UI components for the terminal interface.
//!
//! ## Component Architecture
//!
//! ### Stateless Components (Props-Based Rendering)
//!
//! Display components built each frame from borrowed data:
//! - `TitleBar`: Top status line
//! - `MessageCard`: One transcript entry
//! - `ActivityTimeline`: Progress log of a research run
//!
//! ### Stateful Components (Event-Driven)
//!
//! Components that own local state and emit events:
//! - `QueryForm`: Query box with effort/model selectors (shared by both screens)
//! - `WelcomeScreen`: Initial screen hosting a `QueryForm`
//! - `ChatMessagesView` / `ChatViewState`: Transcript plus follow-up form
//! - `MessageList`: Scrollable transcript with layout caching
//!
//! Components compose: `ChatMessagesView` renders a `MessageList`, which
//! renders `MessageCard`s, which render `ActivityTimeline`s.
//!
//! ## Module Structure
//!
//! ```text
//! components/
//! ├── mod.rs                 (this file)
//! ├── activity_timeline.rs   (Ordered progress log)
//! ├── chat_messages_view.rs  (Conversation screen)
//! ├── message.rs             (Single transcript entry)
//! ├── message_list.rs        (Scrollable transcript)
//! ├── query_form/            (Query box + selectors)
//! ├── title_bar.rs           (Top status line)
//! └── welcome_screen.rs      (Initial screen)
//! ```

pub mod activity_timeline;
pub mod chat_messages_view;
pub mod message;
pub mod message_list;
pub mod query_form;
mod title_bar;
pub mod welcome_screen;

pub use chat_messages_view::{ChatEvent, ChatMessagesView, ChatViewState};
pub use query_form::QueryForm;
pub use title_bar::TitleBar;
pub use welcome_screen::{WelcomeEvent, WelcomeScreen};
