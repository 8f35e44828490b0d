//! # Core Application Logic
//!
//! This module contains Scout's business logic.
//! It knows nothing about any specific UI technology.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • State (app data)     │
//!                    │  • Action (events)      │
//!                    │  • update() (reducer)   │
//!                    │                         │
//!                    │  No UI.                 │
//!                    └───────────┬─────────────┘
//!                                │
//!                   ┌────────────┴────────────┐
//!                   ▼                         ▼
//!            ┌────────────┐            ┌────────────┐
//!            │    TUI     │            │   Agent    │
//!            │  Adapter   │            │  Backend   │
//!            │ (ratatui)  │            │ (LangGraph)│
//!            └────────────┘            └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`state`]: The `App` struct holding all application state
//! - [`action`]: The `Action` enum and the `update()` reducer
//! - [`activity`]: Graph node updates → timeline entries
//! - [`config`]: Config file + env + CLI resolution
//! - [`export`]: Saving finished answers to disk

pub mod action;
pub mod activity;
pub mod config;
pub mod export;
pub mod state;
