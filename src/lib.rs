//! Scout library exports for testing

pub mod agent;
pub mod core;
pub mod tui;

#[cfg(test)]
pub mod test_support;
