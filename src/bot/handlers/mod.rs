//! Discord interaction handlers
//!
//! This module provides handlers for Discord events that are not commands:
//! free-text direct messages and button clicks.

/// Gateway event routing
pub mod events;

pub use events::event_handler;
