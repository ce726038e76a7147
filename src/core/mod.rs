//! Core business logic - framework-agnostic marketplace operations.
//!
//! Nothing in here knows about Discord: the bot layer turns chat events into calls
//! on [`conversation::Conversation`] and renders the returned replies.

/// Button action tokens
pub mod action;
/// Conversation driver for commands, messages and button presses
pub mod conversation;
/// Order lifecycle engine (accept/decline with stock deduction)
pub mod lifecycle;
/// Best-effort notifications to other users
pub mod notify;
/// Order store
pub mod order;
/// Product catalog store
pub mod product;
/// Seller registry
pub mod seller;
/// Per-user conversation state
pub mod session;
