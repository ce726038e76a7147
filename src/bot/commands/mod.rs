//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Admin-only commands
pub mod admin;

/// General commands available to everyone
pub mod general;

// Export commands
pub use admin::*;
pub use general::*;
