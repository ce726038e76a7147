//! Admin identity loaded from the environment.
//!
//! The admin is a single fixed chat user; admin-only commands compare the caller
//! against this id with strict equality.

use crate::errors::{Error, Result};

/// Gets the admin's chat user id from `ADMIN_USER_ID`.
///
/// # Errors
/// Returns an error if the variable is unset or blank.
pub fn get_admin_user_id() -> Result<String> {
    let admin_id = std::env::var("ADMIN_USER_ID")?;
    let admin_id = admin_id.trim();
    if admin_id.is_empty() {
        return Err(Error::Config {
            message: "ADMIN_USER_ID must not be empty".to_string(),
        });
    }
    Ok(admin_id.to_string())
}

/// Returns true when `user_id` is the configured admin.
#[must_use]
pub fn is_admin(admin_user_id: &str, user_id: &str) -> bool {
    admin_user_id == user_id
}
