//! Notification sink used to reach users other than the one who triggered an event.
//!
//! Delivery is best-effort. A recipient may have blocked the bot or closed their
//! DMs, so [`notify_best_effort`] logs failures and never propagates them.

use crate::{core::action::ActionButton, errors::Result};
use std::future::Future;
use tracing::{debug, warn};

/// Delivers a message (with optional buttons) to a chat user.
pub trait Notifier: Send + Sync {
    /// Sends `text` to `target_user_id`.
    fn notify(
        &self,
        target_user_id: &str,
        text: &str,
        buttons: &[ActionButton],
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Sends a notification and swallows (after logging) any delivery failure.
///
/// Returns whether the message was delivered.
pub async fn notify_best_effort<N: Notifier>(
    notifier: &N,
    target_user_id: &str,
    text: &str,
    buttons: &[ActionButton],
) -> bool {
    match notifier.notify(target_user_id, text, buttons).await {
        Ok(()) => {
            debug!("Notified {target_user_id}");
            true
        }
        Err(e) => {
            warn!("Failed to notify {target_user_id}: {e}");
            false
        }
    }
}
