//! Delivers notifications as direct messages.

use crate::{
    bot::render,
    core::{action::ActionButton, notify::Notifier},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Sends notifications to users over DM channels.
#[derive(Clone)]
pub struct DiscordNotifier {
    http: Arc<serenity::Http>,
}

impl DiscordNotifier {
    /// Creates a notifier over a shared HTTP client.
    #[must_use]
    pub const fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

/// Converts a stored user id into a Discord id. Zero is not a valid snowflake.
pub fn parse_user_id(user_id: &str) -> Result<serenity::UserId> {
    match user_id.trim().parse::<u64>() {
        Ok(id) if id != 0 => Ok(serenity::UserId::new(id)),
        _ => Err(Error::InvalidUserId {
            user_id: user_id.to_string(),
        }),
    }
}

impl Notifier for DiscordNotifier {
    async fn notify(&self, target_user_id: &str, text: &str, buttons: &[ActionButton]) -> Result<()> {
        let user = parse_user_id(target_user_id)?;
        let channel = user.create_dm_channel(&*self.http).await?;
        channel
            .send_message(&*self.http, render::create_message(text, buttons))
            .await?;
        Ok(())
    }
}
