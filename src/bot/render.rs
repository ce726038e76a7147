//! Rendering of [`Reply`] values and button lists into Discord builders.
//!
//! Discord allows five buttons per action row and five rows per message, so button
//! lists are cut at 25. Labels are cut at 80 characters and message text at 2000.

use crate::core::{action::ActionButton, conversation::Reply};
use poise::serenity_prelude as serenity;

const MAX_BUTTONS: usize = 25;
const BUTTONS_PER_ROW: usize = 5;
const MAX_LABEL_CHARS: usize = 80;
const MAX_CONTENT_CHARS: usize = 2000;

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars - 1).collect();
    cut.push('…');
    cut
}

/// Lays buttons out in rows of five, dropping anything past the 25th.
#[must_use]
pub fn components(buttons: &[ActionButton]) -> Vec<serenity::CreateActionRow> {
    let buttons: Vec<&ActionButton> = buttons.iter().take(MAX_BUTTONS).collect();
    buttons
        .chunks(BUTTONS_PER_ROW)
        .map(|row| {
            serenity::CreateActionRow::Buttons(
                row.iter()
                    .map(|button| {
                        serenity::CreateButton::new(button.action.to_string())
                            .label(truncate(&button.label, MAX_LABEL_CHARS))
                            .style(serenity::ButtonStyle::Primary)
                    })
                    .collect(),
            )
        })
        .collect()
}

/// A channel message (used for DMs and notifications).
#[must_use]
pub fn create_message(text: &str, buttons: &[ActionButton]) -> serenity::CreateMessage {
    serenity::CreateMessage::new()
        .content(truncate(text, MAX_CONTENT_CHARS))
        .components(components(buttons))
}

/// A command response.
#[must_use]
pub fn create_reply(reply: &Reply) -> poise::CreateReply {
    poise::CreateReply::default()
        .content(truncate(&reply.text, MAX_CONTENT_CHARS))
        .components(components(&reply.buttons))
}

/// A response to a button click.
#[must_use]
pub fn interaction_response(reply: &Reply) -> serenity::CreateInteractionResponse {
    serenity::CreateInteractionResponse::Message(
        serenity::CreateInteractionResponseMessage::new()
            .content(truncate(&reply.text, MAX_CONTENT_CHARS))
            .components(components(&reply.buttons)),
    )
}
