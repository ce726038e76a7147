//! Routes gateway events into the conversation driver.
//!
//! Only direct messages are handled. Messages from bots and prefix commands
//! (which poise dispatches itself) are ignored.

use crate::{
    bot::{BotData, notifier::DiscordNotifier, render},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{debug, info};

/// Entry point registered as the poise event handler.
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, BotData, Error>,
    data: &BotData,
) -> Result<()> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            info!("{} is connected", data_about_bot.user.name);
            Ok(())
        }
        serenity::FullEvent::Message { new_message } => {
            handle_message(ctx, new_message, data).await
        }
        serenity::FullEvent::InteractionCreate {
            interaction: serenity::Interaction::Component(component),
        } => handle_component(ctx, component, data).await,
        _ => Ok(()),
    }
}

fn is_conversational(message: &serenity::Message) -> bool {
    !message.author.bot
        && message.guild_id.is_none()
        && !message.content.trim_start().starts_with('/')
}

async fn handle_message(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &BotData,
) -> Result<()> {
    if !is_conversational(message) {
        return Ok(());
    }

    let user_id = message.author.id.to_string();
    debug!("DM from {user_id}");

    let notifier = DiscordNotifier::new(Arc::clone(&ctx.http));
    let reply = data
        .conversation(&notifier)
        .handle_text(&user_id, &message.content)
        .await;

    message
        .channel_id
        .send_message(&ctx.http, render::create_message(&reply.text, &reply.buttons))
        .await?;
    Ok(())
}

async fn handle_component(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    data: &BotData,
) -> Result<()> {
    let user_id = component.user.id.to_string();
    debug!("Button {} from {user_id}", component.data.custom_id);

    let notifier = DiscordNotifier::new(Arc::clone(&ctx.http));
    let reply = data
        .conversation(&notifier)
        .handle_action(&user_id, &component.data.custom_id)
        .await;

    component
        .create_response(&ctx.http, render::interaction_response(&reply))
        .await?;
    Ok(())
}
