//! Admin Discord commands - allow, ban, sellers and buyers.
//!
//! Authorization is checked in the conversation layer against `ADMIN_USER_ID`;
//! these commands only forward the caller and arguments.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, notifier::DiscordNotifier, render},
        errors::{Error, Result},
    };
    use std::sync::Arc;

    /// Grants seller access to a user.
    #[poise::command(slash_command, prefix_command)]
    pub async fn allow(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Discord user id of the new seller"] user_id: String,
    ) -> Result<()> {
        let caller = ctx.author().id.to_string();
        let notifier = DiscordNotifier::new(Arc::clone(&ctx.serenity_context().http));
        let reply = ctx
            .data()
            .conversation(&notifier)
            .allow_seller(&caller, &user_id)
            .await?;
        ctx.send(render::create_reply(&reply)).await?;
        Ok(())
    }

    /// Revokes seller access from a user.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ban(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Discord user id of the seller"] user_id: String,
    ) -> Result<()> {
        let caller = ctx.author().id.to_string();
        let notifier = DiscordNotifier::new(Arc::clone(&ctx.serenity_context().http));
        let reply = ctx
            .data()
            .conversation(&notifier)
            .ban_seller(&caller, &user_id)
            .await?;
        ctx.send(render::create_reply(&reply)).await?;
        Ok(())
    }

    /// Lists every seller with shop name and status.
    #[poise::command(slash_command, prefix_command)]
    pub async fn sellers(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let caller = ctx.author().id.to_string();
        let notifier = DiscordNotifier::new(Arc::clone(&ctx.serenity_context().http));
        let reply = ctx
            .data()
            .conversation(&notifier)
            .list_sellers(&caller)
            .await?;
        ctx.send(render::create_reply(&reply)).await?;
        Ok(())
    }

    /// Lists every user that has placed an order.
    #[poise::command(slash_command, prefix_command)]
    pub async fn buyers(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let caller = ctx.author().id.to_string();
        let notifier = DiscordNotifier::new(Arc::clone(&ctx.serenity_context().http));
        let reply = ctx
            .data()
            .conversation(&notifier)
            .list_buyers(&caller)
            .await?;
        ctx.send(render::create_reply(&reply)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
