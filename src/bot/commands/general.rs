//! General Discord commands - start, seller, cancel, ping and help.
//! Role-specific work happens through buttons and direct messages; these commands
//! are the entry points into it.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, notifier::DiscordNotifier, render},
        core::action::Action,
        errors::{Error, Result},
    };
    use std::sync::Arc;

    /// Shows the role picker and drops any unfinished flow.
    #[poise::command(slash_command, prefix_command)]
    pub async fn start(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let user_id = ctx.author().id.to_string();
        let notifier = DiscordNotifier::new(Arc::clone(&ctx.serenity_context().http));
        let reply = ctx.data().conversation(&notifier).start(&user_id);
        ctx.send(render::create_reply(&reply)).await?;
        Ok(())
    }

    /// Opens the seller menu (requests access on first use).
    #[poise::command(slash_command, prefix_command)]
    pub async fn seller(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let user_id = ctx.author().id.to_string();
        let notifier = DiscordNotifier::new(Arc::clone(&ctx.serenity_context().http));
        let reply = ctx
            .data()
            .conversation(&notifier)
            .perform(&user_id, Action::SellerMenu)
            .await;
        ctx.send(render::create_reply(&reply)).await?;
        Ok(())
    }

    /// Cancels whatever you are in the middle of.
    #[poise::command(slash_command, prefix_command)]
    pub async fn cancel(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let user_id = ctx.author().id.to_string();
        let notifier = DiscordNotifier::new(Arc::clone(&ctx.serenity_context().http));
        let reply = ctx.data().conversation(&notifier).cancel(&user_id);
        ctx.send(render::create_reply(&reply)).await?;
        Ok(())
    }

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**MarketBuddy Help**\n\
        Buy from local shops or run your own, right here in DMs.\n\n\
        **Everyone**\n\
        • `/start` - Choose between buying and selling.\n\
        • `/seller` - Open the seller menu (sellers need an active subscription).\n\
        • `/cancel` - Abandon the current step.\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.\n\n\
        **Admin**\n\
        • `/allow <user id>` - Grant seller access.\n\
        • `/ban <user id>` - Revoke seller access.\n\
        • `/sellers` - List sellers.\n\
        • `/buyers` - List buyers.\n\n\
        While a step is waiting for input, just type your answer in this DM.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
