//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for the MarketBuddy application:
//! slash/prefix commands, the DM and button event handler, message rendering and
//! the DM-based notifier.

/// Discord command implementations (general, admin)
pub mod commands;
/// Discord event handlers (DM messages, button clicks)
pub mod handlers;
/// Discord delivery of notifications
pub mod notifier;
/// Conversion of replies into Discord messages and components
pub mod render;

use crate::{
    config::Settings,
    core::{conversation::Conversation, session::SessionStore},
    errors::{Error, Result},
};
use notifier::DiscordNotifier;
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use tracing::{error, info, instrument};

/// Shared data available to all bot commands and event handlers.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Per-user conversation state
    pub sessions: SessionStore,
    /// Admin identity and marketplace tuning
    pub settings: Settings,
}

impl BotData {
    /// Creates a new `BotData` instance with an empty session store.
    #[must_use]
    pub fn new(database: DatabaseConnection, settings: Settings) -> Self {
        Self {
            database,
            sessions: SessionStore::new(),
            settings,
        }
    }

    /// Borrows everything a conversation needs for one event.
    #[must_use]
    pub const fn conversation<'a>(
        &'a self,
        notifier: &'a DiscordNotifier,
    ) -> Conversation<'a, DiscordNotifier> {
        Conversation::new(&self.database, &self.sessions, &self.settings, notifier)
    }
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {error}", ctx.command().name);
            if let Err(e) = ctx.say("⚠️ Something went wrong. Please try again.").await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Connects to Discord and runs until the gateway connection ends.
///
/// # Errors
/// Returns an error if the client cannot be built or the connection fails.
#[instrument(skip(token, database, settings))]
pub async fn run_bot(token: String, database: DatabaseConnection, settings: Settings) -> Result<()> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::start(),
                commands::seller(),
                commands::cancel(),
                commands::ping(),
                commands::help(),
                commands::allow(),
                commands::ban(),
                commands::sellers(),
                commands::buyers(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("/".to_string()),
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(handlers::event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Registered {} commands globally", framework.options().commands.len());
                Ok(BotData::new(database, settings))
            })
        })
        .build();

    let intents = serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot client...");
    client.start().await?;
    Ok(())
}
