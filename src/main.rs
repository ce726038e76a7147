use dotenvy::dotenv;
use market_buddy::{
    bot,
    config::{
        Settings,
        database::{create_connection, create_tables},
    },
    errors::{Error, Result},
};
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Admin identity and marketplace settings
    let settings = Settings::load().inspect_err(|e| error!("Failed to load settings: {e}"))?;
    info!(
        "Loaded settings (currency: {}, low-stock threshold: {})",
        settings.marketplace.currency, settings.marketplace.low_stock_threshold
    );

    // 4. Database
    let db = create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    create_tables(&db)
        .await
        .inspect(|_| info!("Database schema is ready"))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    // 5. Run the bot
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))
        .map_err(Error::EnvVar)?;

    bot::run_bot(token, db, settings).await
}
