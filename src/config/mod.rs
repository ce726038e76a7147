//! Application configuration: database connection, marketplace settings and the admin identity.

/// Admin identity from environment variables
pub mod admin;

/// Database configuration and connection management
pub mod database;

/// Marketplace settings from config.toml
pub mod marketplace;

pub use marketplace::MarketplaceConfig;

use crate::errors::Result;

/// Runtime settings shared by the conversation layer and the lifecycle engine.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Chat user id of the admin
    pub admin_user_id: String,
    /// Marketplace tuning knobs
    pub marketplace: MarketplaceConfig,
}

impl Settings {
    /// Creates settings from an admin id and marketplace config.
    #[must_use]
    pub fn new(admin_user_id: impl Into<String>, marketplace: MarketplaceConfig) -> Self {
        Self {
            admin_user_id: admin_user_id.into(),
            marketplace,
        }
    }

    /// Loads settings from `ADMIN_USER_ID` and ./config.toml.
    pub fn load() -> Result<Self> {
        let admin_user_id = admin::get_admin_user_id()?;
        let config = marketplace::load_default_config()?;
        Ok(Self::new(admin_user_id, config.marketplace))
    }
}
