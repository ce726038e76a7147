//! Marketplace settings loaded from config.toml
//!
//! Every key is optional; a missing file or table falls back to the defaults below.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Marketplace tuning knobs
    #[serde(default)]
    pub marketplace: MarketplaceConfig,
}

/// Tunable marketplace behaviour
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// Seller is alerted when an acceptance leaves this many units or fewer
    pub low_stock_threshold: i64,
    /// Shortest delivery address accepted from a buyer
    pub min_address_len: usize,
    /// Shortest shop name accepted during onboarding
    pub min_shop_name_len: usize,
    /// Currency label used when displaying prices
    pub currency: String,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: 5,
            min_address_len: 5,
            min_shop_name_len: 2,
            currency: "som".to_string(),
        }
    }
}

/// Loads marketplace configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_config(&contents)
}

/// Parses marketplace configuration from TOML text
pub fn parse_config(contents: &str) -> Result<Config> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads ./config.toml, returning defaults when the file does not exist
pub fn load_default_config() -> Result<Config> {
    let path = Path::new("config.toml");
    if !path.exists() {
        tracing::info!("No config.toml found, using default marketplace settings");
        return Ok(Config::default());
    }
    load_config(path)
}
