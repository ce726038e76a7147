//! Shared test utilities for `MarketBuddy`.
//!
//! This module provides common helper functions for setting up test databases,
//! creating test entities with sensible defaults and recording notifications.

use crate::{
    config::{MarketplaceConfig, Settings},
    core::{
        action::ActionButton,
        notify::Notifier,
        order::{self, NewOrder},
        product, seller,
    },
    entities,
    errors::{Error, Result},
};
use sea_orm::{ConnectOptions, DatabaseConnection};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;
use std::{
    collections::HashSet,
    sync::{Mutex, PoisonError},
};

/// Routes `tracing` output through the test harness; safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("market_buddy=debug"))
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database in a fresh temporary directory.
///
/// Unlike `sqlite::memory:`, the pool holds several connections, so concurrent
/// futures really run on separate connections. Keep the returned directory alive
/// for as long as the connection is used.
pub async fn setup_file_test_db() -> Result<(TempDir, DatabaseConnection)> {
    let dir = tempfile::tempdir().map_err(|e| Error::Config {
        message: format!("Cannot create test directory: {e}"),
    })?;
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.sqlite").display());
    let mut options = ConnectOptions::new(url);
    options.max_connections(4).min_connections(2).sqlx_logging(false);

    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok((dir, db))
}

/// Creates an active seller with a shop.
pub async fn create_test_seller(
    db: &DatabaseConnection,
    user_id: &str,
    shop_name: &str,
) -> Result<entities::seller::Model> {
    seller::register_seller(db, user_id).await?;
    seller::activate(db, user_id).await?;
    seller::set_shop_name(db, user_id, shop_name).await
}

/// Database with one active seller.
///
/// # Defaults
/// * user id: "seller-1"
/// * shop name: "Test shop"
pub async fn setup_with_seller() -> Result<(DatabaseConnection, entities::seller::Model)> {
    let db = setup_test_db().await?;
    let seller = create_test_seller(&db, "seller-1", "Test shop").await?;
    Ok((db, seller))
}

/// Database with one active seller and one product.
///
/// # Defaults
/// * name: "Test Product", packaging: "1kg"
/// * price: 10.0
/// * stock: 10
pub async fn setup_with_product() -> Result<(
    DatabaseConnection,
    entities::seller::Model,
    entities::product::Model,
)> {
    let (db, seller) = setup_with_seller().await?;
    let product = product::add_product(&db, seller.id, "Test Product", "1kg", 10.0, 10).await?;
    Ok((db, seller, product))
}

/// Places a `new` order for `product` with a default address.
pub async fn create_test_order(
    db: &DatabaseConnection,
    buyer_id: &str,
    product: &entities::product::Model,
    quantity: i64,
) -> Result<entities::order::Model> {
    order::create_order(
        db,
        NewOrder {
            buyer_id,
            product,
            quantity,
            address: "1 Test street",
        },
    )
    .await
}

/// Settings with admin "admin" and default marketplace tuning.
#[must_use]
pub fn test_settings() -> Settings {
    Settings::new("admin", MarketplaceConfig::default())
}

/// A notification captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    /// Recipient
    pub target: String,
    /// Message text
    pub text: String,
    /// Attached buttons
    pub buttons: Vec<ActionButton>,
}

/// Notifier that records deliveries instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    failing: HashSet<String>,
}

impl RecordingNotifier {
    /// Fails every delivery to the given users, as if they had blocked the bot.
    pub fn failing_for<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sent: Mutex::default(),
            failing: targets.into_iter().map(Into::into).collect(),
        }
    }

    /// Every successful delivery so far, in order.
    pub fn sent(&self) -> Vec<Sent> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Successful deliveries to one user.
    pub fn sent_to(&self, target: &str) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|sent| sent.target == target)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    async fn notify(&self, target_user_id: &str, text: &str, buttons: &[ActionButton]) -> Result<()> {
        if self.failing.contains(target_user_id) {
            return Err(Error::InvalidUserId {
                user_id: target_user_id.to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Sent {
                target: target_user_id.to_string(),
                text: text.to_string(),
                buttons: buttons.to_vec(),
            });
        Ok(())
    }
}
