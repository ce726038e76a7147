//! Unified error type for the marketplace bot.
//!
//! Storage, configuration and transport failures all funnel into [`Error`]. Input
//! validation failures carry enough context to re-prompt the user on the same step.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Any failure reported by the storage layer
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Bad or missing configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Missing environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// No seller row for the given chat user
    #[error("Seller not found: {user_id}")]
    SellerNotFound {
        /// External chat user id
        user_id: String,
    },

    /// No product with the given id
    #[error("Product not found: {id}")]
    ProductNotFound {
        /// Product id
        id: i64,
    },

    /// No order with the given id
    #[error("Order not found: {id}")]
    OrderNotFound {
        /// Order id
        id: i64,
    },

    /// Price must be positive and finite
    #[error("Invalid price: {price}")]
    InvalidPrice {
        /// The rejected price
        price: f64,
    },

    /// Quantities and stock levels must be within range
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity {
        /// The rejected quantity
        quantity: i64,
    },

    /// Free-text input that failed validation
    #[error("Invalid {field}: {reason}")]
    InvalidInput {
        /// Which input was rejected
        field: &'static str,
        /// Human-readable reason
        reason: String,
    },

    /// Field name outside the editable allow-list
    #[error("Unknown product field: {field}")]
    UnknownField {
        /// The rejected field name
        field: String,
    },

    /// Another seller already uses this shop name
    #[error("Shop name already taken: {name}")]
    ShopNameTaken {
        /// Normalized shop name
        name: String,
    },

    /// A step was applied to a session running a different flow
    #[error("Flow mismatch: session is in {active}, step belongs to {requested}")]
    FlowMismatch {
        /// Flow currently active for the user
        active: &'static str,
        /// Flow the requested step belongs to
        requested: &'static str,
    },

    /// Button token that does not decode to a known action
    #[error("Unknown action token: {token}")]
    UnknownAction {
        /// Raw `custom_id`
        token: String,
    },

    /// Chat user id that cannot be addressed by the transport
    #[error("Invalid user id: {user_id}")]
    InvalidUserId {
        /// The raw id
        user_id: String,
    },

    /// Serenity/Poise framework error
    #[error("Discord error: {0}")]
    Discord(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Discord(Box::new(value))
    }
}

impl Error {
    /// Returns true when the underlying storage error is a unique-constraint violation.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Database(err) if matches!(err.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_)))
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
