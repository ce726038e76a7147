//! Order entity - A buyer's request for a quantity of one product.
//!
//! Orders are append-only apart from the status (and decline reason). The product
//! name, packaging and unit price are copied in at creation so that an order still
//! renders after its product is deleted; `product_id` is deliberately not a foreign key.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status stored as a lowercase string in the database.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum OrderStatus {
    /// Created by the buyer, waiting for the seller
    #[sea_orm(string_value = "new")]
    New,
    /// Accepted by the seller, stock deducted
    #[sea_orm(string_value = "accepted")]
    Accepted,
    /// Declined by the seller
    #[sea_orm(string_value = "declined")]
    Declined,
}

impl OrderStatus {
    /// Terminal statuses admit no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Declined)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::New => "new",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        };
        f.write_str(label)
    }
}

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Chat user id of the buyer
    pub buyer_external_id: String,
    /// Seller the order was placed with
    pub seller_id: i64,
    /// Ordered product; may dangle after the product is deleted
    pub product_id: i64,
    /// Product name at the time of ordering
    pub product_name: String,
    /// Product packaging at the time of ordering
    pub packaging: String,
    /// Unit price at the time of ordering
    pub unit_price: f64,
    /// Requested units
    pub quantity: i64,
    /// Delivery address
    pub address: String,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Seller's reason, set when the order is declined
    pub decline_reason: Option<String>,
    /// When the order was placed
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order is addressed to one seller
    #[sea_orm(
        belongs_to = "super::seller::Entity",
        from = "Column::SellerId",
        to = "super::seller::Column::Id"
    )]
    Seller,
}

impl Related<super::seller::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seller.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
