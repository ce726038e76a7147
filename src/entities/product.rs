//! Product entity - An item listed by a seller.
//!
//! Stock never goes below zero; the only decrement path is the conditional update
//! in [`crate::core::product::decrement_stock`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the seller listing this product
    pub seller_id: i64,
    /// Name of the product (e.g., "Rice", "Apples")
    pub name: String,
    /// Packaging descriptor (e.g., "1kg", "box of 12")
    pub packaging: String,
    /// Unit price
    pub price: f64,
    /// Units in stock
    pub stock: i64,
    /// When the product was created
    pub created_at: DateTime,
    /// When the product was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each product belongs to one seller
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
