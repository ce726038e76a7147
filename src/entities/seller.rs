//! Seller entity - A chat user allowed (by the admin) to run a shop.
//!
//! A seller row is created on the first seller interaction or by an admin grant.
//! The shop name stays empty until the seller completes onboarding, and the active
//! flag gates every seller capability.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Seller database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sellers")]
pub struct Model {
    /// Unique identifier for the seller
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Chat platform user id of the seller
    #[sea_orm(unique)]
    pub external_user_id: String,
    /// Public shop name, None until onboarding completes
    #[sea_orm(unique)]
    pub shop_name: Option<String>,
    /// Whether the admin has granted access
    pub is_active: bool,
}

/// Defines relationships between Seller and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One seller lists many products
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
    /// One seller receives many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
