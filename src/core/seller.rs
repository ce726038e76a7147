//! Seller catalog - registration, onboarding and admin activation of sellers.
//!
//! Sellers are keyed by their chat user id. Registration is idempotent from the
//! caller's point of view: a duplicate insert is reported as `false`, never as an error.

use crate::{
    entities::{Seller, seller},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use tracing::{info, instrument, warn};

/// Inserts a pending seller (no shop name, inactive) for the given chat user.
///
/// Returns `Ok(true)` when a row was created and `Ok(false)` when the user is
/// already registered.
///
/// # Errors
/// Returns an error for storage failures other than the uniqueness violation.
#[instrument(skip(db))]
pub async fn register_seller<C>(db: &C, user_id: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    let seller = seller::ActiveModel {
        external_user_id: Set(user_id.to_string()),
        shop_name: Set(None),
        is_active: Set(false),
        ..Default::default()
    };

    match seller.insert(db).await.map_err(Error::from) {
        Ok(created) => {
            info!("Registered pending seller {} for user {user_id}", created.id);
            Ok(true)
        }
        Err(e) if e.is_unique_violation() => {
            warn!("Seller for user {user_id} already exists, skipping registration");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Normalizes a shop name: trims surrounding whitespace and upper-cases the first letter.
#[must_use]
pub fn normalize_shop_name(name: &str) -> String {
    let trimmed = name.trim();
    let mut chars = trimmed.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Sets the shop name of a seller after normalizing it.
///
/// # Errors
/// Returns `Error::SellerNotFound` if no seller exists for the user and
/// `Error::ShopNameTaken` if another seller already uses the name.
#[instrument(skip(db))]
pub async fn set_shop_name(
    db: &DatabaseConnection,
    user_id: &str,
    name: &str,
) -> Result<seller::Model> {
    let normalized = normalize_shop_name(name);
    let mut seller: seller::ActiveModel = get_seller_by_user(db, user_id)
        .await?
        .ok_or_else(|| Error::SellerNotFound {
            user_id: user_id.to_string(),
        })?
        .into();

    seller.shop_name = Set(Some(normalized.clone()));

    match seller.update(db).await.map_err(Error::from) {
        Ok(updated) => {
            info!("Seller {} opened shop '{normalized}'", updated.id);
            Ok(updated)
        }
        Err(e) if e.is_unique_violation() => Err(Error::ShopNameTaken { name: normalized }),
        Err(e) => Err(e),
    }
}

async fn set_active(db: &DatabaseConnection, user_id: &str, active: bool) -> Result<bool> {
    let result = Seller::update_many()
        .col_expr(seller::Column::IsActive, Expr::value(active))
        .filter(seller::Column::ExternalUserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Grants seller capabilities. No-op (returns `false`) if the seller does not exist.
#[instrument(skip(db))]
pub async fn activate(db: &DatabaseConnection, user_id: &str) -> Result<bool> {
    let changed = set_active(db, user_id, true).await?;
    info!("Activate seller {user_id}: applied = {changed}");
    Ok(changed)
}

/// Revokes seller capabilities. No-op (returns `false`) if the seller does not exist.
#[instrument(skip(db))]
pub async fn deactivate(db: &DatabaseConnection, user_id: &str) -> Result<bool> {
    let changed = set_active(db, user_id, false).await?;
    info!("Deactivate seller {user_id}: applied = {changed}");
    Ok(changed)
}

/// Finds the seller registered for a chat user.
pub async fn get_seller_by_user<C>(db: &C, user_id: &str) -> Result<Option<seller::Model>>
where
    C: ConnectionTrait,
{
    Seller::find()
        .filter(seller::Column::ExternalUserId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a seller by its row id.
pub async fn get_seller_by_id<C>(db: &C, seller_id: i64) -> Result<Option<seller::Model>>
where
    C: ConnectionTrait,
{
    Seller::find_by_id(seller_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists every seller, pending and active, in registration order.
pub async fn list_sellers(db: &DatabaseConnection) -> Result<Vec<seller::Model>> {
    Seller::find()
        .order_by_asc(seller::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists shops visible to buyers: active sellers that have chosen a shop name.
pub async fn list_active_shops(db: &DatabaseConnection) -> Result<Vec<seller::Model>> {
    Seller::find()
        .filter(seller::Column::IsActive.eq(true))
        .filter(seller::Column::ShopName.is_not_null())
        .order_by_asc(seller::Column::ShopName)
        .all(db)
        .await
        .map_err(Into::into)
}
