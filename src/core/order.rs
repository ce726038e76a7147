//! Order store - creation, lookup and status writes for orders.
//!
//! Creation is a pure append and never touches stock. The store does not enforce
//! the status state machine: [`set_status`] overwrites unconditionally, while
//! [`transition_status`] is the compare-and-set used by the lifecycle engine.
//! Orders carry a snapshot of the product (name, packaging, unit price) taken at
//! creation time, which is what listings display.

use crate::{
    entities::{Order, OrderStatus, order, product},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*, sea_query::Expr};
use std::fmt;
use tracing::{info, instrument};

/// Human-readable order details, shared by the buyer's confirmation prompt,
/// the seller's new-order message and the admin's acceptance report.
#[derive(Debug, Clone)]
pub struct OrderSummary<'a> {
    /// Shop the order goes to
    pub shop_name: &'a str,
    /// Product name
    pub product_name: &'a str,
    /// Packaging descriptor
    pub packaging: &'a str,
    /// Requested units
    pub quantity: i64,
    /// Delivery address
    pub address: &'a str,
    /// Unit price
    pub unit_price: f64,
    /// Currency label
    pub currency: &'a str,
}

impl<'a> OrderSummary<'a> {
    /// Builds a summary from a stored order's snapshot fields.
    #[must_use]
    pub fn from_order(order: &'a order::Model, shop_name: &'a str, currency: &'a str) -> Self {
        Self {
            shop_name,
            product_name: &order.product_name,
            packaging: &order.packaging,
            quantity: order.quantity,
            address: &order.address,
            unit_price: order.unit_price,
            currency,
        }
    }

    /// Unit price times quantity.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

impl fmt::Display for OrderSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "🏪 Shop: {}", self.shop_name)?;
        writeln!(f, "📦 Product: {}", self.product_name)?;
        writeln!(f, "📊 Packaging: {}", self.packaging)?;
        writeln!(f, "🔢 Quantity: {}", self.quantity)?;
        writeln!(f, "📍 Address: {}", self.address)?;
        writeln!(f, "💰 Price: {:.2} {}", self.unit_price, self.currency)?;
        write!(f, "💵 Total: {:.2} {}", self.total(), self.currency)
    }
}

/// Everything a buyer submits when placing an order.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    /// Chat user id of the buyer
    pub buyer_id: &'a str,
    /// Product being ordered; seller and snapshot fields are taken from it
    pub product: &'a product::Model,
    /// Requested units
    pub quantity: i64,
    /// Delivery address
    pub address: &'a str,
}

/// Inserts a new order with status `new` and returns it.
///
/// # Errors
/// Returns `Error::InvalidQuantity` for non-positive quantities, or a database error.
#[instrument(skip(db, new_order), fields(buyer = new_order.buyer_id, product = new_order.product.id))]
pub async fn create_order(db: &DatabaseConnection, new_order: NewOrder<'_>) -> Result<order::Model> {
    if new_order.quantity <= 0 {
        return Err(Error::InvalidQuantity {
            quantity: new_order.quantity,
        });
    }

    let product = new_order.product;
    let order = order::ActiveModel {
        buyer_external_id: Set(new_order.buyer_id.to_string()),
        seller_id: Set(product.seller_id),
        product_id: Set(product.id),
        product_name: Set(product.name.clone()),
        packaging: Set(product.packaging.clone()),
        unit_price: Set(product.price),
        quantity: Set(new_order.quantity),
        address: Set(new_order.address.trim().to_string()),
        status: Set(OrderStatus::New),
        decline_reason: Set(None),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let order = order.insert(db).await?;
    info!(
        "Created order #{} for {} x product {} (seller {})",
        order.id, order.quantity, order.product_id, order.seller_id
    );
    Ok(order)
}

/// Retrieves a specific order by its unique ID.
pub async fn get_order<C>(db: &C, order_id: i64) -> Result<Option<order::Model>>
where
    C: ConnectionTrait,
{
    Order::find_by_id(order_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all orders addressed to a seller, most recent first.
pub async fn get_orders_for_seller(
    db: &DatabaseConnection,
    seller_id: i64,
) -> Result<Vec<order::Model>> {
    Order::find()
        .filter(order::Column::SellerId.eq(seller_id))
        .order_by_desc(order::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Returns the buyer's chat user id for an order, if the order exists.
pub async fn get_buyer_for_order(db: &DatabaseConnection, order_id: i64) -> Result<Option<String>> {
    Ok(get_order(db, order_id)
        .await?
        .map(|order| order.buyer_external_id))
}

/// Lists every distinct buyer that has placed at least one order.
pub async fn list_buyers(db: &DatabaseConnection) -> Result<Vec<String>> {
    Order::find()
        .select_only()
        .column(order::Column::BuyerExternalId)
        .distinct()
        .order_by_asc(order::Column::BuyerExternalId)
        .into_tuple::<String>()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Overwrites the status of an order unconditionally.
///
/// Returns `Ok(true)` if the order existed.
#[instrument(skip(db))]
pub async fn set_status<C>(db: &C, order_id: i64, status: OrderStatus) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Order::update_many()
        .col_expr(order::Column::Status, Expr::value(status))
        .filter(order::Column::Id.eq(order_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Moves an order from `from` to `to` only if it is still in `from`.
///
/// The optional `reason` is stored alongside (used for declines). Returns whether
/// the transition applied; `false` means the order is missing or already moved on.
#[instrument(skip(db, reason))]
pub async fn transition_status<C>(
    db: &C,
    order_id: i64,
    from: OrderStatus,
    to: OrderStatus,
    reason: Option<&str>,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let mut update = Order::update_many().col_expr(order::Column::Status, Expr::value(to));
    if let Some(reason) = reason {
        update = update.col_expr(order::Column::DeclineReason, Expr::value(reason));
    }

    let result = update
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::Status.eq(from))
        .exec(db)
        .await?;

    Ok(result.rows_affected == 1)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_order_snapshots_product_and_keeps_stock() -> Result<()> {
        let (db, seller, product) = setup_with_product().await?;

        let order = create_test_order(&db, "buyer-1", &product, 2).await?;

        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.seller_id, seller.id);
        assert_eq!(order.product_id, product.id);
        assert_eq!(order.product_name, product.name);
        assert_eq!(order.packaging, product.packaging);
        assert_eq!(order.unit_price, product.price);
        assert_eq!(order.quantity, 2);
        assert!(order.decline_reason.is_none());

        // Creation never reserves stock
        let after = crate::core::product::get_product(&db, product.id)
            .await?
            .unwrap();
        assert_eq!(after.stock, product.stock);

        Ok(())
    }

    #[tokio::test]
    async fn test_summary_uses_snapshot_and_total() -> Result<()> {
        let (db, _seller, product) = setup_with_product().await?;
        let order = create_test_order(&db, "b1", &product, 3).await?;

        let summary = OrderSummary::from_order(&order, "Bakery", "som");
        assert_eq!(summary.total(), product.price * 3.0);

        let text = summary.to_string();
        assert!(text.contains("Bakery"));
        assert!(text.contains(&product.name));
        assert!(text.contains("Quantity: 3"));
        assert!(text.contains("som"));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_order_rejects_non_positive_quantity() -> Result<()> {
        let (db, _seller, product) = setup_with_product().await?;
        let result = create_test_order(&db, "buyer-1", &product, 0).await;
        assert!(matches!(result, Err(Error::InvalidQuantity { quantity: 0 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_orders_for_seller_most_recent_first() -> Result<()> {
        let (db, seller, product) = setup_with_product().await?;

        let first = create_test_order(&db, "b1", &product, 1).await?;
        let second = create_test_order(&db, "b2", &product, 1).await?;

        let orders = get_orders_for_seller(&db, seller.id).await?;
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, second.id);
        assert_eq!(orders[1].id, first.id);

        assert!(get_orders_for_seller(&db, seller.id + 100).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_buyer_lookup_and_listing() -> Result<()> {
        let (db, _seller, product) = setup_with_product().await?;

        let order = create_test_order(&db, "b2", &product, 1).await?;
        create_test_order(&db, "b1", &product, 1).await?;
        create_test_order(&db, "b2", &product, 3).await?;

        assert_eq!(
            get_buyer_for_order(&db, order.id).await?.as_deref(),
            Some("b2")
        );
        assert!(get_buyer_for_order(&db, 4242).await?.is_none());

        assert_eq!(list_buyers(&db).await?, vec!["b1", "b2"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_set_status_is_unconditional() -> Result<()> {
        let (db, _seller, product) = setup_with_product().await?;
        let order = create_test_order(&db, "b1", &product, 1).await?;

        assert!(set_status(&db, order.id, OrderStatus::Declined).await?);
        assert!(set_status(&db, order.id, OrderStatus::Accepted).await?);
        assert_eq!(
            get_order(&db, order.id).await?.unwrap().status,
            OrderStatus::Accepted
        );
        assert!(!set_status(&db, 999, OrderStatus::Accepted).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_transition_status_only_from_expected_state() -> Result<()> {
        let (db, _seller, product) = setup_with_product().await?;
        let order = create_test_order(&db, "b1", &product, 1).await?;

        assert!(
            transition_status(
                &db,
                order.id,
                OrderStatus::New,
                OrderStatus::Declined,
                Some("out of stock")
            )
            .await?
        );
        assert!(
            !transition_status(&db, order.id, OrderStatus::New, OrderStatus::Accepted, None)
                .await?
        );

        let stored = get_order(&db, order.id).await?.unwrap();
        assert_eq!(stored.status, OrderStatus::Declined);
        assert_eq!(stored.decline_reason.as_deref(), Some("out of stock"));

        Ok(())
    }
}
