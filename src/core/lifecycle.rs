//! Order lifecycle engine.
//!
//! An order starts as `new` and ends as either `accepted` or `declined`; both are
//! terminal. Stock is deducted exactly once, on `new -> accepted`, inside the same
//! database transaction as the status change, so a failure can never leave stock
//! deducted with the order still `new` (or the reverse). Re-accepting a processed
//! order is reported, not applied.
//!
//! Notifications go out only after the transaction commits and are best-effort.

use crate::{
    config::Settings,
    core::{
        notify::{Notifier, notify_best_effort},
        order::{self as order_store, OrderSummary},
        product as catalog,
        seller as sellers,
    },
    entities::{OrderStatus, order, product, seller},
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use tracing::{info, instrument, warn};

/// Why an order cannot move out of `new` for this seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The order id does not resolve
    NotFound,
    /// The order belongs to a different seller
    NotOwner,
    /// The order is already terminal
    AlreadyProcessed(OrderStatus),
}

/// Result of checking that an order is still pending for a seller.
#[derive(Debug, Clone)]
pub enum Pending {
    /// The order is `new` and owned by the acting seller
    Ready {
        /// The pending order
        order: order::Model,
        /// Its seller
        seller: seller::Model,
    },
    /// The order cannot be processed
    Rejected(Rejection),
}

/// Result of a seller accepting an order.
#[derive(Debug, Clone)]
pub enum AcceptOutcome {
    /// Stock deducted and status set to `accepted`
    Accepted {
        /// The order, now accepted
        order: order::Model,
        /// The product after the deduction
        product: product::Model,
    },
    /// The order is missing, foreign or already processed
    Rejected(Rejection),
    /// The ordered product was deleted after the order was placed
    ProductMissing,
    /// Not enough stock left; nothing was changed
    InsufficientStock {
        /// Units the order asks for
        requested: i64,
        /// Units currently in stock
        available: i64,
    },
}

/// Result of a seller declining an order.
#[derive(Debug, Clone)]
pub enum DeclineOutcome {
    /// Status set to `declined` with the reason stored
    Declined(order::Model),
    /// The order is missing, foreign or already processed
    Rejected(Rejection),
}

/// Checks that `order_id` exists, belongs to the seller behind `seller_user_id`
/// and is still `new`.
pub async fn check_pending<C>(db: &C, order_id: i64, seller_user_id: &str) -> Result<Pending>
where
    C: ConnectionTrait,
{
    let Some(order) = order_store::get_order(db, order_id).await? else {
        return Ok(Pending::Rejected(Rejection::NotFound));
    };

    let owner = sellers::get_seller_by_id(db, order.seller_id).await?;
    let Some(seller) = owner.filter(|s| s.external_user_id == seller_user_id) else {
        return Ok(Pending::Rejected(Rejection::NotOwner));
    };

    if order.status.is_terminal() {
        return Ok(Pending::Rejected(Rejection::AlreadyProcessed(order.status)));
    }

    Ok(Pending::Ready { order, seller })
}

/// Applies `new -> accepted` and the stock deduction in one transaction.
async fn apply_accept(
    db: &DatabaseConnection,
    order_id: i64,
    seller_user_id: &str,
) -> Result<(AcceptOutcome, Option<seller::Model>)> {
    let txn = db.begin().await?;

    let (order, seller) = match check_pending(&txn, order_id, seller_user_id).await? {
        Pending::Ready { order, seller } => (order, seller),
        Pending::Rejected(rejection) => return Ok((AcceptOutcome::Rejected(rejection), None)),
    };

    let Some(product) = catalog::get_product(&txn, order.product_id).await? else {
        return Ok((AcceptOutcome::ProductMissing, Some(seller)));
    };

    if !catalog::decrement_stock(&txn, product.id, order.quantity).await? {
        return Ok((
            AcceptOutcome::InsufficientStock {
                requested: order.quantity,
                available: product.stock,
            },
            Some(seller),
        ));
    }

    // Dropping the transaction here rolls the decrement back
    if !order_store::transition_status(&txn, order.id, OrderStatus::New, OrderStatus::Accepted, None)
        .await?
    {
        let status = order_store::get_order(&txn, order.id)
            .await?
            .map_or(OrderStatus::Accepted, |o| o.status);
        return Ok((
            AcceptOutcome::Rejected(Rejection::AlreadyProcessed(status)),
            Some(seller),
        ));
    }

    let product = catalog::get_product(&txn, product.id)
        .await?
        .ok_or(Error::ProductNotFound { id: product.id })?;

    txn.commit().await?;

    let order = order::Model {
        status: OrderStatus::Accepted,
        ..order
    };
    Ok((AcceptOutcome::Accepted { order, product }, Some(seller)))
}

/// Seller accepts an order.
///
/// On success the buyer is told, the admin receives the full order details, and
/// the seller is warned when the remaining stock is at or below the low-stock
/// threshold.
///
/// # Errors
/// Only storage failures are errors; every business outcome is an [`AcceptOutcome`].
#[instrument(skip(db, notifier, settings))]
pub async fn accept_order<N: Notifier>(
    db: &DatabaseConnection,
    notifier: &N,
    settings: &Settings,
    order_id: i64,
    seller_user_id: &str,
) -> Result<AcceptOutcome> {
    let (outcome, seller) = apply_accept(db, order_id, seller_user_id).await?;

    match (&outcome, seller) {
        (AcceptOutcome::Accepted { order, product }, Some(seller)) => {
            info!(
                "Order #{} accepted, product {} stock now {}",
                order.id, product.id, product.stock
            );
            let currency = settings.marketplace.currency.as_str();
            let shop_name = seller.shop_name.as_deref().unwrap_or("Unknown shop");

            notify_best_effort(
                notifier,
                &order.buyer_external_id,
                &format!("✅ Your order #{} has been accepted.", order.id),
                &[],
            )
            .await;

            let summary = OrderSummary::from_order(order, shop_name, currency);
            notify_best_effort(
                notifier,
                &settings.admin_user_id,
                &format!(
                    "📦 Order #{} accepted\n{summary}\n👤 Buyer: {}",
                    order.id, order.buyer_external_id
                ),
                &[],
            )
            .await;

            if product.stock <= settings.marketplace.low_stock_threshold {
                notify_best_effort(
                    notifier,
                    &seller.external_user_id,
                    &format!(
                        "⚠️ Low stock: '{}' has {} left.",
                        product.name, product.stock
                    ),
                    &[],
                )
                .await;
            }
        }
        (AcceptOutcome::InsufficientStock { requested, available }, _) => {
            warn!("Order #{order_id} cannot be accepted: requested {requested}, in stock {available}");
        }
        (other, _) => {
            warn!("Order #{order_id} not accepted: {other:?}");
        }
    }

    Ok(outcome)
}

/// Seller declines an order with a free-text reason; the buyer receives the reason.
///
/// Stock is never touched.
///
/// # Errors
/// Only storage failures are errors; every business outcome is a [`DeclineOutcome`].
#[instrument(skip(db, notifier))]
pub async fn decline_order<N: Notifier>(
    db: &DatabaseConnection,
    notifier: &N,
    order_id: i64,
    seller_user_id: &str,
    reason: &str,
) -> Result<DeclineOutcome> {
    let order = match check_pending(db, order_id, seller_user_id).await? {
        Pending::Ready { order, .. } => order,
        Pending::Rejected(rejection) => return Ok(DeclineOutcome::Rejected(rejection)),
    };

    let reason = reason.trim();
    if !order_store::transition_status(
        db,
        order.id,
        OrderStatus::New,
        OrderStatus::Declined,
        Some(reason),
    )
    .await?
    {
        let status = order_store::get_order(db, order.id)
            .await?
            .map_or(OrderStatus::Declined, |o| o.status);
        return Ok(DeclineOutcome::Rejected(Rejection::AlreadyProcessed(status)));
    }

    info!("Order #{} declined", order.id);
    notify_best_effort(
        notifier,
        &order.buyer_external_id,
        &format!("❌ Order #{} was declined.\nReason: {reason}", order.id),
        &[],
    )
    .await;

    Ok(DeclineOutcome::Declined(order::Model {
        status: OrderStatus::Declined,
        decline_reason: Some(reason.to_string()),
        ..order
    }))
}
