//! Product catalog - Handles all product-related operations.
//!
//! This module provides functions for listing, searching, editing and deleting a
//! seller's products, plus the conditional stock decrement used when an order is
//! accepted. Price and stock are validated at the edges (add/edit flows) and when
//! an edit value is parsed through [`ProductField::parse_value`].

use crate::{
    entities::{Product, product},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use std::{fmt, str::FromStr};
use tracing::{debug, info, instrument};

/// Editable product fields. Anything outside this set is rejected before storage is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductField {
    /// Display name
    Name,
    /// Packaging descriptor
    Packaging,
    /// Unit price
    Price,
    /// Units in stock
    Stock,
}

impl ProductField {
    /// Every editable field, in menu order.
    pub const ALL: [Self; 4] = [Self::Name, Self::Packaging, Self::Price, Self::Stock];

    /// Storage-facing field name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Packaging => "packaging",
            Self::Price => "price",
            Self::Stock => "stock",
        }
    }

    /// Validates raw user input for this field and turns it into a typed update.
    ///
    /// # Errors
    /// Returns a validation error when the text does not fit the field's type.
    pub fn parse_value(self, raw: &str) -> Result<ProductUpdate> {
        match self {
            Self::Name => parse_text("name", raw).map(ProductUpdate::Name),
            Self::Packaging => parse_text("packaging", raw).map(ProductUpdate::Packaging),
            Self::Price => parse_price(raw).map(ProductUpdate::Price),
            Self::Stock => parse_stock(raw).map(ProductUpdate::Stock),
        }
    }
}

impl fmt::Display for ProductField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| Error::UnknownField {
                field: s.to_string(),
            })
    }
}

/// A typed change to a single product field.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductUpdate {
    /// New display name
    Name(String),
    /// New packaging descriptor
    Packaging(String),
    /// New unit price
    Price(f64),
    /// New stock level
    Stock(i64),
}

impl ProductUpdate {
    /// The field this update writes.
    #[must_use]
    pub const fn field(&self) -> ProductField {
        match self {
            Self::Name(_) => ProductField::Name,
            Self::Packaging(_) => ProductField::Packaging,
            Self::Price(_) => ProductField::Price,
            Self::Stock(_) => ProductField::Stock,
        }
    }
}

/// Parses a non-empty free-text value.
pub fn parse_text(field: &'static str, raw: &str) -> Result<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(Error::InvalidInput {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(value.to_string())
}

/// Parses a positive, finite price. Accepts `,` as the decimal separator.
pub fn parse_price(raw: &str) -> Result<f64> {
    let price: f64 = raw
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| Error::InvalidInput {
            field: "price",
            reason: format!("'{}' is not a number", raw.trim()),
        })?;
    validate_price(price)?;
    Ok(price)
}

/// Parses a non-negative whole stock level.
pub fn parse_stock(raw: &str) -> Result<i64> {
    let stock: i64 = raw.trim().parse().map_err(|_| Error::InvalidInput {
        field: "stock",
        reason: format!("'{}' is not a whole number", raw.trim()),
    })?;
    validate_stock(stock)?;
    Ok(stock)
}

fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() || price <= 0.0 {
        return Err(Error::InvalidPrice { price });
    }
    Ok(())
}

const fn validate_stock(stock: i64) -> Result<()> {
    if stock < 0 {
        return Err(Error::InvalidQuantity { quantity: stock });
    }
    Ok(())
}

/// Creates a product for a seller.
///
/// Callers validate `price` and `stock` beforehand (see [`parse_price`] and
/// [`parse_stock`]); the store only trims the text fields.
#[instrument(skip(db))]
pub async fn add_product(
    db: &DatabaseConnection,
    seller_id: i64,
    name: &str,
    packaging: &str,
    price: f64,
    stock: i64,
) -> Result<product::Model> {
    let now = chrono::Utc::now().naive_utc();

    let product = product::ActiveModel {
        seller_id: Set(seller_id),
        name: Set(name.trim().to_string()),
        packaging: Set(packaging.trim().to_string()),
        price: Set(price),
        stock: Set(stock),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let product = product.insert(db).await?;
    info!(
        "Added product '{}' (ID: {}) for seller {} with price {} and stock {}",
        product.name, product.id, seller_id, price, stock
    );
    Ok(product)
}

/// Retrieves a specific product by its unique ID.
pub async fn get_product<C>(db: &C, product_id: i64) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists all products of a seller, ordered by id.
pub async fn list_seller_products(
    db: &DatabaseConnection,
    seller_id: i64,
) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::SellerId.eq(seller_id))
        .order_by_asc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists the products of a shop that still have stock, ordered alphabetically.
pub async fn list_in_stock(db: &DatabaseConnection, seller_id: i64) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::SellerId.eq(seller_id))
        .filter(product::Column::Stock.gt(0))
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Case-insensitive substring search over product names within one shop.
///
/// Matching happens in Rust rather than with `LIKE` so that non-ASCII names fold case too.
#[instrument(skip(db))]
pub async fn search_products(
    db: &DatabaseConnection,
    seller_id: i64,
    query: &str,
) -> Result<Vec<product::Model>> {
    let needle = query.trim().to_lowercase();
    let products = list_seller_products(db, seller_id).await?;
    let matching: Vec<product::Model> = products
        .into_iter()
        .filter(|prod| prod.name.to_lowercase().contains(&needle))
        .collect();
    debug!("Search '{needle}' in shop {seller_id}: {} hits", matching.len());
    Ok(matching)
}

/// Writes a single typed field of a product.
///
/// # Errors
/// Returns `Error::ProductNotFound` if the product does not exist, or a validation
/// error if a price or stock value is out of range.
#[instrument(skip(db))]
pub async fn update_field(
    db: &DatabaseConnection,
    product_id: i64,
    update: ProductUpdate,
) -> Result<product::Model> {
    match &update {
        ProductUpdate::Price(price) => validate_price(*price)?,
        ProductUpdate::Stock(stock) => validate_stock(*stock)?,
        ProductUpdate::Name(_) | ProductUpdate::Packaging(_) => {}
    }

    let mut product: product::ActiveModel = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })?
        .into();

    let field = update.field();
    match update {
        ProductUpdate::Name(name) => product.name = Set(name),
        ProductUpdate::Packaging(packaging) => product.packaging = Set(packaging),
        ProductUpdate::Price(price) => product.price = Set(price),
        ProductUpdate::Stock(stock) => product.stock = Set(stock),
    }
    product.updated_at = Set(chrono::Utc::now().naive_utc());

    let updated = product.update(db).await?;
    info!("Updated {field} of product {product_id}");
    Ok(updated)
}

/// Updates a product field named by string, validating both the name and the value.
///
/// Field names outside [`ProductField::ALL`] are rejected with `Error::UnknownField`
/// without any storage access.
pub async fn update_field_by_name(
    db: &DatabaseConnection,
    product_id: i64,
    field: &str,
    raw_value: &str,
) -> Result<product::Model> {
    let update = field.parse::<ProductField>()?.parse_value(raw_value)?;
    update_field(db, product_id, update).await
}

/// Hard-deletes a product. Existing orders keep their snapshot of it.
///
/// Returns `Ok(true)` if a row was deleted.
#[instrument(skip(db))]
pub async fn delete_product(db: &DatabaseConnection, product_id: i64) -> Result<bool> {
    let result = Product::delete_by_id(product_id).exec(db).await?;
    info!(
        "Deleted product {product_id}, rows affected: {}",
        result.rows_affected
    );
    Ok(result.rows_affected > 0)
}

/// Atomically removes `amount` units from stock if at least that many remain.
///
/// This is a single conditional statement:
/// `UPDATE products SET stock = stock - ? WHERE id = ? AND stock >= ?`,
/// so concurrent callers can never drive stock below zero. Returns whether the
/// decrement applied.
///
/// # Errors
/// Returns `Error::InvalidQuantity` for non-positive amounts.
#[instrument(skip(db))]
pub async fn decrement_stock<C>(db: &C, product_id: i64, amount: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    if amount <= 0 {
        return Err(Error::InvalidQuantity { quantity: amount });
    }

    let result = Product::update_many()
        .col_expr(
            product::Column::Stock,
            Expr::col(product::Column::Stock).sub(amount),
        )
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::Stock.gte(amount))
        .exec(db)
        .await?;

    let applied = result.rows_affected == 1;
    debug!("Decrement product {product_id} by {amount}: applied = {applied}");
    Ok(applied)
}
