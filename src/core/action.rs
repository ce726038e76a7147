//! Button actions and their opaque tokens.
//!
//! A button press arrives as a short token (Discord's `custom_id`). Tokens are
//! `verb` or `verb:argument` and decode into a typed [`Action`]; anything else is
//! rejected with `Error::UnknownAction`.

use crate::{
    core::product::ProductField,
    errors::{Error, Result},
};
use std::{fmt, str::FromStr};

/// Everything a button can ask the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open the buyer menu
    BuyerMenu,
    /// Open the seller menu (runs the seller gate)
    SellerMenu,
    /// List active shops
    ListShops,
    /// Browse a shop by seller id
    ChooseShop(i64),
    /// Pick a product to order
    ChooseProduct(i64),
    /// Submit the pending order
    ConfirmOrder,
    /// Abandon whatever flow is active
    Cancel,
    /// Start the add-product flow
    AddProduct,
    /// Show the seller's products
    MyProducts,
    /// Start the edit-product flow
    EditProduct,
    /// Pick the product to edit
    EditChooseProduct(i64),
    /// Pick the field to edit
    EditChooseField(ProductField),
    /// Show delete buttons for the seller's products
    DeleteMenu,
    /// Delete a product
    DeleteProduct(i64),
    /// Show the seller's orders
    SellerOrders,
    /// Accept an order
    AcceptOrder(i64),
    /// Start declining an order
    DeclineOrder(i64),
    /// Admin: grant seller access to a chat user
    AllowSeller(String),
}

impl Action {
    fn verb(&self) -> &'static str {
        match self {
            Self::BuyerMenu => "buyer",
            Self::SellerMenu => "seller",
            Self::ListShops => "shops",
            Self::ChooseShop(_) => "shop",
            Self::ChooseProduct(_) => "product",
            Self::ConfirmOrder => "confirm",
            Self::Cancel => "cancel",
            Self::AddProduct => "add",
            Self::MyProducts => "mine",
            Self::EditProduct => "edit",
            Self::EditChooseProduct(_) => "editprod",
            Self::EditChooseField(_) => "editfield",
            Self::DeleteMenu => "delmenu",
            Self::DeleteProduct(_) => "delprod",
            Self::SellerOrders => "orders",
            Self::AcceptOrder(_) => "accept",
            Self::DeclineOrder(_) => "decline",
            Self::AllowSeller(_) => "allow",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = self.verb();
        match self {
            Self::ChooseShop(id)
            | Self::ChooseProduct(id)
            | Self::EditChooseProduct(id)
            | Self::DeleteProduct(id)
            | Self::AcceptOrder(id)
            | Self::DeclineOrder(id) => write!(f, "{verb}:{id}"),
            Self::EditChooseField(field) => write!(f, "{verb}:{field}"),
            Self::AllowSeller(user_id) => write!(f, "{verb}:{user_id}"),
            _ => f.write_str(verb),
        }
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        let unknown = || Error::UnknownAction {
            token: token.to_string(),
        };
        let id = |arg: Option<&str>| -> Result<i64> {
            arg.and_then(|raw| raw.parse().ok()).ok_or_else(unknown)
        };

        let (verb, arg) = token
            .split_once(':')
            .map_or((token, None), |(verb, arg)| (verb, Some(arg)));

        let action = match (verb, arg) {
            ("buyer", None) => Self::BuyerMenu,
            ("seller", None) => Self::SellerMenu,
            ("shops", None) => Self::ListShops,
            ("confirm", None) => Self::ConfirmOrder,
            ("cancel", None) => Self::Cancel,
            ("add", None) => Self::AddProduct,
            ("mine", None) => Self::MyProducts,
            ("edit", None) => Self::EditProduct,
            ("delmenu", None) => Self::DeleteMenu,
            ("orders", None) => Self::SellerOrders,
            ("shop", arg) => Self::ChooseShop(id(arg)?),
            ("product", arg) => Self::ChooseProduct(id(arg)?),
            ("editprod", arg) => Self::EditChooseProduct(id(arg)?),
            ("delprod", arg) => Self::DeleteProduct(id(arg)?),
            ("accept", arg) => Self::AcceptOrder(id(arg)?),
            ("decline", arg) => Self::DeclineOrder(id(arg)?),
            ("editfield", Some(field)) => {
                Self::EditChooseField(field.parse().map_err(|_| unknown())?)
            }
            ("allow", Some(user_id)) if !user_id.is_empty() => Self::AllowSeller(user_id.to_string()),
            _ => return Err(unknown()),
        };
        Ok(action)
    }
}

/// A labelled button that triggers an [`Action`] when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionButton {
    /// Text shown on the button
    pub label: String,
    /// What pressing it does
    pub action: Action,
}

impl ActionButton {
    /// Creates a button.
    #[must_use]
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}
