//! Per-user conversation state.
//!
//! Each chat user has at most one active flow. A flow is a kind plus a step that is
//! specific to that kind (the step enums are not shared between flows), together
//! with scratch fields accumulated over the steps. Starting a flow overwrites
//! whatever was active; finishing, cancelling or failing a flow clears it.
//!
//! The store is an in-memory map behind a mutex. The lock is never held across
//! an `.await`, so users progress independently.

use crate::{
    core::product::ProductField,
    errors::{Error, Result},
};
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};
use tracing::debug;

/// Seller onboarding steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStep {
    /// Waiting for the shop name
    ShopName,
}

/// Add-product steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddProductStep {
    /// Waiting for the product name
    Name,
    /// Waiting for the packaging descriptor
    Packaging,
    /// Waiting for the unit price
    Price,
    /// Waiting for the initial stock
    Stock,
}

/// Edit-product steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditProductStep {
    /// Waiting for a product button
    ChooseProduct,
    /// Waiting for a field button
    ChooseField,
    /// Waiting for the new value
    Value,
}

/// Place-order steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOrderStep {
    /// Browsing a shop; free text searches it
    Browse,
    /// Waiting for the quantity
    Quantity,
    /// Waiting for the delivery address
    Address,
    /// Waiting for confirm/cancel
    Confirm,
}

/// Decline-order steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineStep {
    /// Waiting for the decline reason
    Reason,
}

/// The active flow and its step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    /// Nothing in progress
    #[default]
    Idle,
    /// Seller choosing a shop name
    SellerOnboarding(OnboardingStep),
    /// Seller adding a product
    AddProduct(AddProductStep),
    /// Seller editing a product
    EditProduct(EditProductStep),
    /// Buyer placing an order
    PlaceOrder(PlaceOrderStep),
    /// Seller declining an order
    DeclineOrder(DeclineStep),
}

impl Flow {
    /// Name of the flow kind, independent of the step.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SellerOnboarding(_) => "seller-onboarding",
            Self::AddProduct(_) => "add-product",
            Self::EditProduct(_) => "edit-product",
            Self::PlaceOrder(_) => "place-order",
            Self::DeclineOrder(_) => "decline-order",
        }
    }

    fn same_kind(self, other: Self) -> bool {
        std::mem::discriminant(&self) == std::mem::discriminant(&other)
    }
}

/// Flow-scoped scratch fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scratch {
    /// Product name typed during add-product
    pub product_name: Option<String>,
    /// Packaging typed during add-product
    pub packaging: Option<String>,
    /// Price typed during add-product
    pub price: Option<f64>,
    /// Product chosen for ordering or editing
    pub product_id: Option<i64>,
    /// Field chosen for editing
    pub field: Option<ProductField>,
    /// Shop (seller id) being browsed
    pub shop_id: Option<i64>,
    /// Quantity typed during place-order
    pub quantity: Option<i64>,
    /// Address typed during place-order
    pub address: Option<String>,
    /// Order being declined
    pub order_id: Option<i64>,
}

/// A single scratch assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum ScratchValue {
    /// Sets [`Scratch::product_name`]
    ProductName(String),
    /// Sets [`Scratch::packaging`]
    Packaging(String),
    /// Sets [`Scratch::price`]
    Price(f64),
    /// Sets [`Scratch::product_id`]
    ProductId(i64),
    /// Sets [`Scratch::field`]
    Field(ProductField),
    /// Sets [`Scratch::shop_id`]
    ShopId(i64),
    /// Sets [`Scratch::quantity`]
    Quantity(i64),
    /// Sets [`Scratch::address`]
    Address(String),
    /// Sets [`Scratch::order_id`]
    OrderId(i64),
}

impl Scratch {
    fn apply(&mut self, value: ScratchValue) {
        match value {
            ScratchValue::ProductName(v) => self.product_name = Some(v),
            ScratchValue::Packaging(v) => self.packaging = Some(v),
            ScratchValue::Price(v) => self.price = Some(v),
            ScratchValue::ProductId(v) => self.product_id = Some(v),
            ScratchValue::Field(v) => self.field = Some(v),
            ScratchValue::ShopId(v) => self.shop_id = Some(v),
            ScratchValue::Quantity(v) => self.quantity = Some(v),
            ScratchValue::Address(v) => self.address = Some(v),
            ScratchValue::OrderId(v) => self.order_id = Some(v),
        }
    }
}

/// One user's flow descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// Active flow and step
    pub flow: Flow,
    /// Fields accumulated so far
    pub scratch: Scratch,
}

/// In-memory map from chat user id to that user's session.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        // A panic while holding the lock cannot leave a session half-written
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts `flow` for the user, discarding any previous flow and scratch data.
    pub fn begin(&self, user_id: &str, flow: Flow) {
        debug!("User {user_id} begins {} ({flow:?})", flow.kind());
        if flow == Flow::Idle {
            self.clear(user_id);
            return;
        }
        self.lock().insert(
            user_id.to_string(),
            Session {
                flow,
                scratch: Scratch::default(),
            },
        );
    }

    /// Returns a copy of the user's session (idle if none).
    #[must_use]
    pub fn get(&self, user_id: &str) -> Session {
        self.lock().get(user_id).cloned().unwrap_or_default()
    }

    /// Records a scratch field on the user's active flow.
    ///
    /// # Errors
    /// Returns `Error::FlowMismatch` when the user has no active flow.
    pub fn set(&self, user_id: &str, value: ScratchValue) -> Result<()> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(user_id).ok_or(Error::FlowMismatch {
            active: Flow::Idle.kind(),
            requested: "any",
        })?;
        session.scratch.apply(value);
        Ok(())
    }

    /// Moves the user's flow to `next`, which must be a step of the same flow kind.
    ///
    /// # Errors
    /// Returns `Error::FlowMismatch` when `next` belongs to a different flow.
    pub fn advance(&self, user_id: &str, next: Flow) -> Result<()> {
        let mut sessions = self.lock();
        let active = sessions.get(user_id).map_or(Flow::Idle, |s| s.flow);
        if next == Flow::Idle || !active.same_kind(next) {
            return Err(Error::FlowMismatch {
                active: active.kind(),
                requested: next.kind(),
            });
        }
        if let Some(session) = sessions.get_mut(user_id) {
            session.flow = next;
        }
        debug!("User {user_id} advances to {next:?}");
        Ok(())
    }

    /// Removes and returns the user's session if it is exactly at `flow`.
    ///
    /// Check and removal happen under one lock, so of several concurrent
    /// callers at most one receives the session.
    pub fn take_if(&self, user_id: &str, flow: Flow) -> Option<Session> {
        let mut sessions = self.lock();
        if sessions.get(user_id).map(|s| s.flow) != Some(flow) {
            return None;
        }
        debug!("User {user_id} takes {flow:?}");
        sessions.remove(user_id)
    }

    /// Puts back a session obtained from [`SessionStore::take_if`] at step `flow`.
    ///
    /// Does nothing if the user started another flow in the meantime.
    pub fn restore(&self, user_id: &str, mut session: Session, flow: Flow) {
        session.flow = flow;
        self.lock().entry(user_id.to_string()).or_insert(session);
    }

    /// Ends the user's flow and drops its scratch data.
    pub fn clear(&self, user_id: &str) {
        if self.lock().remove(user_id).is_some() {
            debug!("Cleared session of {user_id}");
        }
    }

    /// Number of users with an active flow.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }
}
