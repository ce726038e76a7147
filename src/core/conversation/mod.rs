//! Conversation driver - turns user events into replies and state changes.
//!
//! Every inbound event (a command, a free-text message or a button press) is
//! handled for one user against that user's [`Session`](crate::core::session::Session).
//! Handlers return a [`Reply`] for the user who triggered the event; other parties
//! are reached through the [`Notifier`].
//!
//! Validation failures re-prompt on the same step. Storage failures are logged,
//! the user's flow is cleared and a generic failure message is returned.

mod admin;
mod buyer;
mod seller;

pub use seller::{Denial, SellerAccess};

use crate::{
    config::Settings,
    core::{
        action::{Action, ActionButton},
        notify::Notifier,
        session::{Flow, SessionStore},
    },
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use tracing::{error, instrument, warn};

/// What the bot sends back to the user who triggered an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Message text
    pub text: String,
    /// Buttons attached to the message
    pub buttons: Vec<ActionButton>,
}

impl Reply {
    /// A plain text reply.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    /// Attaches buttons to the reply.
    #[must_use]
    pub fn with_buttons(mut self, buttons: Vec<ActionButton>) -> Self {
        self.buttons = buttons;
        self
    }

    /// Appends a single button.
    #[must_use]
    pub fn with_button(mut self, label: impl Into<String>, action: Action) -> Self {
        self.buttons.push(ActionButton::new(label, action));
        self
    }
}

/// Borrowed handles needed to process one event.
pub struct Conversation<'a, N: Notifier> {
    db: &'a DatabaseConnection,
    sessions: &'a SessionStore,
    settings: &'a Settings,
    notifier: &'a N,
}

impl<'a, N: Notifier> Conversation<'a, N> {
    /// Creates a driver over shared handles.
    #[must_use]
    pub const fn new(
        db: &'a DatabaseConnection,
        sessions: &'a SessionStore,
        settings: &'a Settings,
        notifier: &'a N,
    ) -> Self {
        Self {
            db,
            sessions,
            settings,
            notifier,
        }
    }

    /// `/start`: drops any flow and shows the role picker.
    pub fn start(&self, user_id: &str) -> Reply {
        self.sessions.clear(user_id);
        Reply::text("Who are you?").with_buttons(role_buttons())
    }

    /// `/cancel` or the Cancel button: drops any flow unconditionally.
    pub fn cancel(&self, user_id: &str) -> Reply {
        let was_active = self.sessions.get(user_id).flow != Flow::Idle;
        self.sessions.clear(user_id);
        if was_active {
            Reply::text("❌ Cancelled.")
        } else {
            Reply::text("Nothing to cancel.")
        }
    }

    /// Handles a free-text message according to the user's active step.
    #[instrument(skip(self, text))]
    pub async fn handle_text(&self, user_id: &str, text: &str) -> Reply {
        let flow = self.sessions.get(user_id).flow;
        let result = match flow {
            Flow::Idle => Ok(Reply::text("Use the buttons 👇").with_buttons(role_buttons())),
            Flow::SellerOnboarding(_) => self.onboarding_text(user_id, text).await,
            Flow::AddProduct(step) => self.add_product_text(user_id, step, text).await,
            Flow::EditProduct(step) => self.edit_product_text(user_id, step, text).await,
            Flow::PlaceOrder(step) => self.place_order_text(user_id, step, text).await,
            Flow::DeclineOrder(_) => self.decline_reason_text(user_id, text).await,
        };
        self.settle(user_id, result)
    }

    /// Handles a button press carrying an action token.
    #[instrument(skip(self))]
    pub async fn handle_action(&self, user_id: &str, token: &str) -> Reply {
        let action = match token.parse::<Action>() {
            Ok(action) => action,
            Err(e) => {
                warn!("Rejected button from {user_id}: {e}");
                return Reply::text("⚠️ That button is no longer valid.");
            }
        };
        self.perform(user_id, action).await
    }

    /// Runs an already decoded action, e.g. from a slash command.
    #[instrument(skip(self))]
    pub async fn perform(&self, user_id: &str, action: Action) -> Reply {
        let result = self.dispatch(user_id, action).await;
        self.settle(user_id, result)
    }

    async fn dispatch(&self, user_id: &str, action: Action) -> Result<Reply> {
        match action {
            Action::BuyerMenu | Action::ListShops => self.list_shops().await,
            Action::SellerMenu => self.seller_menu(user_id).await,
            Action::ChooseShop(shop_id) => self.choose_shop(user_id, shop_id).await,
            Action::ChooseProduct(product_id) => self.choose_product(user_id, product_id).await,
            Action::ConfirmOrder => self.confirm_order(user_id).await,
            Action::Cancel => Ok(self.cancel(user_id)),
            Action::AddProduct => self.begin_add_product(user_id).await,
            Action::MyProducts => self.my_products(user_id).await,
            Action::EditProduct => self.begin_edit_product(user_id).await,
            Action::EditChooseProduct(product_id) => {
                self.edit_choose_product(user_id, product_id).await
            }
            Action::EditChooseField(field) => self.edit_choose_field(user_id, field).await,
            Action::DeleteMenu => self.delete_menu(user_id).await,
            Action::DeleteProduct(product_id) => self.delete_product(user_id, product_id).await,
            Action::SellerOrders => self.seller_orders(user_id).await,
            Action::AcceptOrder(order_id) => self.accept_order(user_id, order_id).await,
            Action::DeclineOrder(order_id) => self.begin_decline(user_id, order_id).await,
            Action::AllowSeller(target) => self.allow_seller(user_id, &target).await,
        }
    }

    /// Converts a handler result into a reply, clearing the flow on failure.
    fn settle(&self, user_id: &str, result: Result<Reply>) -> Reply {
        result.unwrap_or_else(|e| {
            error!("Request from {user_id} failed: {e}");
            self.sessions.clear(user_id);
            Reply::text(failure_text(&e))
        })
    }

    fn money(&self, amount: f64) -> String {
        format!("{amount:.2} {}", self.settings.marketplace.currency)
    }
}

fn failure_text(error: &Error) -> String {
    match error {
        Error::ProductNotFound { id } => format!("❌ Product #{id} was not found."),
        Error::OrderNotFound { id } => format!("❌ Order #{id} was not found."),
        Error::SellerNotFound { .. } => "❌ Seller not found.".to_string(),
        _ => "⚠️ Something went wrong. Please try again with /start.".to_string(),
    }
}

fn role_buttons() -> Vec<ActionButton> {
    vec![
        ActionButton::new("🛒 Buyer", Action::BuyerMenu),
        ActionButton::new("🏪 Seller", Action::SellerMenu),
    ]
}

fn cancel_button() -> ActionButton {
    ActionButton::new("❌ Cancel", Action::Cancel)
}
