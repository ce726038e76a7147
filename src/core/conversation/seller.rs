//! Seller-side flows: access gate, onboarding, catalog management and order handling.

use super::{Conversation, Reply, cancel_button};
use crate::{
    core::{
        action::{Action, ActionButton},
        lifecycle::{self, AcceptOutcome, DeclineOutcome, Pending, Rejection},
        notify::{Notifier, notify_best_effort},
        order as order_store,
        product::{self as catalog, ProductField},
        seller as sellers,
        session::{
            AddProductStep, DeclineStep, EditProductStep, Flow, OnboardingStep, ScratchValue,
        },
    },
    entities::{OrderStatus, product, seller},
    errors::{Error, Result},
};
use tracing::{info, instrument};

/// Outcome of the seller access gate.
#[derive(Debug, Clone)]
pub enum SellerAccess {
    /// Active seller with a shop
    Granted(seller::Model),
    /// Seller capabilities are not available (yet)
    Denied(Denial),
}

/// Why the gate refused a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// First contact; a pending seller was registered and the admin notified
    Requested,
    /// Registered but not active (pending approval or banned)
    Inactive,
    /// Active but has not chosen a shop name yet
    NoShop,
}

fn seller_menu_buttons() -> Vec<ActionButton> {
    vec![
        ActionButton::new("➕ Add product", Action::AddProduct),
        ActionButton::new("📦 My products", Action::MyProducts),
        ActionButton::new("✏️ Edit product", Action::EditProduct),
        ActionButton::new("🗑 Delete product", Action::DeleteMenu),
        ActionButton::new("📥 Orders", Action::SellerOrders),
    ]
}

fn field_buttons() -> Vec<ActionButton> {
    ProductField::ALL
        .into_iter()
        .map(|field| ActionButton::new(field_label(field), Action::EditChooseField(field)))
        .chain(std::iter::once(cancel_button()))
        .collect()
}

const fn field_label(field: ProductField) -> &'static str {
    match field {
        ProductField::Name => "Name",
        ProductField::Packaging => "Packaging",
        ProductField::Price => "Price",
        ProductField::Stock => "Stock",
    }
}

fn rejection_text(order_id: i64, rejection: Rejection) -> String {
    match rejection {
        Rejection::NotFound => format!("❌ Order #{order_id} was not found."),
        Rejection::NotOwner => format!("❌ Order #{order_id} does not belong to your shop."),
        Rejection::AlreadyProcessed(status) => {
            format!("ℹ️ Order #{order_id} was already processed ({status}).")
        }
    }
}

impl<N: Notifier> Conversation<'_, N> {
    /// Decides whether `user_id` may use seller capabilities.
    ///
    /// A user never seen before is registered as a pending seller and the admin
    /// receives an access request with an Allow button.
    #[instrument(skip(self))]
    pub async fn authorize_seller(&self, user_id: &str) -> Result<SellerAccess> {
        let Some(seller) = sellers::get_seller_by_user(self.db, user_id).await? else {
            if !sellers::register_seller(self.db, user_id).await? {
                // A concurrent first contact already registered and notified
                return Ok(SellerAccess::Denied(Denial::Requested));
            }
            notify_best_effort(
                self.notifier,
                &self.settings.admin_user_id,
                &format!("🔔 Seller access request from user {user_id}"),
                &[ActionButton::new(
                    "✅ Allow",
                    Action::AllowSeller(user_id.to_string()),
                )],
            )
            .await;
            return Ok(SellerAccess::Denied(Denial::Requested));
        };

        if !seller.is_active {
            return Ok(SellerAccess::Denied(Denial::Inactive));
        }
        if seller.shop_name.is_none() {
            return Ok(SellerAccess::Denied(Denial::NoShop));
        }
        Ok(SellerAccess::Granted(seller))
    }

    /// Reply for a refused seller; an active seller without a shop is sent into onboarding.
    fn deny(&self, user_id: &str, denial: Denial) -> Reply {
        match denial {
            Denial::Requested => Reply::text(
                "🔒 Selling requires a paid subscription. Your request was sent to the admin.",
            ),
            Denial::Inactive => {
                self.sessions.clear(user_id);
                Reply::text("⛔ Your seller access is not active. Please contact the admin.")
            }
            Denial::NoShop => {
                self.sessions
                    .begin(user_id, Flow::SellerOnboarding(OnboardingStep::ShopName));
                Reply::text("🏪 Enter a name for your shop:").with_buttons(vec![cancel_button()])
            }
        }
    }

    /// Seller menu entry point.
    pub(super) async fn seller_menu(&self, user_id: &str) -> Result<Reply> {
        let seller = match self.authorize_seller(user_id).await? {
            SellerAccess::Granted(seller) => seller,
            SellerAccess::Denied(denial) => return Ok(self.deny(user_id, denial)),
        };
        self.sessions.clear(user_id);
        let shop = seller.shop_name.unwrap_or_default();
        Ok(Reply::text(format!("🏪 {shop}")).with_buttons(seller_menu_buttons()))
    }

    pub(super) async fn onboarding_text(&self, user_id: &str, text: &str) -> Result<Reply> {
        let seller = sellers::get_seller_by_user(self.db, user_id).await?;
        if !seller.is_some_and(|s| s.is_active) {
            return Ok(self.deny(user_id, Denial::Inactive));
        }

        let name = text.trim();
        let min_len = self.settings.marketplace.min_shop_name_len;
        if name.chars().count() < min_len {
            return Ok(Reply::text(format!(
                "⚠️ The shop name must be at least {min_len} characters. Try again:"
            )));
        }

        match sellers::set_shop_name(self.db, user_id, name).await {
            Ok(seller) => {
                self.sessions.clear(user_id);
                let shop = seller.shop_name.unwrap_or_default();
                Ok(Reply::text(format!("✅ Shop '{shop}' is open!"))
                    .with_buttons(seller_menu_buttons()))
            }
            Err(Error::ShopNameTaken { name }) => Ok(Reply::text(format!(
                "⚠️ '{name}' is already taken. Choose another name:"
            ))),
            Err(e) => Err(e),
        }
    }

    pub(super) async fn begin_add_product(&self, user_id: &str) -> Result<Reply> {
        if let SellerAccess::Denied(denial) = self.authorize_seller(user_id).await? {
            return Ok(self.deny(user_id, denial));
        }
        self.sessions
            .begin(user_id, Flow::AddProduct(AddProductStep::Name));
        Ok(Reply::text("📦 Product name:").with_buttons(vec![cancel_button()]))
    }

    pub(super) async fn add_product_text(
        &self,
        user_id: &str,
        step: AddProductStep,
        text: &str,
    ) -> Result<Reply> {
        let seller = match self.authorize_seller(user_id).await? {
            SellerAccess::Granted(seller) => seller,
            SellerAccess::Denied(denial) => return Ok(self.deny(user_id, denial)),
        };

        match step {
            AddProductStep::Name => match catalog::parse_text("name", text) {
                Ok(name) => {
                    self.sessions.set(user_id, ScratchValue::ProductName(name))?;
                    self.sessions
                        .advance(user_id, Flow::AddProduct(AddProductStep::Packaging))?;
                    Ok(Reply::text("📊 Packaging (e.g. 1 kg, 500 ml, box of 12):"))
                }
                Err(e) => Ok(retry(&e)),
            },
            AddProductStep::Packaging => match catalog::parse_text("packaging", text) {
                Ok(packaging) => {
                    self.sessions.set(user_id, ScratchValue::Packaging(packaging))?;
                    self.sessions
                        .advance(user_id, Flow::AddProduct(AddProductStep::Price))?;
                    Ok(Reply::text(format!(
                        "💰 Price in {}:",
                        self.settings.marketplace.currency
                    )))
                }
                Err(e) => Ok(retry(&e)),
            },
            AddProductStep::Price => match catalog::parse_price(text) {
                Ok(price) => {
                    self.sessions.set(user_id, ScratchValue::Price(price))?;
                    self.sessions
                        .advance(user_id, Flow::AddProduct(AddProductStep::Stock))?;
                    Ok(Reply::text("🔢 Units in stock:"))
                }
                Err(e) => Ok(retry(&e)),
            },
            AddProductStep::Stock => {
                let stock = match catalog::parse_stock(text) {
                    Ok(stock) => stock,
                    Err(e) => return Ok(retry(&e)),
                };
                let Some(session) = self
                    .sessions
                    .take_if(user_id, Flow::AddProduct(AddProductStep::Stock))
                else {
                    return Ok(Reply::text("Nothing to save.").with_buttons(seller_menu_buttons()));
                };
                let scratch = session.scratch;
                let (Some(name), Some(packaging), Some(price)) =
                    (scratch.product_name, scratch.packaging, scratch.price)
                else {
                    return Ok(Reply::text(
                        "⚠️ Product details were lost. Start again from the seller menu.",
                    )
                    .with_buttons(seller_menu_buttons()));
                };

                let product =
                    catalog::add_product(self.db, seller.id, &name, &packaging, price, stock)
                        .await?;
                Ok(Reply::text(format!(
                    "✅ Added '{}' ({}), {} at {} in stock.",
                    product.name,
                    product.packaging,
                    self.money(product.price),
                    product.stock
                ))
                .with_buttons(seller_menu_buttons()))
            }
        }
    }

    pub(super) async fn my_products(&self, user_id: &str) -> Result<Reply> {
        let seller = match self.authorize_seller(user_id).await? {
            SellerAccess::Granted(seller) => seller,
            SellerAccess::Denied(denial) => return Ok(self.deny(user_id, denial)),
        };

        let products = catalog::list_seller_products(self.db, seller.id).await?;
        if products.is_empty() {
            return Ok(Reply::text("You have no products yet.")
                .with_button("➕ Add product", Action::AddProduct));
        }

        let lines: Vec<String> = products
            .iter()
            .map(|p| {
                format!(
                    "#{} | {} | {} | {} | stock: {}",
                    p.id,
                    p.name,
                    p.packaging,
                    self.money(p.price),
                    p.stock
                )
            })
            .collect();
        Ok(Reply::text(format!("📦 Your products:\n{}", lines.join("\n")))
            .with_buttons(seller_menu_buttons()))
    }

    /// Looks up a product and checks that it belongs to `seller`.
    async fn owned_product(
        &self,
        seller: &seller::Model,
        product_id: i64,
    ) -> Result<Option<product::Model>> {
        Ok(catalog::get_product(self.db, product_id)
            .await?
            .filter(|p| p.seller_id == seller.id))
    }

    fn product_buttons<F>(products: &[product::Model], action: F) -> Vec<ActionButton>
    where
        F: Fn(i64) -> Action,
    {
        products
            .iter()
            .map(|p| ActionButton::new(format!("{} ({})", p.name, p.packaging), action(p.id)))
            .chain(std::iter::once(cancel_button()))
            .collect()
    }

    pub(super) async fn begin_edit_product(&self, user_id: &str) -> Result<Reply> {
        let seller = match self.authorize_seller(user_id).await? {
            SellerAccess::Granted(seller) => seller,
            SellerAccess::Denied(denial) => return Ok(self.deny(user_id, denial)),
        };

        let products = catalog::list_seller_products(self.db, seller.id).await?;
        if products.is_empty() {
            return Ok(Reply::text("You have no products to edit."));
        }
        self.sessions
            .begin(user_id, Flow::EditProduct(EditProductStep::ChooseProduct));
        Ok(Reply::text("✏️ Which product?")
            .with_buttons(Self::product_buttons(&products, Action::EditChooseProduct)))
    }

    pub(super) async fn edit_choose_product(&self, user_id: &str, product_id: i64) -> Result<Reply> {
        let seller = match self.authorize_seller(user_id).await? {
            SellerAccess::Granted(seller) => seller,
            SellerAccess::Denied(denial) => return Ok(self.deny(user_id, denial)),
        };

        let Some(product) = self.owned_product(&seller, product_id).await? else {
            self.sessions.clear(user_id);
            return Ok(Reply::text("❌ Product not found."));
        };

        self.sessions
            .begin(user_id, Flow::EditProduct(EditProductStep::ChooseField));
        self.sessions
            .set(user_id, ScratchValue::ProductId(product.id))?;
        Ok(
            Reply::text(format!("✏️ What do you want to change in '{}'?", product.name))
                .with_buttons(field_buttons()),
        )
    }

    pub(super) async fn edit_choose_field(
        &self,
        user_id: &str,
        field: ProductField,
    ) -> Result<Reply> {
        if let SellerAccess::Denied(denial) = self.authorize_seller(user_id).await? {
            return Ok(self.deny(user_id, denial));
        }

        let session = self.sessions.get(user_id);
        if session.flow != Flow::EditProduct(EditProductStep::ChooseField)
            || session.scratch.product_id.is_none()
        {
            return Ok(Reply::text("Choose a product first.")
                .with_button("✏️ Edit product", Action::EditProduct));
        }

        self.sessions.set(user_id, ScratchValue::Field(field))?;
        self.sessions
            .advance(user_id, Flow::EditProduct(EditProductStep::Value))?;
        Ok(Reply::text(format!("Enter the new {field}:")).with_buttons(vec![cancel_button()]))
    }

    pub(super) async fn edit_product_text(
        &self,
        user_id: &str,
        step: EditProductStep,
        text: &str,
    ) -> Result<Reply> {
        let seller = match self.authorize_seller(user_id).await? {
            SellerAccess::Granted(seller) => seller,
            SellerAccess::Denied(denial) => return Ok(self.deny(user_id, denial)),
        };

        if step != EditProductStep::Value {
            return Ok(Reply::text("Please use the buttons above."));
        }

        let scratch = self.sessions.get(user_id).scratch;
        let (Some(product_id), Some(field)) = (scratch.product_id, scratch.field) else {
            self.sessions.clear(user_id);
            return Ok(Reply::text("⚠️ Edit state was lost. Start again."));
        };

        let update = match field.parse_value(text) {
            Ok(update) => update,
            Err(e) => return Ok(retry(&e)),
        };

        if self.owned_product(&seller, product_id).await?.is_none() {
            self.sessions.clear(user_id);
            return Ok(Reply::text("❌ Product not found."));
        }

        let product = catalog::update_field(self.db, product_id, update).await?;
        self.sessions.clear(user_id);
        Ok(
            Reply::text(format!("✅ Updated the {field} of '{}'.", product.name))
                .with_buttons(seller_menu_buttons()),
        )
    }

    pub(super) async fn delete_menu(&self, user_id: &str) -> Result<Reply> {
        let seller = match self.authorize_seller(user_id).await? {
            SellerAccess::Granted(seller) => seller,
            SellerAccess::Denied(denial) => return Ok(self.deny(user_id, denial)),
        };

        let products = catalog::list_seller_products(self.db, seller.id).await?;
        if products.is_empty() {
            return Ok(Reply::text("You have no products to delete."));
        }
        Ok(Reply::text("🗑 Which product should be deleted?")
            .with_buttons(Self::product_buttons(&products, Action::DeleteProduct)))
    }

    pub(super) async fn delete_product(&self, user_id: &str, product_id: i64) -> Result<Reply> {
        let seller = match self.authorize_seller(user_id).await? {
            SellerAccess::Granted(seller) => seller,
            SellerAccess::Denied(denial) => return Ok(self.deny(user_id, denial)),
        };

        let Some(product) = self.owned_product(&seller, product_id).await? else {
            return Ok(Reply::text("❌ Product not found."));
        };

        catalog::delete_product(self.db, product.id).await?;
        Ok(Reply::text(format!("🗑 Deleted '{}'.", product.name))
            .with_buttons(seller_menu_buttons()))
    }

    pub(super) async fn seller_orders(&self, user_id: &str) -> Result<Reply> {
        let seller = match self.authorize_seller(user_id).await? {
            SellerAccess::Granted(seller) => seller,
            SellerAccess::Denied(denial) => return Ok(self.deny(user_id, denial)),
        };

        let orders = order_store::get_orders_for_seller(self.db, seller.id).await?;
        if orders.is_empty() {
            return Ok(Reply::text("❌ You have no orders yet."));
        }

        let mut buttons = Vec::new();
        let mut lines = Vec::with_capacity(orders.len());
        for order in &orders {
            lines.push(format!(
                "#{} | {} ({}) x{} | {} | {}",
                order.id, order.product_name, order.packaging, order.quantity, order.status,
                order.address
            ));
            if order.status == OrderStatus::New {
                buttons.push(ActionButton::new(
                    format!("✅ #{}", order.id),
                    Action::AcceptOrder(order.id),
                ));
                buttons.push(ActionButton::new(
                    format!("❌ #{}", order.id),
                    Action::DeclineOrder(order.id),
                ));
            }
        }
        Ok(Reply::text(format!("📥 Your orders:\n{}", lines.join("\n"))).with_buttons(buttons))
    }

    pub(super) async fn accept_order(&self, user_id: &str, order_id: i64) -> Result<Reply> {
        if let SellerAccess::Denied(denial) = self.authorize_seller(user_id).await? {
            return Ok(self.deny(user_id, denial));
        }

        let outcome =
            lifecycle::accept_order(self.db, self.notifier, self.settings, order_id, user_id)
                .await?;
        let text = match outcome {
            AcceptOutcome::Accepted { order, product } => format!(
                "✅ Order #{} accepted. '{}' has {} left in stock.",
                order.id, product.name, product.stock
            ),
            AcceptOutcome::Rejected(rejection) => rejection_text(order_id, rejection),
            AcceptOutcome::ProductMissing => {
                format!("❌ The product of order #{order_id} no longer exists. Decline the order instead.")
            }
            AcceptOutcome::InsufficientStock {
                requested,
                available,
            } => format!(
                "⚠️ Not enough stock for order #{order_id}: {requested} requested, {available} available (short by {}).",
                requested - available
            ),
        };
        Ok(Reply::text(text))
    }

    pub(super) async fn begin_decline(&self, user_id: &str, order_id: i64) -> Result<Reply> {
        if let SellerAccess::Denied(denial) = self.authorize_seller(user_id).await? {
            return Ok(self.deny(user_id, denial));
        }

        match lifecycle::check_pending(self.db, order_id, user_id).await? {
            Pending::Ready { order, .. } => {
                self.sessions
                    .begin(user_id, Flow::DeclineOrder(DeclineStep::Reason));
                self.sessions.set(user_id, ScratchValue::OrderId(order.id))?;
                Ok(Reply::text(format!(
                    "✍️ Why are you declining order #{}?",
                    order.id
                ))
                .with_buttons(vec![cancel_button()]))
            }
            Pending::Rejected(rejection) => Ok(Reply::text(rejection_text(order_id, rejection))),
        }
    }

    pub(super) async fn decline_reason_text(&self, user_id: &str, text: &str) -> Result<Reply> {
        let reason = text.trim();
        if reason.is_empty() {
            return Ok(Reply::text("⚠️ The reason must not be empty. Try again:"));
        }

        let Some(order_id) = self.sessions.get(user_id).scratch.order_id else {
            self.sessions.clear(user_id);
            return Ok(Reply::text("⚠️ No order selected."));
        };

        let outcome =
            lifecycle::decline_order(self.db, self.notifier, order_id, user_id, reason).await?;
        self.sessions.clear(user_id);
        match outcome {
            DeclineOutcome::Declined(order) => {
                info!("Seller {user_id} declined order #{}", order.id);
                Ok(Reply::text(format!(
                    "❌ Order #{} declined. The buyer has been told why.",
                    order.id
                )))
            }
            DeclineOutcome::Rejected(rejection) => {
                Ok(Reply::text(rejection_text(order_id, rejection)))
            }
        }
    }
}

/// Re-prompt for the current step after a validation failure.
pub(super) fn retry(error: &Error) -> Reply {
    Reply::text(format!("⚠️ {error}. Try again:"))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{
        product::get_product,
        session::{Session, SessionStore},
    };
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_unknown_user_requests_access_and_is_denied() -> Result<()> {
        let db = setup_test_db().await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);

        let reply = convo.handle_action("newbie", "add").await;
        assert!(reply.text.contains("sent to the admin"));
        assert_eq!(sessions.get("newbie"), Session::default());

        let pending = sellers::get_seller_by_user(&db, "newbie").await?.unwrap();
        assert!(!pending.is_active);
        assert!(pending.shop_name.is_none());
        assert!(sellers::list_active_shops(&db).await?.is_empty());

        let to_admin = notifier.sent_to("admin");
        assert_eq!(to_admin.len(), 1);
        assert!(to_admin[0].text.contains("newbie"));
        assert_eq!(
            to_admin[0].buttons,
            vec![ActionButton::new(
                "✅ Allow",
                Action::AllowSeller("newbie".to_string())
            )]
        );

        // A second attempt does not spam the admin
        let reply = convo.handle_action("newbie", "seller").await;
        assert!(reply.text.contains("not active"));
        assert_eq!(notifier.sent_to("admin").len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_active_seller_without_shop_is_onboarded() -> Result<()> {
        let db = setup_test_db().await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);

        sellers::register_seller(&db, "s1").await?;
        sellers::activate(&db, "s1").await?;

        convo.handle_action("s1", "seller").await;
        assert_eq!(
            sessions.get("s1").flow,
            Flow::SellerOnboarding(OnboardingStep::ShopName)
        );

        // Too short: stays on the same step
        let reply = convo.handle_text("s1", "x").await;
        assert!(reply.text.contains("at least"));
        assert_eq!(
            sessions.get("s1").flow,
            Flow::SellerOnboarding(OnboardingStep::ShopName)
        );

        let reply = convo.handle_text("s1", "  green grocer ").await;
        assert!(reply.text.contains("Green grocer"));
        assert_eq!(sessions.get("s1").flow, Flow::Idle);

        let shops = sellers::list_active_shops(&db).await?;
        assert_eq!(shops.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_taken_shop_name_reprompts() -> Result<()> {
        let (db, _seller) = setup_with_seller().await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);

        sellers::register_seller(&db, "s2").await?;
        sellers::activate(&db, "s2").await?;
        convo.handle_action("s2", "seller").await;

        let reply = convo.handle_text("s2", "test shop").await;
        assert!(reply.text.contains("already taken"));
        assert_eq!(
            sessions.get("s2").flow,
            Flow::SellerOnboarding(OnboardingStep::ShopName)
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_add_product_flow_with_retries() -> Result<()> {
        let (db, seller) = setup_with_seller().await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);
        let user = seller.external_user_id.as_str();

        convo.handle_action(user, "add").await;
        convo.handle_text(user, "Rice").await;
        convo.handle_text(user, "5 kg").await;

        let reply = convo.handle_text(user, "cheap").await;
        assert!(reply.text.contains("Try again"));
        assert_eq!(sessions.get(user).flow, Flow::AddProduct(AddProductStep::Price));

        convo.handle_text(user, "-3").await;
        assert_eq!(sessions.get(user).flow, Flow::AddProduct(AddProductStep::Price));

        convo.handle_text(user, "12,5").await;
        let reply = convo.handle_text(user, "ten").await;
        assert!(reply.text.contains("Try again"));
        assert_eq!(sessions.get(user).flow, Flow::AddProduct(AddProductStep::Stock));

        let reply = convo.handle_text(user, "20").await;
        assert!(reply.text.contains("Added 'Rice'"));
        assert_eq!(sessions.get(user).flow, Flow::Idle);

        let products = catalog::list_seller_products(&db, seller.id).await?;
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].packaging, "5 kg");
        assert_eq!(products[0].stock, 20);
        assert!((products[0].price - 12.5).abs() < f64::EPSILON);

        Ok(())
    }

    #[tokio::test]
    async fn test_repeated_stock_entry_adds_one_product() -> Result<()> {
        let (db, seller) = setup_with_seller().await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);
        let user = seller.external_user_id.as_str();

        convo.handle_action(user, "add").await;
        convo.handle_text(user, "Rice").await;
        convo.handle_text(user, "5 kg").await;
        convo.handle_text(user, "12").await;

        let (first, second) =
            tokio::join!(convo.handle_text(user, "20"), convo.handle_text(user, "20"));
        let added = [&first, &second]
            .iter()
            .filter(|reply| reply.text.contains("Added 'Rice'"))
            .count();
        assert_eq!(added, 1);
        assert_eq!(catalog::list_seller_products(&db, seller.id).await?.len(), 1);
        assert_eq!(sessions.get(user).flow, Flow::Idle);

        Ok(())
    }

    #[tokio::test]
    async fn test_simultaneous_first_contact_notifies_admin_once() -> Result<()> {
        let db = setup_test_db().await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);

        let (first, second) = tokio::join!(
            convo.authorize_seller("newbie"),
            convo.authorize_seller("newbie"),
        );
        for access in [first?, second?] {
            assert!(matches!(
                access,
                SellerAccess::Denied(Denial::Requested | Denial::Inactive)
            ));
        }
        assert_eq!(notifier.sent_to("admin").len(), 1);
        assert_eq!(sellers::list_sellers(&db).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_edit_product_field() -> Result<()> {
        let (db, seller, product) = setup_with_product().await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);
        let user = seller.external_user_id.as_str();

        convo.handle_action(user, "edit").await;
        convo
            .handle_action(user, &format!("editprod:{}", product.id))
            .await;
        convo.handle_action(user, "editfield:stock").await;

        let reply = convo.handle_text(user, "-1").await;
        assert!(reply.text.contains("Try again"));
        assert_eq!(
            sessions.get(user).flow,
            Flow::EditProduct(EditProductStep::Value)
        );

        convo.handle_text(user, "42").await;
        assert_eq!(get_product(&db, product.id).await?.unwrap().stock, 42);
        assert_eq!(sessions.get(user).flow, Flow::Idle);

        Ok(())
    }

    #[tokio::test]
    async fn test_sellers_cannot_touch_foreign_products() -> Result<()> {
        let (db, _seller, product) = setup_with_product().await?;
        create_test_seller(&db, "other", "Other shop").await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);

        let reply = convo
            .handle_action("other", &format!("delprod:{}", product.id))
            .await;
        assert!(reply.text.contains("not found"));
        assert!(get_product(&db, product.id).await?.is_some());

        let reply = convo
            .handle_action("other", &format!("editprod:{}", product.id))
            .await;
        assert!(reply.text.contains("not found"));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_keeps_order_snapshot() -> Result<()> {
        let (db, seller, product) = setup_with_product().await?;
        let order = create_test_order(&db, "buyer-1", &product, 1).await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);
        let user = seller.external_user_id.as_str();

        convo
            .handle_action(user, &format!("delprod:{}", product.id))
            .await;
        assert!(get_product(&db, product.id).await?.is_none());

        let reply = convo.handle_action(user, "orders").await;
        assert!(reply.text.contains(&product.name));

        let reply = convo
            .handle_action(user, &format!("accept:{}", order.id))
            .await;
        assert!(reply.text.contains("no longer exists"));

        Ok(())
    }

    #[tokio::test]
    async fn test_decline_flow_stores_reason_and_notifies_buyer() -> Result<()> {
        let (db, seller, product) = setup_with_product().await?;
        let order = create_test_order(&db, "buyer-1", &product, 2).await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);
        let user = seller.external_user_id.as_str();

        convo
            .handle_action(user, &format!("decline:{}", order.id))
            .await;
        assert_eq!(
            sessions.get(user).flow,
            Flow::DeclineOrder(DeclineStep::Reason)
        );

        let reply = convo.handle_text(user, "   ").await;
        assert!(reply.text.contains("must not be empty"));

        convo.handle_text(user, "out of season").await;
        let stored = order_store::get_order(&db, order.id).await?.unwrap();
        assert_eq!(stored.status, OrderStatus::Declined);
        assert_eq!(stored.decline_reason.as_deref(), Some("out of season"));
        assert_eq!(get_product(&db, product.id).await?.unwrap().stock, product.stock);

        let to_buyer = notifier.sent_to("buyer-1");
        assert_eq!(to_buyer.len(), 1);
        assert!(to_buyer[0].text.contains("out of season"));

        // Already terminal
        let reply = convo
            .handle_action(user, &format!("decline:{}", order.id))
            .await;
        assert!(reply.text.contains("already processed"));
        assert_eq!(sessions.get(user).flow, Flow::Idle);

        Ok(())
    }

    #[tokio::test]
    async fn test_accept_reports_shortfall() -> Result<()> {
        let (db, seller, product) = setup_with_product().await?;
        let order = create_test_order(&db, "buyer-1", &product, product.stock + 3).await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);

        let reply = convo
            .handle_action(&seller.external_user_id, &format!("accept:{}", order.id))
            .await;
        assert!(reply.text.contains("short by 3"));
        assert_eq!(
            order_store::get_order(&db, order.id).await?.unwrap().status,
            OrderStatus::New
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_banned_seller_loses_access() -> Result<()> {
        let (db, seller) = setup_with_seller().await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);
        let user = seller.external_user_id.as_str();

        convo.handle_action(user, "add").await;
        sellers::deactivate(&db, user).await?;

        let reply = convo.handle_text(user, "Rice").await;
        assert!(reply.text.contains("not active"));
        assert_eq!(sessions.get(user).flow, Flow::Idle);

        Ok(())
    }
}
