//! Buyer-side flow: browse shops, search, choose a product and place an order.

use super::{Conversation, Reply, cancel_button, seller::retry};
use crate::{
    core::{
        action::{Action, ActionButton},
        notify::{Notifier, notify_best_effort},
        order::{self as order_store, NewOrder, OrderSummary},
        product as catalog,
        seller as sellers,
        session::{Flow, PlaceOrderStep, ScratchValue},
    },
    entities::{product, seller},
    errors::{Error, Result},
};
use tracing::{error, info, instrument};

impl<N: Notifier> Conversation<'_, N> {
    fn product_button(&self, product: &product::Model) -> ActionButton {
        ActionButton::new(
            format!(
                "{} · {} · {}",
                product.name,
                product.packaging,
                self.money(product.price)
            ),
            Action::ChooseProduct(product.id),
        )
    }

    fn product_picker(&self, text: String, products: &[product::Model]) -> Reply {
        let buttons = products
            .iter()
            .map(|p| self.product_button(p))
            .chain(std::iter::once(cancel_button()))
            .collect();
        Reply::text(text).with_buttons(buttons)
    }

    /// Returns the seller if it is an active shop buyers may order from.
    async fn open_shop(&self, seller_id: i64) -> Result<Option<seller::Model>> {
        Ok(sellers::get_seller_by_id(self.db, seller_id)
            .await?
            .filter(|s| s.is_active && s.shop_name.is_some()))
    }

    pub(super) async fn list_shops(&self) -> Result<Reply> {
        let shops = sellers::list_active_shops(self.db).await?;
        if shops.is_empty() {
            return Ok(Reply::text("❌ There are no shops yet."));
        }

        let buttons = shops
            .into_iter()
            .filter_map(|shop| {
                shop.shop_name
                    .map(|name| ActionButton::new(format!("🏪 {name}"), Action::ChooseShop(shop.id)))
            })
            .collect();
        Ok(Reply::text("🛒 Choose a shop:").with_buttons(buttons))
    }

    #[instrument(skip(self))]
    pub(super) async fn choose_shop(&self, user_id: &str, shop_id: i64) -> Result<Reply> {
        let Some(shop) = self.open_shop(shop_id).await? else {
            self.sessions.clear(user_id);
            return Ok(Reply::text("❌ This shop is not available."));
        };
        let shop_name = shop.shop_name.unwrap_or_default();

        let products = catalog::list_in_stock(self.db, shop.id).await?;
        if products.is_empty() {
            self.sessions.clear(user_id);
            return Ok(Reply::text(format!(
                "❌ {shop_name} has no products in stock right now."
            ))
            .with_button("🛒 Other shops", Action::ListShops));
        }

        self.sessions
            .begin(user_id, Flow::PlaceOrder(PlaceOrderStep::Browse));
        self.sessions.set(user_id, ScratchValue::ShopId(shop.id))?;
        Ok(self.product_picker(
            format!("🏪 {shop_name}\nChoose a product, or type a name to search:"),
            &products,
        ))
    }

    async fn search_shop(&self, user_id: &str, query: &str) -> Result<Reply> {
        let Some(shop_id) = self.sessions.get(user_id).scratch.shop_id else {
            self.sessions.clear(user_id);
            return Ok(Reply::text("Choose a shop first.")
                .with_button("🛒 Shops", Action::ListShops));
        };

        if query.trim().is_empty() {
            return Ok(Reply::text("Type part of a product name:"));
        }

        let hits: Vec<product::Model> = catalog::search_products(self.db, shop_id, query)
            .await?
            .into_iter()
            .filter(|p| p.stock > 0)
            .collect();
        if hits.is_empty() {
            return Ok(Reply::text(format!(
                "🔍 Nothing matches '{}'. Try another search:",
                query.trim()
            ))
            .with_buttons(vec![cancel_button()]));
        }
        Ok(self.product_picker(format!("🔍 Results for '{}':", query.trim()), &hits))
    }

    #[instrument(skip(self))]
    pub(super) async fn choose_product(&self, user_id: &str, product_id: i64) -> Result<Reply> {
        let product = match catalog::get_product(self.db, product_id).await? {
            Some(product) if product.stock > 0 => product,
            _ => return Ok(Reply::text("❌ This product is not available anymore.")),
        };
        if self.open_shop(product.seller_id).await?.is_none() {
            return Ok(Reply::text("❌ This shop is not available."));
        }

        self.sessions
            .begin(user_id, Flow::PlaceOrder(PlaceOrderStep::Quantity));
        self.sessions
            .set(user_id, ScratchValue::ShopId(product.seller_id))?;
        self.sessions
            .set(user_id, ScratchValue::ProductId(product.id))?;
        Ok(Reply::text(format!(
            "📦 {} ({}), {}\n🔢 How many? ({} in stock)",
            product.name,
            product.packaging,
            self.money(product.price),
            product.stock
        ))
        .with_buttons(vec![cancel_button()]))
    }

    pub(super) async fn place_order_text(
        &self,
        user_id: &str,
        step: PlaceOrderStep,
        text: &str,
    ) -> Result<Reply> {
        match step {
            PlaceOrderStep::Browse => self.search_shop(user_id, text).await,
            PlaceOrderStep::Quantity => self.quantity_text(user_id, text).await,
            PlaceOrderStep::Address => self.address_text(user_id, text).await,
            PlaceOrderStep::Confirm => Ok(Reply::text("Please confirm or cancel the order:")
                .with_buttons(confirm_buttons())),
        }
    }

    /// Loads the product chosen in the current flow, clearing the flow if it is gone.
    async fn chosen_product(&self, user_id: &str) -> Result<Option<product::Model>> {
        let product = match self.sessions.get(user_id).scratch.product_id {
            Some(product_id) => catalog::get_product(self.db, product_id).await?,
            None => None,
        };
        if product.is_none() {
            self.sessions.clear(user_id);
        }
        Ok(product)
    }

    async fn quantity_text(&self, user_id: &str, text: &str) -> Result<Reply> {
        let Ok(quantity) = text.trim().parse::<i64>() else {
            return Ok(Reply::text("⚠️ Enter a whole number:"));
        };
        if quantity <= 0 {
            return Ok(retry(&Error::InvalidQuantity { quantity }));
        }

        let Some(product) = self.chosen_product(user_id).await? else {
            return Ok(Reply::text("❌ This product is not available anymore."));
        };
        if quantity > product.stock {
            return Ok(Reply::text(format!(
                "⚠️ Only {} in stock. Enter a smaller quantity:",
                product.stock
            )));
        }

        self.sessions.set(user_id, ScratchValue::Quantity(quantity))?;
        self.sessions
            .advance(user_id, Flow::PlaceOrder(PlaceOrderStep::Address))?;
        Ok(Reply::text("📍 Delivery address:").with_buttons(vec![cancel_button()]))
    }

    async fn address_text(&self, user_id: &str, text: &str) -> Result<Reply> {
        let address = text.trim();
        let min_len = self.settings.marketplace.min_address_len;
        if address.chars().count() < min_len {
            return Ok(Reply::text(format!(
                "⚠️ The address must be at least {min_len} characters. Try again:"
            )));
        }

        let Some(product) = self.chosen_product(user_id).await? else {
            return Ok(Reply::text("❌ This product is not available anymore."));
        };
        let Some(quantity) = self.sessions.get(user_id).scratch.quantity else {
            self.sessions
                .advance(user_id, Flow::PlaceOrder(PlaceOrderStep::Quantity))?;
            return Ok(Reply::text("🔢 How many?"));
        };
        let shop = sellers::get_seller_by_id(self.db, product.seller_id).await?;
        let shop_name = shop.and_then(|s| s.shop_name).unwrap_or_default();

        self.sessions
            .set(user_id, ScratchValue::Address(address.to_string()))?;
        self.sessions
            .advance(user_id, Flow::PlaceOrder(PlaceOrderStep::Confirm))?;

        let summary = OrderSummary {
            shop_name: &shop_name,
            product_name: &product.name,
            packaging: &product.packaging,
            quantity,
            address,
            unit_price: product.price,
            currency: &self.settings.marketplace.currency,
        };
        Ok(Reply::text(format!("📝 Please check your order:\n{summary}"))
            .with_buttons(confirm_buttons()))
    }

    /// Confirm button: re-checks stock, stores the order and notifies the seller.
    ///
    /// The flow is taken out of the session store before anything is awaited, so
    /// repeated clicks on Confirm store at most one order. If stock dropped below
    /// the requested quantity since it was entered, the buyer is sent back to the
    /// quantity step and nothing is stored.
    #[instrument(skip(self))]
    pub(super) async fn confirm_order(&self, user_id: &str) -> Result<Reply> {
        let confirm = Flow::PlaceOrder(PlaceOrderStep::Confirm);
        let Some(session) = self.sessions.take_if(user_id, confirm) else {
            return Ok(Reply::text("Nothing to confirm."));
        };
        let (Some(product_id), Some(quantity), Some(address)) = (
            session.scratch.product_id,
            session.scratch.quantity,
            session.scratch.address.clone(),
        ) else {
            return Ok(Reply::text("⚠️ Order details were lost. Please start again."));
        };

        let product = match catalog::get_product(self.db, product_id).await? {
            Some(product) if product.stock > 0 => product,
            _ => {
                return Ok(Reply::text("❌ This product is not available anymore.")
                    .with_button("🛒 Shops", Action::ListShops));
            }
        };
        if product.stock < quantity {
            self.sessions
                .restore(user_id, session, Flow::PlaceOrder(PlaceOrderStep::Quantity));
            return Ok(Reply::text(format!(
                "⚠️ Only {} left in stock now. Enter a new quantity:",
                product.stock
            ))
            .with_buttons(vec![cancel_button()]));
        }

        let new_order = NewOrder {
            buyer_id: user_id,
            product: &product,
            quantity,
            address: &address,
        };
        let order = match order_store::create_order(self.db, new_order).await {
            Ok(order) => order,
            Err(e) => {
                error!("Failed to store order for {user_id}: {e}");
                self.sessions.restore(user_id, session, confirm);
                return Ok(Reply::text("⚠️ The order could not be placed. Please try again.")
                    .with_buttons(confirm_buttons()));
            }
        };

        if let Some(seller) = sellers::get_seller_by_id(self.db, order.seller_id).await? {
            let shop_name = seller.shop_name.as_deref().unwrap_or_default();
            let summary =
                OrderSummary::from_order(&order, shop_name, &self.settings.marketplace.currency);
            notify_best_effort(
                self.notifier,
                &seller.external_user_id,
                &format!(
                    "📥 New order #{}\n{summary}\n👤 Buyer: {user_id}",
                    order.id
                ),
                &[
                    ActionButton::new("✅ Accept", Action::AcceptOrder(order.id)),
                    ActionButton::new("❌ Decline", Action::DeclineOrder(order.id)),
                ],
            )
            .await;
        }

        info!("Buyer {user_id} placed order #{}", order.id);
        Ok(Reply::text(format!(
            "✅ Order #{} was sent to the seller. You will be notified when it is processed.",
            order.id
        )))
    }
}

fn confirm_buttons() -> Vec<ActionButton> {
    vec![
        ActionButton::new("✅ Confirm", Action::ConfirmOrder),
        cancel_button(),
    ]
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{lifecycle, session::SessionStore},
        entities::OrderStatus,
    };
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_shop_without_stock_shows_empty_result() -> Result<()> {
        let (db, seller) = setup_with_seller().await?;
        catalog::add_product(&db, seller.id, "Flour", "1kg", 2.0, 0).await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);

        let reply = convo
            .handle_action("buyer-1", &format!("shop:{}", seller.id))
            .await;
        assert!(reply.text.contains("no products in stock"));
        assert_eq!(sessions.get("buyer-1").flow, Flow::Idle);

        Ok(())
    }

    #[tokio::test]
    async fn test_no_shops_listed() -> Result<()> {
        let db = setup_test_db().await?;
        sellers::register_seller(&db, "pending").await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);

        let reply = convo.handle_action("buyer-1", "buyer").await;
        assert!(reply.text.contains("no shops"));
        assert!(reply.buttons.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_search_within_shop() -> Result<()> {
        let (db, seller, _product) = setup_with_product().await?;
        catalog::add_product(&db, seller.id, "Brown Rice", "2kg", 4.5, 3).await?;
        catalog::add_product(&db, seller.id, "Rice flour", "1kg", 3.0, 0).await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);

        convo
            .handle_action("buyer-1", &format!("shop:{}", seller.id))
            .await;
        let reply = convo.handle_text("buyer-1", "RICE").await;
        // Out-of-stock match is hidden; Cancel is always last
        assert_eq!(reply.buttons.len(), 2);
        assert!(reply.buttons[0].label.starts_with("Brown Rice"));

        let reply = convo.handle_text("buyer-1", "tea").await;
        assert!(reply.text.contains("Nothing matches"));
        assert_eq!(
            sessions.get("buyer-1").flow,
            Flow::PlaceOrder(PlaceOrderStep::Browse)
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_full_order_flow_through_acceptance() -> Result<()> {
        init_test_tracing();
        let (db, seller, product) = setup_with_product().await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);

        convo.handle_action("buyer-1", "shops").await;
        convo
            .handle_action("buyer-1", &format!("shop:{}", seller.id))
            .await;
        convo
            .handle_action("buyer-1", &format!("product:{}", product.id))
            .await;

        // Invalid quantities stay on the quantity step
        for bad in ["zero", "0", "-2", "11"] {
            convo.handle_text("buyer-1", bad).await;
            assert_eq!(
                sessions.get("buyer-1").flow,
                Flow::PlaceOrder(PlaceOrderStep::Quantity),
                "input {bad}"
            );
        }
        convo.handle_text("buyer-1", "4").await;

        let reply = convo.handle_text("buyer-1", "abc").await;
        assert!(reply.text.contains("at least"));
        assert_eq!(
            sessions.get("buyer-1").flow,
            Flow::PlaceOrder(PlaceOrderStep::Address)
        );

        let reply = convo.handle_text("buyer-1", "12 Main street").await;
        assert!(reply.text.contains("Total: 40.00 som"));
        assert_eq!(reply.buttons, confirm_buttons());

        let reply = convo.handle_action("buyer-1", "confirm").await;
        assert!(reply.text.contains("sent to the seller"));
        assert_eq!(sessions.get("buyer-1").flow, Flow::Idle);

        let orders = order_store::get_orders_for_seller(&db, seller.id).await?;
        assert_eq!(orders.len(), 1);
        let order = &orders[0];
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.address, "12 Main street");

        // Stock is untouched until acceptance
        let current = catalog::get_product(&db, product.id).await?.unwrap();
        assert_eq!(current.stock, 10);

        let to_seller = notifier.sent_to(&seller.external_user_id);
        assert_eq!(to_seller.len(), 1);
        assert_eq!(
            to_seller[0].buttons,
            vec![
                ActionButton::new("✅ Accept", Action::AcceptOrder(order.id)),
                ActionButton::new("❌ Decline", Action::DeclineOrder(order.id)),
            ]
        );

        let reply = convo
            .handle_action(&seller.external_user_id, &format!("accept:{}", order.id))
            .await;
        assert!(reply.text.contains("6 left"));
        assert_eq!(
            catalog::get_product(&db, product.id).await?.unwrap().stock,
            6
        );
        assert_eq!(notifier.sent_to("buyer-1").len(), 1);
        assert_eq!(notifier.sent_to("admin").len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_confirm_rechecks_stock() -> Result<()> {
        let (db, seller, product) = setup_with_product().await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);

        convo
            .handle_action("buyer-1", &format!("product:{}", product.id))
            .await;
        convo.handle_text("buyer-1", "8").await;
        convo.handle_text("buyer-1", "12 Main street").await;

        // Another buyer's order is accepted in the meantime
        let other = create_test_order(&db, "buyer-2", &product, 5).await?;
        lifecycle::accept_order(&db, &notifier, &settings, other.id, &seller.external_user_id)
            .await?;

        let reply = convo.handle_action("buyer-1", "confirm").await;
        assert!(reply.text.contains("Only 5 left"));
        assert_eq!(
            sessions.get("buyer-1").flow,
            Flow::PlaceOrder(PlaceOrderStep::Quantity)
        );
        assert_eq!(
            order_store::get_orders_for_seller(&db, seller.id)
                .await?
                .len(),
            1
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_double_confirm_stores_one_order() -> Result<()> {
        let (db, seller, product) = setup_with_product().await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);

        convo
            .handle_action("buyer-1", &format!("product:{}", product.id))
            .await;
        convo.handle_text("buyer-1", "2").await;
        convo.handle_text("buyer-1", "12 Main street").await;

        let (first, second) = tokio::join!(
            convo.handle_action("buyer-1", "confirm"),
            convo.handle_action("buyer-1", "confirm"),
        );
        let placed = [&first, &second]
            .iter()
            .filter(|reply| reply.text.contains("sent to the seller"))
            .count();
        assert_eq!(placed, 1);
        assert!(first.text == "Nothing to confirm." || second.text == "Nothing to confirm.");
        assert_eq!(
            order_store::get_orders_for_seller(&db, seller.id)
                .await?
                .len(),
            1
        );
        assert_eq!(notifier.sent_to(&seller.external_user_id).len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_confirm_sold_out_ends_flow() -> Result<()> {
        let (db, seller, product) = setup_with_product().await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);

        convo
            .handle_action("buyer-1", &format!("product:{}", product.id))
            .await;
        convo.handle_text("buyer-1", "3").await;
        convo.handle_text("buyer-1", "12 Main street").await;

        let other = create_test_order(&db, "buyer-2", &product, 10).await?;
        lifecycle::accept_order(&db, &notifier, &settings, other.id, &seller.external_user_id)
            .await?;

        let reply = convo.handle_action("buyer-1", "confirm").await;
        assert!(reply.text.contains("not available anymore"));
        assert_eq!(sessions.get("buyer-1").flow, Flow::Idle);
        assert_eq!(
            order_store::get_orders_for_seller(&db, seller.id)
                .await?
                .len(),
            1
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_confirm_without_flow_does_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let sessions = SessionStore::new();
        let settings = test_settings();
        let notifier = RecordingNotifier::default();
        let convo = Conversation::new(&db, &sessions, &settings, &notifier);

        let reply = convo.handle_action("buyer-1", "confirm").await;
        assert_eq!(reply.text, "Nothing to confirm.");
        assert!(notifier.sent().is_empty());

        Ok(())
    }
}
