//! Admin operations: grant and revoke seller access, list sellers and buyers.
//!
//! Every operation compares the caller against the configured admin id and does
//! nothing for anyone else.

use super::{Conversation, Reply};
use crate::{
    config::admin::is_admin,
    core::{
        action::{Action, ActionButton},
        notify::{Notifier, notify_best_effort},
        order as order_store,
        seller as sellers,
    },
    errors::Result,
};
use tracing::{info, instrument, warn};

const NOT_ADMIN: &str = "⛔ This command is only available to the admin.";

/// Chat user ids are numeric snowflakes.
fn parse_target(raw: &str) -> Option<String> {
    let target = raw.trim();
    (!target.is_empty() && target.bytes().all(|b| b.is_ascii_digit())).then(|| target.to_string())
}

impl<N: Notifier> Conversation<'_, N> {
    fn check_admin(&self, caller: &str) -> bool {
        let allowed = is_admin(&self.settings.admin_user_id, caller);
        if !allowed {
            warn!("Non-admin {caller} attempted an admin operation");
        }
        allowed
    }

    /// `/allow <user>` or the Allow button: creates the seller if needed and activates it.
    #[instrument(skip(self))]
    pub async fn allow_seller(&self, caller: &str, target: &str) -> Result<Reply> {
        if !self.check_admin(caller) {
            return Ok(Reply::text(NOT_ADMIN));
        }
        let Some(target) = parse_target(target) else {
            return Ok(Reply::text("Usage: /allow <user id>"));
        };

        sellers::register_seller(self.db, &target).await?;
        sellers::activate(self.db, &target).await?;
        info!("Admin granted seller access to {target}");

        notify_best_effort(
            self.notifier,
            &target,
            "✅ Seller access granted! Open the seller menu to set up your shop.",
            &[ActionButton::new("🏪 Seller menu", Action::SellerMenu)],
        )
        .await;
        Ok(Reply::text(format!("✅ Seller access granted to {target}.")))
    }

    /// `/ban <user>`: deactivates a seller and drops any flow they had open.
    #[instrument(skip(self))]
    pub async fn ban_seller(&self, caller: &str, target: &str) -> Result<Reply> {
        if !self.check_admin(caller) {
            return Ok(Reply::text(NOT_ADMIN));
        }
        let Some(target) = parse_target(target) else {
            return Ok(Reply::text("Usage: /ban <user id>"));
        };

        if !sellers::deactivate(self.db, &target).await? {
            return Ok(Reply::text(format!("❌ Seller {target} not found.")));
        }
        self.sessions.clear(&target);
        info!("Admin revoked seller access of {target}");

        notify_best_effort(
            self.notifier,
            &target,
            "⛔ Your seller access has been disabled.",
            &[],
        )
        .await;
        Ok(Reply::text(format!("⛔ Seller access revoked for {target}.")))
    }

    /// `/sellers`: every seller with shop name and status.
    pub async fn list_sellers(&self, caller: &str) -> Result<Reply> {
        if !self.check_admin(caller) {
            return Ok(Reply::text(NOT_ADMIN));
        }

        let all = sellers::list_sellers(self.db).await?;
        if all.is_empty() {
            return Ok(Reply::text("No sellers yet."));
        }
        let lines: Vec<String> = all
            .iter()
            .map(|s| {
                format!(
                    "{} | {} | {}",
                    s.external_user_id,
                    s.shop_name.as_deref().unwrap_or("(no shop)"),
                    if s.is_active { "active" } else { "inactive" }
                )
            })
            .collect();
        Ok(Reply::text(format!("👥 Sellers:\n{}", lines.join("\n"))))
    }

    /// `/buyers`: every user that has placed an order.
    pub async fn list_buyers(&self, caller: &str) -> Result<Reply> {
        if !self.check_admin(caller) {
            return Ok(Reply::text(NOT_ADMIN));
        }

        let buyers = order_store::list_buyers(self.db).await?;
        if buyers.is_empty() {
            return Ok(Reply::text("No buyers yet."));
        }
        Ok(Reply::text(format!("🛒 Buyers:\n{}", buyers.join("\n"))))
    }
}
