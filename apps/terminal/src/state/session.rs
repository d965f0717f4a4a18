//! # Register Session
//!
//! Owns everything one signed-in cashier works with: the cart, the open
//! checkout, the catalogue cache, the current rates and the inactivity
//! timer. Every register operation goes through here.
//!
//! ## Session States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   SignedOut ──login──► Ringing ──checkout──► PaymentEntry               │
//! │       ▲                  │  ▲                  │      │                 │
//! │       │                  │  └──────cancel──────┘      │ finalize        │
//! │       │                  │                            ▼                 │
//! │       │                  │                     record_sale ok?          │
//! │       │                  │                      │           │           │
//! │       │                  │                 yes: clear    no: keep cart, │
//! │       │                  │                 cart, back    stay in        │
//! │       │                  │                 to Ringing    PaymentEntry   │
//! │       │                  │                                              │
//! │       └──logout/timeout──┘ (cart, checkout and snapshot discarded)      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! While payment entry is open the cart is locked: cart edits are refused
//! until the checkout is cancelled or finalized.

use std::time::{Duration, Instant};

use barpos_core::validation::{
    validate_bottle_quantity, validate_non_negative, validate_rate_settings,
};
use barpos_core::{
    build_sale, BottleEventKind, BottleLedger, Cart, CartTotals, Checkout, DailySummary,
    DepositMode, InactivityTimer, LineId, Money, PaymentMethod, PaymentRow, PaymentSummary,
    Product, Promotion, RateSettings, Sale,
};
use barpos_db::PersistenceGateway;
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, error, info, warn};

use super::recovery::{CartSnapshot, RecoveryStore};
use crate::error::{TerminalError, TerminalResult};

/// One register terminal's working state.
pub struct Session<G: PersistenceGateway> {
    gateway: G,
    recovery: Option<RecoveryStore>,
    timer: InactivityTimer,
    cashier: Option<String>,
    cart: Cart,
    checkout: Option<Checkout>,
    catalog: Vec<Product>,
    promotions: Vec<Promotion>,
    rates: RateSettings,
}

impl<G: PersistenceGateway> Session<G> {
    /// Creates a signed-out session. Call [`reload`](Self::reload) before
    /// ringing anything up.
    pub fn new(
        gateway: G,
        recovery: Option<RecoveryStore>,
        timeout: Duration,
        now: Instant,
    ) -> Self {
        Session {
            gateway,
            recovery,
            timer: InactivityTimer::new(timeout, now),
            cashier: None,
            cart: Cart::new(),
            checkout: None,
            catalog: Vec::new(),
            promotions: Vec::new(),
            rates: RateSettings::default(),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Refreshes products, promotions and rates from storage.
    pub async fn reload(&mut self) -> TerminalResult<()> {
        self.catalog = self.gateway.list_products().await?;
        self.promotions = self.gateway.list_promotions().await?;
        self.rates = self.gateway.get_rate_settings().await?;

        info!(
            products = self.catalog.len(),
            promotions = self.promotions.len(),
            "Catalogue loaded"
        );
        Ok(())
    }

    pub fn catalog(&self) -> &[Product] {
        &self.catalog
    }

    /// Every promotion on file, active or not, in matching order.
    pub fn promotions(&self) -> &[Promotion] {
        &self.promotions
    }

    pub fn rates(&self) -> RateSettings {
        self.rates
    }

    // =========================================================================
    // Sign-in / Timeout
    // =========================================================================

    pub fn cashier(&self) -> Option<&str> {
        self.cashier.as_deref()
    }

    /// Signs a cashier in, restoring their recovery snapshot if one exists.
    ///
    /// Signing in as a different cashier first signs the current one out.
    ///
    /// ## Returns
    /// `true` when a saved cart was restored.
    pub fn login(&mut self, user_id: &str, now: Instant) -> TerminalResult<bool> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(TerminalError::validation("cashier id is required"));
        }

        if self.cashier.as_deref() == Some(user_id) {
            self.timer.touch(now);
            return Ok(false);
        }
        if self.cashier.is_some() {
            self.logout();
        }

        self.cashier = Some(user_id.to_string());
        self.timer = InactivityTimer::new(self.timer.timeout(), now);
        info!(user_id = %user_id, "Cashier signed in");

        let snapshot = match &self.recovery {
            Some(store) => match store.load(user_id) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Could not read cart snapshot");
                    None
                }
            },
            None => None,
        };

        let Some(snapshot) = snapshot else {
            return Ok(false);
        };

        self.cart = snapshot.cart;
        self.rates = snapshot.rates;
        self.checkout = snapshot.payment_rows.map(Checkout::resume);
        info!(
            user_id = %user_id,
            lines = self.cart.line_count(),
            payment_entry = self.checkout.is_some(),
            "Cart restored from snapshot"
        );
        Ok(true)
    }

    /// Signs out, dropping the cart, checkout and snapshot.
    pub fn logout(&mut self) {
        if let Some(user_id) = self.cashier.take() {
            self.discard_snapshot(&user_id);
            info!(user_id = %user_id, "Cashier signed out");
        }
        self.cart.clear();
        self.checkout = None;
    }

    /// Records operator activity.
    pub fn touch(&mut self, now: Instant) {
        self.timer.touch(now);
    }

    /// When the signed-in session expires; `None` when signed out.
    pub fn deadline(&self) -> Option<Instant> {
        self.cashier.as_ref().map(|_| self.timer.deadline())
    }

    /// Signs out if the inactivity timeout has passed.
    ///
    /// ## Returns
    /// `true` if the session just expired.
    pub fn expire_if_idle(&mut self, now: Instant) -> bool {
        if self.cashier.is_none() || !self.timer.is_expired(now) {
            return false;
        }
        warn!(
            user_id = ?self.cashier,
            lines = self.cart.line_count(),
            "Session timed out, clearing cart"
        );
        self.logout();
        true
    }

    fn require_cashier(&self) -> TerminalResult<&str> {
        self.cashier
            .as_deref()
            .ok_or_else(|| TerminalError::session("No cashier signed in"))
    }

    // =========================================================================
    // Cart
    // =========================================================================

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Totals for the current cart at the current rates.
    pub fn totals(&self) -> CartTotals {
        self.cart.totals(&self.rates)
    }

    /// Adds one unit of a catalogue product.
    pub fn add_product(&mut self, product_id: &str, today: NaiveDate) -> TerminalResult<LineId> {
        self.ensure_cart_editable()?;
        let product = self
            .catalog
            .iter()
            .find(|p| p.id == product_id)
            .ok_or_else(|| TerminalError::not_found("Product", product_id))?;

        let line_id = self.cart.add_item(product, &self.promotions, today);
        self.save_snapshot();
        Ok(line_id)
    }

    pub fn update_qty(&mut self, line_id: LineId, qty: u32) -> TerminalResult<()> {
        self.edit_cart(|cart| cart.update_qty(line_id, qty))
    }

    pub fn increment(&mut self, line_id: LineId) -> TerminalResult<()> {
        self.edit_cart(|cart| cart.increment(line_id))
    }

    pub fn decrement(&mut self, line_id: LineId) -> TerminalResult<()> {
        self.edit_cart(|cart| cart.decrement(line_id))
    }

    pub fn remove_line(&mut self, line_id: LineId) -> TerminalResult<()> {
        self.edit_cart(|cart| cart.remove_line(line_id).map(|_| ()))
    }

    pub fn toggle_deposit_mode(&mut self, line_id: LineId) -> TerminalResult<DepositMode> {
        self.edit_cart(|cart| cart.toggle_deposit_mode(line_id))
    }

    /// Returns whether the line's promotion is now disabled.
    pub fn toggle_promo_for_line(&mut self, line_id: LineId) -> TerminalResult<bool> {
        self.edit_cart(|cart| cart.toggle_promo_for_line(line_id))
    }

    pub fn clear_cart(&mut self) -> TerminalResult<()> {
        self.edit_cart(|cart| {
            cart.clear();
            Ok(())
        })
    }

    fn edit_cart<T>(
        &mut self,
        edit: impl FnOnce(&mut Cart) -> barpos_core::CoreResult<T>,
    ) -> TerminalResult<T> {
        self.ensure_cart_editable()?;
        let result = edit(&mut self.cart)?;
        self.save_snapshot();
        Ok(result)
    }

    fn ensure_cart_editable(&self) -> TerminalResult<()> {
        self.require_cashier()?;
        if self.checkout.is_some() {
            return Err(TerminalError::cart(
                "Cart is locked during payment entry; cancel the checkout to edit it",
            ));
        }
        Ok(())
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    pub fn checkout(&self) -> Option<&Checkout> {
        self.checkout.as_ref()
    }

    /// Opens payment entry with one blank Cash row.
    pub fn begin_checkout(&mut self) -> TerminalResult<PaymentSummary> {
        self.require_cashier()?;
        if self.checkout.is_some() {
            return Err(TerminalError::cart("Payment entry is already open"));
        }

        let checkout = Checkout::begin(&self.cart)?;
        let summary = checkout.summary(self.totals().grand_total);
        self.checkout = Some(checkout);
        self.save_snapshot();

        info!(total = %summary.grand_total, "Payment entry opened");
        Ok(summary)
    }

    /// Adds a payment row. Returns its 0-based index.
    pub fn add_payment_row(&mut self, method: PaymentMethod) -> TerminalResult<usize> {
        self.edit_checkout(|checkout| checkout.add_row(method))
    }

    /// Returns `false` when the row was the last one and was kept.
    pub fn remove_payment_row(&mut self, row: usize) -> TerminalResult<bool> {
        self.edit_checkout(|checkout| checkout.remove_row(row))
    }

    pub fn set_payment_method(&mut self, row: usize, method: PaymentMethod) -> TerminalResult<()> {
        self.edit_checkout(|checkout| checkout.set_method(row, method))
    }

    pub fn set_payment_amount(&mut self, row: usize, text: &str) -> TerminalResult<()> {
        self.edit_checkout(|checkout| checkout.set_amount(row, text))
    }

    /// Paid / balance / change for the open checkout.
    pub fn payment_summary(&self) -> TerminalResult<PaymentSummary> {
        let checkout = self.open_checkout()?;
        Ok(checkout.summary(self.totals().grand_total))
    }

    pub fn payment_rows(&self) -> &[PaymentRow] {
        self.checkout.as_ref().map(Checkout::rows).unwrap_or(&[])
    }

    /// Leaves payment entry; the cart stays as it was.
    pub fn cancel_checkout(&mut self) -> TerminalResult<()> {
        self.require_cashier()?;
        let mut checkout = self
            .checkout
            .take()
            .ok_or_else(|| TerminalError::cart("No payment entry open"))?;
        checkout.cancel()?;
        self.save_snapshot();
        Ok(())
    }

    /// Authorizes, records and closes the sale.
    ///
    /// ## Flow
    /// 1. Balance due must be within tolerance
    /// 2. Build the immutable sale (invoice id from `now`)
    /// 3. `record_sale`: sale, stock and bottles in one transaction
    /// 4. Only then clear the cart, checkout and snapshot
    ///
    /// If step 3 fails the error is returned and the cart and payment rows
    /// are left exactly as they were, so the operator can retry.
    pub async fn finalize(&mut self, now: NaiveDateTime) -> TerminalResult<Sale> {
        let user_id = self.require_cashier()?.to_string();
        let checkout = self.open_checkout()?;

        let sale = build_sale(&self.cart, &self.rates, checkout, &user_id, now)?;

        if let Err(e) = self.gateway.record_sale(&sale).await {
            error!(sale_id = %sale.id, error = %e, "Failed to record sale, cart kept");
            return Err(e.into());
        }

        if let Some(mut checkout) = self.checkout.take() {
            checkout.mark_finalized()?;
        }
        self.cart.clear();
        self.discard_snapshot(&user_id);

        info!(
            sale_id = %sale.id,
            user_id = %user_id,
            total = %sale.grand_total,
            change = %sale.change_due,
            "Sale finalized"
        );

        // Pick up the new stock levels
        if let Err(e) = self.reload().await {
            warn!(error = %e, "Could not refresh catalogue after sale");
        }

        Ok(sale)
    }

    fn open_checkout(&self) -> TerminalResult<&Checkout> {
        self.checkout
            .as_ref()
            .ok_or_else(|| TerminalError::cart("No payment entry open; run checkout first"))
    }

    fn edit_checkout<T>(
        &mut self,
        edit: impl FnOnce(&mut Checkout) -> barpos_core::CoreResult<T>,
    ) -> TerminalResult<T> {
        self.require_cashier()?;
        let checkout = self
            .checkout
            .as_mut()
            .ok_or_else(|| TerminalError::cart("No payment entry open; run checkout first"))?;
        let result = edit(checkout)?;
        self.save_snapshot();
        Ok(result)
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Validates, stores and applies new rates.
    pub async fn set_rates(&mut self, rates: RateSettings) -> TerminalResult<()> {
        self.require_cashier()?;
        validate_rate_settings(&rates)?;
        self.gateway.set_rate_settings(&rates).await?;
        self.rates = rates;
        self.save_snapshot();
        Ok(())
    }

    // =========================================================================
    // Stock / Bottles
    // =========================================================================

    pub async fn low_stock(&self, threshold: i64) -> TerminalResult<Vec<Product>> {
        Ok(self.gateway.low_stock(threshold).await?)
    }

    pub async fn bottle_ledger(&self) -> TerminalResult<BottleLedger> {
        Ok(self.gateway.get_bottle_ledger().await?)
    }

    /// Manual bottle movement. Cost only applies to purchases.
    ///
    /// ## Returns
    /// Bottles in hand afterwards.
    pub async fn record_bottle_event(
        &self,
        kind: BottleEventKind,
        quantity: u32,
        cost: Money,
    ) -> TerminalResult<i64> {
        let user_id = self.require_cashier()?;
        validate_bottle_quantity(quantity)?;
        validate_non_negative("cost", cost)?;

        let total = self.gateway.record_bottle_event(kind, quantity, cost).await?;
        info!(user_id = %user_id, kind = kind.as_str(), quantity, total, "Bottle event recorded");
        Ok(total)
    }

    /// Receives (`delta > 0`) or writes off (`delta < 0`) stock.
    ///
    /// ## Returns
    /// The product's stock afterwards.
    pub async fn restock(&mut self, product_id: &str, delta: i64) -> TerminalResult<i64> {
        let user_id = self.require_cashier()?.to_string();
        if delta == 0 {
            return Err(TerminalError::validation("stock change must not be zero"));
        }
        let product = self
            .catalog
            .iter()
            .find(|p| p.id == product_id)
            .ok_or_else(|| TerminalError::not_found("Product", product_id))?;
        if !product.is_stock_tracked() {
            return Err(TerminalError::validation(format!(
                "{} is made to order and has no stock",
                product.name
            )));
        }

        self.gateway.adjust_stock(product_id, delta).await?;
        self.reload().await?;
        let stock = self
            .catalog
            .iter()
            .find(|p| p.id == product_id)
            .map(|p| p.stock)
            .ok_or_else(|| TerminalError::not_found("Product", product_id))?;

        info!(user_id = %user_id, product_id = %product_id, delta, stock, "Stock adjusted");
        Ok(stock)
    }

    // =========================================================================
    // Catalogue Maintenance
    // =========================================================================

    /// Takes a product off the menu. Lines already in the cart keep selling.
    pub async fn archive_product(&mut self, product_id: &str) -> TerminalResult<()> {
        let user_id = self.require_cashier()?.to_string();
        self.gateway.archive_product(product_id).await?;
        info!(user_id = %user_id, product_id = %product_id, "Product archived");
        self.reload().await
    }

    pub async fn restore_product(&mut self, product_id: &str) -> TerminalResult<Product> {
        let user_id = self.require_cashier()?.to_string();
        let product = self.gateway.restore_product(product_id).await?;
        info!(user_id = %user_id, product_id = %product_id, "Product restored");
        self.reload().await?;
        Ok(product)
    }

    /// Switches a promotion on or off for lines added from now on.
    ///
    /// Lines already in the cart keep the promotion they were added with.
    pub async fn set_promotion_active(
        &mut self,
        promotion_id: &str,
        active: bool,
    ) -> TerminalResult<Promotion> {
        let user_id = self.require_cashier()?.to_string();
        let promotion = self
            .gateway
            .set_promotion_active(promotion_id, active)
            .await?;
        info!(user_id = %user_id, promotion_id = %promotion_id, active, "Promotion switched");
        self.reload().await?;
        Ok(promotion)
    }

    // =========================================================================
    // Sales History
    // =========================================================================

    pub async fn sale(&self, sale_id: &str) -> TerminalResult<Sale> {
        self.gateway
            .get_sale(sale_id)
            .await?
            .ok_or_else(|| TerminalError::not_found("Sale", sale_id))
    }

    /// Newest first; `user_id` narrows to one cashier.
    pub async fn recent_sales(
        &self,
        limit: u32,
        user_id: Option<&str>,
    ) -> TerminalResult<Vec<Sale>> {
        Ok(self.gateway.list_sales(limit, user_id).await?)
    }

    pub async fn daily_summary(&self, date: NaiveDate) -> TerminalResult<DailySummary> {
        Ok(self.gateway.daily_summary(date).await?)
    }

    // =========================================================================
    // Recovery
    // =========================================================================

    fn save_snapshot(&self) {
        let (Some(store), Some(user_id)) = (&self.recovery, &self.cashier) else {
            return;
        };

        if self.cart.is_empty() && self.checkout.is_none() {
            self.discard_snapshot(user_id);
            return;
        }

        let snapshot = CartSnapshot {
            user_id: user_id.clone(),
            cart: self.cart.clone(),
            payment_rows: self.checkout.as_ref().map(|c| c.rows().to_vec()),
            rates: self.rates,
        };
        if let Err(e) = store.save(&snapshot) {
            warn!(user_id = %user_id, error = %e, "Could not save cart snapshot");
        }
    }

    fn discard_snapshot(&self, user_id: &str) {
        if let Some(store) = &self.recovery {
            if let Err(e) = store.discard(user_id) {
                warn!(user_id = %user_id, error = %e, "Could not delete cart snapshot");
            } else {
                debug!(user_id = %user_id, "Snapshot cleared");
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::{
        at, deposit_beer, devilled_chicken, drink, happy_hour, lager, scratch_dir, today,
        FakeGateway,
    };
    use barpos_core::Percent;

    async fn session_with(gateway: FakeGateway) -> Session<FakeGateway> {
        let mut session = Session::new(gateway, None, Duration::from_secs(600), Instant::now());
        session.reload().await.unwrap();
        session.login("nimal", Instant::now()).unwrap();
        session
    }

    /// Signed-out session over the stocked fake, not yet reloaded.
    fn session_at(now: Instant) -> Session<FakeGateway> {
        Session::new(FakeGateway::stocked(), None, Duration::from_secs(600), now)
    }

    fn recovering_session(store: &RecoveryStore) -> Session<FakeGateway> {
        Session::new(
            FakeGateway::stocked(),
            Some(store.clone()),
            Duration::from_secs(600),
            Instant::now(),
        )
    }

    fn no_rates() -> RateSettings {
        RateSettings::new(Percent::zero(), Percent::zero())
    }

    #[tokio::test]
    async fn test_cart_needs_cashier() {
        let mut session = session_at(Instant::now());
        session.reload().await.unwrap();

        let err = session.add_product("lager", today()).unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionError);
    }

    #[tokio::test]
    async fn test_unknown_product_not_found() {
        let mut session = session_with(FakeGateway::stocked()).await;
        let err = session.add_product("ghost", today()).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_full_sale_reference_scenario() {
        // 2 × 1000 with 10% promo, 10% service charge, 8% tax → 2124
        let gateway = FakeGateway::new(
            vec![drink("beer", 1000)],
            vec![happy_hour(&["beer"])],
            RateSettings::default(),
        );
        let mut session = session_with(gateway).await;

        let beer = session.add_product("beer", today()).unwrap();
        session.increment(beer).unwrap();
        let totals = session.totals();
        assert_eq!(totals.discount_total, Money::from_major(200));
        assert_eq!(totals.service_charge, Money::from_major(180));
        assert_eq!(totals.tax, Money::from_major(144));
        assert_eq!(totals.grand_total, Money::from_major(2124));

        session.begin_checkout().unwrap();
        session.set_payment_amount(0, "2123").unwrap();
        let sale = session.finalize(at(21, 5, 9)).await.unwrap();

        assert_eq!(sale.id, "INV-20240615-210509");
        assert_eq!(sale.grand_total, Money::from_major(2124));
        assert_eq!(sale.change_due, Money::ZERO);
        assert!(session.cart().is_empty());
        assert!(session.checkout().is_none());

        let recorded = session.gateway().recorded_sales();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].lines[0].discount, Money::from_major(200));
        assert_eq!(session.gateway().stock_of("beer"), 48);
    }

    #[tokio::test]
    async fn test_underpayment_blocks_finalize() {
        let gateway = FakeGateway::new(
            vec![drink("beer", 1000)],
            vec![happy_hour(&["beer"])],
            RateSettings::default(),
        );
        let mut session = session_with(gateway).await;
        let beer = session.add_product("beer", today()).unwrap();
        session.increment(beer).unwrap();

        session.begin_checkout().unwrap();
        session.set_payment_amount(0, "2000").unwrap();
        let err = session.finalize(at(21, 0, 0)).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::InsufficientPayment);
        assert!(err.message.contains("124.00"));
        assert_eq!(session.cart().line_count(), 1);
        assert!(session.checkout().is_some());
        assert!(session.gateway().recorded_sales().is_empty());
    }

    #[tokio::test]
    async fn test_split_payment_with_change() {
        let gateway = FakeGateway::new(vec![lager()], vec![], no_rates());
        let mut session = session_with(gateway).await;
        let line = session.add_product("lager", today()).unwrap();
        session.update_qty(line, 6).unwrap();

        session.begin_checkout().unwrap();
        session.set_payment_amount(0, "2000").unwrap();
        let card = session.add_payment_row(PaymentMethod::Card).unwrap();
        session.set_payment_amount(card, "2000").unwrap();
        let blank = session.add_payment_row(PaymentMethod::OnlineTransfer).unwrap();
        assert_eq!(blank, 2);

        let summary = session.payment_summary().unwrap();
        assert_eq!(summary.change_due, Money::from_major(100));
        assert_eq!(summary.balance_due, Money::ZERO);

        let sale = session.finalize(at(22, 0, 0)).await.unwrap();
        assert_eq!(sale.payments.len(), 2);
        assert_eq!(sale.change_due, Money::from_major(100));
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_cart() {
        let gateway = FakeGateway::new(vec![lager()], vec![], no_rates());
        gateway.fail_next_sale();
        let mut session = session_with(gateway).await;
        session.add_product("lager", today()).unwrap();
        session.begin_checkout().unwrap();
        session.set_payment_amount(0, "650").unwrap();

        let err = session.finalize(at(22, 0, 0)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PersistenceError);
        assert_eq!(session.cart().line_count(), 1);
        assert_eq!(session.payment_rows()[0].amount, Some(Money::from_major(650)));

        // Retry succeeds once storage is back
        let sale = session.finalize(at(22, 0, 1)).await.unwrap();
        assert_eq!(sale.id, "INV-20240615-220001");
        assert_eq!(session.gateway().recorded_sales().len(), 1);
    }

    #[tokio::test]
    async fn test_cart_locked_during_checkout() {
        let gateway = FakeGateway::new(vec![lager()], vec![], no_rates());
        let mut session = session_with(gateway).await;
        let line = session.add_product("lager", today()).unwrap();
        session.begin_checkout().unwrap();

        assert_eq!(session.increment(line).unwrap_err().code, ErrorCode::CartError);
        assert_eq!(
            session.add_product("lager", today()).unwrap_err().code,
            ErrorCode::CartError
        );

        session.cancel_checkout().unwrap();
        session.increment(line).unwrap();
        assert_eq!(session.cart().line(line).unwrap().qty, 2);
    }

    #[tokio::test]
    async fn test_empty_cart_checkout_rejected() {
        let mut session = session_with(FakeGateway::stocked()).await;
        let err = session.begin_checkout().unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(session.checkout().is_none());
    }

    #[tokio::test]
    async fn test_exchange_sale_records_bottles_and_skips_kitchen_stock() {
        let gateway = FakeGateway::new(
            vec![deposit_beer("beer", 500, 50), devilled_chicken()],
            vec![],
            no_rates(),
        );
        let mut session = session_with(gateway).await;
        let beer = session.add_product("beer", today()).unwrap();
        session.update_qty(beer, 3).unwrap();
        assert_eq!(session.toggle_deposit_mode(beer).unwrap(), DepositMode::Exchange);
        session.add_product("devilled", today()).unwrap();

        let totals = session.totals();
        assert_eq!(totals.deposit_total, Money::ZERO);
        assert_eq!(totals.bottles_exchanged, 3);

        session.begin_checkout().unwrap();
        session.set_payment_amount(0, "2700").unwrap();
        let sale = session.finalize(at(23, 0, 0)).await.unwrap();

        assert_eq!(sale.bottles_exchanged, 3);
        assert_eq!(session.gateway().stock_of("beer"), 47);
        assert_eq!(session.gateway().stock_of("devilled"), 0);
        let ledger = session.gateway().get_bottle_ledger().await.unwrap();
        assert_eq!(ledger.total_in_hand, 3);
        assert_eq!(ledger.history[0].kind, BottleEventKind::Exchange);
    }

    #[tokio::test]
    async fn test_timeout_signs_out_and_clears() {
        let start = Instant::now();
        let mut session = session_at(start);
        session.reload().await.unwrap();
        session.login("nimal", start).unwrap();
        session.add_product("lager", today()).unwrap();
        session.begin_checkout().unwrap();

        assert!(!session.expire_if_idle(start + Duration::from_secs(599)));
        assert!(session.expire_if_idle(start + Duration::from_secs(600)));
        assert!(session.cashier().is_none());
        assert!(session.cart().is_empty());
        assert!(session.checkout().is_none());
        assert!(session.deadline().is_none());
        assert!(!session.expire_if_idle(start + Duration::from_secs(1200)));
    }

    #[tokio::test]
    async fn test_touch_postpones_timeout() {
        let start = Instant::now();
        let mut session = session_at(start);
        session.login("nimal", start).unwrap();
        session.touch(start + Duration::from_secs(500));
        assert!(!session.expire_if_idle(start + Duration::from_secs(900)));
        assert_eq!(session.deadline(), Some(start + Duration::from_secs(1100)));
    }

    #[tokio::test]
    async fn test_snapshot_restored_for_same_cashier_only() {
        let dir = scratch_dir("session-snapshot");
        let store = RecoveryStore::new(&dir);

        let mut first = recovering_session(&store);
        first.reload().await.unwrap();
        first.login("nimal", Instant::now()).unwrap();
        let line = first.add_product("lager", today()).unwrap();
        first.update_qty(line, 4).unwrap();
        first.begin_checkout().unwrap();
        first.set_payment_amount(0, "1000").unwrap();
        drop(first);

        let mut other = recovering_session(&store);
        other.reload().await.unwrap();
        assert!(!other.login("kamal", Instant::now()).unwrap());
        assert!(other.cart().is_empty());

        let mut resumed = recovering_session(&store);
        resumed.reload().await.unwrap();
        assert!(resumed.login("nimal", Instant::now()).unwrap());
        assert_eq!(resumed.cart().line(line).unwrap().qty, 4);
        assert_eq!(resumed.payment_rows()[0].amount, Some(Money::from_major(1000)));

        resumed.logout();
        assert!(store.load("nimal").unwrap().is_none());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_set_rates_validates_and_applies() {
        let mut session = session_with(FakeGateway::stocked()).await;
        session.add_product("lager", today()).unwrap();

        let err = session
            .set_rates(RateSettings::new(Percent::from_whole(101), Percent::zero()))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        session.set_rates(no_rates()).await.unwrap();
        assert_eq!(session.totals().grand_total, Money::from_major(650));
        assert_eq!(session.gateway().get_rate_settings().await.unwrap(), no_rates());
    }

    #[tokio::test]
    async fn test_restock_updates_catalogue() {
        let mut session = session_with(FakeGateway::stocked()).await;

        assert_eq!(session.restock("lager", 24).await.unwrap(), 74);
        assert_eq!(session.restock("lager", -4).await.unwrap(), 70);
        assert_eq!(session.gateway().stock_of("lager"), 70);

        let err = session.restock("lager", 0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        let err = session.restock("ghost", 1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        let err = session.restock("devilled", 5).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(session.gateway().stock_of("devilled"), 0);
    }

    #[tokio::test]
    async fn test_archive_and_restore_product() {
        let mut session = session_with(FakeGateway::stocked()).await;
        let line = session.add_product("lager", today()).unwrap();

        session.archive_product("lager").await.unwrap();
        assert!(session.catalog().iter().all(|p| p.id != "lager"));
        assert_eq!(
            session.add_product("lager", today()).unwrap_err().code,
            ErrorCode::NotFound
        );
        assert!(session.cart().line(line).is_some());

        let restored = session.restore_product("lager").await.unwrap();
        assert!(!restored.is_deleted);
        assert!(session.catalog().iter().any(|p| p.id == "lager"));

        session.logout();
        let err = session.archive_product("lager").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionError);
    }

    #[tokio::test]
    async fn test_promotion_off_applies_to_new_lines_only() {
        let gateway = FakeGateway::new(
            vec![drink("beer", 1000), drink("stout", 800)],
            vec![happy_hour(&["beer", "stout"])],
            no_rates(),
        );
        let mut session = session_with(gateway).await;
        session.add_product("beer", today()).unwrap();

        let promo = session
            .set_promotion_active("promo_happy_hour", false)
            .await
            .unwrap();
        assert!(!promo.is_active);
        assert!(!session.promotions()[0].is_active);

        session.add_product("stout", today()).unwrap();
        assert_eq!(session.totals().discount_total, Money::from_major(100));

        let err = session.set_promotion_active("nope", true).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_sales_history_and_daily_summary() {
        let gateway = FakeGateway::new(
            vec![drink("beer", 1000), deposit_beer("lion", 500, 100)],
            vec![],
            no_rates(),
        );
        let mut session = session_with(gateway).await;

        session.add_product("beer", today()).unwrap();
        session.begin_checkout().unwrap();
        session.set_payment_amount(0, "1000").unwrap();
        session.finalize(at(20, 0, 0)).await.unwrap();

        session.login("kamala", Instant::now()).unwrap();
        session.add_product("lion", today()).unwrap();
        session.begin_checkout().unwrap();
        session.set_payment_amount(0, "600").unwrap();
        session.finalize(at(21, 0, 0)).await.unwrap();

        let recent = session.recent_sales(10, None).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["INV-20240615-210000", "INV-20240615-200000"]);
        let mine = session.recent_sales(10, Some("nimal")).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id, "nimal");

        let sale = session.sale("INV-20240615-210000").await.unwrap();
        assert_eq!(sale.deposit_total, Money::from_major(100));
        let err = session.sale("INV-0").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let summary = session.daily_summary(today()).await.unwrap();
        assert_eq!(summary.sale_count, 2);
        assert_eq!(summary.net_sales(), Money::from_major(1500));
        assert_eq!(summary.deposit_total, Money::from_major(100));
        assert_eq!(summary.grand_total, Money::from_major(1600));
    }

    #[tokio::test]
    async fn test_last_payment_row_kept() {
        let mut session = session_with(FakeGateway::stocked()).await;
        session.add_product("lager", today()).unwrap();
        session.begin_checkout().unwrap();

        assert!(!session.remove_payment_row(0).unwrap());
        assert_eq!(session.payment_rows().len(), 1);

        session.add_payment_row(PaymentMethod::Card).unwrap();
        assert!(session.remove_payment_row(0).unwrap());
        assert_eq!(session.payment_rows()[0].method, PaymentMethod::Card);
    }

    #[tokio::test]
    async fn test_bad_amount_leaves_row() {
        let mut session = session_with(FakeGateway::stocked()).await;
        session.add_product("lager", today()).unwrap();
        session.begin_checkout().unwrap();
        session.set_payment_amount(0, "500").unwrap();

        let err = session.set_payment_amount(0, "five hundred").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(session.payment_rows()[0].amount, Some(Money::from_major(500)));

        session.set_payment_amount(0, "  ").unwrap();
        assert_eq!(session.payment_rows()[0].amount, None);
    }
}
