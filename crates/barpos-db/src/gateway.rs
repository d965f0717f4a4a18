//! # Persistence Gateway
//!
//! The narrow set of storage operations the register needs, behind one
//! trait so the session layer can run against SQLite or a test double.
//!
//! ```text
//! ┌──────────────────────┐      ┌────────────────────────┐
//! │  Session (terminal)  │─────►│  dyn PersistenceGateway │
//! └──────────────────────┘      └───────────┬────────────┘
//!                                           │
//!                         ┌─────────────────┴──────────────┐
//!                         ▼                                ▼
//!                   Database (SQLite)              fake gateway (tests)
//! ```
//!
//! Every method is a single atomic unit: it either fully applies or
//! leaves storage untouched.

use async_trait::async_trait;
use barpos_core::{
    BottleEventKind, BottleLedger, DailySummary, Money, Product, Promotion, RateSettings, Sale,
};
use chrono::{Local, NaiveDate};

use crate::error::{DbError, DbResult};
use crate::pool::Database;

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Sellable products (archived ones excluded).
    async fn list_products(&self) -> DbResult<Vec<Product>>;

    /// All promotions with their product ids, newest start date first.
    async fn list_promotions(&self) -> DbResult<Vec<Promotion>>;

    async fn get_rate_settings(&self) -> DbResult<RateSettings>;

    async fn set_rate_settings(&self, rates: &RateSettings) -> DbResult<()>;

    /// Sale, stock decrements and bottle exchange in one transaction.
    async fn record_sale(&self, sale: &Sale) -> DbResult<()>;

    /// Stock delta for one product. May drive stock negative.
    async fn adjust_stock(&self, product_id: &str, delta: i64) -> DbResult<()>;

    /// Manual bottle movement stamped with the local time. Returns the new
    /// bottles-in-hand total.
    async fn record_bottle_event(
        &self,
        kind: BottleEventKind,
        quantity: u32,
        cost: Money,
    ) -> DbResult<i64>;

    async fn get_bottle_ledger(&self) -> DbResult<BottleLedger>;

    /// Active products with stock below `threshold`, lowest first.
    async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Product>>;

    /// Takes a product off the menu. Past sales keep referring to it.
    async fn archive_product(&self, product_id: &str) -> DbResult<()>;

    /// Puts an archived product back on the menu and returns it.
    async fn restore_product(&self, product_id: &str) -> DbResult<Product>;

    /// Switches a promotion on or off and returns it.
    async fn set_promotion_active(&self, promotion_id: &str, active: bool) -> DbResult<Promotion>;

    async fn get_sale(&self, sale_id: &str) -> DbResult<Option<Sale>>;

    /// Newest first, optionally only one cashier's sales.
    async fn list_sales(&self, limit: u32, user_id: Option<&str>) -> DbResult<Vec<Sale>>;

    /// Takings for one local calendar day.
    async fn daily_summary(&self, date: NaiveDate) -> DbResult<DailySummary>;
}

#[async_trait]
impl PersistenceGateway for Database {
    async fn list_products(&self) -> DbResult<Vec<Product>> {
        self.products().list_active().await
    }

    async fn list_promotions(&self) -> DbResult<Vec<Promotion>> {
        self.promotions().list().await
    }

    async fn get_rate_settings(&self) -> DbResult<RateSettings> {
        self.settings().get_rate_settings().await
    }

    async fn set_rate_settings(&self, rates: &RateSettings) -> DbResult<()> {
        self.settings().set_rate_settings(rates).await
    }

    async fn record_sale(&self, sale: &Sale) -> DbResult<()> {
        self.sales().record_sale(sale).await
    }

    async fn adjust_stock(&self, product_id: &str, delta: i64) -> DbResult<()> {
        self.products().adjust_stock(product_id, delta).await
    }

    async fn record_bottle_event(
        &self,
        kind: BottleEventKind,
        quantity: u32,
        cost: Money,
    ) -> DbResult<i64> {
        self.bottles()
            .record_event(kind, quantity, cost, Local::now().naive_local())
            .await
    }

    async fn get_bottle_ledger(&self) -> DbResult<BottleLedger> {
        self.bottles().ledger().await
    }

    async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Product>> {
        self.products().low_stock(threshold).await
    }

    async fn archive_product(&self, product_id: &str) -> DbResult<()> {
        self.products().archive(product_id).await
    }

    async fn restore_product(&self, product_id: &str) -> DbResult<Product> {
        let products = self.products();
        products.restore(product_id).await?;
        products
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))
    }

    async fn set_promotion_active(&self, promotion_id: &str, active: bool) -> DbResult<Promotion> {
        let promotions = self.promotions();
        promotions.set_active(promotion_id, active).await?;
        promotions
            .get_by_id(promotion_id)
            .await?
            .ok_or_else(|| DbError::not_found("Promotion", promotion_id))
    }

    async fn get_sale(&self, sale_id: &str) -> DbResult<Option<Sale>> {
        self.sales().get_by_id(sale_id).await
    }

    async fn list_sales(&self, limit: u32, user_id: Option<&str>) -> DbResult<Vec<Sale>> {
        self.sales().list_recent(limit, user_id).await
    }

    async fn daily_summary(&self, date: NaiveDate) -> DbResult<DailySummary> {
        let sales = self.sales().list_for_day(date).await?;
        let bottles_in_hand = self.bottles().total_in_hand().await?;
        Ok(DailySummary::tally(date, &sales, bottles_in_hand))
    }
}
