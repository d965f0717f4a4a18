//! # Domain Types
//!
//! Core domain types used throughout BarPOS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │   Promotion     │   │  RateSettings   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id, name       │   │  PERCENTAGE or  │   │  service 10%    │       │
//! │  │  category       │   │  FIXED value    │   │  tax      8%    │       │
//! │  │  price, cost    │   │  date window    │   └─────────────────┘       │
//! │  │  deposit flag   │   │  product ids    │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │   │   SaleLine      │   │  SalePayment    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  INV-YYYYMMDD-  │   │  frozen name,   │   │  Cash | Card |  │       │
//! │  │  HHMMSS         │   │  price, qty,    │   │  Online Transfer│       │
//! │  │  totals, change │   │  discount       │   │  amount > 0     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                              │
//! │  │  DepositMode    │   │  BottleLedger   │                              │
//! │  │  CHARGE         │   │  total_in_hand  │                              │
//! │  │  EXCHANGE       │   │  history        │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::{Money, Percent};
use crate::{DEFAULT_SERVICE_CHARGE_RATE, DEFAULT_TAX_RATE, KITCHEN_CATEGORY};

// =============================================================================
// Product
// =============================================================================

/// A product on the bar's menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique, stable identifier.
    pub id: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Menu category ("Beer", "Spirits", "Kitchen", ...).
    pub category: String,

    /// Unit sell price.
    pub price: Money,

    /// Unit cost (for profit reporting).
    pub cost_price: Money,

    /// Current stock level. Can go negative, see the stock race note on
    /// `record_sale`.
    pub stock: i64,

    /// Whether a returnable bottle deposit applies.
    pub is_deposit_enabled: bool,

    /// Deposit per unit, meaningful only when `is_deposit_enabled`.
    pub deposit_amount: Money,

    /// Archived (soft delete). Archived products stay readable for
    /// historical sales but are never listed for sale.
    pub is_deleted: bool,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Kitchen items are prepared to order and not stock-tracked.
    #[inline]
    pub fn is_stock_tracked(&self) -> bool {
        is_stock_tracked_category(&self.category)
    }
}

/// Returns false for the kitchen category, whose stock is never decremented.
#[inline]
pub fn is_stock_tracked_category(category: &str) -> bool {
    category != KITCHEN_CATEGORY
}

// =============================================================================
// Promotion
// =============================================================================

/// How a promotion's value is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromotionType {
    /// `value` percent off the unit price.
    Percentage,
    /// `value` currency units off each unit.
    Fixed,
}

impl PromotionType {
    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PromotionType::Percentage => "PERCENTAGE",
            PromotionType::Fixed => "FIXED",
        }
    }
}

impl FromStr for PromotionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PERCENTAGE" => Ok(PromotionType::Percentage),
            "FIXED" => Ok(PromotionType::Fixed),
            _ => Err(ValidationError::NotAllowed {
                field: "promotion type".to_string(),
                allowed: vec!["PERCENTAGE".to_string(), "FIXED".to_string()],
            }),
        }
    }
}

/// A time-boxed discount on a set of products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promotion {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub promotion_type: PromotionType,
    /// Percent for PERCENTAGE, currency units for FIXED. Not capped at 100.
    pub value: Decimal,
    pub start_date: NaiveDate,
    /// `None` means open-ended.
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    /// Product ids the promotion applies to.
    pub selected_items: Vec<String>,
}

// =============================================================================
// Deposit Mode
// =============================================================================

/// How a deposit-enabled line handles its bottle.
///
/// ```text
/// CHARGE   : customer pays deposit_amount × qty
/// EXCHANGE : customer hands in empties, pays no deposit,
///            qty bottles go into the empty-bottle ledger at checkout
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepositMode {
    #[default]
    Charge,
    Exchange,
}

impl DepositMode {
    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DepositMode::Charge => "CHARGE",
            DepositMode::Exchange => "EXCHANGE",
        }
    }

    /// CHARGE ↔ EXCHANGE.
    pub fn toggled(self) -> Self {
        match self {
            DepositMode::Charge => DepositMode::Exchange,
            DepositMode::Exchange => DepositMode::Charge,
        }
    }
}

impl FromStr for DepositMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CHARGE" => Ok(DepositMode::Charge),
            "EXCHANGE" => Ok(DepositMode::Exchange),
            _ => Err(ValidationError::NotAllowed {
                field: "deposit mode".to_string(),
                allowed: vec!["CHARGE".to_string(), "EXCHANGE".to_string()],
            }),
        }
    }
}

// =============================================================================
// Rate Settings
// =============================================================================

/// Service charge and tax percentages applied to the discounted net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSettings {
    pub service_charge_rate: Percent,
    pub tax_rate: Percent,
}

impl RateSettings {
    pub fn new(service_charge_rate: Percent, tax_rate: Percent) -> Self {
        Self {
            service_charge_rate,
            tax_rate,
        }
    }

    /// Both rates at zero.
    pub fn zero() -> Self {
        Self::new(Percent::zero(), Percent::zero())
    }
}

impl Default for RateSettings {
    /// 10% service charge, 8% tax.
    fn default() -> Self {
        Self::new(
            Percent::from_whole(DEFAULT_SERVICE_CHARGE_RATE),
            Percent::from_whole(DEFAULT_TAX_RATE),
        )
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// The fixed set of tender types accepted at the register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Physical cash payment.
    #[default]
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// Bank or wallet transfer.
    #[serde(rename = "Online Transfer")]
    OnlineTransfer,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::OnlineTransfer,
    ];

    /// Display and stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::OnlineTransfer => "Online Transfer",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses operator input. Case-insensitive; `online`, `transfer` and
/// `online-transfer` all select [`PaymentMethod::OnlineTransfer`].
impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "online transfer" | "online" | "transfer" => Ok(PaymentMethod::OnlineTransfer),
            _ => Err(ValidationError::NotAllowed {
                field: "payment method".to_string(),
                allowed: PaymentMethod::ALL
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A finalized line item. Every field is frozen at checkout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: String,
    pub name: String,
    pub category: String,
    /// Unit price snapshot.
    pub price: Money,
    /// Unit cost snapshot.
    pub cost_price: Money,
    pub qty: u32,
    /// Discount applied to the whole line.
    pub discount: Money,
    pub is_deposit_enabled: bool,
    pub deposit_mode: DepositMode,
    /// Deposit charged for the whole line (zero for EXCHANGE).
    pub line_deposit: Money,
}

impl SaleLine {
    /// `price × qty`, before discount.
    pub fn line_raw(&self) -> Money {
        self.price * self.qty
    }
}

/// One tender row of a finalized sale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalePayment {
    pub method: PaymentMethod,
    pub amount: Money,
}

/// A finalized sale. Written exactly once, never mutated afterwards.
///
/// `grand_total = (subtotal − discount_total) + service_charge + tax + deposit_total`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    /// `INV-YYYYMMDD-HHMMSS`.
    pub id: String,
    /// Cashier who rang it up.
    pub user_id: String,
    /// Local wall-clock time of finalization.
    pub date: NaiveDateTime,
    pub lines: Vec<SaleLine>,
    pub subtotal: Money,
    pub discount_total: Money,
    pub service_charge_rate: Percent,
    pub service_charge: Money,
    pub tax_rate: Percent,
    pub tax: Money,
    pub deposit_total: Money,
    pub grand_total: Money,
    pub bottles_exchanged: u32,
    /// Only rows with amount > 0.
    pub payments: Vec<SalePayment>,
    pub change_due: Money,
}

impl Sale {
    /// Sum of all payment rows.
    pub fn total_paid(&self) -> Money {
        self.payments.iter().map(|p| p.amount).sum()
    }

    /// `date` as stored and printed (`YYYY-MM-DD HH:MM:SS`).
    pub fn date_string(&self) -> String {
        self.date.format(crate::SALE_DATE_FORMAT).to_string()
    }
}

// =============================================================================
// Daily Summary
// =============================================================================

/// One business day's takings, as shown on the `today` report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub sale_count: u32,
    /// Before discounts.
    pub subtotal: Money,
    pub discount_total: Money,
    /// Deposits charged: a liability, not revenue.
    pub deposit_total: Money,
    pub grand_total: Money,
    pub bottles_in_hand: i64,
}

impl DailySummary {
    /// Totals over the sales in `sales` dated on `date`; others are skipped.
    pub fn tally<'a>(
        date: NaiveDate,
        sales: impl IntoIterator<Item = &'a Sale>,
        bottles_in_hand: i64,
    ) -> Self {
        let mut summary = DailySummary {
            date,
            sale_count: 0,
            subtotal: Money::ZERO,
            discount_total: Money::ZERO,
            deposit_total: Money::ZERO,
            grand_total: Money::ZERO,
            bottles_in_hand,
        };

        for sale in sales.into_iter().filter(|s| s.date.date() == date) {
            summary.sale_count += 1;
            summary.subtotal += sale.subtotal;
            summary.discount_total += sale.discount_total;
            summary.deposit_total += sale.deposit_total;
            summary.grand_total += sale.grand_total;
        }
        summary
    }

    /// Product revenue: subtotal less discounts, no deposits or charges.
    pub fn net_sales(&self) -> Money {
        self.subtotal - self.discount_total
    }
}

// =============================================================================
// Empty Bottle Ledger
// =============================================================================

/// Kinds of empty-bottle movements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BottleEventKind {
    /// Bought empties (with cost).
    Purchase,
    /// Taken in from customers at checkout.
    Exchange,
    /// Sent back to the supplier.
    ReturnToSupplier,
    /// Written off / given out.
    Out,
}

impl BottleEventKind {
    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BottleEventKind::Purchase => "PURCHASE",
            BottleEventKind::Exchange => "EXCHANGE",
            BottleEventKind::ReturnToSupplier => "RETURN_TO_SUPPLIER",
            BottleEventKind::Out => "OUT",
        }
    }

    /// PURCHASE and EXCHANGE add to the bottles in hand.
    pub fn is_inbound(&self) -> bool {
        matches!(self, BottleEventKind::Purchase | BottleEventKind::Exchange)
    }

    /// Change to `total_in_hand` for `qty` bottles.
    pub fn signed_quantity(&self, qty: u32) -> i64 {
        if self.is_inbound() {
            i64::from(qty)
        } else {
            -i64::from(qty)
        }
    }
}

impl FromStr for BottleEventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "PURCHASE" => Ok(BottleEventKind::Purchase),
            "EXCHANGE" => Ok(BottleEventKind::Exchange),
            "RETURN_TO_SUPPLIER" | "RETURN" => Ok(BottleEventKind::ReturnToSupplier),
            "OUT" => Ok(BottleEventKind::Out),
            _ => Err(ValidationError::NotAllowed {
                field: "bottle event".to_string(),
                allowed: vec![
                    "PURCHASE".to_string(),
                    "EXCHANGE".to_string(),
                    "RETURN_TO_SUPPLIER".to_string(),
                    "OUT".to_string(),
                ],
            }),
        }
    }
}

/// One row of the append-only bottle history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleEvent {
    pub id: i64,
    pub kind: BottleEventKind,
    pub quantity: u32,
    /// Non-zero only for PURCHASE.
    pub cost: Money,
    pub date: NaiveDateTime,
}

/// Bottles in hand plus history, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BottleLedger {
    pub total_in_hand: i64,
    pub history: Vec<BottleEvent>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_settings_default() {
        let rates = RateSettings::default();
        assert_eq!(rates.service_charge_rate, Percent::from_whole(10));
        assert_eq!(rates.tax_rate, Percent::from_whole(8));
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("cash".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!("CARD".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert_eq!(
            "Online Transfer".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::OnlineTransfer
        );
        assert_eq!(
            "online-transfer".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::OnlineTransfer
        );

        let err = "cheque".parse::<PaymentMethod>().unwrap_err();
        assert!(matches!(err, ValidationError::NotAllowed { .. }));
    }

    #[test]
    fn test_payment_method_serde_name() {
        let json = serde_json::to_string(&PaymentMethod::OnlineTransfer).unwrap();
        assert_eq!(json, "\"Online Transfer\"");
    }

    #[test]
    fn test_deposit_mode_toggle() {
        assert_eq!(DepositMode::default(), DepositMode::Charge);
        assert_eq!(DepositMode::Charge.toggled(), DepositMode::Exchange);
        assert_eq!(DepositMode::Exchange.toggled(), DepositMode::Charge);
    }

    #[test]
    fn test_bottle_event_direction() {
        assert_eq!(BottleEventKind::Purchase.signed_quantity(5), 5);
        assert_eq!(BottleEventKind::Exchange.signed_quantity(3), 3);
        assert_eq!(BottleEventKind::ReturnToSupplier.signed_quantity(4), -4);
        assert_eq!(BottleEventKind::Out.signed_quantity(1), -1);
        assert_eq!(
            "return".parse::<BottleEventKind>().unwrap(),
            BottleEventKind::ReturnToSupplier
        );
    }

    fn sale_at(id: &str, date: NaiveDateTime, subtotal: i64, deposit: i64) -> Sale {
        Sale {
            id: id.to_string(),
            user_id: "nimal".to_string(),
            date,
            lines: Vec::new(),
            subtotal: Money::from_major(subtotal),
            discount_total: Money::from_major(subtotal / 10),
            service_charge_rate: Percent::from_whole(10),
            service_charge: Money::ZERO,
            tax_rate: Percent::from_whole(8),
            tax: Money::ZERO,
            deposit_total: Money::from_major(deposit),
            grand_total: Money::from_major(subtotal + deposit),
            bottles_exchanged: 0,
            payments: Vec::new(),
            change_due: Money::ZERO,
        }
    }

    #[test]
    fn test_daily_summary_counts_only_that_day() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let at = |d: NaiveDate, h| d.and_hms_opt(h, 0, 0).unwrap();
        let sales = vec![
            sale_at("INV-1", at(day, 0), 1000, 0),
            sale_at("INV-2", at(day, 23), 2000, 300),
            sale_at("INV-3", at(day.succ_opt().unwrap(), 0), 5000, 0),
        ];

        let summary = DailySummary::tally(day, &sales, 12);
        assert_eq!(summary.sale_count, 2);
        assert_eq!(summary.subtotal, Money::from_major(3000));
        assert_eq!(summary.net_sales(), Money::from_major(2700));
        assert_eq!(summary.deposit_total, Money::from_major(300));
        assert_eq!(summary.grand_total, Money::from_major(3300));
        assert_eq!(summary.bottles_in_hand, 12);

        let quiet = DailySummary::tally(day.pred_opt().unwrap(), &sales, 0);
        assert_eq!(quiet.sale_count, 0);
        assert_eq!(quiet.grand_total, Money::ZERO);
    }

    #[test]
    fn test_kitchen_is_not_stock_tracked() {
        assert!(!is_stock_tracked_category("Kitchen"));
        assert!(is_stock_tracked_category("Beer"));
    }
}
