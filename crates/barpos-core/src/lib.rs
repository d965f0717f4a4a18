//! # barpos-core: Pure Business Logic for BarPOS
//!
//! This crate is the **heart** of BarPOS. It contains the checkout engine
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        BarPOS Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Operator Console (apps/terminal)                │   │
//! │  │    add / qty / deposit / promo ──► checkout ──► pay ──► finalize│   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ Session controller                     │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ barpos-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   cart    │  │  pricing  │  │ checkout  │  │ promotion │  │   │
//! │  │   │  CartLine │  │ CartTotals│  │ Payments  │  │  matching │  │   │
//! │  │   │  LineId   │  │ breakdown │  │ Sale      │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 barpos-db (Persistence Gateway)                 │   │
//! │  │        SQLite: catalogue, settings, sales, bottle ledger        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Promotion, Sale, BottleLedger, etc.)
//! - [`money`] - Exact decimal Money and Percent
//! - [`promotion`] - Which promotion a product picks up
//! - [`pricing`] - Totals breakdown for a cart
//! - [`cart`] - Cart lines and their mutations
//! - [`checkout`] - Split payments, sufficiency, Sale construction
//! - [`session`] - Inactivity timer
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use barpos_core::{Cart, Checkout, Money, RateSettings};
//! # use barpos_core::Product;
//! # use chrono::{NaiveDate, Utc};
//! # let lager = Product {
//! #     id: "lager".into(), name: "Lager".into(), category: "Beer".into(),
//! #     price: Money::from_major(1000), cost_price: Money::from_major(600),
//! #     stock: 10, is_deposit_enabled: false, deposit_amount: Money::ZERO,
//! #     is_deleted: false, created_at: Utc::now(), updated_at: Utc::now(),
//! # };
//! let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
//!
//! let mut cart = Cart::new();
//! cart.add_item(&lager, &[], today);
//!
//! let totals = cart.totals(&RateSettings::default());
//! assert_eq!(totals.grand_total, Money::from_major(1180));
//!
//! let mut checkout = Checkout::begin(&cart).unwrap();
//! checkout.set_amount(0, "1179").unwrap();
//! assert!(checkout.authorize(totals.grand_total).is_ok());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod money;
pub mod pricing;
pub mod promotion;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use barpos_core::Money` instead of
// `use barpos_core::money::Money`

pub use cart::{Cart, CartLine, LineId};
pub use checkout::{build_sale, Checkout, CheckoutStatus, PaymentRow, PaymentSummary};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Percent};
pub use pricing::{compute_totals, CartTotals, LineBreakdown};
pub use session::InactivityTimer;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest balance due at which a sale may still be finalized.
///
/// ## Business Reason
/// Absorbs rounding when the customer pays a total shown to two decimals.
/// Exactly one currency unit.
pub const PAYMENT_TOLERANCE: Money = Money::new(rust_decimal::Decimal::ONE);

/// Default service charge percentage when none is stored.
pub const DEFAULT_SERVICE_CHARGE_RATE: i64 = 10;

/// Default tax percentage when none is stored.
pub const DEFAULT_TAX_RATE: i64 = 8;

/// Category whose products are prepared to order and never stock-tracked.
pub const KITCHEN_CATEGORY: &str = "Kitchen";

/// Inactivity period after which the cart is cleared and the cashier signed out.
pub const SESSION_TIMEOUT_SECS: u64 = 10 * 60;

/// Largest quantity a single cart line can hold.
pub const MAX_LINE_QTY: u32 = 9_999;

/// Products with stock below this are reported as low.
pub const LOW_STOCK_THRESHOLD: i64 = 20;

/// `chrono` format for invoice ids.
pub const INVOICE_ID_FORMAT: &str = "INV-%Y%m%d-%H%M%S";

/// `chrono` format for stored sale and ledger timestamps.
pub const SALE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
