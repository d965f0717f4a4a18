//! # Checkout / Payment Reconciler
//!
//! Collects split payments against the grand total and turns a paid cart
//! into an immutable [`Sale`].
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Empty ──begin(cart)──► PaymentEntry ──authorize ok──► Finalized       │
//! │     ▲                      │    ▲                                       │
//! │     │                      │    └── add/remove row, method, amount      │
//! │     │                      │                                            │
//! │     └──────── cancel ──────┘   (no side effects)                        │
//! │                                                                         │
//! │   authorize fails (balance_due > 1) ──► stays in PaymentEntry           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Payment Sufficiency
//! ```text
//! total_paid  = Σ row.amount          (blank row = 0)
//! balance_due = max(0, grand_total − total_paid)
//! change_due  = max(0, total_paid − grand_total)
//! finalize    ⇔ balance_due ≤ PAYMENT_TOLERANCE (1 currency unit)
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentMethod, RateSettings, Sale, SaleLine, SalePayment};
use crate::validation::parse_amount;
use crate::{INVOICE_ID_FORMAT, PAYMENT_TOLERANCE};

// =============================================================================
// Payment Rows
// =============================================================================

/// One tender row being edited.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PaymentRow {
    pub method: PaymentMethod,
    /// `None` while the amount field is blank.
    pub amount: Option<Money>,
}

impl PaymentRow {
    /// A blank row with the given method.
    pub fn blank(method: PaymentMethod) -> Self {
        PaymentRow {
            method,
            amount: None,
        }
    }

    /// Amount counted towards the total (blank = 0).
    pub fn counted_amount(&self) -> Money {
        self.amount.unwrap_or(Money::ZERO)
    }
}

/// Where a checkout is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckoutStatus {
    PaymentEntry,
    Finalized,
    Cancelled,
}

/// Paid / balance / change for the current rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub grand_total: Money,
    pub total_paid: Money,
    pub balance_due: Money,
    pub change_due: Money,
    pub can_finalize: bool,
}

// =============================================================================
// Checkout
// =============================================================================

/// Payment entry for one cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkout {
    rows: Vec<PaymentRow>,
    status: CheckoutStatus,
}

impl Checkout {
    /// Opens payment entry for a non-empty cart with one blank Cash row.
    pub fn begin(cart: &Cart) -> CoreResult<Self> {
        if cart.is_empty() {
            return Err(ValidationError::Empty {
                field: "cart".to_string(),
            }
            .into());
        }

        debug!(lines = cart.line_count(), "Checkout opened");
        Ok(Checkout {
            rows: vec![PaymentRow::blank(PaymentMethod::Cash)],
            status: CheckoutStatus::PaymentEntry,
        })
    }

    /// Rebuilds a checkout in payment entry from saved rows.
    ///
    /// An empty row list gets the default blank Cash row.
    pub fn resume(rows: Vec<PaymentRow>) -> Self {
        let rows = if rows.is_empty() {
            vec![PaymentRow::blank(PaymentMethod::Cash)]
        } else {
            rows
        };
        Checkout {
            rows,
            status: CheckoutStatus::PaymentEntry,
        }
    }

    pub fn rows(&self) -> &[PaymentRow] {
        &self.rows
    }

    pub fn status(&self) -> CheckoutStatus {
        self.status
    }

    /// Appends a blank row. Returns its index.
    pub fn add_row(&mut self, method: PaymentMethod) -> CoreResult<usize> {
        self.ensure_open()?;
        self.rows.push(PaymentRow::blank(method));
        debug!(row = self.rows.len() - 1, method = %method, "Payment row added");
        Ok(self.rows.len() - 1)
    }

    /// Removes a row. The last remaining row is kept; in that case the call
    /// is ignored and `Ok(false)` is returned.
    pub fn remove_row(&mut self, row: usize) -> CoreResult<bool> {
        self.ensure_open()?;
        self.check_row(row)?;
        if self.rows.len() == 1 {
            warn!(row, "Ignored removal of the only payment row");
            return Ok(false);
        }
        self.rows.remove(row);
        debug!(row, "Payment row removed");
        Ok(true)
    }

    /// Changes a row's payment method.
    pub fn set_method(&mut self, row: usize, method: PaymentMethod) -> CoreResult<()> {
        self.ensure_open()?;
        self.row_mut(row)?.method = method;
        debug!(row, method = %method, "Payment method set");
        Ok(())
    }

    /// Sets a row's amount from operator text.
    ///
    /// Blank text clears the amount. Non-numeric or negative text is a
    /// validation error and leaves the row untouched.
    pub fn set_amount(&mut self, row: usize, text: &str) -> CoreResult<()> {
        self.ensure_open()?;
        self.check_row(row)?;

        let amount = if text.trim().is_empty() {
            None
        } else {
            Some(parse_amount("payment amount", text)?)
        };

        self.row_mut(row)?.amount = amount;
        debug!(row, amount = ?amount.map(|a| a.to_string()), "Payment amount set");
        Ok(())
    }

    /// Sum of all row amounts.
    pub fn total_paid(&self) -> Money {
        self.rows.iter().map(PaymentRow::counted_amount).sum()
    }

    /// Paid / balance / change against `grand_total`.
    pub fn summary(&self, grand_total: Money) -> PaymentSummary {
        let total_paid = self.total_paid();
        let balance_due = (grand_total - total_paid).clamp_non_negative();
        let change_due = (total_paid - grand_total).clamp_non_negative();

        PaymentSummary {
            grand_total,
            total_paid,
            balance_due,
            change_due,
            can_finalize: balance_due <= PAYMENT_TOLERANCE,
        }
    }

    /// Succeeds iff the balance due is within the payment tolerance.
    pub fn authorize(&self, grand_total: Money) -> CoreResult<PaymentSummary> {
        self.ensure_open()?;
        let summary = self.summary(grand_total);
        if !summary.can_finalize {
            return Err(CoreError::InsufficientPayment {
                balance_due: summary.balance_due,
            });
        }
        Ok(summary)
    }

    /// Marks the checkout finalized. Called once the sale is persisted.
    pub fn mark_finalized(&mut self) -> CoreResult<()> {
        self.ensure_open()?;
        self.status = CheckoutStatus::Finalized;
        Ok(())
    }

    /// Abandons payment entry without side effects.
    pub fn cancel(&mut self) -> CoreResult<()> {
        self.ensure_open()?;
        self.status = CheckoutStatus::Cancelled;
        debug!("Checkout cancelled");
        Ok(())
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.status != CheckoutStatus::PaymentEntry {
            return Err(CoreError::InvalidCheckoutState(format!(
                "checkout is {:?}",
                self.status
            )));
        }
        Ok(())
    }

    fn check_row(&self, row: usize) -> CoreResult<()> {
        if row >= self.rows.len() {
            return Err(CoreError::PaymentRowNotFound(row));
        }
        Ok(())
    }

    fn row_mut(&mut self, row: usize) -> CoreResult<&mut PaymentRow> {
        self.rows
            .get_mut(row)
            .ok_or(CoreError::PaymentRowNotFound(row))
    }
}

// =============================================================================
// Sale Construction
// =============================================================================

/// Invoice id for a sale finalized at `now`: `INV-YYYYMMDD-HHMMSS`.
pub fn invoice_id(now: NaiveDateTime) -> String {
    now.format(INVOICE_ID_FORMAT).to_string()
}

/// Builds the immutable sale record for a paid cart.
///
/// Re-runs [`Checkout::authorize`], so an underpaid cart never yields a
/// `Sale`. Only payment rows with an amount above zero are kept.
pub fn build_sale(
    cart: &Cart,
    rates: &RateSettings,
    checkout: &Checkout,
    user_id: &str,
    now: NaiveDateTime,
) -> CoreResult<Sale> {
    if cart.is_empty() {
        return Err(ValidationError::Empty {
            field: "cart".to_string(),
        }
        .into());
    }

    let totals = cart.totals(rates);
    let summary = checkout.authorize(totals.grand_total)?;

    let lines = cart
        .lines()
        .iter()
        .zip(&totals.lines)
        .map(|(line, priced)| SaleLine {
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            category: line.category.clone(),
            price: line.price,
            cost_price: line.cost_price,
            qty: line.qty,
            discount: priced.discount,
            is_deposit_enabled: line.is_deposit_enabled,
            deposit_mode: line.deposit_mode,
            line_deposit: priced.line_deposit,
        })
        .collect();

    let payments = checkout
        .rows()
        .iter()
        .filter(|row| row.counted_amount().is_positive())
        .map(|row| SalePayment {
            method: row.method,
            amount: row.counted_amount(),
        })
        .collect();

    Ok(Sale {
        id: invoice_id(now),
        user_id: user_id.to_string(),
        date: now,
        lines,
        subtotal: totals.subtotal,
        discount_total: totals.discount_total,
        service_charge_rate: totals.service_charge_rate,
        service_charge: totals.service_charge,
        tax_rate: totals.tax_rate,
        tax: totals.tax,
        deposit_total: totals.deposit_total,
        grand_total: totals.grand_total,
        bottles_exchanged: totals.bottles_exchanged,
        payments,
        change_due: summary.change_due,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
