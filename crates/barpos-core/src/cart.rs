//! # Cart Manager
//!
//! The in-memory list of lines for the order being rung up.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Operator Action          Cart Method               Line Change         │
//! │  ───────────────          ───────────               ───────────         │
//! │                                                                         │
//! │  Pick Product ───────────► add_item() ─────────► merge (+1) or push    │
//! │                                                                         │
//! │  Set Quantity ───────────► update_qty() ───────► 1 ≤ qty ≤ MAX_LINE_QTY │
//! │                                                                         │
//! │  + / - ──────────────────► increment/decrement ► qty ± 1, floor 1      │
//! │                                                                         │
//! │  Remove ─────────────────► remove_line() ──────► line + promo flag gone│
//! │                                                                         │
//! │  Bottle Swap ────────────► toggle_deposit_mode ► CHARGE ↔ EXCHANGE     │
//! │                                                                         │
//! │  Promo Off/On ───────────► toggle_promo_for_line ► flag flipped        │
//! │                                                                         │
//! │  Every change is followed by totals() ──► pricing::compute_totals      │
//! │  (nothing is cached, so totals cannot drift)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Merge Rule
//! - Deposit-enabled product: merges only into a CHARGE line of the same
//!   product. A line switched to EXCHANGE keeps its own quantity, and a new
//!   CHARGE line is opened next to it.
//! - Any other product: merges into the line of the same product.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{compute_totals, CartTotals};
use crate::promotion::find_active_promotion;
use crate::types::{DepositMode, Product, Promotion, RateSettings};
use crate::validation::validate_quantity;
use crate::MAX_LINE_QTY;

// =============================================================================
// Line Id
// =============================================================================

/// Per-cart line identifier, distinct from the product id.
///
/// The same product can sit on two lines when their deposit modes differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(pub u32);

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// A line in the cart.
///
/// ## Design Notes
/// Price, cost and deposit fields are copied from the product when the line
/// is created. A catalogue edit made while the order is open does not change
/// what this customer pays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub line_id: LineId,
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub price: Money,
    pub cost_price: Money,
    pub is_deposit_enabled: bool,
    pub deposit_amount: Money,
    /// Always ≥ 1.
    pub qty: u32,
    pub deposit_mode: DepositMode,
    /// Promotion matched when the line was created.
    pub applied_promotion: Option<Promotion>,
    /// Operator switched the promotion off for this line only.
    pub promo_disabled: bool,
}

impl CartLine {
    fn from_product(line_id: LineId, product: &Product, promotion: Option<&Promotion>) -> Self {
        CartLine {
            line_id,
            product_id: product.id.clone(),
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price,
            cost_price: product.cost_price,
            is_deposit_enabled: product.is_deposit_enabled,
            deposit_amount: product.deposit_amount,
            qty: 1,
            deposit_mode: DepositMode::Charge,
            applied_promotion: promotion.cloned(),
            promo_disabled: false,
        }
    }

    /// The promotion that prices this line, `None` when absent or switched off.
    pub fn effective_promotion(&self) -> Option<&Promotion> {
        if self.promo_disabled {
            None
        } else {
            self.applied_promotion.as_ref()
        }
    }

    /// Whether this line hands bottles in instead of paying a deposit.
    pub fn is_exchange(&self) -> bool {
        self.is_deposit_enabled && self.deposit_mode == DepositMode::Exchange
    }

    fn accepts_merge_of(&self, product: &Product) -> bool {
        if self.product_id != product.id {
            return false;
        }
        !product.is_deposit_enabled || self.deposit_mode == DepositMode::Charge
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The cart for one register session.
///
/// ## Invariants
/// - Every line has `qty ≥ 1`
/// - Line ids are unique and never reused within one cart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    next_line_id: u32,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart::default()
    }

    /// Lines in the order they were added.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Looks up a line.
    pub fn line(&self, line_id: LineId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.line_id == line_id)
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the number of lines in the cart.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the total quantity of all lines.
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.qty)).sum()
    }

    /// Adds one unit of `product`, merging into an existing line when the
    /// merge rule allows it.
    ///
    /// A new line picks up the first promotion in `promotions` that is
    /// active for the product on `today`. A merge into a line already at
    /// [`MAX_LINE_QTY`] leaves it there.
    pub fn add_item(
        &mut self,
        product: &Product,
        promotions: &[Promotion],
        today: NaiveDate,
    ) -> LineId {
        if let Some(line) = self.lines.iter_mut().find(|l| l.accepts_merge_of(product)) {
            if line.qty >= MAX_LINE_QTY {
                warn!(
                    line_id = %line.line_id,
                    product_id = %product.id,
                    "Cart line at quantity ceiling"
                );
                return line.line_id;
            }
            line.qty += 1;
            debug!(
                line_id = %line.line_id,
                product_id = %product.id,
                qty = line.qty,
                "Merged into cart line"
            );
            return line.line_id;
        }

        // Line numbers start at 1 on the console
        self.next_line_id += 1;
        let line_id = LineId(self.next_line_id);

        let promotion = find_active_promotion(promotions, &product.id, today);
        self.lines
            .push(CartLine::from_product(line_id, product, promotion));

        debug!(
            line_id = %line_id,
            product_id = %product.id,
            promotion = ?promotion.map(|p| p.id.as_str()),
            "Added cart line"
        );
        line_id
    }

    /// Sets a line's quantity, floored at 1.
    ///
    /// Quantities above [`MAX_LINE_QTY`] are rejected and leave the line
    /// unchanged.
    pub fn update_qty(&mut self, line_id: LineId, qty: u32) -> CoreResult<()> {
        let qty = validate_quantity(i64::from(qty.max(1)))?;
        let line = self.line_mut(line_id)?;
        line.qty = qty;
        debug!(line_id = %line_id, qty = line.qty, "Updated cart line quantity");
        Ok(())
    }

    /// Adds one unit to a line.
    pub fn increment(&mut self, line_id: LineId) -> CoreResult<()> {
        let qty = self.line_mut(line_id)?.qty;
        self.update_qty(line_id, qty.saturating_add(1))
    }

    /// Takes one unit off a line; a line at 1 stays at 1.
    pub fn decrement(&mut self, line_id: LineId) -> CoreResult<()> {
        let qty = self.line_mut(line_id)?.qty;
        self.update_qty(line_id, qty.saturating_sub(1))
    }

    /// Deletes a line. Its promotion-disable flag goes with it.
    pub fn remove_line(&mut self, line_id: LineId) -> CoreResult<CartLine> {
        let index = self
            .lines
            .iter()
            .position(|l| l.line_id == line_id)
            .ok_or(CoreError::LineNotFound(line_id.0))?;
        let removed = self.lines.remove(index);
        debug!(line_id = %line_id, product_id = %removed.product_id, "Removed cart line");
        Ok(removed)
    }

    /// Flips CHARGE ↔ EXCHANGE. Lines without a deposit are left alone.
    ///
    /// Returns the line's deposit mode after the call.
    pub fn toggle_deposit_mode(&mut self, line_id: LineId) -> CoreResult<DepositMode> {
        let line = self.line_mut(line_id)?;
        if line.is_deposit_enabled {
            line.deposit_mode = line.deposit_mode.toggled();
            debug!(line_id = %line_id, mode = line.deposit_mode.as_str(), "Toggled deposit mode");
        }
        Ok(line.deposit_mode)
    }

    /// Switches this line's promotion off or back on.
    ///
    /// The promotion stays attached; only its discount is suppressed.
    /// Returns the new disabled flag.
    pub fn toggle_promo_for_line(&mut self, line_id: LineId) -> CoreResult<bool> {
        let line = self.line_mut(line_id)?;
        line.promo_disabled = !line.promo_disabled;
        debug!(line_id = %line_id, disabled = line.promo_disabled, "Toggled line promotion");
        Ok(line.promo_disabled)
    }

    /// Clears all lines from the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
        debug!("Cleared cart");
    }

    /// Recomputes totals from the current lines.
    pub fn totals(&self, rates: &RateSettings) -> CartTotals {
        compute_totals(&self.lines, rates)
    }

    fn line_mut(&mut self, line_id: LineId) -> CoreResult<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|l| l.line_id == line_id)
            .ok_or(CoreError::LineNotFound(line_id.0))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
