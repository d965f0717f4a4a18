//! # Pricing Engine
//!
//! Turns cart lines plus rate settings into the payable breakdown.
//! Deterministic and side-effect free: the same lines and rates always give
//! the same totals.
//!
//! ## Order of Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Per line (unit price p, quantity q)                                    │
//! │    line_raw     = p × q                                                 │
//! │    discount     = PERCENTAGE: p × value/100 × q                         │
//! │                   FIXED:      value × q                                 │
//! │                   then min(discount, line_raw)                          │
//! │    line_net     = line_raw − discount                                   │
//! │    line_deposit = deposit × q   (deposit line in CHARGE mode, else 0)   │
//! │                                                                         │
//! │  Aggregates                                                             │
//! │    subtotal       = Σ line_raw                                          │
//! │    discount_total = Σ discount                                          │
//! │    net            = subtotal − discount_total                           │
//! │    service_charge = net × sc/100  ┐ both from the same net,             │
//! │    tax            = net × tax/100 ┘ never compounded                    │
//! │    deposit_total  = Σ line_deposit  (never discounted or taxed)         │
//! │    grand_total    = net + service_charge + tax + deposit_total          │
//! │    bottles_exchanged = Σ q over EXCHANGE deposit lines                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::cart::{CartLine, LineId};
use crate::money::{Money, Percent};
use crate::types::{DepositMode, RateSettings};

/// Computed amounts for one cart line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineBreakdown {
    pub line_id: LineId,
    pub line_raw: Money,
    pub discount: Money,
    pub line_net: Money,
    pub line_deposit: Money,
}

/// Full totals breakdown for a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartTotals {
    pub lines: Vec<LineBreakdown>,
    pub subtotal: Money,
    pub discount_total: Money,
    pub net: Money,
    pub service_charge_rate: Percent,
    pub service_charge: Money,
    pub tax_rate: Percent,
    pub tax: Money,
    pub deposit_total: Money,
    pub grand_total: Money,
    pub bottles_exchanged: u32,
}

impl CartTotals {
    /// Breakdown for a given line.
    pub fn line(&self, line_id: LineId) -> Option<&LineBreakdown> {
        self.lines.iter().find(|l| l.line_id == line_id)
    }
}

/// Prices a single line.
pub fn price_line(line: &CartLine) -> LineBreakdown {
    let line_raw = line.price * line.qty;
    let discount = line
        .effective_promotion()
        .map(|promo| promo.discount_for(line.price, line.qty))
        .unwrap_or(Money::ZERO);
    let line_deposit = if line.is_deposit_enabled && line.deposit_mode == DepositMode::Charge {
        line.deposit_amount * line.qty
    } else {
        Money::ZERO
    };

    LineBreakdown {
        line_id: line.line_id,
        line_raw,
        discount,
        line_net: line_raw - discount,
        line_deposit,
    }
}

/// Computes the totals breakdown for `lines` under `rates`.
///
/// Never fails. Quantities are kept ≥ 1 by the cart, so every input the
/// cart can produce has a well-defined result.
pub fn compute_totals(lines: &[CartLine], rates: &RateSettings) -> CartTotals {
    let breakdowns: Vec<LineBreakdown> = lines.iter().map(price_line).collect();

    let subtotal: Money = breakdowns.iter().map(|b| b.line_raw).sum();
    let discount_total: Money = breakdowns.iter().map(|b| b.discount).sum();
    let deposit_total: Money = breakdowns.iter().map(|b| b.line_deposit).sum();
    let bottles_exchanged = lines
        .iter()
        .filter(|l| l.is_exchange())
        .fold(0u32, |acc, l| acc.saturating_add(l.qty));

    let net = subtotal - discount_total;
    let service_charge = net.percent_of(rates.service_charge_rate);
    let tax = net.percent_of(rates.tax_rate);
    let grand_total = net + service_charge + tax + deposit_total;

    CartTotals {
        lines: breakdowns,
        subtotal,
        discount_total,
        net,
        service_charge_rate: rates.service_charge_rate,
        service_charge,
        tax_rate: rates.tax_rate,
        tax,
        deposit_total,
        grand_total,
        bottles_exchanged,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
