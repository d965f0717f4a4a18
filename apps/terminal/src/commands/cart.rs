//! # Cart Commands
//!
//! Console commands for cart manipulation.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Lifecycle                                       │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│ Payment  │────►│ Finalized│       │
//! │  │  Cart    │     │          │     │  Entry   │     │   Sale   │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │                 │                              │
//! │                   add / qty         finalize                           │
//! │                   inc / dec         (sale.rs)                          │
//! │                   rm / deposit                                          │
//! │                   promo                                                 │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                   clear ───────────────────────────►                   │
//! │                                                      (back to empty)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every command returns the whole cart with freshly computed totals.

use std::fmt::Write as _;

use barpos_core::{Cart, CartTotals, DepositMode, LineId};
use barpos_db::PersistenceGateway;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use super::product::resolve_product;
use crate::error::TerminalResult;
use crate::state::{ConfigState, Session};

/// One cart line as shown to the operator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub line_id: u32,
    pub name: String,
    pub qty: u32,
    pub unit_price: String,
    pub line_raw: String,
    pub discount: String,
    pub line_net: String,
    /// `None` for lines without a bottle deposit.
    pub deposit_mode: Option<DepositMode>,
    pub line_deposit: String,
    pub promotion: Option<String>,
    pub promo_disabled: bool,
}

/// Cart response including lines and totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub lines: Vec<CartLineView>,
    pub subtotal: String,
    pub discount_total: String,
    pub service_charge_rate: String,
    pub service_charge: String,
    pub tax_rate: String,
    pub tax: String,
    pub deposit_total: String,
    pub grand_total: String,
    pub bottles_exchanged: u32,
    /// Payment entry is open and the cart cannot be edited.
    pub locked: bool,
}

impl CartResponse {
    pub fn build(cart: &Cart, totals: &CartTotals, locked: bool, config: &ConfigState) -> Self {
        let money = |m| config.format_currency(m);

        let lines = cart
            .lines()
            .iter()
            .zip(&totals.lines)
            .map(|(line, priced)| CartLineView {
                line_id: line.line_id.0,
                name: line.name.clone(),
                qty: line.qty,
                unit_price: money(line.price),
                line_raw: money(priced.line_raw),
                discount: money(priced.discount),
                line_net: money(priced.line_net),
                deposit_mode: line.is_deposit_enabled.then_some(line.deposit_mode),
                line_deposit: money(priced.line_deposit),
                promotion: line.applied_promotion.as_ref().map(|p| p.name.clone()),
                promo_disabled: line.promo_disabled,
            })
            .collect();

        CartResponse {
            lines,
            subtotal: money(totals.subtotal),
            discount_total: money(totals.discount_total),
            service_charge_rate: totals.service_charge_rate.to_string(),
            service_charge: money(totals.service_charge),
            tax_rate: totals.tax_rate.to_string(),
            tax: money(totals.tax),
            deposit_total: money(totals.deposit_total),
            grand_total: money(totals.grand_total),
            bottles_exchanged: totals.bottles_exchanged,
            locked,
        }
    }

    /// Plain-text cart display.
    ///
    /// ```text
    ///   #1  Lion Lager 625ml        x2     1300.00
    ///       Happy Hour Beers              -130.00
    ///       deposit CHARGE                +100.00
    /// ```
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.lines.is_empty() {
            out.push_str("  (cart is empty)\n");
        }

        for line in &self.lines {
            let _ = writeln!(
                out,
                "  #{:<3} {:<28} x{:<4} {:>14}",
                line.line_id, line.name, line.qty, line.line_raw
            );
            if let Some(promotion) = &line.promotion {
                if line.promo_disabled {
                    let _ = writeln!(out, "       {} (off)", promotion);
                } else {
                    let _ = writeln!(out, "       {:<35} -{:>13}", promotion, line.discount);
                }
            }
            match line.deposit_mode {
                Some(DepositMode::Charge) => {
                    let _ = writeln!(
                        out,
                        "       {:<35} +{:>13}",
                        "deposit CHARGE", line.line_deposit
                    );
                }
                Some(DepositMode::Exchange) => {
                    let _ = writeln!(out, "       deposit EXCHANGE ({} bottles)", line.qty);
                }
                None => {}
            }
        }

        let _ = writeln!(out, "  {}", "-".repeat(56));
        let _ = writeln!(out, "  {:<40} {:>14}", "Subtotal", self.subtotal);
        let _ = writeln!(out, "  {:<40} {:>14}", "Discount", format!("-{}", self.discount_total));
        let _ = writeln!(
            out,
            "  {:<40} {:>14}",
            format!("Service charge ({})", self.service_charge_rate),
            self.service_charge
        );
        let _ = writeln!(out, "  {:<40} {:>14}", format!("Tax ({})", self.tax_rate), self.tax);
        let _ = writeln!(out, "  {:<40} {:>14}", "Deposits", self.deposit_total);
        let _ = writeln!(out, "  {:<40} {:>14}", "TOTAL", self.grand_total);
        if self.bottles_exchanged > 0 {
            let _ = writeln!(out, "  Bottles exchanged: {}", self.bottles_exchanged);
        }
        if self.locked {
            out.push_str("  [payment entry open: cancel to edit the cart]\n");
        }
        out
    }
}

fn respond<G: PersistenceGateway>(session: &Session<G>, config: &ConfigState) -> CartResponse {
    CartResponse::build(
        session.cart(),
        &session.totals(),
        session.checkout().is_some(),
        config,
    )
}

/// Gets the current cart contents.
pub fn get_cart<G: PersistenceGateway>(session: &Session<G>, config: &ConfigState) -> CartResponse {
    debug!("get_cart command");
    respond(session, config)
}

/// Adds one unit of a product.
///
/// ## Arguments
/// * `product_ref` - Product id, or its number in the `products` listing
/// * `today` - Local date for promotion matching
pub fn add_to_cart<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
    product_ref: &str,
    today: NaiveDate,
) -> TerminalResult<CartResponse> {
    debug!(product_ref = %product_ref, "add_to_cart command");

    let product_id = resolve_product(session.catalog(), product_ref)?.id.clone();
    session.add_product(&product_id, today)?;
    Ok(respond(session, config))
}

/// Sets a line's quantity (floored at 1).
pub fn update_cart_line<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
    line_id: u32,
    qty: u32,
) -> TerminalResult<CartResponse> {
    debug!(line_id, qty, "update_cart_line command");
    session.update_qty(LineId(line_id), qty)?;
    Ok(respond(session, config))
}

pub fn increment_line<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
    line_id: u32,
) -> TerminalResult<CartResponse> {
    debug!(line_id, "increment_line command");
    session.increment(LineId(line_id))?;
    Ok(respond(session, config))
}

pub fn decrement_line<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
    line_id: u32,
) -> TerminalResult<CartResponse> {
    debug!(line_id, "decrement_line command");
    session.decrement(LineId(line_id))?;
    Ok(respond(session, config))
}

pub fn remove_from_cart<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
    line_id: u32,
) -> TerminalResult<CartResponse> {
    debug!(line_id, "remove_from_cart command");
    session.remove_line(LineId(line_id))?;
    Ok(respond(session, config))
}

/// Switches a deposit line between CHARGE and EXCHANGE.
pub fn toggle_deposit<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
    line_id: u32,
) -> TerminalResult<CartResponse> {
    debug!(line_id, "toggle_deposit command");
    session.toggle_deposit_mode(LineId(line_id))?;
    Ok(respond(session, config))
}

/// Turns a line's promotion off or back on.
pub fn toggle_promo<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
    line_id: u32,
) -> TerminalResult<CartResponse> {
    debug!(line_id, "toggle_promo command");
    session.toggle_promo_for_line(LineId(line_id))?;
    Ok(respond(session, config))
}

/// Empties the cart.
pub fn clear_cart<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
) -> TerminalResult<CartResponse> {
    debug!("clear_cart command");
    session.clear_cart()?;
    Ok(respond(session, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::{deposit_beer, signed_in, today};

    #[tokio::test]
    async fn test_add_by_menu_number_and_render() {
        let config = ConfigState::default();
        let mut session = signed_in(vec![deposit_beer("beer", 500, 50)]).await;

        let cart = add_to_cart(&mut session, &config, "1", today()).unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].deposit_mode, Some(DepositMode::Charge));
        assert_eq!(cart.deposit_total, "LKR 50.00");

        let cart = toggle_deposit(&mut session, &config, cart.lines[0].line_id).unwrap();
        assert_eq!(cart.deposit_total, "LKR 0.00");
        assert_eq!(cart.bottles_exchanged, 1);
        assert!(cart.render().contains("deposit EXCHANGE (1 bottles)"));
    }

    #[tokio::test]
    async fn test_unknown_line_is_not_found() {
        let config = ConfigState::default();
        let mut session = signed_in(vec![deposit_beer("beer", 500, 50)]).await;

        let err = increment_line(&mut session, &config, 99).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_empty_cart_render() {
        let config = ConfigState::default();
        let session = signed_in(vec![]).await;
        let text = get_cart(&session, &config).render();
        assert!(text.contains("(cart is empty)"));
        assert!(text.contains("Service charge (10%)"));
    }
}
