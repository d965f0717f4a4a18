//! # Sale Commands
//!
//! Payment entry and finalization.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  checkout            opens payment entry, one blank Cash row           │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  pay <method> [amt]  adds a row          amount <row> <amt|blank>       │
//! │  method <row> <m>    changes a row       unpay <row>                    │
//! │     │                                                                   │
//! │     │  every edit prints paid / balance / change                        │
//! │     ▼                                                                   │
//! │  finalize ──► balance ≤ 1? ──no──► [INSUFFICIENT_PAYMENT]               │
//! │                   │ yes                                                 │
//! │                   ▼                                                     │
//! │              record_sale ──fail──► [PERSISTENCE_ERROR], cart kept       │
//! │                   │ ok                                                  │
//! │                   ▼                                                     │
//! │              receipt printed, cart cleared                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Row numbers are 1-based on the console.

use std::fmt::Write as _;

use barpos_core::{DepositMode, PaymentMethod, PaymentSummary, Sale};
use barpos_db::PersistenceGateway;
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use crate::error::{TerminalError, TerminalResult};
use crate::state::{ConfigState, Session};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRowView {
    /// 1-based row number
    pub row: usize,
    pub method: PaymentMethod,
    /// `None` while blank
    pub amount: Option<String>,
}

/// Payment entry state after every edit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub rows: Vec<PaymentRowView>,
    pub grand_total: String,
    pub total_paid: String,
    pub balance_due: String,
    pub change_due: String,
    pub can_finalize: bool,
}

impl PaymentResponse {
    fn build<G: PersistenceGateway>(
        session: &Session<G>,
        summary: &PaymentSummary,
        config: &ConfigState,
    ) -> Self {
        let rows = session
            .payment_rows()
            .iter()
            .enumerate()
            .map(|(i, row)| PaymentRowView {
                row: i + 1,
                method: row.method,
                amount: row.amount.map(|a| config.format_currency(a)),
            })
            .collect();

        PaymentResponse {
            rows,
            grand_total: config.format_currency(summary.grand_total),
            total_paid: config.format_currency(summary.total_paid),
            balance_due: config.format_currency(summary.balance_due),
            change_due: config.format_currency(summary.change_due),
            can_finalize: summary.can_finalize,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            let _ = writeln!(
                out,
                "  [{}] {:<16} {:>14}",
                row.row,
                row.method.as_str(),
                row.amount.as_deref().unwrap_or("(blank)")
            );
        }
        let _ = writeln!(out, "  {}", "-".repeat(34));
        let _ = writeln!(out, "  {:<18} {:>14}", "Total", self.grand_total);
        let _ = writeln!(out, "  {:<18} {:>14}", "Paid", self.total_paid);
        let _ = writeln!(out, "  {:<18} {:>14}", "Balance due", self.balance_due);
        let _ = writeln!(out, "  {:<18} {:>14}", "Change", self.change_due);
        if self.can_finalize {
            out.push_str("  Ready to finalize\n");
        }
        out
    }
}

fn respond<G: PersistenceGateway>(
    session: &Session<G>,
    config: &ConfigState,
) -> TerminalResult<PaymentResponse> {
    let summary = session.payment_summary()?;
    Ok(PaymentResponse::build(session, &summary, config))
}

/// Console row number → row index.
fn row_index(row: usize) -> TerminalResult<usize> {
    row.checked_sub(1)
        .ok_or_else(|| TerminalError::validation("payment rows are numbered from 1"))
}

/// Opens payment entry for the current cart.
pub fn begin_checkout<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
) -> TerminalResult<PaymentResponse> {
    debug!("begin_checkout command");
    let summary = session.begin_checkout()?;
    Ok(PaymentResponse::build(session, &summary, config))
}

/// Adds a payment row, optionally with its amount.
///
/// If setting the amount fails the new row stays, blank.
pub fn add_payment<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
    method: &str,
    amount: Option<&str>,
) -> TerminalResult<PaymentResponse> {
    debug!(method = %method, amount = ?amount, "add_payment command");

    let method: PaymentMethod = method.parse()?;
    let row = session.add_payment_row(method)?;
    if let Some(amount) = amount {
        session.set_payment_amount(row, amount)?;
    }
    respond(session, config)
}

/// Sets a row's amount; blank text clears it.
pub fn set_payment_amount<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
    row: usize,
    amount: &str,
) -> TerminalResult<PaymentResponse> {
    debug!(row, amount = %amount, "set_payment_amount command");
    session.set_payment_amount(row_index(row)?, amount)?;
    respond(session, config)
}

pub fn set_payment_method<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
    row: usize,
    method: &str,
) -> TerminalResult<PaymentResponse> {
    debug!(row, method = %method, "set_payment_method command");
    let method: PaymentMethod = method.parse()?;
    session.set_payment_method(row_index(row)?, method)?;
    respond(session, config)
}

/// Removes a payment row. The last row is kept.
pub fn remove_payment<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
    row: usize,
) -> TerminalResult<PaymentResponse> {
    debug!(row, "remove_payment command");
    session.remove_payment_row(row_index(row)?)?;
    respond(session, config)
}

/// Shows the open payment entry.
pub fn get_payments<G: PersistenceGateway>(
    session: &Session<G>,
    config: &ConfigState,
) -> TerminalResult<PaymentResponse> {
    debug!("get_payments command");
    respond(session, config)
}

/// Leaves payment entry; the cart is unchanged.
pub fn cancel_checkout<G: PersistenceGateway>(session: &mut Session<G>) -> TerminalResult<()> {
    debug!("cancel_checkout command");
    session.cancel_checkout()
}

/// Finalizes the sale and returns the printed receipt.
pub async fn finalize_sale<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
    now: NaiveDateTime,
) -> TerminalResult<ReceiptResponse> {
    debug!("finalize_sale command");
    let sale = session.finalize(now).await?;
    Ok(ReceiptResponse::from_sale(&sale, config))
}

// =============================================================================
// Receipt
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptResponse {
    pub sale_id: String,
    pub change_due: String,
    /// Plain-text receipt
    pub text: String,
}

impl ReceiptResponse {
    pub fn from_sale(sale: &Sale, config: &ConfigState) -> Self {
        ReceiptResponse {
            sale_id: sale.id.clone(),
            change_due: config.format_currency(sale.change_due),
            text: render_receipt(sale, config),
        }
    }
}

const RECEIPT_WIDTH: usize = 44;

/// Plain-text receipt.
///
/// ```text
///             Harbour Tavern
/// Invoice: INV-20240615-210509
/// Date:    2024-06-15 21:05:09
/// Cashier: nimal
/// --------------------------------------------
/// Lion Lager 625ml
///   2 x 1000.00                        2000.00
///   Happy Hour Beers                   -200.00
/// --------------------------------------------
/// Subtotal                             2000.00
/// ...
/// ```
pub fn render_receipt(sale: &Sale, config: &ConfigState) -> String {
    let rule = "-".repeat(RECEIPT_WIDTH);
    let mut out = String::new();
    let row = |out: &mut String, label: &str, value: String| {
        let _ = writeln!(out, "{:<28}{:>16}", label, value);
    };

    let _ = writeln!(out, "{:^width$}", config.store_name, width = RECEIPT_WIDTH);
    let _ = writeln!(out, "Invoice: {}", sale.id);
    let _ = writeln!(out, "Date:    {}", sale.date_string());
    let _ = writeln!(out, "Cashier: {}", sale.user_id);
    let _ = writeln!(out, "{}", rule);

    for line in &sale.lines {
        let _ = writeln!(out, "{}", line.name);
        row(
            &mut out,
            &format!("  {} x {}", line.qty, line.price),
            line.line_raw().to_string(),
        );
        if line.discount.is_positive() {
            row(&mut out, "  discount", format!("-{}", line.discount));
        }
        if line.is_deposit_enabled {
            match line.deposit_mode {
                DepositMode::Charge => {
                    row(&mut out, "  bottle deposit", line.line_deposit.to_string())
                }
                DepositMode::Exchange => {
                    let _ = writeln!(out, "  bottles exchanged: {}", line.qty);
                }
            }
        }
    }

    let _ = writeln!(out, "{}", rule);
    row(&mut out, "Subtotal", sale.subtotal.to_string());
    if sale.discount_total.is_positive() {
        row(&mut out, "Discount", format!("-{}", sale.discount_total));
    }
    row(
        &mut out,
        &format!("Service charge ({})", sale.service_charge_rate),
        sale.service_charge.to_string(),
    );
    row(&mut out, &format!("Tax ({})", sale.tax_rate), sale.tax.to_string());
    if sale.deposit_total.is_positive() {
        row(&mut out, "Bottle deposits", sale.deposit_total.to_string());
    }
    let _ = writeln!(out, "{}", rule);
    row(&mut out, "TOTAL", config.format_currency(sale.grand_total));

    for payment in &sale.payments {
        row(&mut out, payment.method.as_str(), payment.amount.to_string());
    }
    row(&mut out, "Change", config.format_currency(sale.change_due));

    if sale.bottles_exchanged > 0 {
        let _ = writeln!(out, "Bottles exchanged: {}", sale.bottles_exchanged);
    }
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "{:^width$}", "Thank you!", width = RECEIPT_WIDTH);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart::{add_to_cart, toggle_deposit};
    use crate::error::ErrorCode;
    use crate::test_support::{at, deposit_beer, lager, signed_in, today};

    #[tokio::test]
    async fn test_split_payment_flow() {
        let config = ConfigState::default();
        let mut session = signed_in(vec![lager()]).await;
        add_to_cart(&mut session, &config, "lager", today()).unwrap();

        // 650 + 65 + 52 = 767
        let payments = begin_checkout(&mut session, &config).unwrap();
        assert_eq!(payments.grand_total, "LKR 767.00");
        assert_eq!(payments.rows.len(), 1);
        assert_eq!(payments.rows[0].amount, None);

        let payments = set_payment_amount(&mut session, &config, 1, "500").unwrap();
        assert_eq!(payments.balance_due, "LKR 267.00");
        assert!(!payments.can_finalize);

        let payments = add_payment(&mut session, &config, "card", Some("300")).unwrap();
        assert_eq!(payments.rows[1].method, PaymentMethod::Card);
        assert_eq!(payments.change_due, "LKR 33.00");
        assert!(payments.can_finalize);

        let receipt = finalize_sale(&mut session, &config, at(20, 30, 0)).await.unwrap();
        assert_eq!(receipt.sale_id, "INV-20240615-203000");
        assert_eq!(receipt.change_due, "LKR 33.00");
        assert!(receipt.text.contains("Cash"));
        assert!(receipt.text.contains("Card"));
        assert!(receipt.text.contains("Service charge (10%)"));
    }

    #[tokio::test]
    async fn test_bad_method_and_row_numbers() {
        let config = ConfigState::default();
        let mut session = signed_in(vec![lager()]).await;
        add_to_cart(&mut session, &config, "lager", today()).unwrap();
        begin_checkout(&mut session, &config).unwrap();

        let err = add_payment(&mut session, &config, "bitcoin", None).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        let err = set_payment_amount(&mut session, &config, 0, "10").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        let err = set_payment_amount(&mut session, &config, 5, "10").unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let payments = set_payment_method(&mut session, &config, 1, "online transfer").unwrap();
        assert_eq!(payments.rows[0].method, PaymentMethod::OnlineTransfer);
    }

    #[tokio::test]
    async fn test_payment_commands_need_open_checkout() {
        let config = ConfigState::default();
        let mut session = signed_in(vec![lager()]).await;
        let err = add_payment(&mut session, &config, "cash", None).unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);
        let err = cancel_checkout(&mut session).unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);
    }

    #[tokio::test]
    async fn test_receipt_shows_deposits_and_exchange() {
        let config = ConfigState::default();
        let mut session = signed_in(vec![deposit_beer("beer", 500, 50), lager()]).await;
        let cart = add_to_cart(&mut session, &config, "beer", today()).unwrap();
        toggle_deposit(&mut session, &config, cart.lines[0].line_id).unwrap();
        add_to_cart(&mut session, &config, "beer", today()).unwrap();

        begin_checkout(&mut session, &config).unwrap();
        set_payment_amount(&mut session, &config, 1, "2000").unwrap();
        let receipt = finalize_sale(&mut session, &config, at(21, 0, 0)).await.unwrap();

        assert!(receipt.text.contains("bottles exchanged: 1"));
        assert!(receipt.text.contains("bottle deposit"));
        assert!(receipt.text.contains("Bottles exchanged: 1"));
        assert!(receipt.text.contains("Invoice: INV-20240615-210000"));
    }
}
