//! # Report Commands
//!
//! Sales history and the end-of-day figures.
//!
//! ```text
//!   sales [cashier]     latest sales, optionally one cashier's
//!   sale <invoice>      reprint a receipt
//!   today               today's takings
//! ```

use std::fmt::Write as _;

use barpos_core::{DailySummary, Sale};
use barpos_db::PersistenceGateway;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::commands::sale::ReceiptResponse;
use crate::error::{TerminalError, TerminalResult};
use crate::state::{ConfigState, Session};

/// How many sales `sales` lists.
const SALES_LIMIT: u32 = 20;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleSummaryView {
    pub id: String,
    pub date: String,
    pub cashier: String,
    pub grand_total: String,
    /// "Cash + Card"
    pub paid_by: String,
}

impl SaleSummaryView {
    fn new(sale: &Sale, config: &ConfigState) -> Self {
        SaleSummaryView {
            id: sale.id.clone(),
            date: sale.date_string(),
            cashier: sale.user_id.clone(),
            grand_total: config.format_currency(sale.grand_total),
            paid_by: sale
                .payments
                .iter()
                .map(|p| p.method.as_str())
                .collect::<Vec<_>>()
                .join(" + "),
        }
    }
}

pub fn render_sales(sales: &[SaleSummaryView]) -> String {
    if sales.is_empty() {
        return "  (no sales)\n".to_string();
    }

    let mut out = String::new();
    for s in sales {
        let _ = writeln!(
            out,
            "  {}  {}  {:<12} {:>14}  {}",
            s.id, s.date, s.cashier, s.grand_total, s.paid_by
        );
    }
    out
}

/// Latest sales, newest first.
pub async fn list_sales<G: PersistenceGateway>(
    session: &Session<G>,
    config: &ConfigState,
    cashier: Option<&str>,
) -> TerminalResult<Vec<SaleSummaryView>> {
    debug!(cashier = ?cashier, "list_sales command");

    let cashier = cashier.map(str::trim).filter(|c| !c.is_empty());
    let sales = session.recent_sales(SALES_LIMIT, cashier).await?;
    Ok(sales.iter().map(|s| SaleSummaryView::new(s, config)).collect())
}

/// Reprints a stored sale's receipt.
pub async fn show_sale<G: PersistenceGateway>(
    session: &Session<G>,
    config: &ConfigState,
    sale_id: &str,
) -> TerminalResult<ReceiptResponse> {
    debug!(sale_id = %sale_id, "show_sale command");

    let sale_id = sale_id.trim();
    if sale_id.is_empty() {
        return Err(TerminalError::validation("invoice number is required"));
    }
    let sale = session.sale(sale_id).await?;
    Ok(ReceiptResponse::from_sale(&sale, config))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummaryResponse {
    pub date: String,
    pub sale_count: u32,
    pub net_sales: String,
    pub discounts: String,
    pub deposits: String,
    pub grand_total: String,
    pub bottles_in_hand: i64,
}

impl DailySummaryResponse {
    fn build(summary: &DailySummary, config: &ConfigState) -> Self {
        DailySummaryResponse {
            date: summary.date.to_string(),
            sale_count: summary.sale_count,
            net_sales: config.format_currency(summary.net_sales()),
            discounts: config.format_currency(summary.discount_total),
            deposits: config.format_currency(summary.deposit_total),
            grand_total: config.format_currency(summary.grand_total),
            bottles_in_hand: summary.bottles_in_hand,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "  {}", self.date);
        let _ = writeln!(out, "  {:<18}{:>16}", "Sales", self.sale_count);
        let _ = writeln!(out, "  {:<18}{:>16}", "Net sales", self.net_sales);
        let _ = writeln!(out, "  {:<18}{:>16}", "Discounts", self.discounts);
        let _ = writeln!(out, "  {:<18}{:>16}", "Deposits", self.deposits);
        let _ = writeln!(out, "  {:<18}{:>16}", "Collected", self.grand_total);
        let _ = writeln!(out, "  {:<18}{:>16}", "Bottles in hand", self.bottles_in_hand);
        out
    }
}

/// Figures for the sales dated on `date`.
pub async fn daily_summary<G: PersistenceGateway>(
    session: &Session<G>,
    config: &ConfigState,
    date: NaiveDate,
) -> TerminalResult<DailySummaryResponse> {
    debug!(date = %date, "daily_summary command");
    let summary = session.daily_summary(date).await?;
    Ok(DailySummaryResponse::build(&summary, config))
}
