//! # Bottle Commands
//!
//! Empty-bottle ledger: bottles in hand and manual movements.
//!
//! ```text
//!   bottles                      ledger summary + history
//!   bottle purchase <qty> <cost> bought empties      (+qty)
//!   bottle return <qty>          back to supplier    (-qty)
//!   bottle out <qty>             written off         (-qty)
//! ```
//!
//! EXCHANGE movements are only created by finalized sales.

use std::fmt::Write as _;

use barpos_core::validation::parse_amount;
use barpos_core::{BottleEventKind, BottleLedger, Money};
use barpos_db::PersistenceGateway;
use serde::Serialize;
use tracing::debug;

use crate::error::{TerminalError, TerminalResult};
use crate::state::{ConfigState, Session};

/// How many history rows the console shows.
const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BottleEventView {
    pub date: String,
    pub kind: BottleEventKind,
    pub quantity: u32,
    pub cost: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BottleLedgerResponse {
    pub total_in_hand: i64,
    /// Newest first
    pub history: Vec<BottleEventView>,
}

impl BottleLedgerResponse {
    fn build(ledger: &BottleLedger, config: &ConfigState) -> Self {
        BottleLedgerResponse {
            total_in_hand: ledger.total_in_hand,
            history: ledger
                .history
                .iter()
                .map(|event| BottleEventView {
                    date: event.date.format(barpos_core::SALE_DATE_FORMAT).to_string(),
                    kind: event.kind,
                    quantity: event.quantity,
                    cost: config.format_currency(event.cost),
                })
                .collect(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "  Bottles in hand: {}", self.total_in_hand);
        for event in self.history.iter().take(HISTORY_LIMIT) {
            let _ = write!(
                out,
                "  {}  {:<18} {:>5}",
                event.date,
                event.kind.as_str(),
                event.quantity
            );
            if event.kind == BottleEventKind::Purchase {
                let _ = write!(out, "  {}", event.cost);
            }
            out.push('\n');
        }
        if self.history.len() > HISTORY_LIMIT {
            let _ = writeln!(out, "  ... {} older", self.history.len() - HISTORY_LIMIT);
        }
        out
    }
}

/// Gets the bottle ledger.
pub async fn get_bottle_ledger<G: PersistenceGateway>(
    session: &Session<G>,
    config: &ConfigState,
) -> TerminalResult<BottleLedgerResponse> {
    debug!("get_bottle_ledger command");
    let ledger = session.bottle_ledger().await?;
    Ok(BottleLedgerResponse::build(&ledger, config))
}

/// Records a manual bottle movement.
///
/// ## Arguments
/// * `kind` - `purchase`, `return` or `out`
/// * `quantity` - positive bottle count
/// * `cost` - purchase cost; required for purchases, ignored otherwise
pub async fn record_bottle_event<G: PersistenceGateway>(
    session: &Session<G>,
    config: &ConfigState,
    kind: &str,
    quantity: &str,
    cost: Option<&str>,
) -> TerminalResult<BottleLedgerResponse> {
    debug!(kind = %kind, quantity = %quantity, cost = ?cost, "record_bottle_event command");

    let kind: BottleEventKind = kind.parse()?;
    if kind == BottleEventKind::Exchange {
        return Err(TerminalError::validation(
            "EXCHANGE is recorded by sales; use purchase, return or out",
        ));
    }

    let quantity: u32 = quantity
        .trim()
        .parse()
        .map_err(|_| TerminalError::validation(format!("'{}' is not a bottle count", quantity)))?;

    let cost = match (kind, cost) {
        (BottleEventKind::Purchase, Some(text)) => parse_amount("cost", text)?,
        (BottleEventKind::Purchase, None) => {
            return Err(TerminalError::validation("purchase cost is required"))
        }
        _ => Money::ZERO,
    };

    session.record_bottle_event(kind, quantity, cost).await?;
    get_bottle_ledger(session, config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::{lager, signed_in};

    #[tokio::test]
    async fn test_purchase_then_return() {
        let config = ConfigState::default();
        let session = signed_in(vec![lager()]).await;

        let ledger = record_bottle_event(&session, &config, "purchase", "24", Some("1200"))
            .await
            .unwrap();
        assert_eq!(ledger.total_in_hand, 24);
        assert_eq!(ledger.history[0].cost, "LKR 1200.00");

        let ledger = record_bottle_event(&session, &config, "return", "10", None)
            .await
            .unwrap();
        assert_eq!(ledger.total_in_hand, 14);
        assert_eq!(ledger.history[0].kind, BottleEventKind::ReturnToSupplier);
        assert!(ledger.render().contains("Bottles in hand: 14"));
    }

    #[tokio::test]
    async fn test_rejects_bad_movements() {
        let config = ConfigState::default();
        let session = signed_in(vec![lager()]).await;

        let cases = [
            ("exchange", "1", None),
            ("purchase", "5", None),
            ("purchase", "0", Some("10")),
            ("out", "-3", None),
            ("lost", "1", None),
        ];
        for (kind, qty, cost) in cases {
            let err = record_bottle_event(&session, &config, kind, qty, cost)
                .await
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::ValidationError, "{} {}", kind, qty);
        }

        let ledger = get_bottle_ledger(&session, &config).await.unwrap();
        assert!(ledger.history.is_empty());
    }
}
