//! # Bottle Repository
//!
//! Empty-bottle counter plus its append-only history.
//!
//! ## Ledger Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  one transaction                                                        │
//! │                                                                         │
//! │  INSERT INTO empty_bottles (type, quantity, cost, date)                 │
//! │  UPDATE empty_bottles_summary SET total_in_hand = total_in_hand ± qty   │
//! │                                                                         │
//! │  PURCHASE, EXCHANGE           → +qty                                    │
//! │  RETURN_TO_SUPPLIER, OUT      → -qty                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! The counter may go negative; nothing here blocks an OUT larger than the
//! bottles in hand.

use barpos_core::validation::{validate_bottle_quantity, validate_non_negative};
use barpos_core::{BottleEvent, BottleEventKind, BottleLedger, Money};
use chrono::NaiveDateTime;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::info;

use super::{
    decode_count, decode_enum, decode_local_datetime, decode_money, encode_local_datetime,
    encode_money,
};
use crate::error::{DbError, DbResult};

#[derive(Debug, FromRow)]
struct BottleEventRow {
    id: i64,
    #[sqlx(rename = "type")]
    kind: String,
    quantity: i64,
    cost: String,
    date: String,
}

impl TryFrom<BottleEventRow> for BottleEvent {
    type Error = DbError;

    fn try_from(row: BottleEventRow) -> DbResult<Self> {
        Ok(BottleEvent {
            id: row.id,
            kind: decode_enum("empty_bottles.type", &row.kind)?,
            quantity: decode_count("empty_bottles.quantity", row.quantity)?,
            cost: decode_money("empty_bottles.cost", &row.cost)?,
            date: decode_local_datetime("empty_bottles.date", &row.date)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BottleRepository {
    pool: SqlitePool,
}

impl BottleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BottleRepository { pool }
    }

    /// Current bottles in hand.
    pub async fn total_in_hand(&self) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        total_in_hand_on(&mut conn).await
    }

    /// Counter plus full history, newest first.
    pub async fn ledger(&self) -> DbResult<BottleLedger> {
        let total_in_hand = self.total_in_hand().await?;

        let rows: Vec<BottleEventRow> = sqlx::query_as(
            r#"
            SELECT id, type, quantity, cost, date
            FROM empty_bottles
            ORDER BY date DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let history = rows
            .into_iter()
            .map(BottleEvent::try_from)
            .collect::<DbResult<Vec<_>>>()?;

        Ok(BottleLedger {
            total_in_hand,
            history,
        })
    }

    /// Records a manual bottle movement.
    ///
    /// Only PURCHASE carries a cost; for the other kinds `cost` is stored
    /// as zero.
    ///
    /// ## Returns
    /// The new bottles-in-hand total.
    pub async fn record_event(
        &self,
        kind: BottleEventKind,
        quantity: u32,
        cost: Money,
        at: NaiveDateTime,
    ) -> DbResult<i64> {
        validate_bottle_quantity(quantity)?;
        validate_non_negative("bottle cost", cost)?;

        let cost = if kind == BottleEventKind::Purchase {
            cost
        } else {
            Money::ZERO
        };

        let mut tx = self.pool.begin().await?;
        apply_event(&mut tx, kind, quantity, cost, at).await?;
        let total = total_in_hand_on(&mut tx).await?;
        tx.commit().await?;

        info!(kind = kind.as_str(), quantity, total_in_hand = total, "Bottle movement recorded");
        Ok(total)
    }
}

/// Appends one history row and moves the counter, on the caller's
/// connection so sale recording can share its transaction.
pub(crate) async fn apply_event(
    conn: &mut SqliteConnection,
    kind: BottleEventKind,
    quantity: u32,
    cost: Money,
    at: NaiveDateTime,
) -> DbResult<()> {
    sqlx::query("INSERT INTO empty_bottles (type, quantity, cost, date) VALUES (?1, ?2, ?3, ?4)")
        .bind(kind.as_str())
        .bind(i64::from(quantity))
        .bind(encode_money(cost))
        .bind(encode_local_datetime(at))
        .execute(&mut *conn)
        .await?;

    sqlx::query("UPDATE empty_bottles_summary SET total_in_hand = total_in_hand + ?1 WHERE id = 1")
        .bind(kind.signed_quantity(quantity))
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn total_in_hand_on(conn: &mut SqliteConnection) -> DbResult<i64> {
    let total: Option<i64> =
        sqlx::query_scalar("SELECT total_in_hand FROM empty_bottles_summary WHERE id = 1")
            .fetch_optional(&mut *conn)
            .await?;
    Ok(total.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, test_db};

    #[tokio::test]
    async fn test_fresh_ledger_is_empty() {
        let db = test_db().await;
        let ledger = db.bottles().ledger().await.unwrap();
        assert_eq!(ledger, BottleLedger::default());
    }

    #[tokio::test]
    async fn test_purchase_return_out_move_counter() {
        let db = test_db().await;
        let repo = db.bottles();

        let total = repo
            .record_event(BottleEventKind::Purchase, 24, Money::from_major(1200), at(9, 0, 0))
            .await
            .unwrap();
        assert_eq!(total, 24);

        let cost = Money::from_major(50);
        repo.record_event(BottleEventKind::ReturnToSupplier, 10, cost, at(10, 0, 0))
            .await
            .unwrap();
        let total = repo
            .record_event(BottleEventKind::Out, 20, Money::ZERO, at(11, 0, 0))
            .await
            .unwrap();
        assert_eq!(total, -6);

        let ledger = repo.ledger().await.unwrap();
        assert_eq!(ledger.total_in_hand, -6);
        let kinds: Vec<BottleEventKind> = ledger.history.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BottleEventKind::Out,
                BottleEventKind::ReturnToSupplier,
                BottleEventKind::Purchase
            ]
        );
        assert_eq!(ledger.history[1].cost, Money::ZERO);
        assert_eq!(ledger.history[2].cost, Money::from_major(1200));
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let db = test_db().await;
        let err = db
            .bottles()
            .record_event(BottleEventKind::Purchase, 0, Money::ZERO, at(9, 0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Invalid(_)));
        assert!(db.bottles().ledger().await.unwrap().history.is_empty());
    }
}
