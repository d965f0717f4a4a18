//! # Sale Repository
//!
//! Database operations for finalized sales, their lines and payments.
//!
//! ## Recording a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    record_sale (one transaction)                        │
//! │                                                                         │
//! │  1. INSERT sales            header, totals, rates, change               │
//! │  2. INSERT sale_items       one row per line (snapshot of the cart)     │
//! │  3. INSERT sale_payments    rows with amount > 0                        │
//! │  4. UPDATE products         stock -= qty   (skipped for Kitchen lines)  │
//! │  5. bottles_exchanged > 0:                                              │
//! │       INSERT empty_bottles  EXCHANGE event                              │
//! │       UPDATE summary        total_in_hand += bottles_exchanged          │
//! │                                                                         │
//! │  COMMIT, or nothing at all                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock is skipped by the category snapshot on the sale line, not by a
//! fresh product lookup. A stock update for a product that no longer
//! exists fails the whole sale.

use barpos_core::{
    is_stock_tracked_category, BottleEventKind, DepositMode, Money, PaymentMethod, Sale, SaleLine,
    SalePayment,
};
use chrono::NaiveDate;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::bottle::apply_event;
use super::product::adjust_stock_on;
use super::{
    decode_count, decode_enum, decode_local_datetime, decode_money, decode_percent,
    encode_local_datetime, encode_money, encode_percent,
};
use crate::error::{DbError, DbResult};

#[derive(Debug, FromRow)]
struct SaleRow {
    id: String,
    user_id: String,
    date: String,
    subtotal: String,
    discount_total: String,
    service_charge_rate: String,
    service_charge: String,
    tax_rate: String,
    tax: String,
    deposit_total: String,
    total: String,
    bottles_exchanged: i64,
    change_due: String,
}

#[derive(Debug, FromRow)]
struct SaleItemRow {
    product_id: String,
    name: String,
    category: String,
    price: String,
    cost_price: String,
    qty: i64,
    discount: String,
    is_deposit_enabled: bool,
    deposit_mode: String,
    line_deposit: String,
}

#[derive(Debug, FromRow)]
struct SalePaymentRow {
    method: String,
    amount: String,
}

impl TryFrom<SaleItemRow> for SaleLine {
    type Error = DbError;

    fn try_from(row: SaleItemRow) -> DbResult<Self> {
        Ok(SaleLine {
            price: decode_money("sale_items.price", &row.price)?,
            cost_price: decode_money("sale_items.cost_price", &row.cost_price)?,
            qty: decode_count("sale_items.qty", row.qty)?,
            discount: decode_money("sale_items.discount", &row.discount)?,
            deposit_mode: decode_enum::<DepositMode>("sale_items.deposit_mode", &row.deposit_mode)?,
            line_deposit: decode_money("sale_items.line_deposit", &row.line_deposit)?,
            product_id: row.product_id,
            name: row.name,
            category: row.category,
            is_deposit_enabled: row.is_deposit_enabled,
        })
    }
}

impl TryFrom<SalePaymentRow> for SalePayment {
    type Error = DbError;

    fn try_from(row: SalePaymentRow) -> DbResult<Self> {
        Ok(SalePayment {
            method: decode_enum::<PaymentMethod>("sale_payments.method", &row.method)?,
            amount: decode_money("sale_payments.amount", &row.amount)?,
        })
    }
}

impl SaleRow {
    fn into_sale(self, lines: Vec<SaleLine>, payments: Vec<SalePayment>) -> DbResult<Sale> {
        Ok(Sale {
            date: decode_local_datetime("sales.date", &self.date)?,
            subtotal: decode_money("sales.subtotal", &self.subtotal)?,
            discount_total: decode_money("sales.discount_total", &self.discount_total)?,
            service_charge_rate: decode_percent(
                "sales.service_charge_rate",
                &self.service_charge_rate,
            )?,
            service_charge: decode_money("sales.service_charge", &self.service_charge)?,
            tax_rate: decode_percent("sales.tax_rate", &self.tax_rate)?,
            tax: decode_money("sales.tax", &self.tax)?,
            deposit_total: decode_money("sales.deposit_total", &self.deposit_total)?,
            grand_total: decode_money("sales.total", &self.total)?,
            bottles_exchanged: decode_count("sales.bottles_exchanged", self.bottles_exchanged)?,
            change_due: decode_money("sales.change_due", &self.change_due)?,
            id: self.id,
            user_id: self.user_id,
            lines,
            payments,
        })
    }
}

const SALE_COLUMNS: &str = "id, user_id, date, subtotal, discount_total, service_charge_rate, \
     service_charge, tax_rate, tax, deposit_total, total, bottles_exchanged, change_due";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Writes a finalized sale and its side effects atomically.
    ///
    /// ## Returns
    /// * `Ok(())` - Everything committed
    /// * `Err(DbError::UniqueViolation)` - Invoice id already used
    /// * `Err(DbError::NotFound)` - A line's product is gone
    ///
    /// On any error nothing is written.
    pub async fn record_sale(&self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, lines = sale.lines.len(), "Recording sale");

        let mut tx = self.pool.begin().await?;

        insert_header(&mut tx, sale).await?;

        for line in &sale.lines {
            insert_line(&mut tx, &sale.id, line).await?;
        }

        for payment in sale.payments.iter().filter(|p| p.amount.is_positive()) {
            sqlx::query("INSERT INTO sale_payments (sale_id, method, amount) VALUES (?1, ?2, ?3)")
                .bind(&sale.id)
                .bind(payment.method.as_str())
                .bind(encode_money(payment.amount))
                .execute(&mut *tx)
                .await?;
        }

        for line in sale
            .lines
            .iter()
            .filter(|l| is_stock_tracked_category(&l.category))
        {
            adjust_stock_on(&mut tx, &line.product_id, -i64::from(line.qty)).await?;
        }

        if sale.bottles_exchanged > 0 {
            apply_event(
                &mut tx,
                BottleEventKind::Exchange,
                sale.bottles_exchanged,
                Money::ZERO,
                sale.date,
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            id = %sale.id,
            user_id = %sale.user_id,
            total = %sale.grand_total,
            bottles_exchanged = sale.bottles_exchanged,
            "Sale recorded"
        );
        Ok(())
    }

    /// Gets a sale with its lines and payments.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let row: Option<SaleRow> =
            sqlx::query_as(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut conn = self.pool.acquire().await?;
        let lines = load_lines(&mut conn, id).await?;
        let payments = load_payments(&mut conn, id).await?;

        row.into_sale(lines, payments).map(Some)
    }

    /// Most recent sales first, optionally only those rung up by `user_id`.
    pub async fn list_recent(&self, limit: u32, user_id: Option<&str>) -> DbResult<Vec<Sale>> {
        let rows: Vec<SaleRow> = sqlx::query_as(&format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE ?2 IS NULL OR user_id = ?2 \
             ORDER BY date DESC, id DESC LIMIT ?1"
        ))
        .bind(i64::from(limit))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        self.load_sales(rows).await
    }

    /// Every sale stamped on `date`, oldest first.
    pub async fn list_for_day(&self, date: NaiveDate) -> DbResult<Vec<Sale>> {
        let rows: Vec<SaleRow> = sqlx::query_as(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE substr(date, 1, 10) = ?1 ORDER BY date, id"
        ))
        .bind(date.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await?;

        debug!(%date, count = rows.len(), "Loaded sales for day");
        self.load_sales(rows).await
    }

    async fn load_sales(&self, rows: Vec<SaleRow>) -> DbResult<Vec<Sale>> {
        let mut conn = self.pool.acquire().await?;
        let mut sales = Vec::with_capacity(rows.len());
        for row in rows {
            let lines = load_lines(&mut conn, &row.id).await?;
            let payments = load_payments(&mut conn, &row.id).await?;
            sales.push(row.into_sale(lines, payments)?);
        }
        Ok(sales)
    }
}

async fn insert_header(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, user_id, date,
            subtotal, discount_total,
            service_charge_rate, service_charge,
            tax_rate, tax,
            deposit_total, total,
            bottles_exchanged, change_due
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.user_id)
    .bind(encode_local_datetime(sale.date))
    .bind(encode_money(sale.subtotal))
    .bind(encode_money(sale.discount_total))
    .bind(encode_percent(sale.service_charge_rate))
    .bind(encode_money(sale.service_charge))
    .bind(encode_percent(sale.tax_rate))
    .bind(encode_money(sale.tax))
    .bind(encode_money(sale.deposit_total))
    .bind(encode_money(sale.grand_total))
    .bind(i64::from(sale.bottles_exchanged))
    .bind(encode_money(sale.change_due))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_line(conn: &mut SqliteConnection, sale_id: &str, line: &SaleLine) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_items (
            sale_id, product_id, name, category,
            price, cost_price, qty, discount,
            is_deposit_enabled, deposit_mode, line_deposit
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(sale_id)
    .bind(&line.product_id)
    .bind(&line.name)
    .bind(&line.category)
    .bind(encode_money(line.price))
    .bind(encode_money(line.cost_price))
    .bind(i64::from(line.qty))
    .bind(encode_money(line.discount))
    .bind(line.is_deposit_enabled)
    .bind(line.deposit_mode.as_str())
    .bind(encode_money(line.line_deposit))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn load_lines(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleLine>> {
    let rows: Vec<SaleItemRow> = sqlx::query_as(
        r#"
        SELECT product_id, name, category, price, cost_price, qty, discount,
               is_deposit_enabled, deposit_mode, line_deposit
        FROM sale_items
        WHERE sale_id = ?1
        ORDER BY id
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(SaleLine::try_from).collect()
}

async fn load_payments(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SalePayment>> {
    let rows: Vec<SalePaymentRow> =
        sqlx::query_as("SELECT method, amount FROM sale_payments WHERE sale_id = ?1 ORDER BY id")
            .bind(sale_id)
            .fetch_all(&mut *conn)
            .await?;

    rows.into_iter().map(SalePayment::try_from).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
