//! # Promotion Repository
//!
//! Promotions and the product ids each one covers.
//!
//! A promotion row lives in `promotions`; the products it applies to live
//! in `promotion_items`. An insert writes both inside one transaction.
//! Switching a promotion off keeps it and its items on file.

use std::collections::HashMap;

use barpos_core::{Promotion, PromotionType};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::decode_enum;
use crate::error::{DbError, DbResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, FromRow)]
struct PromotionRow {
    id: String,
    name: String,
    description: Option<String>,
    #[sqlx(rename = "type")]
    promotion_type: String,
    value: String,
    start_date: String,
    end_date: Option<String>,
    is_active: bool,
}

#[derive(Debug, FromRow)]
struct PromotionItemRow {
    promotion_id: String,
    product_id: String,
}

fn decode_date(column: &str, text: &str) -> DbResult<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|e| DbError::decode(column, e))
}

fn encode_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

impl PromotionRow {
    fn into_promotion(self, selected_items: Vec<String>) -> DbResult<Promotion> {
        Ok(Promotion {
            promotion_type: decode_enum::<PromotionType>("promotions.type", &self.promotion_type)?,
            value: self
                .value
                .trim()
                .parse::<Decimal>()
                .map_err(|e| DbError::decode("promotions.value", e))?,
            start_date: decode_date("promotions.start_date", &self.start_date)?,
            end_date: self
                .end_date
                .as_deref()
                .map(|d| decode_date("promotions.end_date", d))
                .transpose()?,
            id: self.id,
            name: self.name,
            description: self.description,
            is_active: self.is_active,
            selected_items,
        })
    }
}

/// Repository for promotion database operations.
#[derive(Debug, Clone)]
pub struct PromotionRepository {
    pool: SqlitePool,
}

impl PromotionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PromotionRepository { pool }
    }

    /// Lists every promotion with its product ids.
    ///
    /// ## Ordering
    /// Newest start date first, then id. The cart takes the first match
    /// from this list, so the order is part of the pricing contract.
    pub async fn list(&self) -> DbResult<Vec<Promotion>> {
        let rows: Vec<PromotionRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, type, value, start_date, end_date, is_active
            FROM promotions
            ORDER BY start_date DESC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let item_rows: Vec<PromotionItemRow> = sqlx::query_as(
            r#"
            SELECT promotion_id, product_id
            FROM promotion_items
            ORDER BY promotion_id, product_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<String, Vec<String>> = HashMap::new();
        for item in item_rows {
            items.entry(item.promotion_id).or_default().push(item.product_id);
        }

        debug!(count = rows.len(), "Listed promotions");

        rows.into_iter()
            .map(|row| {
                let selected = items.remove(&row.id).unwrap_or_default();
                row.into_promotion(selected)
            })
            .collect()
    }

    /// Gets one promotion by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Promotion>> {
        let row: Option<PromotionRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, type, value, start_date, end_date, is_active
            FROM promotions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let selected: Vec<String> = sqlx::query_scalar(
            "SELECT product_id FROM promotion_items WHERE promotion_id = ?1 ORDER BY product_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        row.into_promotion(selected).map(Some)
    }

    /// Inserts a promotion and its item set in one transaction.
    pub async fn insert(&self, promotion: &Promotion) -> DbResult<()> {
        info!(id = %promotion.id, name = %promotion.name, "Creating promotion");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO promotions
                (id, name, description, type, value, start_date, end_date, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&promotion.id)
        .bind(&promotion.name)
        .bind(&promotion.description)
        .bind(promotion.promotion_type.as_str())
        .bind(promotion.value.to_string())
        .bind(encode_date(promotion.start_date))
        .bind(promotion.end_date.map(encode_date))
        .bind(promotion.is_active)
        .execute(&mut *tx)
        .await?;

        insert_items(&mut tx, &promotion.id, &promotion.selected_items).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Switches a promotion on or off without touching its items.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE promotions SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Promotion", id));
        }

        Ok(())
    }
}

async fn insert_items(
    conn: &mut SqliteConnection,
    promotion_id: &str,
    product_ids: &[String],
) -> DbResult<()> {
    for product_id in product_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO promotion_items (promotion_id, product_id) VALUES (?1, ?2)",
        )
        .bind(promotion_id)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Helper to generate a new promotion ID.
pub fn generate_promotion_id() -> String {
    format!("promo_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    fn promo(id: &str, start: (i32, u32, u32), items: &[&str]) -> Promotion {
        Promotion {
            id: id.to_string(),
            name: format!("Promo {id}"),
            description: None,
            promotion_type: PromotionType::Percentage,
            value: Decimal::from(10),
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: None,
            is_active: true,
            selected_items: items.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_with_items() {
        let db = test_db().await;
        let repo = db.promotions();
        repo.insert(&promo("b", (2024, 1, 1), &["lager"])).await.unwrap();
        repo.insert(&promo("a", (2024, 6, 1), &["stout", "lager"])).await.unwrap();
        repo.insert(&promo("c", (2024, 6, 1), &[])).await.unwrap();

        let listed = repo.list().await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
        assert_eq!(listed[0].selected_items, vec!["lager", "stout"]);
        assert!(listed[1].selected_items.is_empty());
    }

    #[tokio::test]
    async fn test_insert_round_trips() {
        let db = test_db().await;
        let repo = db.promotions();
        let mut p = promo("p", (2024, 1, 1), &["stout", "lager"]);
        p.promotion_type = PromotionType::Fixed;
        p.value = Decimal::new(2550, 2);
        p.end_date = NaiveDate::from_ymd_opt(2024, 12, 31);
        repo.insert(&p).await.unwrap();

        let stored = repo.get_by_id("p").await.unwrap().unwrap();
        p.selected_items.sort();
        assert_eq!(stored, p);
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_active_keeps_items() {
        let db = test_db().await;
        let repo = db.promotions();
        repo.insert(&promo("p", (2024, 1, 1), &["lager"])).await.unwrap();

        repo.set_active("p", false).await.unwrap();
        let stored = repo.get_by_id("p").await.unwrap().unwrap();
        assert!(!stored.is_active);
        assert_eq!(stored.selected_items, vec!["lager"]);

        repo.set_active("p", true).await.unwrap();
        assert!(repo.get_by_id("p").await.unwrap().unwrap().is_active);
        assert!(matches!(
            repo.set_active("missing", false).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[test]
    fn test_generated_ids_are_prefixed() {
        assert!(generate_promotion_id().starts_with("promo_"));
    }
}
