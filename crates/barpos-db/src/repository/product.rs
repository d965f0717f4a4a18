//! # Product Repository
//!
//! Database operations for the bar's catalogue.
//!
//! ## Key Operations
//! - Active listing (archived products hidden)
//! - Insert, lookup, archive and restore
//! - Stock deltas and low-stock report
//!
//! ## Product Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  insert ──► active (listed, sellable) ──► archive ──► is_deleted = 1    │
//! │                 │                                        │              │
//! │                 │ adjust_stock                           │ get_by_id    │
//! │                 ▼                                        ▼ still works  │
//! │             active                              (historical sales keep  │
//! │                                                  their product id)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `restore` clears the flag and the product is listed again.

use barpos_core::{Product, KITCHEN_CATEGORY};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::{decode_money, encode_money};
use crate::error::{DbError, DbResult};

const PRODUCT_COLUMNS: &str = "id, name, category, price, cost_price, stock, \
     is_deposit_enabled, deposit_amount, is_deleted, created_at, updated_at";

/// Raw `products` row.
#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    name: String,
    category: String,
    price: String,
    cost_price: String,
    stock: i64,
    is_deposit_enabled: bool,
    deposit_amount: String,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> DbResult<Self> {
        Ok(Product {
            price: decode_money("products.price", &row.price)?,
            cost_price: decode_money("products.cost_price", &row.cost_price)?,
            deposit_amount: decode_money("products.deposit_amount", &row.deposit_amount)?,
            id: row.id,
            name: row.name,
            category: row.category,
            stock: row.stock,
            is_deposit_enabled: row.is_deposit_enabled,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> DbResult<Vec<Product>> {
    rows.into_iter().map(Product::try_from).collect()
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let menu = repo.list_active().await?;
/// let product = repo.get_by_id("lager-625").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products that are not archived, ordered by name.
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_deleted = 0 ORDER BY name, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Listed active products");
        into_products(rows)
    }

    /// Gets a product by its ID, archived or not.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Product::try_from).transpose()
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(())` - Inserted
    /// * `Err(DbError::UniqueViolation)` - id already exists
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category, price, cost_price, stock,
                is_deposit_enabled, deposit_amount, is_deleted,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(encode_money(product.price))
        .bind(encode_money(product.cost_price))
        .bind(product.stock)
        .bind(product.is_deposit_enabled)
        .bind(encode_money(product.deposit_amount))
        .bind(product.is_deleted)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Changes product stock by `delta`.
    ///
    /// ## Delta Update
    /// ```text
    /// UPDATE products SET stock = stock + delta
    /// ```
    /// Never an absolute write, so two terminals selling at once both land.
    /// Nothing stops the result from going below zero.
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        adjust_stock_on(&mut conn, id, delta).await
    }

    /// Archives a product (soft delete).
    ///
    /// ## Why Soft Delete?
    /// - Historical sales still reference this product
    /// - Can be restored if archived by mistake
    pub async fn archive(&self, id: &str) -> DbResult<()> {
        self.set_deleted(id, true).await
    }

    /// Brings an archived product back onto the menu.
    pub async fn restore(&self, id: &str) -> DbResult<()> {
        self.set_deleted(id, false).await
    }

    async fn set_deleted(&self, id: &str, deleted: bool) -> DbResult<()> {
        debug!(id = %id, deleted, "Setting product archive flag");

        let result =
            sqlx::query("UPDATE products SET is_deleted = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(deleted)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Active stock-tracked products with stock below `threshold`, lowest
    /// first. Kitchen items are never listed.
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_deleted = 0 AND stock < ?1 AND category <> ?2 \
             ORDER BY stock ASC, name"
        ))
        .bind(threshold)
        .bind(KITCHEN_CATEGORY)
        .fetch_all(&self.pool)
        .await?;

        into_products(rows)
    }

    /// Counts active products. The seed tool uses it to avoid seeding twice.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_deleted = 0")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Stock delta on an existing connection, so the sale transaction can reuse it.
pub(crate) async fn adjust_stock_on(
    conn: &mut SqliteConnection,
    id: &str,
    delta: i64,
) -> DbResult<()> {
    debug!(id = %id, delta, "Adjusting stock");

    let result =
        sqlx::query("UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(delta)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::test_support::{sample_product, test_db};
    use barpos_core::Money;

    #[tokio::test]
    async fn test_insert_and_get_round_trips_decimals() {
        let db = test_db().await;
        let mut product = sample_product("lager", "Lion Lager", "Beer", 650);
        product.price = Money::from_minor(64999);
        db.products().insert(&product).await.unwrap();

        let stored = db.products().get_by_id("lager").await.unwrap().unwrap();
        assert_eq!(stored.price, Money::from_minor(64999));
        assert_eq!(stored.name, "Lion Lager");
        assert!(db.products().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_archived_products_are_hidden() {
        let db = test_db().await;
        let repo = db.products();
        repo.insert(&sample_product("b", "Stout", "Beer", 700)).await.unwrap();
        repo.insert(&sample_product("a", "Arrack", "Spirits", 900)).await.unwrap();

        let names: Vec<String> = repo
            .list_active()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Arrack", "Stout"]);

        repo.archive("a").await.unwrap();
        assert_eq!(repo.list_active().await.unwrap().len(), 1);
        assert!(repo.get_by_id("a").await.unwrap().unwrap().is_deleted);
        assert_eq!(repo.count().await.unwrap(), 1);

        repo.restore("a").await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_adjust_stock_can_go_negative() {
        let db = test_db().await;
        db.products()
            .insert(&sample_product("lager", "Lion Lager", "Beer", 650))
            .await
            .unwrap();

        db.products().adjust_stock("lager", -60).await.unwrap();
        let stock = db.products().get_by_id("lager").await.unwrap().unwrap().stock;
        assert_eq!(stock, -10);

        assert!(db.products().adjust_stock("missing", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_low_stock_skips_kitchen() {
        let db = test_db().await;
        let repo = db.products();
        repo.insert(&sample_product("lager", "Lion Lager", "Beer", 650)).await.unwrap();
        let mut stout = sample_product("stout", "Lion Stout", "Beer", 700);
        stout.stock = 5;
        repo.insert(&stout).await.unwrap();
        let mut chips = sample_product("chips", "Chips", "Kitchen", 600);
        chips.stock = 0;
        repo.insert(&chips).await.unwrap();

        let low = repo.low_stock(20).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, "stout");
    }
}
