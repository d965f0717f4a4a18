//! # Schema Migrations
//!
//! The store schema lives in `migrations/sqlite/` and is compiled into the
//! binary, so a register and the seed tool always agree on the tables they
//! open.
//!
//! | File                     | Tables                                          |
//! |--------------------------|-------------------------------------------------|
//! | `001_initial_schema.sql` | products, promotions, promotion_items,          |
//! |                          | system_settings, sales, sale_items,             |
//! |                          | sale_payments, empty_bottles(_summary)          |
//!
//! Later schema changes go in a new `NNN_description.sql`; applied files are
//! checksummed in `_sqlx_migrations` and must not be edited.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every embedded migration not yet recorded in the store.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(embedded = MIGRATOR.migrations.len(), "Checking store schema");

    MIGRATOR.run(pool).await?;

    let (embedded, applied) = migration_status(pool).await?;
    info!(embedded, applied, "Store schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?;

    Ok((MIGRATOR.migrations.len(), usize::try_from(applied).unwrap_or(0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_open_applies_schema() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (embedded, applied) = migration_status(db.pool()).await.unwrap();

        assert!(embedded >= 1);
        assert_eq!(embedded, applied);

        let counter: i64 = sqlx::query_scalar("SELECT total_in_hand FROM empty_bottles_summary")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(counter, 0);
    }

    #[tokio::test]
    async fn test_rerun_is_noop() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        run_migrations(db.pool()).await.unwrap();

        let (embedded, applied) = migration_status(db.pool()).await.unwrap();
        assert_eq!(embedded, applied);
    }
}
