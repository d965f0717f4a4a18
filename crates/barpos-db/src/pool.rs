//! # Store Database
//!
//! Opens the shared SQLite store file and hands out repositories.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  register A ─┐                                                          │
//! │  register B ─┼──► barpos.db  (WAL journal, busy_timeout)                │
//! │  seed tool  ─┘        │                                                 │
//! │                       ├── reads:  catalogue, promotions, rates          │
//! │                       └── writes: one transaction per sale / event      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Several registers may open the same file. A writer that finds the file
//! locked waits up to `busy_timeout` before the statement fails, so a sale
//! recorded on register A does not fail just because register B is midway
//! through its own commit.
//!
//! `:memory:` opens a private database on a single pinned connection.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::bottle::BottleRepository;
use crate::repository::product::ProductRepository;
use crate::repository::promotion::PromotionRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::settings::SettingsRepository;

const IN_MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// How to open the store database.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/barpos/barpos.db")
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Store file, created on first open.
    pub database_path: PathBuf,

    /// Pool size. One register rarely needs more than a handful.
    pub max_connections: u32,

    /// How long a write waits on another register's lock.
    pub busy_timeout: Duration,

    /// Apply embedded migrations on open.
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Private in-memory store for tests.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            ..DbConfig::new(IN_MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
                .journal_mode(SqliteJournalMode::Memory)
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .journal_mode(SqliteJournalMode::Wal)
                .create_if_missing(true)
        };

        Ok(options
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(self.busy_timeout)
            .foreign_keys(true))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle on the store database.
///
/// ```text
/// Database
///   ├── products()    catalogue, stock, archive
///   ├── promotions()  promotions + their product ids
///   ├── settings()    service charge / tax rates
///   ├── sales()       atomic sale recording, lookups
///   └── bottles()     empty-bottle counter + history
/// ```
///
/// The register session only sees [`crate::PersistenceGateway`], which this
/// type implements by delegating to the repositories.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the store and applies pending migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Opening store database"
        );

        let options = config.connect_options()?;

        // The in-memory database dies with its connection
        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1);
        if config.is_in_memory() {
            pool_options = pool_options
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        debug!(max_connections = config.max_connections, "Pool ready");

        let db = Database { pool };
        if config.run_migrations {
            migrations::run_migrations(&db.pool).await?;
        }
        Ok(db)
    }

    /// Raw pool, for the seed tool and tests.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn promotions(&self) -> PromotionRepository {
        PromotionRepository::new(self.pool.clone())
    }

    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.pool.clone())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    pub fn bottles(&self) -> BottleRepository {
        BottleRepository::new(self.pool.clone())
    }

    /// Waits for in-flight queries, then closes every connection.
    pub async fn close(&self) {
        info!("Closing store database");
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_keeps_writes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query("INSERT INTO system_settings (setting_key, setting_value) VALUES ('k', 'v')")
            .execute(db.pool())
            .await
            .unwrap();

        let value: String =
            sqlx::query_scalar("SELECT setting_value FROM system_settings WHERE setting_key = 'k'")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(value, "v");
    }

    #[tokio::test]
    async fn test_file_store_shared_between_handles() {
        let dir = std::env::temp_dir().join(format!("barpos-pool-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("shared.db");
        let _ = std::fs::remove_file(&path);

        let a = Database::new(DbConfig::new(&path)).await.unwrap();
        let b = Database::new(DbConfig::new(&path).run_migrations(false))
            .await
            .unwrap();

        sqlx::query("UPDATE empty_bottles_summary SET total_in_hand = 7 WHERE id = 1")
            .execute(a.pool())
            .await
            .unwrap();
        let seen: i64 = sqlx::query_scalar("SELECT total_in_hand FROM empty_bottles_summary")
            .fetch_one(b.pool())
            .await
            .unwrap();
        assert_eq!(seen, 7);

        a.close().await;
        b.close().await;
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/barpos.db")
            .max_connections(2)
            .busy_timeout(Duration::from_millis(250));

        assert_eq!(config.max_connections, 2);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
        assert_eq!(DbConfig::in_memory().max_connections, 1);
    }
}
