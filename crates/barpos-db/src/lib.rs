//! # barpos-db: Persistence Gateway for BarPOS
//!
//! This crate provides database access for the BarPOS register.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        BarPOS Data Flow                                 │
//! │                                                                         │
//! │  Console command (finalize)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     barpos-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │   │   │
//! │  │   │               │    │ ProductRepo   │    │              │   │   │
//! │  │   │ SqlitePool    │◄───│ PromotionRepo │    │ 001_initial_ │   │   │
//! │  │   │ Connection    │    │ SettingsRepo  │    │  schema.sql  │   │   │
//! │  │   │ Management    │    │ SaleRepo      │    │              │   │   │
//! │  │   │               │    │ BottleRepo    │    │              │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │   │
//! │  │           ▲                                                     │   │
//! │  │           │ impl PersistenceGateway (gateway.rs)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <data dir>/barpos/barpos.db                                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, sale, etc.)
//! - [`gateway`] - The storage trait the register talks to
//!
//! ## Usage
//!
//! ```rust,ignore
//! use barpos_db::{Database, DbConfig, PersistenceGateway};
//!
//! let db = Database::new(DbConfig::new("path/to/barpos.db")).await?;
//!
//! let menu = db.list_products().await?;
//! let rates = db.get_rate_settings().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod gateway;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use gateway::PersistenceGateway;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::bottle::BottleRepository;
pub use repository::product::{generate_product_id, ProductRepository};
pub use repository::promotion::{generate_promotion_id, PromotionRepository};
pub use repository::sale::SaleRepository;
pub use repository::settings::SettingsRepository;
