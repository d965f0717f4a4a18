//! # Repository Module
//!
//! Database repository implementations for BarPOS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  PersistenceGateway (gateway.rs)                                       │
//! │       │                                                                 │
//! │       │  db.sales().record_sale(&sale)                                 │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │  ├── record_sale(&self, sale)      ← one transaction                   │
//! │  ├── get_by_id(&self, id)                                              │
//! │  └── list_recent(&self, limit)                                         │
//! │       │                                                                 │
//! │       │  SQL Query → FromRow row struct → TryFrom → domain type        │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Catalogue, stock, archive, low stock
//! - [`PromotionRepository`] - Promotions and their product ids
//! - [`SettingsRepository`] - Key/value settings, rate settings
//! - [`SaleRepository`] - Atomic sale recording and lookups
//! - [`BottleRepository`] - Empty-bottle counter and history
//!
//! [`ProductRepository`]: product::ProductRepository
//! [`PromotionRepository`]: promotion::PromotionRepository
//! [`SettingsRepository`]: settings::SettingsRepository
//! [`SaleRepository`]: sale::SaleRepository
//! [`BottleRepository`]: bottle::BottleRepository

pub mod bottle;
pub mod product;
pub mod promotion;
pub mod sale;
pub mod settings;

use std::str::FromStr;

use barpos_core::{Money, Percent, SALE_DATE_FORMAT};
use chrono::NaiveDateTime;

use crate::error::{DbError, DbResult};

// =============================================================================
// Column Codecs
// =============================================================================
// Money and rates are stored as exact decimal TEXT; local timestamps as
// "YYYY-MM-DD HH:MM:SS".

pub(crate) fn encode_money(amount: Money) -> String {
    amount.amount().to_string()
}

pub(crate) fn encode_percent(rate: Percent) -> String {
    rate.value().to_string()
}

pub(crate) fn decode_money(column: &str, text: &str) -> DbResult<Money> {
    Money::from_str(text).map_err(|e| DbError::decode(column, e))
}

pub(crate) fn decode_percent(column: &str, text: &str) -> DbResult<Percent> {
    Percent::from_str(text).map_err(|e| DbError::decode(column, e))
}

pub(crate) fn decode_enum<T>(column: &str, text: &str) -> DbResult<T>
where
    T: FromStr,
    T::Err: ToString,
{
    T::from_str(text).map_err(|e| DbError::decode(column, e))
}

pub(crate) fn decode_count(column: &str, value: i64) -> DbResult<u32> {
    u32::try_from(value).map_err(|e| DbError::decode(column, e))
}

pub(crate) fn encode_local_datetime(at: NaiveDateTime) -> String {
    at.format(SALE_DATE_FORMAT).to_string()
}

pub(crate) fn decode_local_datetime(column: &str, text: &str) -> DbResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, SALE_DATE_FORMAT).map_err(|e| DbError::decode(column, e))
}
