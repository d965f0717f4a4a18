//! # Settings Repository
//!
//! Key/value store in `system_settings`, plus typed access to the two
//! rates the pricing engine needs.
//!
//! ## Rate Keys
//! ```text
//! service_charge_rate  → "10"   (percent, default 10)
//! tax_rate             → "8"    (percent, default 8)
//! ```
//! A missing key falls back to its default; a malformed one is a decode
//! error rather than a silent default.

use barpos_core::validation::validate_rate_settings;
use barpos_core::{Percent, RateSettings, DEFAULT_SERVICE_CHARGE_RATE, DEFAULT_TAX_RATE};
use sqlx::SqlitePool;
use tracing::info;

use super::{decode_percent, encode_percent};
use crate::error::DbResult;

pub const SERVICE_CHARGE_RATE_KEY: &str = "service_charge_rate";
pub const TAX_RATE_KEY: &str = "tax_rate";

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Raw value for `key`, if set.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT setting_value FROM system_settings WHERE setting_key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    /// Inserts or overwrites `key`.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO system_settings (setting_key, setting_value) VALUES (?1, ?2)
            ON CONFLICT (setting_key) DO UPDATE SET setting_value = excluded.setting_value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Current service charge and tax rates.
    pub async fn get_rate_settings(&self) -> DbResult<RateSettings> {
        let service_charge_rate = self
            .get_percent(SERVICE_CHARGE_RATE_KEY, DEFAULT_SERVICE_CHARGE_RATE)
            .await?;
        let tax_rate = self.get_percent(TAX_RATE_KEY, DEFAULT_TAX_RATE).await?;

        Ok(RateSettings::new(service_charge_rate, tax_rate))
    }

    /// Validates and stores both rates in one transaction.
    pub async fn set_rate_settings(&self, rates: &RateSettings) -> DbResult<()> {
        validate_rate_settings(rates)?;

        info!(
            service_charge_rate = %rates.service_charge_rate,
            tax_rate = %rates.tax_rate,
            "Saving rate settings"
        );

        let mut tx = self.pool.begin().await?;
        for (key, rate) in [
            (SERVICE_CHARGE_RATE_KEY, rates.service_charge_rate),
            (TAX_RATE_KEY, rates.tax_rate),
        ] {
            sqlx::query(
                r#"
                INSERT INTO system_settings (setting_key, setting_value) VALUES (?1, ?2)
                ON CONFLICT (setting_key) DO UPDATE SET setting_value = excluded.setting_value
                "#,
            )
            .bind(key)
            .bind(encode_percent(rate))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn get_percent(&self, key: &str, default: i64) -> DbResult<Percent> {
        match self.get(key).await? {
            Some(text) => decode_percent(key, &text),
            None => Ok(Percent::from_whole(default)),
        }
    }
}
