//! # Config Commands
//!
//! Terminal configuration and the service charge / tax rates.

use std::fmt::Write as _;

use barpos_core::{Percent, RateSettings};
use barpos_db::PersistenceGateway;
use serde::Serialize;
use tracing::debug;

use crate::error::TerminalResult;
use crate::state::{ConfigState, Session};

/// Configuration plus the rates currently applied to the cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub store_name: String,
    pub currency_symbol: String,
    pub db_path: String,
    pub session_timeout_secs: u64,
    pub cashier: Option<String>,
    pub service_charge_rate: String,
    pub tax_rate: String,
}

impl ConfigResponse {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "  Store:          {}", self.store_name);
        let _ = writeln!(out, "  Currency:       {}", self.currency_symbol);
        let _ = writeln!(out, "  Database:       {}", self.db_path);
        let _ = writeln!(out, "  Idle timeout:   {}s", self.session_timeout_secs);
        let _ = writeln!(
            out,
            "  Cashier:        {}",
            self.cashier.as_deref().unwrap_or("(signed out)")
        );
        let _ = writeln!(out, "  Service charge: {}", self.service_charge_rate);
        let _ = writeln!(out, "  Tax:            {}", self.tax_rate);
        out
    }
}

/// Gets the current configuration.
///
/// ## When Used
/// - `rates` on the console
/// - Checking which cashier is signed in
pub fn get_config<G: PersistenceGateway>(
    session: &Session<G>,
    config: &ConfigState,
) -> ConfigResponse {
    debug!("get_config command");
    let rates = session.rates();

    ConfigResponse {
        store_name: config.store_name.clone(),
        currency_symbol: config.currency_symbol.clone(),
        db_path: config.db_path.display().to_string(),
        session_timeout_secs: config.session_timeout_secs,
        cashier: session.cashier().map(str::to_string),
        service_charge_rate: rates.service_charge_rate.to_string(),
        tax_rate: rates.tax_rate.to_string(),
    }
}

/// Stores new rates and reprices the cart with them.
///
/// ## Arguments
/// * `service_charge` - e.g. "10" or "12.5%"
/// * `tax` - same format, 0 to 100
pub async fn set_rates<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
    service_charge: &str,
    tax: &str,
) -> TerminalResult<ConfigResponse> {
    debug!(service_charge = %service_charge, tax = %tax, "set_rates command");

    let rates = RateSettings::new(service_charge.parse::<Percent>()?, tax.parse::<Percent>()?);
    session.set_rates(rates).await?;
    Ok(get_config(session, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::{lager, signed_in};

    #[tokio::test]
    async fn test_set_rates_accepts_percent_sign() {
        let config = ConfigState::default();
        let mut session = signed_in(vec![lager()]).await;

        let response = set_rates(&mut session, &config, "12.5%", "0").await.unwrap();
        assert_eq!(response.service_charge_rate, "12.5%");
        assert_eq!(response.tax_rate, "0%");
        assert_eq!(response.cashier.as_deref(), Some("nimal"));
    }

    #[tokio::test]
    async fn test_set_rates_rejects_bad_input() {
        let config = ConfigState::default();
        let mut session = signed_in(vec![lager()]).await;

        let err = set_rates(&mut session, &config, "ten", "8").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        let err = set_rates(&mut session, &config, "10", "-1").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(session.rates(), RateSettings::default());
    }
}
