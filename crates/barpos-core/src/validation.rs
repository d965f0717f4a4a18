//! # Validation Module
//!
//! Input validation utilities for BarPOS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Console (apps/terminal)                                      │
//! │  ├── Argument count, line/row numbers                                  │
//! │  └── Immediate operator feedback                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Core (Rust)                                                  │
//! │  ├── Typed parsing (PaymentMethod, Money, Percent)                     │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use barpos_core::validation::{parse_amount, validate_rate_settings};
//! use barpos_core::RateSettings;
//!
//! assert!(parse_amount("payment amount", "1124").is_ok());
//! assert!(validate_rate_settings(&RateSettings::default()).is_ok());
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::{Money, Percent};
use crate::types::{Product, Promotion, RateSettings};
use crate::MAX_LINE_QTY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_CATEGORY_LEN: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product or promotion name.
///
/// ## Rules
/// - Must not be blank
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use barpos_core::validation::validate_name;
///
/// assert!(validate_name("Lion Lager 625ml").is_ok());
/// assert!(validate_name("  ").is_err());
/// ```
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a menu category.
pub fn validate_category(category: &str) -> ValidationResult<()> {
    let category = category.trim();

    if category.is_empty() {
        return Err(ValidationError::Required {
            field: "category".to_string(),
        });
    }

    if category.chars().count() > MAX_CATEGORY_LEN {
        return Err(ValidationError::TooLong {
            field: "category".to_string(),
            max: MAX_CATEGORY_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Rejects negative amounts. Zero is allowed (free items, no deposit).
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Parses operator-entered money and rejects negatives.
///
/// ```rust
/// use barpos_core::validation::parse_amount;
///
/// assert!(parse_amount("amount", "99.50").is_ok());
/// assert!(parse_amount("amount", "abc").is_err());
/// assert!(parse_amount("amount", "-1").is_err());
/// ```
pub fn parse_amount(field: &str, text: &str) -> ValidationResult<Money> {
    let amount: Money = text
        .parse()
        .map_err(|_| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("'{}' is not a number", text.trim()),
        })?;
    validate_non_negative(field, amount)?;
    Ok(amount)
}

/// Validates a percentage rate.
///
/// ## Rules
/// - Must be between 0 and 100 inclusive
pub fn validate_rate(field: &str, rate: Percent) -> ValidationResult<()> {
    if rate.value() < Decimal::ZERO || rate.value() > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

/// Validates both service charge and tax rate.
pub fn validate_rate_settings(rates: &RateSettings) -> ValidationResult<()> {
    validate_rate("service_charge_rate", rates.service_charge_rate)?;
    validate_rate("tax_rate", rates.tax_rate)
}

/// Validates a cart line quantity.
///
/// ## Rules
/// - Must be at least 1 (removal is a separate command)
/// - At most [`MAX_LINE_QTY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<u32> {
    if qty < 1 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    u32::try_from(qty)
        .ok()
        .filter(|q| *q <= MAX_LINE_QTY)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: i64::from(MAX_LINE_QTY),
        })
}

/// Bottle movements must move at least one bottle.
pub fn validate_bottle_quantity(qty: u32) -> ValidationResult<()> {
    if qty == 0 {
        return Err(ValidationError::MustBePositive {
            field: "bottle quantity".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates a product before it is written to the catalogue.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_name(&product.name)?;
    validate_category(&product.category)?;
    validate_non_negative("price", product.price)?;
    validate_non_negative("cost_price", product.cost_price)?;
    validate_non_negative("deposit_amount", product.deposit_amount)?;
    Ok(())
}

/// Validates a promotion before it is written.
///
/// ## Rules
/// - Name required
/// - Value ≥ 0 (percentages above 100 are allowed; the discount is
///   clamped at pricing time)
/// - End date, when present, not before the start date
pub fn validate_promotion(promotion: &Promotion) -> ValidationResult<()> {
    validate_name(&promotion.name)?;

    if promotion.value < Decimal::ZERO {
        return Err(ValidationError::MustNotBeNegative {
            field: "value".to_string(),
        });
    }

    if let Some(end) = promotion.end_date {
        if end < promotion.start_date {
            return Err(ValidationError::InvalidFormat {
                field: "end_date".to_string(),
                reason: "must not be before start_date".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::tests::{percent_promo, test_product};
    use chrono::NaiveDate;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Lion Lager").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("amount", " 1124 ").unwrap(), Money::from_major(1124));
        assert_eq!(parse_amount("amount", "0").unwrap(), Money::ZERO);
        assert!(matches!(
            parse_amount("amount", "1,000").unwrap_err(),
            ValidationError::InvalidFormat { .. }
        ));
        assert!(matches!(
            parse_amount("amount", "-0.01").unwrap_err(),
            ValidationError::MustNotBeNegative { .. }
        ));
    }

    #[test]
    fn test_validate_rate() {
        assert!(validate_rate("tax_rate", Percent::from_whole(0)).is_ok());
        assert!(validate_rate("tax_rate", Percent::from_whole(100)).is_ok());
        assert!(validate_rate("tax_rate", Percent::new(Decimal::new(125, 1))).is_ok());
        assert!(validate_rate("tax_rate", Percent::from_whole(101)).is_err());
        assert!(validate_rate("tax_rate", Percent::from_whole(-1)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert_eq!(validate_quantity(1).unwrap(), 1);
        assert_eq!(validate_quantity(9_999).unwrap(), 9_999);
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(matches!(
            validate_quantity(10_000),
            Err(ValidationError::OutOfRange { max: 9_999, .. })
        ));
        assert!(validate_quantity(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn test_validate_product() {
        let mut product = test_product("lager", 500);
        assert!(validate_product(&product).is_ok());

        product.price = Money::from_major(-1);
        assert!(validate_product(&product).is_err());
    }

    #[test]
    fn test_validate_promotion() {
        let mut promo = percent_promo("p", 150, &["lager"]);
        assert!(validate_promotion(&promo).is_ok());

        promo.end_date = NaiveDate::from_ymd_opt(2023, 12, 31);
        assert!(validate_promotion(&promo).is_err());

        promo.end_date = None;
        promo.value = Decimal::from(-5);
        assert!(validate_promotion(&promo).is_err());
    }
}
