//! # Money Module
//!
//! Provides the `Money` and `Percent` types for handling monetary values safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A bar bill mixes percentages on top of percentages:                    │
//! │    net × 10% service + net × 8% tax + deposits                          │
//! │                                                                         │
//! │  OUR SOLUTION: exact decimals (rust_decimal)                            │
//! │    1800 × 10% = 180 exactly, 1800 × 8% = 144 exactly                    │
//! │    Rounding happens ONCE, when a value is shown to a human              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use barpos_core::money::{Money, Percent};
//!
//! let price = Money::from_major(1000);
//! let line = price * 2;
//! let tax = line.percent_of(Percent::from_whole(8));
//! assert_eq!(tax, Money::from_major(160));
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;

use crate::error::ValidationError;

/// Number of decimal places shown on screens and receipts.
pub const DISPLAY_SCALE: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in the register's currency.
///
/// ## Design Decisions
/// - **Decimal (not f64)**: percentages of amounts stay exact
/// - **Signed**: intermediate values (e.g. `grand_total - paid`) may go negative
/// - **No implicit rounding**: arithmetic keeps full precision; call
///   [`Money::rounded`] only for display
///
/// ## Where Money is Used
/// ```text
/// Product.price ──► CartLine.price (snapshot) ──► line_raw ──► subtotal
///                                                   │
///                                 discount ◄────────┘
///                                   │
///   net ──► service charge, tax ──► grand_total ──► balance / change
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero money value.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Wraps an exact decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a whole-unit amount (e.g. `from_major(1000)` = 1000.00).
    #[inline]
    pub fn from_major(units: i64) -> Self {
        Money(Decimal::from(units))
    }

    /// Creates an amount from minor units (cents).
    ///
    /// ```rust
    /// use barpos_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(1099).to_string(), "10.99");
    /// ```
    #[inline]
    pub fn from_minor(minor: i64) -> Self {
        Money(Decimal::new(minor, DISPLAY_SCALE))
    }

    /// Returns the exact decimal amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Checks if the value is strictly greater than zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is strictly less than zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns `max(self, 0)`.
    ///
    /// Balance due and change due are both defined this way.
    #[inline]
    pub fn clamp_non_negative(self) -> Self {
        if self.is_negative() {
            Money::ZERO
        } else {
            self
        }
    }

    /// Returns `self × rate / 100` without rounding.
    ///
    /// ```rust
    /// use barpos_core::money::{Money, Percent};
    ///
    /// let net = Money::from_major(1800);
    /// assert_eq!(net.percent_of(Percent::from_whole(10)), Money::from_major(180));
    /// ```
    #[inline]
    pub fn percent_of(&self, rate: Percent) -> Self {
        Money(self.0 * rate.fraction())
    }

    /// Rounds half away from zero to [`DISPLAY_SCALE`] places.
    ///
    /// Only for display and receipts; never feed the result back into
    /// pricing.
    pub fn rounded(&self) -> Self {
        Money(
            self.0
                .round_dp_with_strategy(DISPLAY_SCALE, RoundingStrategy::MidpointAwayFromZero),
        )
    }
}

/// Renders the amount rounded to two places, e.g. `2124.00`.
///
/// Currency symbols are a presentation concern of the terminal.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.rounded().0;
        write!(f, "{:.2}", rounded)
    }
}

/// Parses operator or database text into money.
///
/// Accepts plain decimals (`"1124"`, `"99.50"`), surrounding whitespace
/// is ignored.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Decimal::from_str(trimmed)
            .map(Money)
            .map_err(|_| ValidationError::InvalidFormat {
                field: "amount".to_string(),
                reason: format!("'{}' is not a number", trimmed),
            })
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::ZERO
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by a line quantity.
impl Mul<u32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: u32) -> Self {
        Money(self.0 * Decimal::from(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

// =============================================================================
// Percent
// =============================================================================

/// A percentage rate, e.g. `Percent::from_whole(10)` = 10%.
///
/// Used for service charge, tax and PERCENTAGE promotions. The value is kept
/// as entered (10, 8, 12.5); [`Percent::fraction`] gives the multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(Decimal);

impl Percent {
    /// Creates a rate from an exact decimal percentage.
    #[inline]
    pub const fn new(value: Decimal) -> Self {
        Percent(value)
    }

    /// Creates a rate from a whole percentage.
    #[inline]
    pub fn from_whole(value: i64) -> Self {
        Percent(Decimal::from(value))
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percent(Decimal::ZERO)
    }

    /// The percentage as entered (10 for 10%).
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// The multiplier (0.10 for 10%).
    #[inline]
    pub fn fraction(&self) -> Decimal {
        self.0 / Decimal::ONE_HUNDRED
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

impl FromStr for Percent {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('%');
        Decimal::from_str(trimmed)
            .map(Percent)
            .map_err(|_| ValidationError::InvalidFormat {
                field: "rate".to_string(),
                reason: format!("'{}' is not a number", s.trim()),
            })
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_rounds_to_two_places() {
        assert_eq!(Money::from_major(2124).to_string(), "2124.00");
        assert_eq!(Money::from_minor(1099).to_string(), "10.99");
        assert_eq!(Money::new(Decimal::new(10005, 3)).to_string(), "10.01");
        assert_eq!(Money::from_minor(-550).to_string(), "-5.50");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_major(1000);
        let b = Money::from_major(500);

        assert_eq!(a + b, Money::from_major(1500));
        assert_eq!(a - b, Money::from_major(500));
        assert_eq!(a * 3, Money::from_major(3000));
        assert_eq!(Money::from_minor(1099) * 9_999, Money::from_minor(10_988_901));
        assert_eq!(b * 0, Money::ZERO);
        assert_eq!(Percent::default(), Percent::zero());
    }

    #[test]
    fn test_percent_of_is_exact() {
        let net = Money::from_major(1800);
        assert_eq!(net.percent_of(Percent::from_whole(10)), Money::from_major(180));
        assert_eq!(net.percent_of(Percent::from_whole(8)), Money::from_major(144));

        // 8% of 0.10 is 0.008, kept until display
        let tiny = Money::from_minor(10).percent_of(Percent::from_whole(8));
        assert_eq!(tiny.amount(), Decimal::new(8, 3));
        assert_eq!(tiny.to_string(), "0.01");
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(Money::from_major(-3).clamp_non_negative(), Money::ZERO);
        assert_eq!(Money::from_major(3).clamp_non_negative(), Money::from_major(3));
    }

    #[test]
    fn test_parse() {
        assert_eq!("1124".parse::<Money>().unwrap(), Money::from_major(1124));
        assert_eq!(" 99.50 ".parse::<Money>().unwrap(), Money::from_minor(9950));
        assert!("abc".parse::<Money>().is_err());
        assert_eq!("12.5%".parse::<Percent>().unwrap().value(), Decimal::new(125, 1));
    }

    #[test]
    fn test_sum() {
        let amounts = [Money::from_major(1000), Money::from_major(1124)];
        let total: Money = amounts.iter().sum();
        assert_eq!(total, Money::from_major(2124));
    }
}
