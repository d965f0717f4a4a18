//! # Promotion Matching
//!
//! Decides which promotion, if any, a product picks up when it is added to
//! the cart.
//!
//! ```text
//! active(promo, product, today) ⇔
//!     promo.is_active
//!   ∧ promo.start_date ≤ today
//!   ∧ (promo.end_date is None ∨ promo.end_date ≥ today)
//!   ∧ product.id ∈ promo.selected_items
//! ```
//!
//! When several promotions match, the first one in the slice wins. Callers
//! pass promotions in the gateway's list order (start date descending, then
//! id ascending), so the newest promotion takes precedence.

use chrono::NaiveDate;

use crate::money::{Money, Percent};
use crate::types::{Promotion, PromotionType};

impl Promotion {
    /// Whether this promotion currently applies to `product_id`.
    pub fn is_active_for(&self, product_id: &str, today: NaiveDate) -> bool {
        self.is_active
            && self.start_date <= today
            && self.end_date.map_or(true, |end| end >= today)
            && self.selected_items.iter().any(|id| id == product_id)
    }

    /// Discount for `qty` units at `unit_price`, clamped to the line total.
    ///
    /// ```rust
    /// use barpos_core::money::Money;
    /// # use barpos_core::types::{Promotion, PromotionType};
    /// # use chrono::NaiveDate;
    /// # use rust_decimal::Decimal;
    /// let promo = Promotion {
    ///     id: "p1".into(),
    ///     name: "Ten off".into(),
    ///     description: None,
    ///     promotion_type: PromotionType::Percentage,
    ///     value: Decimal::from(10),
    ///     start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    ///     end_date: None,
    ///     is_active: true,
    ///     selected_items: vec![],
    /// };
    /// assert_eq!(promo.discount_for(Money::from_major(1000), 2), Money::from_major(200));
    /// ```
    pub fn discount_for(&self, unit_price: Money, qty: u32) -> Money {
        let line_raw = unit_price * qty;
        let discount = match self.promotion_type {
            PromotionType::Percentage => unit_price.percent_of(Percent::new(self.value)) * qty,
            PromotionType::Fixed => Money::new(self.value) * qty,
        };
        discount.min(line_raw)
    }
}

/// First promotion in `promotions` active for `product_id` on `today`.
pub fn find_active_promotion<'a>(
    promotions: &'a [Promotion],
    product_id: &str,
    today: NaiveDate,
) -> Option<&'a Promotion> {
    promotions
        .iter()
        .find(|promo| promo.is_active_for(product_id, today))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn promo(id: &str, kind: PromotionType, value: i64) -> Promotion {
        Promotion {
            id: id.to_string(),
            name: format!("Promo {id}"),
            description: None,
            promotion_type: kind,
            value: Decimal::from(value),
            start_date: date(2024, 6, 1),
            end_date: Some(date(2024, 6, 30)),
            is_active: true,
            selected_items: vec!["lager".to_string()],
        }
    }

    #[test]
    fn test_active_window_is_inclusive() {
        let p = promo("a", PromotionType::Percentage, 10);

        assert!(p.is_active_for("lager", date(2024, 6, 1)));
        assert!(p.is_active_for("lager", date(2024, 6, 30)));
        assert!(!p.is_active_for("lager", date(2024, 5, 31)));
        assert!(!p.is_active_for("lager", date(2024, 7, 1)));
    }

    #[test]
    fn test_open_ended_and_inactive() {
        let mut p = promo("a", PromotionType::Fixed, 50);
        p.end_date = None;
        assert!(p.is_active_for("lager", date(2030, 1, 1)));

        p.is_active = false;
        assert!(!p.is_active_for("lager", date(2024, 6, 15)));
    }

    #[test]
    fn test_product_must_be_selected() {
        let p = promo("a", PromotionType::Percentage, 10);
        assert!(!p.is_active_for("stout", date(2024, 6, 15)));
    }

    #[test]
    fn test_first_match_wins() {
        let promos = vec![
            promo("newer", PromotionType::Fixed, 100),
            promo("older", PromotionType::Percentage, 10),
        ];
        let found = find_active_promotion(&promos, "lager", date(2024, 6, 15)).unwrap();
        assert_eq!(found.id, "newer");

        assert!(find_active_promotion(&promos, "stout", date(2024, 6, 15)).is_none());
    }

    #[test]
    fn test_discount_clamped_to_line() {
        // 150% off
        let pct = promo("a", PromotionType::Percentage, 150);
        assert_eq!(pct.discount_for(Money::from_major(400), 2), Money::from_major(800));

        // fixed value above unit price
        let fixed = promo("b", PromotionType::Fixed, 900);
        assert_eq!(fixed.discount_for(Money::from_major(500), 3), Money::from_major(1500));

        let fixed = promo("c", PromotionType::Fixed, 50);
        assert_eq!(fixed.discount_for(Money::from_major(500), 3), Money::from_major(150));
    }
}
