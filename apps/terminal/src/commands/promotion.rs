//! # Promotion Commands
//!
//! Lists promotions and switches them on or off.
//!
//! ```text
//!   promos            every promotion on file, numbered
//!   promo-off 2       stop offering promotion 2 on new lines
//!   promo-on 2        offer it again
//! ```
//!
//! Switching never touches lines already in the cart.

use std::fmt::Write as _;

use barpos_core::{Money, Percent, Promotion, PromotionType};
use barpos_db::PersistenceGateway;
use serde::Serialize;
use tracing::debug;

use crate::error::{TerminalError, TerminalResult};
use crate::state::{ConfigState, Session};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionView {
    /// 1-based number in the `promos` listing
    pub number: usize,
    pub id: String,
    pub name: String,
    /// "10%" or "LKR 50.00"
    pub discount: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub active: bool,
    pub item_count: usize,
}

impl PromotionView {
    fn new(number: usize, promotion: &Promotion, config: &ConfigState) -> Self {
        let discount = match promotion.promotion_type {
            PromotionType::Percentage => Percent::new(promotion.value).to_string(),
            PromotionType::Fixed => config.format_currency(Money::new(promotion.value)),
        };
        PromotionView {
            number,
            id: promotion.id.clone(),
            name: promotion.name.clone(),
            discount,
            start_date: promotion.start_date.to_string(),
            end_date: promotion.end_date.map(|d| d.to_string()),
            active: promotion.is_active,
            item_count: promotion.selected_items.len(),
        }
    }
}

pub fn render_promotions(promotions: &[PromotionView]) -> String {
    if promotions.is_empty() {
        return "  (no promotions)\n".to_string();
    }

    let mut out = String::new();
    for p in promotions {
        let _ = writeln!(
            out,
            "  {:>3}. {:<24} {:>12}  {} to {}  {} items  {}",
            p.number,
            p.name,
            p.discount,
            p.start_date,
            p.end_date.as_deref().unwrap_or("open"),
            p.item_count,
            if p.active { "on" } else { "off" }
        );
    }
    out
}

/// Every promotion on file, as loaded by the last reload.
pub fn list_promotions<G: PersistenceGateway>(
    session: &Session<G>,
    config: &ConfigState,
) -> Vec<PromotionView> {
    debug!("list_promotions command");
    session
        .promotions()
        .iter()
        .enumerate()
        .map(|(i, p)| PromotionView::new(i + 1, p, config))
        .collect()
}

/// Switches a promotion, named by listing number or id.
pub async fn set_promotion_active<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
    promotion_ref: &str,
    active: bool,
) -> TerminalResult<PromotionView> {
    debug!(promotion_ref = %promotion_ref, active, "set_promotion_active command");

    let promotion_id = resolve_promotion(session.promotions(), promotion_ref)?.id.clone();
    let promotion = session.set_promotion_active(&promotion_id, active).await?;

    let number = session
        .promotions()
        .iter()
        .position(|p| p.id == promotion.id)
        .map_or(0, |i| i + 1);
    Ok(PromotionView::new(number, &promotion, config))
}

fn resolve_promotion<'a>(
    promotions: &'a [Promotion],
    promotion_ref: &str,
) -> TerminalResult<&'a Promotion> {
    let promotion_ref = promotion_ref.trim();
    if promotion_ref.is_empty() {
        return Err(TerminalError::validation("promotion is required"));
    }

    if let Ok(number) = promotion_ref.parse::<usize>() {
        if let Some(promotion) = number.checked_sub(1).and_then(|i| promotions.get(i)) {
            return Ok(promotion);
        }
    }

    promotions
        .iter()
        .find(|p| p.id == promotion_ref)
        .ok_or_else(|| TerminalError::not_found("Promotion", promotion_ref))
}
