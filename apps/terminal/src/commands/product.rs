//! # Product Commands
//!
//! Menu listing, low-stock report and catalogue upkeep (restock,
//! archive, unarchive).
//!
//! ## Product References
//! The operator can name a product two ways:
//! - by its 1-based number in the `products` listing (`add 3`)
//! - by its id (`add prod_1f0c...`)
//!
//! Numbers refer to the cached catalogue, which is reloaded after every
//! sale and on `reload`.

use std::fmt::Write as _;

use barpos_core::Product;
use barpos_db::PersistenceGateway;
use serde::Serialize;
use tracing::debug;

use crate::error::{TerminalError, TerminalResult};
use crate::state::{ConfigState, Session};

/// Product as listed on the register menu.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    /// 1-based menu number
    pub number: usize,
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: String,
    pub stock: i64,
    pub deposit: Option<String>,
    pub stock_tracked: bool,
}

impl ProductView {
    fn new(number: usize, product: &Product, config: &ConfigState) -> Self {
        ProductView {
            number,
            id: product.id.clone(),
            name: product.name.clone(),
            category: product.category.clone(),
            price: config.format_currency(product.price),
            stock: product.stock,
            deposit: product
                .is_deposit_enabled
                .then(|| config.format_currency(product.deposit_amount)),
            stock_tracked: product.is_stock_tracked(),
        }
    }
}

/// Renders a product listing, one line per product.
pub fn render_products(products: &[ProductView]) -> String {
    if products.is_empty() {
        return "  (no products)\n".to_string();
    }

    let mut out = String::new();
    for p in products {
        let stock = if p.stock_tracked {
            p.stock.to_string()
        } else {
            "-".to_string()
        };
        let _ = write!(
            out,
            "  {:>3}. {:<28} {:<12} {:>14}  stock {:>5}",
            p.number, p.name, p.category, p.price, stock
        );
        if let Some(deposit) = &p.deposit {
            let _ = write!(out, "  deposit {}", deposit);
        }
        out.push('\n');
    }
    out
}

/// Finds a catalogue product by menu number or id.
pub fn resolve_product<'a>(
    catalog: &'a [Product],
    product_ref: &str,
) -> TerminalResult<&'a Product> {
    let product_ref = product_ref.trim();
    if product_ref.is_empty() {
        return Err(TerminalError::validation("product is required"));
    }

    if let Ok(number) = product_ref.parse::<usize>() {
        if let Some(product) = number.checked_sub(1).and_then(|i| catalog.get(i)) {
            return Ok(product);
        }
    }

    catalog
        .iter()
        .find(|p| p.id == product_ref)
        .ok_or_else(|| TerminalError::not_found("Product", product_ref))
}

/// Lists sellable products, ordered by name.
pub fn list_products<G: PersistenceGateway>(
    session: &Session<G>,
    config: &ConfigState,
) -> Vec<ProductView> {
    debug!("list_products command");
    session
        .catalog()
        .iter()
        .enumerate()
        .map(|(i, p)| ProductView::new(i + 1, p, config))
        .collect()
}

/// Products below the configured stock threshold, lowest first.
pub async fn low_stock<G: PersistenceGateway>(
    session: &Session<G>,
    config: &ConfigState,
) -> TerminalResult<Vec<ProductView>> {
    debug!(threshold = config.low_stock_threshold, "low_stock command");

    let products = session.low_stock(config.low_stock_threshold).await?;
    Ok(products
        .iter()
        .enumerate()
        .map(|(i, p)| ProductView::new(i + 1, p, config))
        .collect())
}

/// Reloads catalogue, promotions and rates.
pub async fn reload_catalog<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
) -> TerminalResult<Vec<ProductView>> {
    debug!("reload_catalog command");
    session.reload().await?;
    Ok(list_products(session, config))
}

/// One product after a stock or archive change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductChangeResponse {
    pub message: String,
    pub product: ProductView,
}

impl ProductChangeResponse {
    pub fn render(&self) -> String {
        format!("  {}\n", self.message)
    }
}

/// Receives or writes off stock for a bar product.
///
/// ## Arguments
/// * `product_ref` - menu number or id
/// * `delta` - units received (positive) or written off (negative)
pub async fn restock_product<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
    product_ref: &str,
    delta: i64,
) -> TerminalResult<ProductChangeResponse> {
    debug!(product_ref = %product_ref, delta, "restock_product command");

    let product_id = resolve_product(session.catalog(), product_ref)?.id.clone();
    let stock = session.restock(&product_id, delta).await?;

    let (number, product) = catalogue_entry(session, &product_id)?;
    Ok(ProductChangeResponse {
        message: format!("{} stock now {}", product.name, stock),
        product: ProductView::new(number, product, config),
    })
}

/// Takes a product off the menu. Menu numbers shift afterwards.
pub async fn archive_product<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
    product_ref: &str,
) -> TerminalResult<ProductChangeResponse> {
    debug!(product_ref = %product_ref, "archive_product command");

    let product = resolve_product(session.catalog(), product_ref)?.clone();
    session.archive_product(&product.id).await?;

    Ok(ProductChangeResponse {
        message: format!("Archived {} ({})", product.name, product.id),
        product: ProductView::new(0, &product, config),
    })
}

/// Puts an archived product back on the menu. Archived products have no
/// menu number, so only the id works here.
pub async fn restore_product<G: PersistenceGateway>(
    session: &mut Session<G>,
    config: &ConfigState,
    product_id: &str,
) -> TerminalResult<ProductChangeResponse> {
    debug!(product_id = %product_id, "restore_product command");

    let product_id = product_id.trim();
    if product_id.is_empty() {
        return Err(TerminalError::validation("product id is required"));
    }
    session.restore_product(product_id).await?;

    let (number, product) = catalogue_entry(session, product_id)?;
    Ok(ProductChangeResponse {
        message: format!("{} is back on the menu as number {}", product.name, number),
        product: ProductView::new(number, product, config),
    })
}

fn catalogue_entry<'a, G: PersistenceGateway>(
    session: &'a Session<G>,
    product_id: &str,
) -> TerminalResult<(usize, &'a Product)> {
    session
        .catalog()
        .iter()
        .enumerate()
        .find(|(_, p)| p.id == product_id)
        .map(|(i, p)| (i + 1, p))
        .ok_or_else(|| TerminalError::not_found("Product", product_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::{devilled_chicken, lager, signed_in};

    #[test]
    fn test_resolve_by_number_or_id() {
        let catalog = vec![devilled_chicken(), lager()];
        assert_eq!(resolve_product(&catalog, "2").unwrap().id, "lager");
        assert_eq!(resolve_product(&catalog, " devilled ").unwrap().id, "devilled");

        let err = resolve_product(&catalog, "3").unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        let err = resolve_product(&catalog, "0").unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        let err = resolve_product(&catalog, "").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_kitchen_stock_not_shown() {
        let config = ConfigState::default();
        let session = signed_in(vec![devilled_chicken(), lager()]).await;

        let products = list_products(&session, &config);
        assert!(!products[0].stock_tracked);
        let text = render_products(&products);
        assert!(text.contains("stock     -"));
        assert!(text.contains("stock    50"));
    }

    #[tokio::test]
    async fn test_low_stock_uses_threshold() {
        let mut config = ConfigState::default();
        let session = signed_in(vec![lager()]).await;

        assert!(low_stock(&session, &config).await.unwrap().is_empty());
        config.low_stock_threshold = 51;
        let low = low_stock(&session, &config).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, "lager");
    }

    #[tokio::test]
    async fn test_restock_by_menu_number() {
        let config = ConfigState::default();
        let mut session = signed_in(vec![devilled_chicken(), lager()]).await;

        let response = restock_product(&mut session, &config, "2", 24).await.unwrap();
        assert_eq!(response.product.stock, 74);
        assert_eq!(response.render(), "  Lion Lager 625ml stock now 74\n");
        assert_eq!(session.gateway().stock_of("lager"), 74);

        let err = restock_product(&mut session, &config, "1", 5).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_archive_then_unarchive() {
        let config = ConfigState::default();
        let mut session = signed_in(vec![devilled_chicken(), lager()]).await;

        let response = archive_product(&mut session, &config, "1").await.unwrap();
        assert_eq!(response.product.id, "devilled");
        assert_eq!(list_products(&session, &config).len(), 1);

        let err = restore_product(&mut session, &config, "1").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let response = restore_product(&mut session, &config, "devilled").await.unwrap();
        assert_eq!(response.product.number, 1);
        assert!(response.render().contains("back on the menu as number 1"));
    }
}
