//! # BarPOS Terminal Library
//!
//! The register application: configuration, session, commands and the
//! operator console, wired to the SQLite persistence gateway.
//!
//! ## Module Organization
//! ```text
//! barpos_terminal/
//! ├── lib.rs          ◄─── You are here (startup & console loop)
//! ├── console.rs      ◄─── Line parsing and dispatch
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── config.rs   ◄─── Configuration from env
//! │   ├── session.rs  ◄─── Cashier, cart, checkout, timeout
//! │   └── recovery.rs ◄─── Per-cashier cart snapshots
//! ├── commands/
//! │   ├── mod.rs      ◄─── Command exports
//! │   ├── product.rs  ◄─── Menu and low stock
//! │   ├── cart.rs     ◄─── Cart manipulation
//! │   ├── sale.rs     ◄─── Payment entry, finalize, receipt
//! │   ├── config.rs   ◄─── Rates
//! │   └── bottle.rs   ◄─── Empty-bottle ledger
//! └── error.rs        ◄─── Error type for commands
//! ```

pub mod commands;
pub mod console;
pub mod error;
pub mod state;

use std::time::Instant;

use barpos_db::{Database, DbConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use console::{Console, Reply};
use state::{ConfigState, RecoveryStore, Session};

/// Runs the register until `quit` or end of input.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Terminal Startup                                  │
/// │                                                                         │
/// │  1. Initialize Logging ───────────────────────────────────────────────► │
/// │     • tracing-subscriber with env filter, to stderr                     │
/// │     • Default: info,barpos=debug,sqlx=warn (override with RUST_LOG)     │
/// │                                                                         │
/// │  2. Load Configuration ───────────────────────────────────────────────► │
/// │     • BARPOS_* environment variables over platform defaults             │
/// │                                                                         │
/// │  3. Connect to Database ──────────────────────────────────────────────► │
/// │     • SQLite with WAL mode                                              │
/// │     • Run pending migrations                                            │
/// │                                                                         │
/// │  4. Build Session ────────────────────────────────────────────────────► │
/// │     • Load catalogue, promotions, rates                                 │
/// │     • Sign in BARPOS_CASHIER_ID if set (restores saved cart)            │
/// │                                                                         │
/// │  5. Console Loop ─────────────────────────────────────────────────────► │
/// │     • select! { next stdin line, inactivity deadline }                  │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting BarPOS terminal");

    let config = ConfigState::from_env();
    std::fs::create_dir_all(&config.data_dir)?;
    if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    info!(db_path = ?config.db_path, data_dir = ?config.data_dir, "Paths determined");

    let db = Database::new(DbConfig::new(&config.db_path)).await?;
    info!("Database connected and migrations applied");

    let recovery = RecoveryStore::new(&config.data_dir);
    let mut session = Session::new(db, Some(recovery), config.session_timeout(), Instant::now());
    session.reload().await?;

    if let Some(cashier) = &config.cashier_id {
        if session.login(cashier, Instant::now())? {
            println!("Restored saved cart for {}", cashier);
        }
    }

    println!("{} register. Type help for commands.", config.store_name);
    let mut console = Console::new(session, config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let deadline = console.session().deadline();
        let idle = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match console.handle_line(&line, Instant::now()).await {
                    Reply::Print(text) if text.is_empty() => {}
                    Reply::Print(text) => println!("{}", text.trim_end()),
                    Reply::Quit => break,
                }
            }
            _ = idle => {
                if let Some(notice) = console.on_idle(Instant::now()) {
                    warn!("Inactivity timeout reached");
                    println!("{}", notice);
                }
            }
        }
    }

    console.session().gateway().close().await;
    info!("Terminal stopped");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so receipts and cart output on stdout stay clean.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=barpos_db=trace` - Trace for one crate only
/// - Default: `info,barpos=debug,sqlx=warn`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,barpos=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// =============================================================================
// Test Support
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use barpos_core::{
        is_stock_tracked_category, BottleEvent, BottleEventKind, BottleLedger, DailySummary, Money,
        Product, Promotion, PromotionType, RateSettings, Sale,
    };
    use barpos_db::{DbError, DbResult, PersistenceGateway};
    use chrono::{NaiveDate, NaiveDateTime, Utc};
    use rust_decimal::Decimal;

    use crate::state::Session;

    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    pub fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        today().and_hms_opt(h, m, s).unwrap()
    }

    /// Beer at `price`, stock 50, no deposit.
    pub fn drink(id: &str, price: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Drink {}", id),
            category: "Beer".to_string(),
            price: Money::from_major(price),
            cost_price: Money::from_major(price / 2),
            stock: 50,
            is_deposit_enabled: false,
            deposit_amount: Money::ZERO,
            is_deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn lager() -> Product {
        Product {
            name: "Lion Lager 625ml".to_string(),
            ..drink("lager", 650)
        }
    }

    pub fn deposit_beer(id: &str, price: i64, deposit: i64) -> Product {
        Product {
            is_deposit_enabled: true,
            deposit_amount: Money::from_major(deposit),
            ..drink(id, price)
        }
    }

    pub fn devilled_chicken() -> Product {
        Product {
            name: "Devilled Chicken".to_string(),
            category: "Kitchen".to_string(),
            stock: 0,
            ..drink("devilled", 1200)
        }
    }

    /// Open-ended 10% off the given products.
    pub fn happy_hour(items: &[&str]) -> Promotion {
        Promotion {
            id: "promo_happy_hour".to_string(),
            name: "Happy Hour".to_string(),
            description: None,
            promotion_type: PromotionType::Percentage,
            value: Decimal::from(10),
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end_date: None,
            is_active: true,
            selected_items: items.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Fresh directory under the system temp dir.
    pub fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "barpos-{}-{}-{}",
            name,
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    /// Session signed in as "nimal" over a fake gateway with default rates.
    pub async fn signed_in(products: Vec<Product>) -> Session<FakeGateway> {
        let gateway = FakeGateway::new(products, vec![], RateSettings::default());
        let mut session = Session::new(
            gateway,
            None,
            Duration::from_secs(600),
            std::time::Instant::now(),
        );
        session.reload().await.unwrap();
        session.login("nimal", std::time::Instant::now()).unwrap();
        session
    }

    #[derive(Default)]
    struct FakeStore {
        products: Vec<Product>,
        promotions: Vec<Promotion>,
        rates: Option<RateSettings>,
        sales: Vec<Sale>,
        ledger: BottleLedger,
    }

    /// In-memory gateway. `fail_next_sale` makes the next `record_sale`
    /// fail without writing anything.
    pub struct FakeGateway {
        store: Mutex<FakeStore>,
        fail_next_sale: AtomicBool,
    }

    impl FakeGateway {
        pub fn new(
            products: Vec<Product>,
            promotions: Vec<Promotion>,
            rates: RateSettings,
        ) -> Self {
            FakeGateway {
                store: Mutex::new(FakeStore {
                    products,
                    promotions,
                    rates: Some(rates),
                    ..FakeStore::default()
                }),
                fail_next_sale: AtomicBool::new(false),
            }
        }

        /// Lager and devilled chicken, default rates.
        pub fn stocked() -> Self {
            FakeGateway::new(
                vec![lager(), devilled_chicken()],
                vec![],
                RateSettings::default(),
            )
        }

        pub fn fail_next_sale(&self) {
            self.fail_next_sale.store(true, Ordering::SeqCst);
        }

        pub fn recorded_sales(&self) -> Vec<Sale> {
            self.store.lock().unwrap().sales.clone()
        }

        pub fn stock_of(&self, product_id: &str) -> i64 {
            let store = self.store.lock().unwrap();
            store
                .products
                .iter()
                .find(|p| p.id == product_id)
                .map(|p| p.stock)
                .unwrap()
        }

        fn set_deleted(&self, product_id: &str, deleted: bool) -> DbResult<Product> {
            let mut store = self.store.lock().unwrap();
            let product = store
                .products
                .iter_mut()
                .find(|p| p.id == product_id)
                .ok_or_else(|| DbError::not_found("Product", product_id))?;
            product.is_deleted = deleted;
            Ok(product.clone())
        }

        fn push_event(
            ledger: &mut BottleLedger,
            kind: BottleEventKind,
            quantity: u32,
            cost: Money,
            date: NaiveDateTime,
        ) -> i64 {
            ledger.total_in_hand += kind.signed_quantity(quantity);
            let id = ledger.history.len() as i64 + 1;
            ledger.history.insert(
                0,
                BottleEvent {
                    id,
                    kind,
                    quantity,
                    cost,
                    date,
                },
            );
            ledger.total_in_hand
        }
    }

    #[async_trait]
    impl PersistenceGateway for FakeGateway {
        async fn list_products(&self) -> DbResult<Vec<Product>> {
            let mut products: Vec<Product> = self
                .store
                .lock()
                .unwrap()
                .products
                .iter()
                .filter(|p| !p.is_deleted)
                .cloned()
                .collect();
            products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
            Ok(products)
        }

        async fn list_promotions(&self) -> DbResult<Vec<Promotion>> {
            Ok(self.store.lock().unwrap().promotions.clone())
        }

        async fn get_rate_settings(&self) -> DbResult<RateSettings> {
            Ok(self.store.lock().unwrap().rates.unwrap_or_default())
        }

        async fn set_rate_settings(&self, rates: &RateSettings) -> DbResult<()> {
            self.store.lock().unwrap().rates = Some(*rates);
            Ok(())
        }

        async fn record_sale(&self, sale: &Sale) -> DbResult<()> {
            if self.fail_next_sale.swap(false, Ordering::SeqCst) {
                return Err(DbError::TransactionFailed("disk I/O error".to_string()));
            }

            let mut store = self.store.lock().unwrap();
            if store.sales.iter().any(|s| s.id == sale.id) {
                return Err(DbError::duplicate("sales.id"));
            }

            let mut stock: HashMap<String, i64> = HashMap::new();
            for line in sale.lines.iter().filter(|l| is_stock_tracked_category(&l.category)) {
                *stock.entry(line.product_id.clone()).or_default() += i64::from(line.qty);
            }
            for product in store.products.iter_mut() {
                if let Some(sold) = stock.get(&product.id) {
                    product.stock -= sold;
                }
            }
            if sale.bottles_exchanged > 0 {
                Self::push_event(
                    &mut store.ledger,
                    BottleEventKind::Exchange,
                    sale.bottles_exchanged,
                    Money::ZERO,
                    sale.date,
                );
            }
            store.sales.push(sale.clone());
            Ok(())
        }

        async fn adjust_stock(&self, product_id: &str, delta: i64) -> DbResult<()> {
            let mut store = self.store.lock().unwrap();
            let product = store
                .products
                .iter_mut()
                .find(|p| p.id == product_id)
                .ok_or_else(|| DbError::not_found("Product", product_id))?;
            product.stock += delta;
            Ok(())
        }

        async fn record_bottle_event(
            &self,
            kind: BottleEventKind,
            quantity: u32,
            cost: Money,
        ) -> DbResult<i64> {
            let cost = if kind == BottleEventKind::Purchase {
                cost
            } else {
                Money::ZERO
            };
            let mut store = self.store.lock().unwrap();
            Ok(Self::push_event(&mut store.ledger, kind, quantity, cost, at(12, 0, 0)))
        }

        async fn get_bottle_ledger(&self) -> DbResult<BottleLedger> {
            Ok(self.store.lock().unwrap().ledger.clone())
        }

        async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Product>> {
            let mut products: Vec<Product> = self
                .list_products()
                .await?
                .into_iter()
                .filter(|p| p.is_stock_tracked() && p.stock < threshold)
                .collect();
            products.sort_by(|a, b| a.stock.cmp(&b.stock).then(a.name.cmp(&b.name)));
            Ok(products)
        }

        async fn archive_product(&self, product_id: &str) -> DbResult<()> {
            self.set_deleted(product_id, true).map(|_| ())
        }

        async fn restore_product(&self, product_id: &str) -> DbResult<Product> {
            self.set_deleted(product_id, false)
        }

        async fn set_promotion_active(
            &self,
            promotion_id: &str,
            active: bool,
        ) -> DbResult<Promotion> {
            let mut store = self.store.lock().unwrap();
            let promotion = store
                .promotions
                .iter_mut()
                .find(|p| p.id == promotion_id)
                .ok_or_else(|| DbError::not_found("Promotion", promotion_id))?;
            promotion.is_active = active;
            Ok(promotion.clone())
        }

        async fn get_sale(&self, sale_id: &str) -> DbResult<Option<Sale>> {
            let store = self.store.lock().unwrap();
            Ok(store.sales.iter().find(|s| s.id == sale_id).cloned())
        }

        async fn list_sales(&self, limit: u32, user_id: Option<&str>) -> DbResult<Vec<Sale>> {
            let store = self.store.lock().unwrap();
            let mut sales: Vec<Sale> = store
                .sales
                .iter()
                .filter(|s| user_id.map_or(true, |u| s.user_id == u))
                .cloned()
                .collect();
            sales.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
            sales.truncate(limit as usize);
            Ok(sales)
        }

        async fn daily_summary(&self, date: NaiveDate) -> DbResult<DailySummary> {
            let store = self.store.lock().unwrap();
            Ok(DailySummary::tally(date, &store.sales, store.ledger.total_in_hand))
        }
    }
}
