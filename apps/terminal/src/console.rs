//! # Operator Console
//!
//! Line-oriented front end for the register. Each input line is parsed
//! into a [`Command`], run against the session and answered with text
//! (or JSON after `json on`).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stdin line ──► Command::from_str ──► Console::execute ──► commands::*  │
//! │                       │                      │                          │
//! │                  [VALIDATION_ERROR]     touch timer                     │
//! │                                              │                          │
//! │                                     render() / serde_json ──► stdout    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No error ends the loop; only `quit` (or end of input) does.

use std::str::FromStr;
use std::time::Instant;

use barpos_db::PersistenceGateway;
use chrono::Local;
use serde::Serialize;
use tracing::{debug, info};

use crate::commands::{bottle, cart, config, product, promotion, report, sale};
use crate::error::{TerminalError, TerminalResult};
use crate::state::{ConfigState, Session};

pub const HELP: &str = "\
Session
  login <cashier>            sign in (restores a saved cart)
  logout                     sign out and drop the cart
Catalogue
  products                   list the menu
  low-stock                  products below the stock threshold
  reload                     reload products, promotions and rates
  restock <n|product id> <+/-qty>
  archive <n|product id>     take a product off the menu
  unarchive <product id>     put an archived product back
Promotions
  promos                     list promotions
  promo-on <n|id>            offer a promotion on new lines
  promo-off <n|id>           stop offering it
Cart
  add <n|product id>         add one unit
  qty <line> <qty>           set quantity
  inc <line> / dec <line>    +1 / -1
  rm <line>                  remove a line
  deposit <line>             toggle bottle deposit CHARGE/EXCHANGE
  promo <line>               toggle the line's promotion
  clear                      empty the cart
  show                       show the cart
Checkout
  checkout                   open payment entry
  pay <method> [amount]      add a payment row (cash, card, online)
  amount <row> [amount]      set or blank a row's amount
  method <row> <method>      change a row's method
  unpay <row>                remove a payment row
  payments                   show payment entry
  finalize                   record the sale and print the receipt
  cancel                     leave payment entry
Settings
  rates                      show configuration and rates
  set-rates <sc%> <tax%>     change service charge and tax
Bottles
  bottles                    ledger and history
  bottle purchase <qty> <cost>
  bottle return <qty>
  bottle out <qty>
Reports
  sales [cashier]            latest sales
  sale <invoice>             reprint a receipt
  today                      today's takings
Other
  json on|off                print responses as JSON
  help                       this text
  quit                       exit";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(String),
    Logout,
    Products,
    LowStock,
    Reload,
    Restock { product: String, delta: i64 },
    Archive(String),
    Unarchive(String),
    Promos,
    PromoSwitch { promotion: String, active: bool },
    Add(String),
    Qty { line: u32, qty: u32 },
    Inc(u32),
    Dec(u32),
    Remove(u32),
    Deposit(u32),
    Promo(u32),
    Clear,
    Show,
    Checkout,
    Pay { method: String, amount: Option<String> },
    Amount { row: usize, amount: String },
    Method { row: usize, method: String },
    Unpay(usize),
    Payments,
    Finalize,
    Cancel,
    Rates,
    SetRates { service_charge: String, tax: String },
    Bottles,
    Bottle { kind: String, quantity: String, cost: Option<String> },
    Sales(Option<String>),
    Sale(String),
    Today,
    Json(bool),
    Help,
    Quit,
}

fn arg<'a>(args: &[&'a str], i: usize, what: &str) -> TerminalResult<&'a str> {
    args.get(i)
        .copied()
        .ok_or_else(|| TerminalError::validation(format!("{} is required", what)))
}

fn number<T: FromStr>(args: &[&str], i: usize, what: &str) -> TerminalResult<T> {
    let text = arg(args, i, what)?;
    text.parse().map_err(|_| {
        TerminalError::validation(format!("{} must be a whole number, got '{}'", what, text))
    })
}

impl FromStr for Command {
    type Err = TerminalError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words
            .next()
            .ok_or_else(|| TerminalError::validation("empty command"))?
            .to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        let command = match name.as_str() {
            "login" => Command::Login(arg(&args, 0, "cashier id")?.to_string()),
            "logout" => Command::Logout,
            "products" | "menu" => Command::Products,
            "low-stock" => Command::LowStock,
            "reload" => Command::Reload,
            "restock" => Command::Restock {
                product: arg(&args, 0, "product")?.to_string(),
                delta: number(&args, 1, "stock change")?,
            },
            "archive" => Command::Archive(arg(&args, 0, "product")?.to_string()),
            "unarchive" => Command::Unarchive(arg(&args, 0, "product id")?.to_string()),
            "promos" | "promotions" => Command::Promos,
            "promo-on" | "promo-off" => Command::PromoSwitch {
                promotion: arg(&args, 0, "promotion")?.to_string(),
                active: name == "promo-on",
            },
            "add" => Command::Add(arg(&args, 0, "product")?.to_string()),
            "qty" => Command::Qty {
                line: number(&args, 0, "line")?,
                qty: number(&args, 1, "quantity")?,
            },
            "inc" => Command::Inc(number(&args, 0, "line")?),
            "dec" => Command::Dec(number(&args, 0, "line")?),
            "rm" | "remove" => Command::Remove(number(&args, 0, "line")?),
            "deposit" => Command::Deposit(number(&args, 0, "line")?),
            "promo" => Command::Promo(number(&args, 0, "line")?),
            "clear" => Command::Clear,
            "show" | "cart" => Command::Show,
            "checkout" => Command::Checkout,
            "pay" => {
                // "online transfer 500" is two method words
                let (method, amount) = match args.as_slice() {
                    [] => return Err(TerminalError::validation("payment method is required")),
                    [m1, m2, rest @ ..] if m2.eq_ignore_ascii_case("transfer") => {
                        (format!("{} {}", m1, m2), rest.first().map(|a| a.to_string()))
                    }
                    [method, rest @ ..] => {
                        (method.to_string(), rest.first().map(|a| a.to_string()))
                    }
                };
                Command::Pay { method, amount }
            }
            "amount" => Command::Amount {
                row: number(&args, 0, "row")?,
                amount: args.get(1).copied().unwrap_or("").to_string(),
            },
            "method" => Command::Method {
                row: number(&args, 0, "row")?,
                method: args.get(1..).map(|m| m.join(" ")).unwrap_or_default(),
            },
            "unpay" => Command::Unpay(number(&args, 0, "row")?),
            "payments" => Command::Payments,
            "finalize" => Command::Finalize,
            "cancel" => Command::Cancel,
            "rates" | "config" => Command::Rates,
            "set-rates" => Command::SetRates {
                service_charge: arg(&args, 0, "service charge rate")?.to_string(),
                tax: arg(&args, 1, "tax rate")?.to_string(),
            },
            "bottles" => Command::Bottles,
            "bottle" => Command::Bottle {
                kind: arg(&args, 0, "bottle movement")?.to_string(),
                quantity: arg(&args, 1, "bottle quantity")?.to_string(),
                cost: args.get(2).map(|c| c.to_string()),
            },
            "sales" => Command::Sales(args.first().map(|c| c.to_string())),
            "sale" | "reprint" => Command::Sale(arg(&args, 0, "invoice number")?.to_string()),
            "today" => Command::Today,
            "json" => match arg(&args, 0, "on/off")?.to_ascii_lowercase().as_str() {
                "on" => Command::Json(true),
                "off" => Command::Json(false),
                other => {
                    return Err(TerminalError::validation(format!(
                        "json expects on or off, got '{}'",
                        other
                    )))
                }
            },
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => {
                return Err(TerminalError::validation(format!(
                    "unknown command '{}', type help",
                    other
                )))
            }
        };
        Ok(command)
    }
}

/// What the loop should do after a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Print(String),
    Quit,
}

/// The session plus presentation settings.
pub struct Console<G: PersistenceGateway> {
    session: Session<G>,
    config: ConfigState,
    json: bool,
}

impl<G: PersistenceGateway> Console<G> {
    pub fn new(session: Session<G>, config: ConfigState) -> Self {
        Console {
            session,
            config,
            json: false,
        }
    }

    pub fn session(&self) -> &Session<G> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<G> {
        &mut self.session
    }

    /// Handles one input line.
    ///
    /// An idle session is expired before the command runs, so a late
    /// command never touches a cart that should already be gone.
    pub async fn handle_line(&mut self, line: &str, now: Instant) -> Reply {
        let line = line.trim();
        if line.is_empty() {
            return Reply::Print(String::new());
        }

        let mut notice = String::new();
        if self.session.expire_if_idle(now) {
            notice.push_str("Session timed out; cart cleared. Sign in again.\n");
        }
        self.session.touch(now);

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => return Reply::Print(format!("{}{}", notice, e)),
        };
        if command == Command::Quit {
            return Reply::Quit;
        }

        debug!(?command, "Console command");
        match self.execute(command, now).await {
            Ok(text) => Reply::Print(format!("{}{}", notice, text)),
            Err(e) => Reply::Print(format!("{}{}", notice, e)),
        }
    }

    /// Called when the inactivity deadline passes with no input.
    pub fn on_idle(&mut self, now: Instant) -> Option<String> {
        self.session
            .expire_if_idle(now)
            .then(|| "Session timed out; cart cleared. Sign in again.".to_string())
    }

    async fn execute(&mut self, command: Command, now: Instant) -> TerminalResult<String> {
        let config = &self.config;
        let session = &mut self.session;
        let json = self.json;

        match command {
            Command::Login(user_id) => {
                let restored = session.login(&user_id, now)?;
                let mut text = format!("Signed in as {}\n", user_id.trim());
                if restored {
                    text.push_str("Restored saved cart\n");
                    text.push_str(&cart::get_cart(session, config).render());
                }
                Ok(text)
            }
            Command::Logout => {
                session.logout();
                Ok("Signed out".to_string())
            }
            Command::Products => {
                let products = product::list_products(session, config);
                show(json, &products, || product::render_products(&products))
            }
            Command::LowStock => {
                let products = product::low_stock(session, config).await?;
                show(json, &products, || product::render_products(&products))
            }
            Command::Reload => {
                let products = product::reload_catalog(session, config).await?;
                show(json, &products, || product::render_products(&products))
            }
            Command::Restock {
                product: product_ref,
                delta,
            } => {
                let response =
                    product::restock_product(session, config, &product_ref, delta).await?;
                show(json, &response, || response.render())
            }
            Command::Archive(product_ref) => {
                let response = product::archive_product(session, config, &product_ref).await?;
                show(json, &response, || response.render())
            }
            Command::Unarchive(product_id) => {
                let response = product::restore_product(session, config, &product_id).await?;
                show(json, &response, || response.render())
            }
            Command::Promos => {
                let promotions = promotion::list_promotions(session, config);
                show(json, &promotions, || promotion::render_promotions(&promotions))
            }
            Command::PromoSwitch {
                promotion: promotion_ref,
                active,
            } => {
                let view = promotion::set_promotion_active(session, config, &promotion_ref, active)
                    .await?;
                show(json, &view, || promotion::render_promotions(std::slice::from_ref(&view)))
            }
            Command::Add(product_ref) => {
                let today = Local::now().date_naive();
                let cart = cart::add_to_cart(session, config, &product_ref, today)?;
                show(json, &cart, || cart.render())
            }
            Command::Qty { line, qty } => {
                let cart = cart::update_cart_line(session, config, line, qty)?;
                show(json, &cart, || cart.render())
            }
            Command::Inc(line) => {
                let cart = cart::increment_line(session, config, line)?;
                show(json, &cart, || cart.render())
            }
            Command::Dec(line) => {
                let cart = cart::decrement_line(session, config, line)?;
                show(json, &cart, || cart.render())
            }
            Command::Remove(line) => {
                let cart = cart::remove_from_cart(session, config, line)?;
                show(json, &cart, || cart.render())
            }
            Command::Deposit(line) => {
                let cart = cart::toggle_deposit(session, config, line)?;
                show(json, &cart, || cart.render())
            }
            Command::Promo(line) => {
                let cart = cart::toggle_promo(session, config, line)?;
                show(json, &cart, || cart.render())
            }
            Command::Clear => {
                let cart = cart::clear_cart(session, config)?;
                show(json, &cart, || cart.render())
            }
            Command::Show => {
                let cart = cart::get_cart(session, config);
                show(json, &cart, || cart.render())
            }
            Command::Checkout => {
                let payments = sale::begin_checkout(session, config)?;
                show(json, &payments, || payments.render())
            }
            Command::Pay { method, amount } => {
                let payments = sale::add_payment(session, config, &method, amount.as_deref())?;
                show(json, &payments, || payments.render())
            }
            Command::Amount { row, amount } => {
                let payments = sale::set_payment_amount(session, config, row, &amount)?;
                show(json, &payments, || payments.render())
            }
            Command::Method { row, method } => {
                let payments = sale::set_payment_method(session, config, row, &method)?;
                show(json, &payments, || payments.render())
            }
            Command::Unpay(row) => {
                let payments = sale::remove_payment(session, config, row)?;
                show(json, &payments, || payments.render())
            }
            Command::Payments => {
                let payments = sale::get_payments(session, config)?;
                show(json, &payments, || payments.render())
            }
            Command::Finalize => {
                let now = Local::now().naive_local();
                let receipt = sale::finalize_sale(session, config, now).await?;
                show(json, &receipt, || receipt.text.clone())
            }
            Command::Cancel => {
                sale::cancel_checkout(session)?;
                let cart = cart::get_cart(session, config);
                show(json, &cart, || format!("Payment entry cancelled\n{}", cart.render()))
            }
            Command::Rates => {
                let response = config::get_config(session, config);
                show(json, &response, || response.render())
            }
            Command::SetRates {
                service_charge,
                tax,
            } => {
                let response = config::set_rates(session, config, &service_charge, &tax).await?;
                show(json, &response, || response.render())
            }
            Command::Bottles => {
                let ledger = bottle::get_bottle_ledger(session, config).await?;
                show(json, &ledger, || ledger.render())
            }
            Command::Bottle {
                kind,
                quantity,
                cost,
            } => {
                let ledger =
                    bottle::record_bottle_event(session, config, &kind, &quantity, cost.as_deref())
                        .await?;
                show(json, &ledger, || ledger.render())
            }
            Command::Sales(cashier) => {
                let sales = report::list_sales(session, config, cashier.as_deref()).await?;
                show(json, &sales, || report::render_sales(&sales))
            }
            Command::Sale(sale_id) => {
                let receipt = report::show_sale(session, config, &sale_id).await?;
                show(json, &receipt, || receipt.text.clone())
            }
            Command::Today => {
                let today = Local::now().date_naive();
                let summary = report::daily_summary(session, config, today).await?;
                show(json, &summary, || summary.render())
            }
            Command::Json(on) => {
                self.json = on;
                info!(json = on, "Console output mode changed");
                Ok(format!("JSON output {}", if on { "on" } else { "off" }))
            }
            Command::Help => Ok(HELP.to_string()),
            Command::Quit => Ok(String::new()),
        }
    }
}

fn show<T: Serialize>(
    json: bool,
    value: &T,
    text: impl FnOnce() -> String,
) -> TerminalResult<String> {
    if json {
        serde_json::to_string_pretty(value).map_err(|e| TerminalError::internal(e.to_string()))
    } else {
        Ok(text())
    }
}
