//! # State Module
//!
//! Everything the terminal keeps between console commands.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────────────────────────────┐   │
//! │  │   ConfigState    │   │  Session<G: PersistenceGateway>          │   │
//! │  │                  │   │                                          │   │
//! │  │  store_name      │   │  cashier + inactivity timer              │   │
//! │  │  currency        │   │  Cart ──► totals (pricing engine)        │   │
//! │  │  db_path         │   │  Checkout (payment rows)                 │   │
//! │  │  data_dir        │   │  catalogue / promotions / rates cache    │   │
//! │  │  timeout         │   │  gateway (Database in production)        │   │
//! │  └──────────────────┘   └────────────────────┬─────────────────────┘   │
//! │                                              │ every mutation          │
//! │                                              ▼                          │
//! │                                   ┌──────────────────────┐             │
//! │                                   │   RecoveryStore      │             │
//! │                                   │   cart_<user>.json   │             │
//! │                                   └──────────────────────┘             │
//! │                                                                         │
//! │  The console loop is the only owner of the session, so no locking.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod recovery;
mod session;

pub use config::ConfigState;
pub use recovery::{CartSnapshot, RecoveryStore};
pub use session::Session;
