//! # BarPOS Terminal Entry Point
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        BarPOS Register                                  │
//! │                                                                         │
//! │   stdin ──► console.rs ──► commands/ ──► Session ──► barpos-core        │
//! │                                             │                           │
//! │                                             ▼                           │
//! │                                     PersistenceGateway                  │
//! │                                     (barpos-db, SQLite)                 │
//! │                                                                         │
//! │   stdout ◄── carts, payment entry, receipts                             │
//! │   stderr ◄── tracing logs                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The actual setup is in lib.rs for testability.

#[tokio::main]
async fn main() {
    if let Err(e) = barpos_terminal::run().await {
        eprintln!("barpos: {}", e);
        std::process::exit(1);
    }
}
