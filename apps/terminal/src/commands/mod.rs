//! # Register Commands
//!
//! Every operation the console can run against a [`Session`](crate::state::Session).
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (exports)
//! ├── product.rs   ◄─── Menu listing, low stock, restock, archive
//! ├── promotion.rs ◄─── Promotion listing, on/off
//! ├── cart.rs      ◄─── Cart manipulation
//! ├── sale.rs      ◄─── Payment entry, finalize, receipt
//! ├── report.rs    ◄─── Sales history, daily figures
//! ├── config.rs    ◄─── Configuration and rates
//! └── bottle.rs    ◄─── Empty-bottle ledger
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  Operator types                                                         │
//! │  ──────────────                                                         │
//! │  > amount 1 2000                                                        │
//! │         │                                                               │
//! │         │ (console.rs parses into Command::Amount)                      │
//! │         ▼                                                               │
//! │  fn set_payment_amount(                                                 │
//! │      session: &mut Session<G>,  ◄── owned by the console loop           │
//! │      config: &ConfigState,      ◄── currency formatting                 │
//! │      row: usize,                ◄── 1-based                             │
//! │      amount: &str,              ◄── raw operator text                   │
//! │  ) -> TerminalResult<PaymentResponse>                                   │
//! │         │                                                               │
//! │         │ (render() to text, or serde_json for --json)                  │
//! │         ▼                                                               │
//! │  Console prints the response, or "[CODE] message"                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Responses are plain `Serialize` structs with pre-formatted money so the
//! same values can be printed as text or JSON.

pub mod bottle;
pub mod cart;
pub mod config;
pub mod product;
pub mod promotion;
pub mod report;
pub mod sale;
