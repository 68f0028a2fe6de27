//! # Bookkeeping Core
//!
//! A double-entry posting engine: a chart-of-accounts tree with five fixed
//! branches, accounts that keep date-ordered entries with running balances,
//! and a date-ordered journal of two-legged transactions.
//!
//! ## Features
//!
//! - **Posting**: inserting, moving and deleting transactions keeps every
//!   affected account's balance history consistent
//! - **Chart of accounts**: row addressing, dotted full names, cascading removal
//! - **Validation**: field-keyed errors that leave state untouched on failure
//! - **Snapshots**: cycle-free serialization with a two-phase restore
//!
//! ## Quick Start
//!
//! ```rust
//! use bookkeeping_core::{Account, AccountType, Books, TransactionBuilder};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! let mut books = Books::new();
//! let cash = books
//!     .insert_account_under("Assets", Account::named(AccountType::Asset, "Cash").unwrap())
//!     .unwrap();
//! let capital = books
//!     .insert_account_under("Equity", Account::named(AccountType::Equity, "Capital").unwrap())
//!     .unwrap();
//!
//! let investment = TransactionBuilder::new(
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     BigDecimal::from(500),
//!     cash,
//!     capital,
//! )
//! .memo("Initial investment")
//! .build();
//! books.record_transaction(&investment).unwrap();
//!
//! assert_eq!(*books.account_balance(cash).unwrap(), BigDecimal::from(500));
//! ```

pub mod config;
pub mod ledger;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use ledger::*;
pub use traits::*;
pub use types::*;

// Re-export transaction patterns for convenience
pub use ledger::transaction::patterns;
