//! Ledger module containing the chart of accounts, the journal and posting

pub mod account;
pub mod chart;
pub mod core;
pub mod journal;
pub mod snapshot;
pub mod transaction;

pub use account::*;
pub use chart::*;
pub use self::core::*;
pub use journal::*;
pub use snapshot::*;
pub use transaction::*;
