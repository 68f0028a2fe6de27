//! Traits for storage abstraction and extensibility

use async_trait::async_trait;

use crate::ledger::{LedgerEvent, LedgerSnapshot, TransactionUpdate};
use crate::types::*;

/// Storage abstraction for persisting a set of books
///
/// The core works on an in-memory graph; a backend only has to keep the
/// cycle-free [`LedgerSnapshot`] produced by [`crate::Books::snapshot`].
#[async_trait]
pub trait BooksStorage: Send + Sync {
    /// Replace the stored books with the given snapshot
    async fn save(&mut self, snapshot: &LedgerSnapshot) -> LedgerResult<()>;

    /// Load the stored books, if any were saved
    async fn load(&self) -> LedgerResult<Option<LedgerSnapshot>>;
}

/// Trait for implementing custom account validation rules
pub trait AccountValidator: Send + Sync {
    /// Validate the identity fields an account update would set
    fn validate_identity(&self, number: i32, name: &str, description: &str) -> ValidationErrors;
}

/// Trait for implementing custom transaction validation rules
pub trait TransactionValidator: Send + Sync {
    /// Validate an update against the two accounts it would post into
    fn validate_update(
        &self,
        update: &TransactionUpdate,
        debit_account: &Account,
        credit_account: &Account,
    ) -> ValidationErrors;
}

/// Receives a notification after every successful mutation of the books
pub trait LedgerObserver {
    fn on_change(&self, event: &LedgerEvent);
}

impl<F> LedgerObserver for F
where
    F: Fn(&LedgerEvent),
{
    fn on_change(&self, event: &LedgerEvent) {
        self(event)
    }
}
