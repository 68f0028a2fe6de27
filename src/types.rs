//! Core types and data structures for the bookkeeping system

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing identifier (used when restoring snapshots)
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

entity_id!(
    /// Stable identity of an account inside a [`crate::GeneralLedger`]
    AccountId
);
entity_id!(
    /// Stable identity of a transaction inside a [`crate::Journal`]
    TransactionId
);

/// Account types following standard accounting principles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Assets - what the business owns (Cash, Inventory, Equipment, etc.)
    Asset,
    /// Liabilities - what the business owes (Loans, Accounts Payable, etc.)
    Liability,
    /// Equity - owner's interest in the business (Capital, Retained Earnings, etc.)
    Equity,
    /// Revenue - money earned by the business
    Revenue,
    /// Expenses - costs incurred by the business
    Expense,
}

impl AccountType {
    /// The five branches of the chart of accounts, in row order
    pub const ALL: [AccountType; 5] = [
        AccountType::Asset,
        AccountType::Liability,
        AccountType::Equity,
        AccountType::Revenue,
        AccountType::Expense,
    ];

    /// Returns the normal balance type for this account type
    /// Assets and Expenses normally have debit balances
    /// Liabilities, Equity, and Revenue normally have credit balances
    pub fn normal_balance(&self) -> EntryType {
        match self {
            AccountType::Asset | AccountType::Expense => EntryType::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Revenue => {
                EntryType::Credit
            }
        }
    }

    /// Apply one entry to a running balance using this type's sign convention
    pub fn apply_entry(
        &self,
        balance: &mut BigDecimal,
        entry_type: EntryType,
        amount: &BigDecimal,
    ) {
        if self.normal_balance() == entry_type {
            *balance += amount;
        } else {
            *balance -= amount;
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            AccountType::Asset => "asset",
            AccountType::Liability => "liability",
            AccountType::Equity => "equity",
            AccountType::Revenue => "revenue",
            AccountType::Expense => "expense",
        };
        f.write_str(tag)
    }
}

impl FromStr for AccountType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asset" | "assets" => Ok(AccountType::Asset),
            "liability" | "liabilities" => Ok(AccountType::Liability),
            "equity" => Ok(AccountType::Equity),
            "revenue" | "income" => Ok(AccountType::Revenue),
            "expense" | "expenses" => Ok(AccountType::Expense),
            _ => Err(LedgerError::InvalidAccountType(s.to_string())),
        }
    }
}

/// Types of entries in double-entry bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    /// Debit entry - increases Assets and Expenses, decreases Liabilities, Equity, and Revenue
    Debit,
    /// Credit entry - increases Liabilities, Equity, and Revenue, decreases Assets and Expenses
    Credit,
}

/// Address of one posted entry: a transaction has exactly one entry per side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryRef {
    pub transaction: TransactionId,
    pub entry_type: EntryType,
}

impl EntryRef {
    pub fn new(transaction: TransactionId, entry_type: EntryType) -> Self {
        Self {
            transaction,
            entry_type,
        }
    }
}

/// A ledger bucket tracking a running balance from its posted entries
#[derive(Debug, Clone)]
pub struct Account {
    pub(crate) id: AccountId,
    pub(crate) account_type: AccountType,
    /// Advisory identifier, -1 when unset
    pub(crate) number: i32,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) balance: BigDecimal,
    pub(crate) transactions_enabled: bool,
    /// Date-ascending by the owning transaction's date
    pub(crate) entries: Vec<EntryRef>,
}

impl Account {
    /// Create an empty account of the given type that accepts transactions
    pub fn new(account_type: AccountType) -> Self {
        Self {
            id: AccountId::new(),
            account_type,
            number: -1,
            name: String::new(),
            description: String::new(),
            balance: BigDecimal::from(0),
            transactions_enabled: true,
            entries: Vec::new(),
        }
    }

    /// Create an account and set its identity fields, validating them
    pub fn named(account_type: AccountType, name: &str) -> LedgerResult<Self> {
        let mut account = Self::new(account_type);
        account.update(-1, name, "")?;
        Ok(account)
    }

    /// Set whether the account accepts postings. Disabling clears any entries.
    pub fn with_transactions_enabled(mut self, enabled: bool) -> Self {
        if !enabled && !self.entries.is_empty() {
            tracing::warn!(
                account = %self.id,
                entries = self.entries.len(),
                "dropping entries of an account that does not accept transactions"
            );
            self.entries.clear();
            self.balance = BigDecimal::from(0);
        }
        self.transactions_enabled = enabled;
        self
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    pub fn number(&self) -> i32 {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Balance after the last entry in date order
    pub fn balance(&self) -> &BigDecimal {
        &self.balance
    }

    pub fn transactions_enabled(&self) -> bool {
        self.transactions_enabled
    }

    pub fn entries(&self) -> &[EntryRef] {
        &self.entries
    }
}

/// One half (debit or credit) of a transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionEntry {
    pub(crate) entry_type: EntryType,
    pub(crate) transaction: TransactionId,
    /// The counterparty account, `None` while the transaction is unposted
    pub(crate) transfer_account: Option<AccountId>,
    /// Owning account's balance right after this entry was applied
    pub(crate) account_balance: BigDecimal,
}

impl TransactionEntry {
    pub(crate) fn new(transaction: TransactionId, entry_type: EntryType) -> Self {
        Self {
            entry_type,
            transaction,
            transfer_account: None,
            account_balance: BigDecimal::from(0),
        }
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn transaction(&self) -> TransactionId {
        self.transaction
    }

    pub fn transfer_account(&self) -> Option<AccountId> {
        self.transfer_account
    }

    pub fn account_balance(&self) -> &BigDecimal {
        &self.account_balance
    }
}

/// A paired debit and credit movement of one amount between two accounts
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub(crate) id: TransactionId,
    pub(crate) date: NaiveDate,
    pub(crate) ref_no: String,
    pub(crate) memo: String,
    pub(crate) amount: BigDecimal,
    pub(crate) debit_account: Option<AccountId>,
    pub(crate) credit_account: Option<AccountId>,
    pub(crate) debit_entry: TransactionEntry,
    pub(crate) credit_entry: TransactionEntry,
}

impl Transaction {
    /// Create a fresh, unposted transaction with zero-filled entries
    pub fn new() -> Self {
        Self::with_id(TransactionId::new())
    }

    pub(crate) fn with_id(id: TransactionId) -> Self {
        Self {
            id,
            date: chrono::Utc::now().date_naive(),
            ref_no: String::new(),
            memo: String::new(),
            amount: BigDecimal::from(0),
            debit_account: None,
            credit_account: None,
            debit_entry: TransactionEntry::new(id, EntryType::Debit),
            credit_entry: TransactionEntry::new(id, EntryType::Credit),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn ref_no(&self) -> &str {
        &self.ref_no
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    pub fn amount(&self) -> &BigDecimal {
        &self.amount
    }

    /// Account holding the debit entry
    pub fn debit_account(&self) -> Option<AccountId> {
        self.debit_account
    }

    /// Account holding the credit entry
    pub fn credit_account(&self) -> Option<AccountId> {
        self.credit_account
    }

    pub fn debit_entry(&self) -> &TransactionEntry {
        &self.debit_entry
    }

    pub fn credit_entry(&self) -> &TransactionEntry {
        &self.credit_entry
    }

    pub fn entry(&self, entry_type: EntryType) -> &TransactionEntry {
        match entry_type {
            EntryType::Debit => &self.debit_entry,
            EntryType::Credit => &self.credit_entry,
        }
    }

    pub(crate) fn entry_mut(&mut self, entry_type: EntryType) -> &mut TransactionEntry {
        match entry_type {
            EntryType::Debit => &mut self.debit_entry,
            EntryType::Credit => &mut self.credit_entry,
        }
    }

    /// The account an entry of the given side is posted into
    pub fn account_for(&self, entry_type: EntryType) -> Option<AccountId> {
        match entry_type {
            EntryType::Debit => self.debit_account,
            EntryType::Credit => self.credit_account,
        }
    }

    /// Whether both entries currently sit in their accounts
    pub fn is_posted(&self) -> bool {
        self.debit_account.is_some() && self.credit_account.is_some()
    }

    /// Whether either side of the transaction touches the account
    pub fn touches(&self, account: AccountId) -> bool {
        self.debit_account == Some(account) || self.credit_account == Some(account)
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

/// Fields that can fail user-facing validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValidationField {
    AccountNumber,
    AccountName,
    TransactionAmount,
    DebitAccount,
    CreditAccount,
}

impl fmt::Display for ValidationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValidationField::AccountNumber => "number",
            ValidationField::AccountName => "name",
            ValidationField::TransactionAmount => "amount",
            ValidationField::DebitAccount => "debit account",
            ValidationField::CreditAccount => "credit account",
        };
        f.write_str(name)
    }
}

/// Why a field was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum ValidationErrorKind {
    #[error("account number must be -1 (unset) or positive")]
    NegativeAccountNumber,
    #[error("account name cannot be empty")]
    EmptyAccountName,
    #[error("account name must be words separated by single spaces")]
    NotAlphanumericAccountName,
    #[error("transaction amount cannot be negative")]
    NegativeTransactionAmount,
    #[error("account does not accept transactions")]
    NotTransactionnableAccount,
}

/// Field-keyed validation failures, returned instead of raised
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors(BTreeMap<ValidationField, ValidationErrorKind>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure; the first failure per field wins
    pub fn insert(&mut self, field: ValidationField, kind: ValidationErrorKind) {
        self.0.entry(field).or_insert(kind);
    }

    pub fn get(&self, field: ValidationField) -> Option<ValidationErrorKind> {
        self.0.get(&field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ValidationField, ValidationErrorKind)> + '_ {
        self.0.iter().map(|(field, kind)| (*field, *kind))
    }

    /// `Ok` when nothing failed, otherwise [`LedgerError::Validation`]
    pub fn into_result(self) -> LedgerResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, kind)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {kind}")?;
        }
        Ok(())
    }
}

/// Trial Balance - snapshot of all account balances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    /// One line per account, in row order
    pub lines: Vec<TrialBalanceLine>,
    /// Total debits across all accounts
    pub total_debits: BigDecimal,
    /// Total credits across all accounts
    pub total_credits: BigDecimal,
    /// Whether the trial balance is balanced
    pub is_balanced: bool,
}

/// Account balance information for trial balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceLine {
    pub account: AccountId,
    pub full_name: String,
    pub account_type: AccountType,
    /// Debit balance (if applicable)
    pub debit_balance: Option<BigDecimal>,
    /// Credit balance (if applicable)
    pub credit_balance: Option<BigDecimal>,
}

impl TrialBalanceLine {
    /// Get the balance amount regardless of debit/credit
    pub fn balance_amount(&self) -> BigDecimal {
        self.debit_balance
            .clone()
            .or_else(|| self.credit_balance.clone())
            .unwrap_or_else(|| BigDecimal::from(0))
    }
}

/// Errors that can occur in the bookkeeping system
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("Account {0} does not accept transactions")]
    NotTransactionnableAccount(AccountId),
    #[error("Invalid account type: {0}")]
    InvalidAccountType(String),
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),
    #[error("No account named '{0}'")]
    AccountNameNotFound(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),
    #[error("Transaction {0} is already in the journal")]
    DuplicateTransactionId(TransactionId),
    #[error("Row {0} is out of range")]
    RowOutOfRange(usize),
    #[error("The root of the chart of accounts cannot be edited")]
    RootAccount,
    #[error("Top-level account at row {0} cannot be edited or removed")]
    TopLevelAccount(usize),
    #[error("Account {0} is already in the chart")]
    DuplicateAccountId(AccountId),
    #[error("An account named '{name}' already exists under '{parent}'")]
    DuplicateAccountName { parent: String, name: String },
    #[error("Account type {child} does not match parent type {parent}")]
    AccountTypeMismatch {
        parent: AccountType,
        child: AccountType,
    },
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_convention() {
        let amount = BigDecimal::from(10);
        for account_type in AccountType::ALL {
            let mut balance = BigDecimal::from(0);
            account_type.apply_entry(&mut balance, EntryType::Debit, &amount);
            let expected = match account_type {
                AccountType::Asset | AccountType::Expense => BigDecimal::from(10),
                _ => BigDecimal::from(-10),
            };
            assert_eq!(balance, expected, "{account_type}");
        }
    }

    #[test]
    fn test_account_type_tags() {
        assert_eq!("Assets".parse::<AccountType>().unwrap(), AccountType::Asset);
        assert_eq!("income".parse::<AccountType>().unwrap(), AccountType::Revenue);
        assert!(matches!(
            "goodwill".parse::<AccountType>(),
            Err(LedgerError::InvalidAccountType(tag)) if tag == "goodwill"
        ));
    }

    #[test]
    fn test_fresh_transaction_is_unposted() {
        let transaction = Transaction::new();
        assert!(!transaction.is_posted());
        assert_eq!(transaction.debit_entry().transaction(), transaction.id());
        assert_eq!(transaction.credit_entry().transaction(), transaction.id());
        assert_eq!(transaction.debit_entry().entry_type(), EntryType::Debit);
        assert_eq!(transaction.credit_entry().entry_type(), EntryType::Credit);
        assert!(transaction.debit_entry().transfer_account().is_none());
    }

    #[test]
    fn test_validation_errors_keep_first_kind() {
        let mut errors = ValidationErrors::new();
        errors.insert(ValidationField::AccountName, ValidationErrorKind::EmptyAccountName);
        errors.insert(
            ValidationField::AccountName,
            ValidationErrorKind::NotAlphanumericAccountName,
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.get(ValidationField::AccountName),
            Some(ValidationErrorKind::EmptyAccountName)
        );
        assert!(errors.into_result().is_err());
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}
