//! Main bookkeeping context that coordinates the chart of accounts and the journal
//!
//! `Books` is single-threaded: every mutation takes `&mut self` and runs to
//! completion (unpost, update, repost, cascade) before returning, so no
//! reader can observe a half-posted transaction.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::BooksConfig;
use crate::ledger::{GeneralLedger, Journal, LedgerSnapshot, RemovedAccounts, TransactionUpdate};
use crate::traits::*;
use crate::types::*;
use crate::utils::{DefaultAccountValidator, DefaultTransactionValidator};

/// Change notifications delivered to registered observers
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEvent {
    AccountInserted { account: AccountId, row: usize },
    AccountUpdated { account: AccountId },
    AccountsRemoved {
        accounts: Vec<AccountId>,
        transactions: Vec<TransactionId>,
    },
    TransactionRecorded { transaction: TransactionId },
    TransactionUpdated { transaction: TransactionId },
    TransactionsRemoved { transactions: Vec<TransactionId> },
}

/// One line of an account's ledger view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub transaction: TransactionId,
    pub date: NaiveDate,
    pub ref_no: String,
    pub memo: String,
    /// Full name of the counterparty account
    pub transfer_account: Option<String>,
    pub debit: Option<BigDecimal>,
    pub credit: Option<BigDecimal>,
    /// Running balance right after this line
    pub balance: BigDecimal,
}

/// Main bookkeeping system
pub struct Books {
    config: BooksConfig,
    chart: GeneralLedger,
    journal: Journal,
    account_validator: Box<dyn AccountValidator>,
    transaction_validator: Box<dyn TransactionValidator>,
    observers: Vec<Box<dyn LedgerObserver>>,
}

impl Default for Books {
    fn default() -> Self {
        Self::new()
    }
}

impl Books {
    /// Create empty books with the default configuration
    pub fn new() -> Self {
        Self::from_parts(BooksConfig::default(), GeneralLedger::new(), Journal::new())
    }

    /// Create empty books with a custom configuration
    pub fn with_config(config: BooksConfig) -> LedgerResult<Self> {
        let chart = GeneralLedger::with_config(&config)?;
        Ok(Self::from_parts(config, chart, Journal::new()))
    }

    fn from_parts(config: BooksConfig, chart: GeneralLedger, journal: Journal) -> Self {
        Self {
            config,
            chart,
            journal,
            account_validator: Box::new(DefaultAccountValidator),
            transaction_validator: Box::new(DefaultTransactionValidator),
            observers: Vec::new(),
        }
    }

    /// Replace the validators used by account and transaction updates
    pub fn with_validators(
        mut self,
        account_validator: Box<dyn AccountValidator>,
        transaction_validator: Box<dyn TransactionValidator>,
    ) -> Self {
        self.account_validator = account_validator;
        self.transaction_validator = transaction_validator;
        self
    }

    /// Register an observer notified after every successful mutation
    pub fn subscribe(&mut self, observer: impl LedgerObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn notify(&self, event: LedgerEvent) {
        for observer in &self.observers {
            observer.on_change(&event);
        }
    }

    pub fn config(&self) -> &BooksConfig {
        &self.config
    }

    pub fn chart(&self) -> &GeneralLedger {
        &self.chart
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    // Account operations

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.chart.account(id)
    }

    pub fn account_balance(&self, id: AccountId) -> LedgerResult<&BigDecimal> {
        self.chart
            .account(id)
            .map(Account::balance)
            .ok_or(LedgerError::AccountNotFound(id))
    }

    pub fn account_at_row(&self, row: usize) -> Option<&Account> {
        self.chart.account_at_row(row)
    }

    pub fn row_of_account(&self, id: AccountId) -> Option<usize> {
        self.chart.row_of_account(id)
    }

    pub fn account_by_full_name(&self, full_name: &str) -> Option<&Account> {
        self.chart.account_by_full_name(full_name)
    }

    pub fn account_full_name(&self, id: AccountId) -> Option<String> {
        self.chart.account_full_name(id)
    }

    pub fn account_full_names(&self, exclude_non_transactionnable: bool) -> Vec<String> {
        self.chart.account_full_names(exclude_non_transactionnable)
    }

    /// Add a new account under the account at `row`
    pub fn insert_child_account(
        &mut self,
        row: usize,
        account: Account,
    ) -> LedgerResult<AccountId> {
        let id = self
            .chart
            .insert_child_account_with(row, self.account_validator.as_ref(), account)?;
        let row = self.chart.row_of_account(id).unwrap_or_default();
        self.notify(LedgerEvent::AccountInserted { account: id, row });
        Ok(id)
    }

    /// Add a new account under the account with the given full name
    pub fn insert_account_under(
        &mut self,
        parent_full_name: &str,
        account: Account,
    ) -> LedgerResult<AccountId> {
        let row = self
            .chart
            .account_by_full_name(parent_full_name)
            .and_then(|parent| self.chart.row_of_account(parent.id()))
            .ok_or_else(|| LedgerError::AccountNameNotFound(parent_full_name.to_string()))?;
        self.insert_child_account(row, account)
    }

    /// Change the number, name and description of the account at `row`
    pub fn update_account(
        &mut self,
        row: usize,
        number: i32,
        name: &str,
        description: &str,
    ) -> LedgerResult<()> {
        let id = self.chart.update_account(
            row,
            self.account_validator.as_ref(),
            number,
            name,
            description,
        )?;
        self.notify(LedgerEvent::AccountUpdated { account: id });
        Ok(())
    }

    /// Remove the account at `row` with its descendants and their transactions
    pub fn remove_account(&mut self, row: usize) -> LedgerResult<RemovedAccounts> {
        let removed = self.chart.remove_account(row, &mut self.journal)?;
        self.notify(LedgerEvent::AccountsRemoved {
            accounts: removed.accounts.iter().map(Account::id).collect(),
            transactions: removed.transactions.iter().map(Transaction::id).collect(),
        });
        Ok(removed)
    }

    // Transaction operations

    pub fn transaction(&self, id: TransactionId) -> Option<&Transaction> {
        self.journal.transaction(id)
    }

    /// All transactions in date order
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> + '_ {
        self.journal.transactions()
    }

    /// Create a transaction, post it and file it in the journal
    pub fn record_transaction(
        &mut self,
        update: &TransactionUpdate,
    ) -> LedgerResult<TransactionId> {
        let id = self.journal.record_transaction(
            self.transaction_validator.as_ref(),
            update,
            &mut self.chart,
        )?;
        self.notify(LedgerEvent::TransactionRecorded { transaction: id });
        Ok(id)
    }

    /// Move an existing transaction to new values, reposting it
    pub fn update_transaction(
        &mut self,
        id: TransactionId,
        update: &TransactionUpdate,
    ) -> LedgerResult<()> {
        self.journal.update_transaction(
            self.transaction_validator.as_ref(),
            id,
            update,
            &mut self.chart,
        )?;
        self.notify(LedgerEvent::TransactionUpdated { transaction: id });
        Ok(())
    }

    /// Delete the transaction at journal `row`
    pub fn remove_transaction(&mut self, row: usize) -> LedgerResult<Transaction> {
        let removed = self.journal.remove_transaction(row, &mut self.chart)?;
        self.notify(LedgerEvent::TransactionsRemoved {
            transactions: vec![removed.id()],
        });
        Ok(removed)
    }

    /// Delete several transactions, notifying once
    pub fn remove_transactions(&mut self, ids: &[TransactionId]) -> Vec<Transaction> {
        let removed = self.journal.remove_transactions(ids, &mut self.chart);
        self.notify(LedgerEvent::TransactionsRemoved {
            transactions: removed.iter().map(Transaction::id).collect(),
        });
        removed
    }

    // Reporting operations

    /// Ledger view of one account, oldest entry first
    pub fn account_statement(&self, id: AccountId) -> LedgerResult<Vec<StatementLine>> {
        let account = self
            .chart
            .account(id)
            .ok_or(LedgerError::AccountNotFound(id))?;

        account
            .entries()
            .iter()
            .map(|entry| {
                let transaction = self
                    .journal
                    .table()
                    .get(&entry.transaction)
                    .ok_or(LedgerError::TransactionNotFound(entry.transaction))?;
                let posted = transaction.entry(entry.entry_type);
                let amount = Some(transaction.amount.clone());
                let (debit, credit) = match entry.entry_type {
                    EntryType::Debit => (amount, None),
                    EntryType::Credit => (None, amount),
                };
                Ok(StatementLine {
                    transaction: transaction.id,
                    date: transaction.date,
                    ref_no: transaction.ref_no.clone(),
                    memo: transaction.memo.clone(),
                    transfer_account: posted
                        .transfer_account
                        .and_then(|other| self.chart.account_full_name(other)),
                    debit,
                    credit,
                    balance: posted.account_balance.clone(),
                })
            })
            .collect()
    }

    /// Every account's balance on its debit or credit side
    pub fn trial_balance(&self) -> TrialBalance {
        let zero = BigDecimal::from(0);
        let mut lines = Vec::with_capacity(self.chart.len());
        let mut total_debits = BigDecimal::from(0);
        let mut total_credits = BigDecimal::from(0);

        for account in self.chart.accounts() {
            let balance = account.balance();
            let on_normal_side = *balance >= zero;
            let side = match (account.account_type().normal_balance(), on_normal_side) {
                (EntryType::Debit, true) | (EntryType::Credit, false) => EntryType::Debit,
                (EntryType::Credit, true) | (EntryType::Debit, false) => EntryType::Credit,
            };
            let amount = balance.abs();

            let (debit_balance, credit_balance) = match side {
                EntryType::Debit => {
                    total_debits += &amount;
                    (Some(amount), None)
                }
                EntryType::Credit => {
                    total_credits += &amount;
                    (None, Some(amount))
                }
            };

            lines.push(TrialBalanceLine {
                account: account.id(),
                full_name: self.chart.account_full_name(account.id()).unwrap_or_default(),
                account_type: account.account_type(),
                debit_balance,
                credit_balance,
            });
        }

        let is_balanced = total_debits == total_credits;
        TrialBalance {
            lines,
            total_debits,
            total_credits,
            is_balanced,
        }
    }

    // Persistence

    /// Cycle-free copy of the chart and journal
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot::capture(&self.chart, &self.journal)
    }

    /// Rebuild books from a snapshot with the default validators
    ///
    /// Branch names and flags come from the snapshot, not from
    /// `config.branch_names`.
    pub fn restore(snapshot: &LedgerSnapshot, config: BooksConfig) -> LedgerResult<Self> {
        Self::restore_with(
            snapshot,
            config,
            Box::new(DefaultAccountValidator),
            Box::new(DefaultTransactionValidator),
        )
    }

    /// Rebuild books from a snapshot, reposting every transaction
    ///
    /// Accounts and transactions are checked by the given validators, which
    /// the restored books keep for later mutations.
    pub fn restore_with(
        snapshot: &LedgerSnapshot,
        config: BooksConfig,
        account_validator: Box<dyn AccountValidator>,
        transaction_validator: Box<dyn TransactionValidator>,
    ) -> LedgerResult<Self> {
        let (chart, journal) =
            snapshot.rebuild(account_validator.as_ref(), transaction_validator.as_ref())?;
        tracing::info!(
            accounts = chart.len(),
            transactions = journal.len(),
            "books restored"
        );
        Ok(Self::from_parts(config, chart, journal)
            .with_validators(account_validator, transaction_validator))
    }

    /// Persist the books through a storage backend
    pub async fn save_to<S: BooksStorage>(&self, storage: &mut S) -> LedgerResult<()> {
        storage.save(&self.snapshot()).await
    }

    /// Load books from a storage backend, `None` when nothing was saved
    ///
    /// Uses the default validators; load the snapshot from the storage and
    /// call [`Books::restore_with`] to keep custom ones.
    pub async fn load_from<S: BooksStorage>(
        storage: &S,
        config: BooksConfig,
    ) -> LedgerResult<Option<Self>> {
        match storage.load().await? {
            Some(snapshot) => Self::restore(&snapshot, config).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::patterns;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn open(books: &mut Books, parent: &str, account_type: AccountType, name: &str) -> AccountId {
        books
            .insert_account_under(parent, Account::named(account_type, name).unwrap())
            .unwrap()
    }

    #[test]
    fn test_books_basic_operations() {
        let mut books = Books::new();
        let cash = open(&mut books, "Assets", AccountType::Asset, "Cash");
        let revenue = open(&mut books, "Revenue", AccountType::Revenue, "Sales");

        let sale = patterns::create_sales_transaction(
            date(1),
            "Sale of goods",
            cash,
            revenue,
            BigDecimal::from(1000),
        );
        books.record_transaction(&sale).unwrap();

        assert_eq!(*books.account_balance(cash).unwrap(), BigDecimal::from(1000));
        assert_eq!(*books.account_balance(revenue).unwrap(), BigDecimal::from(1000));

        let trial_balance = books.trial_balance();
        assert!(trial_balance.is_balanced);
        assert_eq!(trial_balance.total_debits, BigDecimal::from(1000));
    }

    #[test]
    fn test_observers_see_each_mutation() {
        let mut books = Books::new();
        let seen: Rc<RefCell<Vec<LedgerEvent>>> = Rc::default();
        let sink = Rc::clone(&seen);
        books.subscribe(move |event: &LedgerEvent| sink.borrow_mut().push(event.clone()));

        let cash = books
            .insert_child_account(1, Account::named(AccountType::Asset, "Cash").unwrap())
            .unwrap();
        let capital = open(&mut books, "Equity", AccountType::Equity, "Capital");
        let deposit = TransactionUpdate::new(date(2), BigDecimal::from(5), cash, capital);
        let id = books.record_transaction(&deposit).unwrap();
        let refund = TransactionUpdate::new(date(2), BigDecimal::from(-5), cash, capital);
        assert!(books.record_transaction(&refund).is_err());
        books.remove_transaction(0).unwrap();

        let events = seen.borrow();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], LedgerEvent::AccountInserted { account: cash, row: 2 });
        assert_eq!(events[2], LedgerEvent::TransactionRecorded { transaction: id });
        assert_eq!(
            events[3],
            LedgerEvent::TransactionsRemoved {
                transactions: vec![id]
            }
        );
    }

    #[test]
    fn test_statement_lists_counterparties_and_running_balance() {
        let mut books = Books::new();
        let cash = open(&mut books, "Assets", AccountType::Asset, "Cash");
        let rent = open(&mut books, "Expense", AccountType::Expense, "Rent");
        let loan = open(&mut books, "Liabilities", AccountType::Liability, "Loan");

        let rent_paid = BigDecimal::from(300);
        let borrowed = BigDecimal::from(1000);
        books
            .record_transaction(&patterns::create_expense_payment(
                date(10),
                "January rent",
                rent,
                cash,
                rent_paid,
            ))
            .unwrap();
        books
            .record_transaction(&patterns::create_loan_received(
                date(3),
                "Bank loan",
                cash,
                loan,
                borrowed,
            ))
            .unwrap();

        let statement = books.account_statement(cash).unwrap();
        assert_eq!(statement.len(), 2);
        assert_eq!(statement[0].memo, "Bank loan");
        assert_eq!(statement[0].transfer_account.as_deref(), Some("Liabilities.Loan"));
        assert_eq!(statement[0].debit, Some(BigDecimal::from(1000)));
        assert_eq!(statement[0].balance, BigDecimal::from(1000));
        assert_eq!(statement[1].transfer_account.as_deref(), Some("Expense.Rent"));
        assert_eq!(statement[1].credit, Some(BigDecimal::from(300)));
        assert_eq!(statement[1].balance, BigDecimal::from(700));
    }

    #[test]
    fn test_trial_balance_puts_overdrawn_asset_on_credit_side() {
        let mut books = Books::new();
        let cash = open(&mut books, "Assets", AccountType::Asset, "Cash");
        let rent = open(&mut books, "Expense", AccountType::Expense, "Rent");
        let rent_paid = BigDecimal::from(50);
        books
            .record_transaction(&patterns::create_expense_payment(
                date(1),
                "Rent",
                rent,
                cash,
                rent_paid,
            ))
            .unwrap();

        let trial_balance = books.trial_balance();
        let cash_line = trial_balance
            .lines
            .iter()
            .find(|line| line.account == cash)
            .unwrap();
        assert_eq!(cash_line.credit_balance, Some(BigDecimal::from(50)));
        assert_eq!(cash_line.debit_balance, None);
        assert!(trial_balance.is_balanced);
    }

    #[test]
    fn test_restore_drops_postings_into_closed_accounts() {
        let mut books = Books::new();
        let cash = open(&mut books, "Assets", AccountType::Asset, "Cash");
        let sales = open(&mut books, "Revenue", AccountType::Revenue, "Sales");
        books
            .record_transaction(&TransactionUpdate::new(date(1), BigDecimal::from(8), cash, sales))
            .unwrap();

        let mut snapshot = books.snapshot();
        for record in &mut snapshot.accounts {
            if record.id == sales {
                record.transactions_enabled = false;
            }
        }

        let restored = Books::restore(&snapshot, BooksConfig::default()).unwrap();
        assert!(restored.journal().is_empty());
        assert_eq!(*restored.account_balance(cash).unwrap(), BigDecimal::from(0));
        assert!(!restored.account(sales).unwrap().transactions_enabled());
    }

    #[test]
    fn test_restore_rejects_malformed_tree() {
        let books = Books::new();
        let mut snapshot = books.snapshot();
        snapshot.accounts.remove(0);
        assert!(matches!(
            Books::restore(&snapshot, BooksConfig::default()),
            Err(LedgerError::Snapshot(_))
        ));
    }
}
