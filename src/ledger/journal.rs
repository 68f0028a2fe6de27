//! Journal: every transaction, kept in date order

use chrono::NaiveDate;

use crate::ledger::transaction::{self, TransactionUpdate};
use crate::ledger::{GeneralLedger, TransactionTable};
use crate::traits::*;
use crate::types::*;

/// Date-ordered collection of all transactions
///
/// Transactions on the same date keep the order they were added in.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    transactions: TransactionTable,
    order: Vec<TransactionId>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All transactions in journal order
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.transactions.get(id))
    }

    pub fn transaction(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions.get(&id)
    }

    pub fn transaction_at(&self, row: usize) -> Option<&Transaction> {
        self.order.get(row).and_then(|id| self.transactions.get(id))
    }

    pub fn row_of(&self, id: TransactionId) -> Option<usize> {
        self.order.iter().position(|candidate| *candidate == id)
    }

    /// Index of the first transaction dated strictly after `date`
    fn insertion_point(&self, date: NaiveDate) -> usize {
        self.order
            .iter()
            .position(|id| {
                self.transactions
                    .get(id)
                    .is_some_and(|transaction| transaction.date > date)
            })
            .unwrap_or(self.order.len())
    }

    /// Insert a transaction at its date position and return its row
    ///
    /// The transaction is stored as given: an unposted transaction stays
    /// unposted until [`Journal::update_transaction`] binds it. An id that is
    /// already filed is refused.
    pub fn add_transaction(&mut self, transaction: Transaction) -> LedgerResult<usize> {
        let id = transaction.id;
        if self.transactions.contains_key(&id) {
            return Err(LedgerError::DuplicateTransactionId(id));
        }
        let row = self.insertion_point(transaction.date);
        self.transactions.insert(id, transaction);
        self.order.insert(row, id);
        Ok(row)
    }

    /// Create, validate and post a new transaction, then file it by date
    ///
    /// Nothing is added when validation fails.
    pub fn record_transaction(
        &mut self,
        validator: &dyn TransactionValidator,
        update: &TransactionUpdate,
        chart: &mut GeneralLedger,
    ) -> LedgerResult<TransactionId> {
        transaction::validate_update(validator, update, chart)?;

        let mut fresh = Transaction::new();
        fresh.date = update.date;
        let id = fresh.id;
        self.add_transaction(fresh)?;

        if let Err(err) = transaction::update_transaction(
            validator,
            chart,
            &mut self.transactions,
            id,
            update,
        ) {
            self.order.retain(|candidate| *candidate != id);
            self.transactions.remove(&id);
            return Err(err);
        }
        Ok(id)
    }

    /// Re-post a transaction with new values, moving it if its date changed
    pub fn update_transaction(
        &mut self,
        validator: &dyn TransactionValidator,
        id: TransactionId,
        update: &TransactionUpdate,
        chart: &mut GeneralLedger,
    ) -> LedgerResult<()> {
        let old_date = self
            .transactions
            .get(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?
            .date;

        transaction::update_transaction(validator, chart, &mut self.transactions, id, update)?;

        if old_date != update.date {
            if let Some(row) = self.row_of(id) {
                self.order.remove(row);
                let row = self.insertion_point(update.date);
                self.order.insert(row, id);
            }
        }
        Ok(())
    }

    /// Take the transaction at `row` out of the journal and its accounts
    pub fn remove_transaction(
        &mut self,
        row: usize,
        chart: &mut GeneralLedger,
    ) -> LedgerResult<Transaction> {
        if row >= self.order.len() {
            return Err(LedgerError::RowOutOfRange(row));
        }
        let id = self.order.remove(row);
        self.discard(id, chart)
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    /// Remove several transactions at once, returned in journal order
    ///
    /// Ids not in the journal are ignored.
    pub fn remove_transactions(
        &mut self,
        ids: &[TransactionId],
        chart: &mut GeneralLedger,
    ) -> Vec<Transaction> {
        let (doomed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.order)
            .into_iter()
            .partition(|id| ids.contains(id));
        self.order = kept;
        doomed
            .into_iter()
            .filter_map(|id| self.discard(id, chart))
            .collect()
    }

    fn discard(&mut self, id: TransactionId, chart: &mut GeneralLedger) -> Option<Transaction> {
        if !self.transactions.contains_key(&id) {
            return None;
        }
        if let Err(err) = transaction::unpost(chart, &mut self.transactions, id) {
            tracing::warn!(transaction = %id, error = %err, "could not unpost removed transaction");
        }
        self.transactions.remove(&id)
    }

    pub(crate) fn table(&self) -> &TransactionTable {
        &self.transactions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::DefaultTransactionValidator;
    use bigdecimal::BigDecimal;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn setup() -> (GeneralLedger, AccountId, AccountId) {
        let mut chart = GeneralLedger::new();
        let cash = chart
            .insert_child_account(1, Account::named(AccountType::Asset, "Cash").unwrap())
            .unwrap();
        let sales_row = chart
            .row_of_account(chart.branch(AccountType::Revenue))
            .unwrap();
        let sales = chart
            .insert_child_account(
                sales_row,
                Account::named(AccountType::Revenue, "Sales").unwrap(),
            )
            .unwrap();
        (chart, cash, sales)
    }

    fn record(
        journal: &mut Journal,
        chart: &mut GeneralLedger,
        day: u32,
        amount: i64,
        debit: AccountId,
        credit: AccountId,
    ) -> TransactionId {
        let update = TransactionUpdate::new(date(day), BigDecimal::from(amount), debit, credit);
        journal
            .record_transaction(&DefaultTransactionValidator, &update, chart)
            .unwrap()
    }

    fn dates(journal: &Journal) -> Vec<NaiveDate> {
        journal.transactions().map(|transaction| transaction.date()).collect()
    }

    #[test]
    fn test_transactions_stay_date_ordered() {
        let (mut chart, cash, sales) = setup();
        let mut journal = Journal::new();

        let late = record(&mut journal, &mut chart, 20, 1, cash, sales);
        let early = record(&mut journal, &mut chart, 2, 2, cash, sales);
        let tie = record(&mut journal, &mut chart, 20, 3, cash, sales);
        record(&mut journal, &mut chart, 10, 4, cash, sales);

        assert_eq!(dates(&journal), vec![date(2), date(10), date(20), date(20)]);
        assert_eq!(journal.row_of(early), Some(0));
        assert_eq!(journal.row_of(late), Some(2));
        assert_eq!(journal.row_of(tie), Some(3));
        assert_eq!(*chart.account(cash).unwrap().balance(), BigDecimal::from(10));
    }

    #[test]
    fn test_date_change_repositions() {
        let (mut chart, cash, sales) = setup();
        let mut journal = Journal::new();
        let moved = record(&mut journal, &mut chart, 1, 5, cash, sales);
        record(&mut journal, &mut chart, 15, 6, cash, sales);

        let update = TransactionUpdate::new(date(30), BigDecimal::from(5), cash, sales);
        journal
            .update_transaction(&DefaultTransactionValidator, moved, &update, &mut chart)
            .unwrap();

        assert_eq!(journal.row_of(moved), Some(1));
        assert_eq!(dates(&journal), vec![date(15), date(30)]);
        let cash_entries = chart.account(cash).unwrap().entries();
        assert_eq!(cash_entries.last().unwrap().transaction, moved);
    }

    #[test]
    fn test_remove_by_row_unposts() {
        let (mut chart, cash, sales) = setup();
        let mut journal = Journal::new();
        record(&mut journal, &mut chart, 1, 100, cash, sales);
        let second = record(&mut journal, &mut chart, 2, 40, cash, sales);

        let removed = journal.remove_transaction(0, &mut chart).unwrap();
        assert_eq!(*removed.amount(), BigDecimal::from(100));
        assert_eq!(journal.len(), 1);
        assert_eq!(*chart.account(cash).unwrap().balance(), BigDecimal::from(40));
        assert_eq!(*chart.account(sales).unwrap().balance(), BigDecimal::from(40));

        let snapshot = journal.transaction(second).unwrap().debit_entry().account_balance();
        assert_eq!(*snapshot, BigDecimal::from(40));

        assert!(matches!(
            journal.remove_transaction(5, &mut chart),
            Err(LedgerError::RowOutOfRange(5))
        ));
    }

    #[test]
    fn test_bulk_remove() {
        let (mut chart, cash, sales) = setup();
        let mut journal = Journal::new();
        let a = record(&mut journal, &mut chart, 1, 1, cash, sales);
        let b = record(&mut journal, &mut chart, 2, 2, cash, sales);
        let c = record(&mut journal, &mut chart, 3, 4, cash, sales);

        let removed = journal.remove_transactions(&[c, a, TransactionId::new()], &mut chart);
        assert_eq!(removed.len(), 2);
        assert_eq!(journal.len(), 1);
        assert_eq!(journal.transaction_at(0).unwrap().id(), b);
        assert_eq!(*chart.account(cash).unwrap().balance(), BigDecimal::from(2));
    }

    #[test]
    fn test_failed_record_adds_nothing() {
        let (mut chart, cash, sales) = setup();
        let mut journal = Journal::new();
        let update = TransactionUpdate::new(date(1), BigDecimal::from(-3), cash, sales);

        assert!(journal
            .record_transaction(&DefaultTransactionValidator, &update, &mut chart)
            .is_err());
        assert!(journal.is_empty());
        assert!(journal.table().is_empty());
        assert!(chart.account(cash).unwrap().entries().is_empty());
    }

    #[test]
    fn test_unposted_transaction_can_be_filed_and_bound_later() {
        let (mut chart, cash, sales) = setup();
        let mut journal = Journal::new();
        let pending = Transaction::new();
        let id = pending.id();

        assert_eq!(journal.add_transaction(pending).unwrap(), 0);
        assert!(!journal.transaction(id).unwrap().is_posted());

        let filed_on = journal.transaction(id).unwrap().date();
        let update = TransactionUpdate::new(filed_on, BigDecimal::from(9), cash, sales);
        journal
            .update_transaction(&DefaultTransactionValidator, id, &update, &mut chart)
            .unwrap();
        assert!(journal.transaction(id).unwrap().is_posted());
        assert_eq!(*chart.account(sales).unwrap().balance(), BigDecimal::from(9));
    }

    #[test]
    fn test_duplicate_id_is_refused() {
        let mut journal = Journal::new();
        let pending = Transaction::new();
        let id = pending.id();

        journal.add_transaction(pending.clone()).unwrap();
        assert!(matches!(
            journal.add_transaction(pending),
            Err(LedgerError::DuplicateTransactionId(duplicate)) if duplicate == id
        ));
        assert_eq!(journal.len(), 1);

        let mut chart = GeneralLedger::new();
        journal.remove_transaction(0, &mut chart).unwrap();
        assert!(journal.is_empty());
        assert!(journal.transaction_at(0).is_none());
    }

    #[test]
    fn test_removal_survives_failed_unpost() {
        let (mut chart, cash, sales) = setup();
        let mut journal = Journal::new();
        let id = record(&mut journal, &mut chart, 1, 15, cash, sales);

        // The cash side can no longer be unposted
        if let Some(account) = chart.account_mut(cash) {
            account.transactions_enabled = false;
        }

        let removed = journal.remove_transaction(0, &mut chart).unwrap();
        assert_eq!(removed.id(), id);
        assert!(journal.is_empty());
        assert!(chart.account(sales).unwrap().entries().is_empty());
        assert_eq!(*chart.account(sales).unwrap().balance(), BigDecimal::from(0));
        assert_eq!(chart.account(cash).unwrap().entries().len(), 1);
    }
}
