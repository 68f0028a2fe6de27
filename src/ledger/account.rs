//! Account balance ledger: date-ordered entries and running-balance recomputation

use bigdecimal::BigDecimal;
use std::collections::HashMap;

use crate::traits::*;
use crate::types::*;
use crate::utils::DefaultAccountValidator;

/// Arena of transactions keyed by id; entries live inside their transaction
pub type TransactionTable = HashMap<TransactionId, Transaction>;

impl Account {
    /// Update the identity fields (number, name, description) after validating them
    ///
    /// Balance, type and entries are never touched. On a validation failure
    /// nothing changes and the field errors come back in
    /// [`LedgerError::Validation`].
    pub fn update(&mut self, number: i32, name: &str, description: &str) -> LedgerResult<()> {
        self.update_with(&DefaultAccountValidator, number, name, description)
    }

    /// Same as [`Account::update`] with a custom validator
    pub fn update_with(
        &mut self,
        validator: &dyn AccountValidator,
        number: i32,
        name: &str,
        description: &str,
    ) -> LedgerResult<()> {
        validator
            .validate_identity(number, name, description)
            .into_result()?;

        self.number = number;
        self.name = name.to_string();
        self.description = description.to_string();
        Ok(())
    }

    /// Insert an entry in date order and recompute the balance history after it
    ///
    /// The entry goes before the first existing entry whose transaction is
    /// strictly later, so entries on the same date keep insertion order.
    pub fn add_entry(
        &mut self,
        entry: EntryRef,
        transactions: &mut TransactionTable,
    ) -> LedgerResult<()> {
        if !self.transactions_enabled {
            return Err(LedgerError::NotTransactionnableAccount(self.id));
        }

        let date = transactions
            .get(&entry.transaction)
            .map(|transaction| transaction.date)
            .ok_or(LedgerError::TransactionNotFound(entry.transaction))?;

        let index = self
            .entries
            .iter()
            .position(|existing| {
                transactions
                    .get(&existing.transaction)
                    .is_some_and(|transaction| transaction.date > date)
            })
            .unwrap_or(self.entries.len());

        self.entries.insert(index, entry);
        self.recompute_from(index, transactions);

        tracing::debug!(
            account = %self.id,
            transaction = %entry.transaction,
            side = ?entry.entry_type,
            index,
            balance = %self.balance,
            "entry posted"
        );
        Ok(())
    }

    /// Remove an entry and recompute the balance history after its old position
    ///
    /// Returns `false` (and changes nothing) when the entry was not posted here.
    pub fn remove_entry(
        &mut self,
        entry: EntryRef,
        transactions: &mut TransactionTable,
    ) -> LedgerResult<bool> {
        if !self.transactions_enabled {
            return Err(LedgerError::NotTransactionnableAccount(self.id));
        }

        let Some(index) = self.entries.iter().position(|existing| *existing == entry) else {
            return Ok(false);
        };

        self.entries.remove(index);
        self.recompute_from(index, transactions);

        tracing::debug!(
            account = %self.id,
            transaction = %entry.transaction,
            side = ?entry.entry_type,
            index,
            balance = %self.balance,
            "entry unposted"
        );
        Ok(true)
    }

    /// Replay entries from `index` onward, seeding from the snapshot just before it
    fn recompute_from(&mut self, index: usize, transactions: &mut TransactionTable) {
        let mut balance = index
            .checked_sub(1)
            .and_then(|previous| self.entries.get(previous))
            .and_then(|previous| {
                let transaction = transactions.get(&previous.transaction)?;
                Some(transaction.entry(previous.entry_type).account_balance.clone())
            })
            .unwrap_or_else(|| BigDecimal::from(0));

        for entry in &self.entries[index..] {
            if let Some(transaction) = transactions.get_mut(&entry.transaction) {
                let amount = transaction.amount.clone();
                self.account_type
                    .apply_entry(&mut balance, entry.entry_type, &amount);
                transaction.entry_mut(entry.entry_type).account_balance = balance.clone();
            }
        }

        self.balance = balance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn transaction(table: &mut TransactionTable, day: u32, amount: &str) -> TransactionId {
        let mut transaction = Transaction::new();
        transaction.date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        transaction.amount = BigDecimal::from_str(amount).unwrap();
        let id = transaction.id;
        table.insert(id, transaction);
        id
    }

    fn snapshot(table: &TransactionTable, entry: EntryRef) -> BigDecimal {
        table[&entry.transaction]
            .entry(entry.entry_type)
            .account_balance
            .clone()
    }

    #[test]
    fn test_asset_balance_follows_debits_and_credits() {
        let mut table = TransactionTable::new();
        let mut cash = Account::named(AccountType::Asset, "Cash").unwrap();

        let deposit = EntryRef::new(transaction(&mut table, 1, "1000.50"), EntryType::Debit);
        let payment = EntryRef::new(transaction(&mut table, 2, "2000.50"), EntryType::Credit);

        cash.add_entry(deposit, &mut table).unwrap();
        assert_eq!(*cash.balance(), BigDecimal::from_str("1000.50").unwrap());

        cash.add_entry(payment, &mut table).unwrap();
        assert_eq!(*cash.balance(), BigDecimal::from_str("-1000.00").unwrap());

        assert!(cash.remove_entry(deposit, &mut table).unwrap());
        assert_eq!(*cash.balance(), BigDecimal::from_str("-2000.50").unwrap());
        assert_eq!(snapshot(&table, payment), BigDecimal::from_str("-2000.50").unwrap());
    }

    #[test]
    fn test_back_dated_entry_rewrites_later_snapshots() {
        let mut table = TransactionTable::new();
        let mut loan = Account::named(AccountType::Liability, "Loan").unwrap();

        let third = EntryRef::new(transaction(&mut table, 20, "30"), EntryType::Credit);
        let second = EntryRef::new(transaction(&mut table, 10, "20"), EntryType::Debit);
        let first = EntryRef::new(transaction(&mut table, 5, "100"), EntryType::Credit);

        loan.add_entry(third, &mut table).unwrap();
        loan.add_entry(second, &mut table).unwrap();
        loan.add_entry(first, &mut table).unwrap();

        assert_eq!(loan.entries(), &[first, second, third]);
        assert_eq!(snapshot(&table, first), BigDecimal::from(100));
        assert_eq!(snapshot(&table, second), BigDecimal::from(80));
        assert_eq!(snapshot(&table, third), BigDecimal::from(110));
        assert_eq!(*loan.balance(), BigDecimal::from(110));
    }

    #[test]
    fn test_same_date_keeps_insertion_order() {
        let mut table = TransactionTable::new();
        let mut rent = Account::named(AccountType::Expense, "Rent").unwrap();

        let a = EntryRef::new(transaction(&mut table, 3, "1"), EntryType::Debit);
        let b = EntryRef::new(transaction(&mut table, 3, "2"), EntryType::Debit);
        rent.add_entry(a, &mut table).unwrap();
        rent.add_entry(b, &mut table).unwrap();

        assert_eq!(rent.entries(), &[a, b]);
    }

    #[test]
    fn test_removing_missing_entry_changes_nothing() {
        let mut table = TransactionTable::new();
        let mut cash = Account::named(AccountType::Asset, "Cash").unwrap();
        let posted = EntryRef::new(transaction(&mut table, 1, "5"), EntryType::Debit);
        let stray = EntryRef::new(transaction(&mut table, 2, "7"), EntryType::Debit);
        cash.add_entry(posted, &mut table).unwrap();

        assert!(!cash.remove_entry(stray, &mut table).unwrap());
        assert_eq!(*cash.balance(), BigDecimal::from(5));
        assert_eq!(cash.entries().len(), 1);
    }

    #[test]
    fn test_disabled_account_rejects_entries() {
        let mut table = TransactionTable::new();
        let mut assets = Account::new(AccountType::Asset).with_transactions_enabled(false);
        let entry = EntryRef::new(transaction(&mut table, 1, "5"), EntryType::Debit);

        assert!(matches!(
            assets.add_entry(entry, &mut table),
            Err(LedgerError::NotTransactionnableAccount(_))
        ));
        assert!(matches!(
            assets.remove_entry(entry, &mut table),
            Err(LedgerError::NotTransactionnableAccount(_))
        ));
    }

    #[test]
    fn test_invalid_update_leaves_account_unchanged() {
        let mut account = Account::new(AccountType::Revenue);
        account.update(4000, "Sales", "Product sales").unwrap();

        let result = account.update(-5, "Bad.Name", "changed");
        match result {
            Err(LedgerError::Validation(errors)) => {
                assert_eq!(
                    errors.get(ValidationField::AccountNumber),
                    Some(ValidationErrorKind::NegativeAccountNumber)
                );
                assert_eq!(
                    errors.get(ValidationField::AccountName),
                    Some(ValidationErrorKind::NotAlphanumericAccountName)
                );
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert_eq!(account.number(), 4000);
        assert_eq!(account.name(), "Sales");
        assert_eq!(account.description(), "Product sales");
    }
}
