//! Cycle-free snapshot of a set of books and the two-phase restore
//!
//! Accounts, entries and transactions reference each other, so the snapshot
//! only keeps what cannot be derived: the tree (parent ids in preorder) and
//! each transaction's scalar fields plus its two account ids. Entries and
//! balances are rebuilt by posting on restore.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ledger::TransactionUpdate;
use crate::ledger::{GeneralLedger, Journal};
use crate::traits::*;
use crate::types::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: AccountId,
    /// `None` for the five branches
    pub parent: Option<AccountId>,
    pub account_type: AccountType,
    pub number: i32,
    pub name: String,
    pub description: String,
    pub transactions_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub date: NaiveDate,
    pub ref_no: String,
    pub memo: String,
    pub amount: BigDecimal,
    pub debit_account: Option<AccountId>,
    pub credit_account: Option<AccountId>,
}

/// Serializable form of [`crate::Books`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// In row order, so parents always precede their children
    pub accounts: Vec<AccountRecord>,
    /// In journal order
    pub transactions: Vec<TransactionRecord>,
}

impl LedgerSnapshot {
    pub(crate) fn capture(chart: &GeneralLedger, journal: &Journal) -> Self {
        let accounts = chart
            .preorder()
            .into_iter()
            .filter_map(|id| {
                let node = chart.node(id)?;
                let account = node.account();
                Some(AccountRecord {
                    id,
                    parent: node.parent(),
                    account_type: account.account_type,
                    number: account.number,
                    name: account.name.clone(),
                    description: account.description.clone(),
                    transactions_enabled: account.transactions_enabled,
                })
            })
            .collect();

        let transactions = journal
            .transactions()
            .map(|transaction| TransactionRecord {
                id: transaction.id,
                date: transaction.date,
                ref_no: transaction.ref_no.clone(),
                memo: transaction.memo.clone(),
                amount: transaction.amount.clone(),
                debit_account: transaction.debit_account,
                credit_account: transaction.credit_account,
            })
            .collect();

        Self {
            accounts,
            transactions,
        }
    }

    /// Rebuild the chart and journal
    ///
    /// Phase one creates every account and every transaction unposted.
    /// Phase two binds each transaction to its accounts and posts it;
    /// a transaction that no longer validates is dropped with a warning.
    pub(crate) fn rebuild(
        &self,
        account_validator: &dyn AccountValidator,
        transaction_validator: &dyn TransactionValidator,
    ) -> LedgerResult<(GeneralLedger, Journal)> {
        let mut chart = self.rebuild_chart(account_validator)?;
        let mut journal = Journal::new();

        let mut bindings = Vec::with_capacity(self.transactions.len());
        for record in &self.transactions {
            let mut pending = Transaction::with_id(record.id);
            pending.date = record.date;
            pending.ref_no = record.ref_no.clone();
            pending.memo = record.memo.clone();
            pending.amount = record.amount.clone();
            journal.add_transaction(pending)?;

            if let (Some(debit), Some(credit)) = (record.debit_account, record.credit_account) {
                bindings.push((record, debit, credit));
            }
        }

        for (record, debit, credit) in bindings {
            let update = TransactionUpdate {
                date: record.date,
                ref_no: record.ref_no.clone(),
                memo: record.memo.clone(),
                amount: record.amount.clone(),
                debit_account: debit,
                credit_account: credit,
            };
            if let Err(err) =
                journal.update_transaction(transaction_validator, record.id, &update, &mut chart)
            {
                tracing::warn!(
                    transaction = %record.id,
                    error = %err,
                    "dropping transaction that cannot be posted"
                );
                if let Some(row) = journal.row_of(record.id) {
                    journal.remove_transaction(row, &mut chart)?;
                }
            }
        }

        Ok((chart, journal))
    }

    fn rebuild_chart(&self, validator: &dyn AccountValidator) -> LedgerResult<GeneralLedger> {
        let mut branches = Vec::with_capacity(AccountType::ALL.len());
        for account_type in AccountType::ALL {
            let mut found = self
                .accounts
                .iter()
                .filter(|record| record.parent.is_none() && record.account_type == account_type);
            let (Some(record), None) = (found.next(), found.next()) else {
                return Err(LedgerError::Snapshot(format!(
                    "expected exactly one top-level {account_type} account"
                )));
            };
            branches.push(record.to_account(validator)?);
        }
        let mut chart = GeneralLedger::from_branches(branches);

        for record in &self.accounts {
            let Some(parent) = record.parent else {
                continue;
            };
            if chart.account(parent).is_none() {
                return Err(LedgerError::Snapshot(format!(
                    "account {} appears before its parent {}",
                    record.id, parent
                )));
            }
            chart.attach(parent, validator, record.to_account(validator)?)?;
        }
        Ok(chart)
    }
}

impl AccountRecord {
    fn to_account(&self, validator: &dyn AccountValidator) -> LedgerResult<Account> {
        let mut account =
            Account::new(self.account_type).with_transactions_enabled(self.transactions_enabled);
        account.id = self.id;
        account.update_with(validator, self.number, &self.name, &self.description)?;
        Ok(account)
    }
}
