//! Transaction posting protocol: validate, unpost, rebind, repost

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::ledger::{GeneralLedger, TransactionTable};
use crate::traits::*;
use crate::types::*;

/// New values for a transaction's date, reference, memo, amount and accounts
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionUpdate {
    pub date: NaiveDate,
    pub ref_no: String,
    pub memo: String,
    pub amount: BigDecimal,
    pub debit_account: AccountId,
    pub credit_account: AccountId,
}

impl TransactionUpdate {
    pub fn new(
        date: NaiveDate,
        amount: BigDecimal,
        debit_account: AccountId,
        credit_account: AccountId,
    ) -> Self {
        Self {
            date,
            ref_no: String::new(),
            memo: String::new(),
            amount,
            debit_account,
            credit_account,
        }
    }
}

/// Builder for transaction updates
#[derive(Debug)]
pub struct TransactionBuilder {
    update: TransactionUpdate,
}

impl TransactionBuilder {
    /// Start a movement of `amount` from `credit_account` into `debit_account`
    pub fn new(
        date: NaiveDate,
        amount: BigDecimal,
        debit_account: AccountId,
        credit_account: AccountId,
    ) -> Self {
        Self {
            update: TransactionUpdate::new(date, amount, debit_account, credit_account),
        }
    }

    /// Set the reference number (cheque number, invoice number, etc.)
    pub fn reference(mut self, ref_no: impl Into<String>) -> Self {
        self.update.ref_no = ref_no.into();
        self
    }

    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.update.memo = memo.into();
        self
    }

    pub fn build(self) -> TransactionUpdate {
        self.update
    }
}

impl Transaction {
    /// Overwrite the scalar fields and bind both entries to their counterparties
    fn assign(&mut self, update: &TransactionUpdate) {
        self.date = update.date;
        self.ref_no = update.ref_no.clone();
        self.memo = update.memo.clone();
        self.amount = update.amount.clone();
        self.debit_account = Some(update.debit_account);
        self.credit_account = Some(update.credit_account);
        // The entry sitting in each account points at the other account
        self.debit_entry.transfer_account = Some(update.credit_account);
        self.credit_entry.transfer_account = Some(update.debit_account);
    }
}

/// Check an update against the accounts it would post into
pub fn validate_update(
    validator: &dyn TransactionValidator,
    update: &TransactionUpdate,
    chart: &GeneralLedger,
) -> LedgerResult<()> {
    let debit_account = chart
        .account(update.debit_account)
        .ok_or(LedgerError::AccountNotFound(update.debit_account))?;
    let credit_account = chart
        .account(update.credit_account)
        .ok_or(LedgerError::AccountNotFound(update.credit_account))?;

    validator
        .validate_update(update, debit_account, credit_account)
        .into_result()
}

/// Validate, then move a transaction onto the update's accounts
///
/// A previously posted transaction is unposted from its old accounts first.
/// When validation fails, or a target account does not accept postings,
/// nothing is touched.
pub fn update_transaction(
    validator: &dyn TransactionValidator,
    chart: &mut GeneralLedger,
    transactions: &mut TransactionTable,
    id: TransactionId,
    update: &TransactionUpdate,
) -> LedgerResult<()> {
    validate_update(validator, update, chart)?;
    ensure_postable(update, chart)?;

    let was_posted = transactions
        .get(&id)
        .ok_or(LedgerError::TransactionNotFound(id))?
        .is_posted();
    if was_posted {
        unpost(chart, transactions, id)?;
    }

    if let Some(transaction) = transactions.get_mut(&id) {
        transaction.assign(update);
    }

    post(chart, transactions, id)
}

/// Both target accounts must accept postings, whatever the validator allowed
fn ensure_postable(update: &TransactionUpdate, chart: &GeneralLedger) -> LedgerResult<()> {
    for id in [update.debit_account, update.credit_account] {
        let account = chart.account(id).ok_or(LedgerError::AccountNotFound(id))?;
        if !account.transactions_enabled() {
            return Err(LedgerError::NotTransactionnableAccount(id));
        }
    }
    Ok(())
}

/// Add both entries to their accounts; a no-op for an unbound transaction
pub(crate) fn post(
    chart: &mut GeneralLedger,
    transactions: &mut TransactionTable,
    id: TransactionId,
) -> LedgerResult<()> {
    let transaction = transactions
        .get(&id)
        .ok_or(LedgerError::TransactionNotFound(id))?;
    let (Some(debit), Some(credit)) = (transaction.debit_account, transaction.credit_account)
    else {
        return Ok(());
    };

    let debit_entry = EntryRef::new(id, EntryType::Debit);
    chart
        .account_mut(debit)
        .ok_or(LedgerError::AccountNotFound(debit))?
        .add_entry(debit_entry, transactions)?;

    let credited = match chart.account_mut(credit) {
        Some(account) => account.add_entry(EntryRef::new(id, EntryType::Credit), transactions),
        None => Err(LedgerError::AccountNotFound(credit)),
    };
    if let Err(err) = credited {
        // Keep the pair together: drop the half that made it in
        if let Some(account) = chart.account_mut(debit) {
            account.remove_entry(debit_entry, transactions)?;
        }
        return Err(err);
    }

    tracing::debug!(transaction = %id, debit = %debit, credit = %credit, "transaction posted");
    Ok(())
}

/// Remove both entries from their accounts; accounts already gone are skipped
pub(crate) fn unpost(
    chart: &mut GeneralLedger,
    transactions: &mut TransactionTable,
    id: TransactionId,
) -> LedgerResult<()> {
    let transaction = transactions
        .get(&id)
        .ok_or(LedgerError::TransactionNotFound(id))?;
    let sides = [
        (EntryType::Debit, transaction.debit_account),
        (EntryType::Credit, transaction.credit_account),
    ];

    // Both sides are attempted; the first failure is reported
    let mut outcome: LedgerResult<()> = Ok(());
    for (entry_type, account) in sides {
        let Some(account) = account.and_then(|account| chart.account_mut(account)) else {
            continue;
        };
        if let Err(err) = account.remove_entry(EntryRef::new(id, entry_type), transactions) {
            if outcome.is_ok() {
                outcome = Err(err);
            }
        }
    }

    tracing::debug!(transaction = %id, "transaction unposted");
    outcome
}

/// Common transaction patterns
pub mod patterns {
    use super::*;

    /// Pay an expense out of cash (debit expense, credit cash)
    pub fn create_expense_payment(
        date: NaiveDate,
        memo: &str,
        expense_account: AccountId,
        cash_account: AccountId,
        amount: BigDecimal,
    ) -> TransactionUpdate {
        TransactionBuilder::new(date, amount, expense_account, cash_account)
            .memo(memo)
            .build()
    }

    /// Record a sale (debit cash/receivables, credit revenue)
    pub fn create_sales_transaction(
        date: NaiveDate,
        memo: &str,
        cash_or_receivables_account: AccountId,
        revenue_account: AccountId,
        amount: BigDecimal,
    ) -> TransactionUpdate {
        TransactionBuilder::new(date, amount, cash_or_receivables_account, revenue_account)
            .memo(memo)
            .build()
    }

    /// Cash received from a loan (debit cash, credit loan payable)
    pub fn create_loan_received(
        date: NaiveDate,
        memo: &str,
        cash_account: AccountId,
        loan_payable_account: AccountId,
        amount: BigDecimal,
    ) -> TransactionUpdate {
        TransactionBuilder::new(date, amount, cash_account, loan_payable_account)
            .memo(memo)
            .build()
    }

    /// Owner puts cash into the business (debit cash, credit equity)
    pub fn create_owner_investment(
        date: NaiveDate,
        memo: &str,
        cash_account: AccountId,
        equity_account: AccountId,
        amount: BigDecimal,
    ) -> TransactionUpdate {
        TransactionBuilder::new(date, amount, cash_account, equity_account)
            .memo(memo)
            .build()
    }
}
