//! Validation utilities

use bigdecimal::BigDecimal;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ledger::TransactionUpdate;
use crate::traits::*;
use crate::types::*;

/// Words separated by single spaces; names stay on one line
static ACCOUNT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+ ?)+$").expect("account name pattern compiles"));

/// Validate an advisory account number (-1 means unset)
pub fn validate_account_number(number: i32, errors: &mut ValidationErrors) {
    if number < -1 {
        errors.insert(
            ValidationField::AccountNumber,
            ValidationErrorKind::NegativeAccountNumber,
        );
    }
}

/// Validate that an account name is non-empty and made of words
pub fn validate_account_name(name: &str, errors: &mut ValidationErrors) {
    if name.is_empty() {
        errors.insert(
            ValidationField::AccountName,
            ValidationErrorKind::EmptyAccountName,
        );
    } else if !ACCOUNT_NAME.is_match(name) {
        errors.insert(
            ValidationField::AccountName,
            ValidationErrorKind::NotAlphanumericAccountName,
        );
    }
}

/// Validate that a transaction amount is not negative
pub fn validate_transaction_amount(amount: &BigDecimal, errors: &mut ValidationErrors) {
    if *amount < BigDecimal::from(0) {
        errors.insert(
            ValidationField::TransactionAmount,
            ValidationErrorKind::NegativeTransactionAmount,
        );
    }
}

/// Validate that a chosen account accepts postings
pub fn validate_transactionnable(
    field: ValidationField,
    account: &Account,
    errors: &mut ValidationErrors,
) {
    if !account.transactions_enabled() {
        errors.insert(field, ValidationErrorKind::NotTransactionnableAccount);
    }
}

/// Default account validator with basic rules
pub struct DefaultAccountValidator;

impl AccountValidator for DefaultAccountValidator {
    fn validate_identity(&self, number: i32, name: &str, _description: &str) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        validate_account_number(number, &mut errors);
        validate_account_name(name, &mut errors);
        errors
    }
}

/// Default transaction validator: non-negative amount, both accounts transactionnable
pub struct DefaultTransactionValidator;

impl TransactionValidator for DefaultTransactionValidator {
    fn validate_update(
        &self,
        update: &TransactionUpdate,
        debit_account: &Account,
        credit_account: &Account,
    ) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        validate_transaction_amount(&update.amount, &mut errors);
        validate_transactionnable(ValidationField::DebitAccount, debit_account, &mut errors);
        validate_transactionnable(ValidationField::CreditAccount, credit_account, &mut errors);
        errors
    }
}
