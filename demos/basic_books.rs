//! Basic books usage example

use bookkeeping_core::utils::{init_tracing, MemoryStorage};
use bookkeeping_core::{
    patterns, Account, AccountType, Books, BooksConfig, LedgerEvent, TransactionBuilder,
    TrialBalanceLine,
};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = BooksConfig::default();
    init_tracing(&config.log_filter);
    println!("Bookkeeping Core - Basic Books Example\n");

    let mut books = Books::with_config(config)?;
    books.subscribe(|event: &LedgerEvent| {
        if let LedgerEvent::AccountsRemoved { accounts, transactions } = event {
            println!(
                "  ! removed {} account(s) and {} transaction(s)",
                accounts.len(),
                transactions.len()
            );
        }
    });

    // 1. Chart of accounts
    println!("Setting up the chart of accounts...");
    let mut open = |parent: &str, account_type: AccountType, name: &str| {
        Account::named(account_type, name)
            .and_then(|account| books.insert_account_under(parent, account))
    };
    let cash = open("Assets", AccountType::Asset, "Cash")?;
    let bank = open("Assets", AccountType::Asset, "Bank")?;
    let equipment = open("Assets", AccountType::Asset, "Equipment")?;
    let loan = open("Liabilities", AccountType::Liability, "Bank Loan")?;
    let capital = open("Equity", AccountType::Equity, "Owner Capital")?;
    let sales = open("Revenue", AccountType::Revenue, "Sales")?;
    let rent = open("Expense", AccountType::Expense, "Rent")?;
    let temp = open("Expense", AccountType::Expense, "Temp Staff")?;

    for full_name in books.account_full_names(true) {
        println!("  + {full_name}");
    }
    println!();

    // 2. Business transactions, recorded out of date order on purpose
    println!("Recording transactions...");
    let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).ok_or("invalid date");

    books.record_transaction(&patterns::create_owner_investment(
        day(1)?,
        "Initial owner investment",
        cash,
        capital,
        BigDecimal::from(50000),
    ))?;
    books.record_transaction(&patterns::create_expense_payment(
        day(31)?,
        "January rent",
        rent,
        bank,
        BigDecimal::from(15000),
    ))?;
    books.record_transaction(&patterns::create_loan_received(
        day(3)?,
        "Working capital loan",
        bank,
        loan,
        BigDecimal::from(100000),
    ))?;
    books.record_transaction(
        &TransactionBuilder::new(day(5)?, BigDecimal::from(25000), equipment, cash)
            .reference("INV-1001")
            .memo("Office equipment")
            .build(),
    )?;
    books.record_transaction(&patterns::create_sales_transaction(
        day(20)?,
        "Consulting services",
        bank,
        sales,
        BigDecimal::from(40000),
    ))?;
    books.record_transaction(&patterns::create_expense_payment(
        day(12)?,
        "Event staff",
        temp,
        cash,
        BigDecimal::from(2000),
    ))?;

    for transaction in books.transactions() {
        println!(
            "  {} {:<24} {:>10}",
            transaction.date(),
            transaction.memo(),
            transaction.amount()
        );
    }
    println!();

    // 3. Removing an account takes its history with it
    println!("Closing the temporary staff account...");
    if let Some(row) = books.row_of_account(temp) {
        books.remove_account(row)?;
    }
    println!("  Cash after removal: {}\n", books.account_balance(cash)?);

    // 4. Bank statement with running balance
    println!("Bank statement:");
    for line in books.account_statement(bank)? {
        println!(
            "  {} {:<24} {:<20} {:>10} {:>10} {:>10}",
            line.date,
            line.memo,
            line.transfer_account.unwrap_or_default(),
            line.debit.map(|d| d.to_string()).unwrap_or_default(),
            line.credit.map(|c| c.to_string()).unwrap_or_default(),
            line.balance
        );
    }
    println!();

    // 5. Trial balance
    println!("Trial balance:");
    let trial_balance = books.trial_balance();
    let nonzero = |line: &&TrialBalanceLine| line.balance_amount() != BigDecimal::from(0);
    for line in trial_balance.lines.iter().filter(nonzero) {
        println!(
            "  {:<28} {:>10} {:>10}",
            line.full_name,
            line.debit_balance.as_ref().map(|d| d.to_string()).unwrap_or_default(),
            line.credit_balance.as_ref().map(|c| c.to_string()).unwrap_or_default()
        );
    }
    println!(
        "  {:<28} {:>10} {:>10}  balanced: {}\n",
        "Total", trial_balance.total_debits, trial_balance.total_credits, trial_balance.is_balanced
    );

    // 6. Persist and reload
    let mut storage = MemoryStorage::new();
    books.save_to(&mut storage).await?;
    if let Some(reloaded) = Books::load_from(&storage, BooksConfig::default()).await? {
        println!(
            "Reloaded {} transactions, bank balance {}",
            reloaded.journal().len(),
            reloaded.account_balance(bank)?
        );
    }

    Ok(())
}
