//! Configuration for a set of books

use serde::{Deserialize, Serialize};

use crate::types::*;
use crate::utils::validate_account_name;

/// Display names of the five fixed branches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchNames {
    pub assets: String,
    pub liabilities: String,
    pub equity: String,
    pub revenue: String,
    pub expense: String,
}

impl Default for BranchNames {
    fn default() -> Self {
        Self {
            assets: "Assets".into(),
            liabilities: "Liabilities".into(),
            equity: "Equity".into(),
            revenue: "Revenue".into(),
            expense: "Expense".into(),
        }
    }
}

impl BranchNames {
    pub fn name_for(&self, account_type: AccountType) -> &str {
        match account_type {
            AccountType::Asset => &self.assets,
            AccountType::Liability => &self.liabilities,
            AccountType::Equity => &self.equity,
            AccountType::Revenue => &self.revenue,
            AccountType::Expense => &self.expense,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BooksConfig {
    pub branch_names: BranchNames,
    /// Whether the five branches themselves accept postings
    pub branches_accept_transactions: bool,
    /// Directive handed to the tracing `EnvFilter`
    pub log_filter: String,
}

impl Default for BooksConfig {
    fn default() -> Self {
        Self {
            branch_names: BranchNames::default(),
            branches_accept_transactions: false,
            log_filter: "bookkeeping_core=info".into(),
        }
    }
}

impl BooksConfig {
    /// Parse a JSON configuration; missing keys fall back to the defaults
    pub fn from_json_str(raw: &str) -> LedgerResult<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Branch names must be valid account names
    pub fn validate(&self) -> LedgerResult<()> {
        let mut errors = ValidationErrors::new();
        for account_type in AccountType::ALL {
            validate_account_name(self.branch_names.name_for(account_type), &mut errors);
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            BooksConfig::from_json_str(r#"{ "branch_names": { "revenue": "Income" } }"#).unwrap();
        assert_eq!(config.branch_names.revenue, "Income");
        assert_eq!(config.branch_names.assets, "Assets");
        assert!(!config.branches_accept_transactions);
        assert_eq!(config.log_filter, "bookkeeping_core=info");
    }

    #[test]
    fn test_invalid_branch_name_is_rejected() {
        let result = BooksConfig::from_json_str(r#"{ "branch_names": { "equity": "" } }"#);
        assert!(matches!(result, Err(LedgerError::Validation(_))));
        assert!(matches!(
            BooksConfig::from_json_str("not json"),
            Err(LedgerError::Serde(_))
        ));
    }
}
