//! General ledger: the chart-of-accounts tree and its row addressing
//!
//! The tree has an implicit root (row 0) with exactly five fixed branches,
//! one per [`AccountType`]. Every other account hangs below one of them.
//! Rows are indices into the preorder traversal, so row 1 is the Assets
//! branch and its descendants follow before the Liabilities branch.

use std::collections::HashMap;

use crate::config::BooksConfig;
use crate::ledger::Journal;
use crate::traits::*;
use crate::types::*;
use crate::utils::DefaultAccountValidator;

/// Separator between segments of an account's full name
pub const FULL_NAME_SEPARATOR: char = '.';

/// One account in the tree together with its structural links
#[derive(Debug, Clone)]
pub struct AccountNode {
    account: Account,
    parent: Option<AccountId>,
    children: Vec<AccountId>,
}

impl AccountNode {
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// `None` for the five branches, which hang off the implicit root
    pub fn parent(&self) -> Option<AccountId> {
        self.parent
    }

    pub fn children(&self) -> &[AccountId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// What a cascading account removal took out of the books
#[derive(Debug, Clone, Default)]
pub struct RemovedAccounts {
    /// Removed accounts, subtree root first, in preorder
    pub accounts: Vec<Account>,
    /// Every transaction that touched one of them, in journal order
    pub transactions: Vec<Transaction>,
}

/// The chart of accounts
#[derive(Debug, Clone)]
pub struct GeneralLedger {
    nodes: HashMap<AccountId, AccountNode>,
    branches: Vec<AccountId>,
}

impl Default for GeneralLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneralLedger {
    /// Create a chart with the default branch names
    pub fn new() -> Self {
        Self::build(&BooksConfig::default())
    }

    /// Create a chart using the configured branch names and flags
    pub fn with_config(config: &BooksConfig) -> LedgerResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: &BooksConfig) -> Self {
        let branches = AccountType::ALL
            .iter()
            .map(|account_type| {
                let mut account = Account::new(*account_type)
                    .with_transactions_enabled(config.branches_accept_transactions);
                account.name = config.branch_names.name_for(*account_type).to_string();
                account
            })
            .collect();
        Self::from_branches(branches)
    }

    /// Assemble a chart from five branch accounts given in [`AccountType::ALL`] order
    pub(crate) fn from_branches(branches: Vec<Account>) -> Self {
        let mut chart = Self {
            nodes: HashMap::new(),
            branches: Vec::with_capacity(branches.len()),
        };
        for account in branches {
            chart.branches.push(account.id);
            chart.nodes.insert(
                account.id,
                AccountNode {
                    account,
                    parent: None,
                    children: Vec::new(),
                },
            );
        }
        chart
    }

    /// The fixed top-level account for a type
    pub fn branch(&self, account_type: AccountType) -> AccountId {
        let index = AccountType::ALL
            .iter()
            .position(|candidate| *candidate == account_type)
            .unwrap_or_default();
        self.branches[index]
    }

    pub fn branches(&self) -> &[AccountId] {
        &self.branches
    }

    /// Number of accounts, branches included (the root is not an account)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.nodes.get(&id).map(|node| &node.account)
    }

    pub(crate) fn account_mut(&mut self, id: AccountId) -> Option<&mut Account> {
        self.nodes.get_mut(&id).map(|node| &mut node.account)
    }

    pub fn node(&self, id: AccountId) -> Option<&AccountNode> {
        self.nodes.get(&id)
    }

    /// Depth below the root: branches are at depth 1
    pub fn depth(&self, id: AccountId) -> Option<usize> {
        let mut node = self.nodes.get(&id)?;
        let mut depth = 1;
        while let Some(parent) = node.parent {
            node = self.nodes.get(&parent)?;
            depth += 1;
        }
        Some(depth)
    }

    /// Ids of every account in row order (row = position + 1)
    pub fn preorder(&self) -> Vec<AccountId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        for branch in &self.branches {
            self.collect_subtree(*branch, &mut order);
        }
        order
    }

    fn collect_subtree(&self, id: AccountId, order: &mut Vec<AccountId>) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        order.push(id);
        for child in &node.children {
            self.collect_subtree(*child, order);
        }
    }

    /// An account and all its descendants, in preorder
    pub fn subtree(&self, id: AccountId) -> Vec<AccountId> {
        let mut order = Vec::new();
        self.collect_subtree(id, &mut order);
        order
    }

    /// Every account in row order
    pub fn accounts(&self) -> impl Iterator<Item = &Account> + '_ {
        self.preorder()
            .into_iter()
            .filter_map(move |id| self.account(id))
    }

    /// Node at a row; row 0 is the root and addresses no account
    pub fn account_node_at_row(&self, row: usize) -> Option<&AccountNode> {
        let id = self.account_id_at_row(row)?;
        self.nodes.get(&id)
    }

    pub fn account_at_row(&self, row: usize) -> Option<&Account> {
        self.account_node_at_row(row).map(|node| &node.account)
    }

    fn account_id_at_row(&self, row: usize) -> Option<AccountId> {
        let index = row.checked_sub(1)?;
        self.preorder().get(index).copied()
    }

    /// Row of an account, `None` when it is not in the chart
    pub fn row_of_account(&self, id: AccountId) -> Option<usize> {
        self.preorder()
            .iter()
            .position(|candidate| *candidate == id)
            .map(|index| index + 1)
    }

    /// Resolve a row to an account id, refusing the root
    fn require_row(&self, row: usize) -> LedgerResult<AccountId> {
        if row == 0 {
            return Err(LedgerError::RootAccount);
        }
        self.account_id_at_row(row)
            .ok_or(LedgerError::RowOutOfRange(row))
    }

    /// Resolve a row that may be edited or removed: not the root, not a branch
    fn require_editable_row(&self, row: usize) -> LedgerResult<AccountId> {
        let id = self.require_row(row)?;
        if self.depth(id).unwrap_or_default() <= 1 {
            return Err(LedgerError::TopLevelAccount(row));
        }
        Ok(id)
    }

    fn ensure_unique_name(
        &self,
        parent: AccountId,
        name: &str,
        ignore: Option<AccountId>,
    ) -> LedgerResult<()> {
        let Some(node) = self.nodes.get(&parent) else {
            return Err(LedgerError::AccountNotFound(parent));
        };
        let taken = node
            .children
            .iter()
            .filter(|child| Some(**child) != ignore)
            .filter_map(|child| self.account(*child))
            .any(|sibling| sibling.name == name);
        if taken {
            return Err(LedgerError::DuplicateAccountName {
                parent: self.account_full_name(parent).unwrap_or_default(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Append a new leaf account under the account at `row`
    ///
    /// The account's number and name are validated first. The root row is
    /// refused, the name must be unused among the siblings and the type must
    /// match the parent's.
    pub fn insert_child_account(
        &mut self,
        row: usize,
        account: Account,
    ) -> LedgerResult<AccountId> {
        self.insert_child_account_with(row, &DefaultAccountValidator, account)
    }

    /// Same as [`GeneralLedger::insert_child_account`] with a custom validator
    pub fn insert_child_account_with(
        &mut self,
        row: usize,
        validator: &dyn AccountValidator,
        account: Account,
    ) -> LedgerResult<AccountId> {
        let parent = self.require_row(row)?;
        self.attach(parent, validator, account)
    }

    pub(crate) fn attach(
        &mut self,
        parent: AccountId,
        validator: &dyn AccountValidator,
        mut account: Account,
    ) -> LedgerResult<AccountId> {
        validator
            .validate_identity(account.number, &account.name, &account.description)
            .into_result()?;

        let parent_type = self
            .account(parent)
            .ok_or(LedgerError::AccountNotFound(parent))?
            .account_type;
        if parent_type != account.account_type {
            return Err(LedgerError::AccountTypeMismatch {
                parent: parent_type,
                child: account.account_type,
            });
        }
        if self.nodes.contains_key(&account.id) {
            return Err(LedgerError::DuplicateAccountId(account.id));
        }
        self.ensure_unique_name(parent, &account.name, None)?;

        if !account.entries.is_empty() {
            tracing::warn!(
                account = %account.id,
                entries = account.entries.len(),
                "discarding entries of an account posted outside this chart"
            );
            account.entries.clear();
            account.balance = bigdecimal::BigDecimal::from(0);
        }

        let id = account.id;
        tracing::info!(account = %id, parent = %parent, name = %account.name, "account inserted");
        self.nodes.insert(
            id,
            AccountNode {
                account,
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(id);
        }
        Ok(id)
    }

    /// Update the identity fields of the account at `row`
    ///
    /// Branches cannot be edited and the new name must stay unique among siblings.
    pub fn update_account(
        &mut self,
        row: usize,
        validator: &dyn AccountValidator,
        number: i32,
        name: &str,
        description: &str,
    ) -> LedgerResult<AccountId> {
        let id = self.require_editable_row(row)?;
        if let Some(parent) = self.nodes.get(&id).and_then(|node| node.parent) {
            self.ensure_unique_name(parent, name, Some(id))?;
        }
        let account = self
            .account_mut(id)
            .ok_or(LedgerError::AccountNotFound(id))?;
        account.update_with(validator, number, name, description)?;
        Ok(id)
    }

    /// Remove the account at `row`, its descendants and their whole history
    ///
    /// Every transaction that touched a removed account is taken out of the
    /// journal (and unposted from any surviving counterparty) before the
    /// subtree is detached.
    pub fn remove_account(
        &mut self,
        row: usize,
        journal: &mut Journal,
    ) -> LedgerResult<RemovedAccounts> {
        let id = self.require_editable_row(row)?;
        let doomed = self.subtree(id);

        let mut touched = Vec::new();
        for account in doomed.iter().filter_map(|account| self.account(*account)) {
            for entry in &account.entries {
                if !touched.contains(&entry.transaction) {
                    touched.push(entry.transaction);
                }
            }
        }
        let transactions = journal.remove_transactions(&touched, self);

        if let Some(parent) = self.nodes.get(&id).and_then(|node| node.parent) {
            if let Some(node) = self.nodes.get_mut(&parent) {
                node.children.retain(|child| *child != id);
            }
        }
        let accounts = doomed
            .iter()
            .filter_map(|account| self.nodes.remove(account))
            .map(|node| node.account)
            .collect::<Vec<_>>();

        tracing::info!(
            account = %id,
            accounts = accounts.len(),
            transactions = transactions.len(),
            "account removed"
        );
        Ok(RemovedAccounts {
            accounts,
            transactions,
        })
    }

    /// Dot-joined name from the branch down, e.g. `Assets.Cash.Checking`
    pub fn account_full_name(&self, id: AccountId) -> Option<String> {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(id) = current {
            let node = self.nodes.get(&id)?;
            segments.push(node.account.name.as_str());
            current = node.parent;
        }
        segments.reverse();
        Some(segments.join(&FULL_NAME_SEPARATOR.to_string()))
    }

    /// Full names of all accounts in row order, optionally only those that accept postings
    pub fn account_full_names(&self, exclude_non_transactionnable: bool) -> Vec<String> {
        self.preorder()
            .into_iter()
            .filter(|id| {
                !exclude_non_transactionnable
                    || self
                        .account(*id)
                        .is_some_and(|account| account.transactions_enabled)
            })
            .filter_map(|id| self.account_full_name(id))
            .collect()
    }

    /// Find an account by its full name, one segment at a time
    pub fn account_by_full_name(&self, full_name: &str) -> Option<&Account> {
        let mut segments = full_name.split(FULL_NAME_SEPARATOR);
        let first = segments.next()?;
        let mut current = self
            .branches
            .iter()
            .copied()
            .find(|branch| self.account(*branch).is_some_and(|account| account.name == first))?;

        for segment in segments {
            let node = self.nodes.get(&current)?;
            current = node
                .children
                .iter()
                .copied()
                .find(|child| self.account(*child).is_some_and(|account| account.name == segment))?;
        }
        self.account(current)
    }
}
