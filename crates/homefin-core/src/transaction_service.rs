//! Validated creation, editing and querying of active transactions.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use homefin_domain::{Classification, DashboardData, Transaction};

use crate::{CoreError, CoreResult};

/// Changes applied to every transaction of a bulk edit. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkEdit {
    /// Setting a category also clears the subcategory unless one is given below.
    pub category_id: Option<String>,
    pub sub_category_id: Option<String>,
    pub classification: Option<Classification>,
    pub budget_id: Option<String>,
    #[serde(default)]
    pub clear_budget: bool,
    #[serde(default)]
    pub add_tags: Vec<String>,
    #[serde(default)]
    pub remove_tags: Vec<String>,
}

impl BulkEdit {
    pub fn is_empty(&self) -> bool {
        self.category_id.is_none()
            && self.sub_category_id.is_none()
            && self.classification.is_none()
            && self.budget_id.is_none()
            && !self.clear_budget
            && self.add_tags.is_empty()
            && self.remove_tags.is_empty()
    }
}

/// Query over active transactions. Date bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub account_id: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub category_id: Option<String>,
    /// Case-insensitive match against description, notes and tags.
    pub search: Option<String>,
    pub include_transfers: bool,
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self {
            account_id: None,
            start: None,
            end: None,
            category_id: None,
            search: None,
            include_transfers: true,
        }
    }
}

impl TransactionFilter {
    pub fn for_account(account_id: impl Into<String>) -> Self {
        Self {
            account_id: Some(account_id.into()),
            ..Self::default()
        }
    }

    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn matches(&self, txn: &Transaction) -> bool {
        if !self.include_transfers && txn.is_transfer {
            return false;
        }
        if let Some(account_id) = &self.account_id {
            if &txn.account_id != account_id {
                return false;
            }
        }
        if self.start.is_some_and(|start| txn.date < start)
            || self.end.is_some_and(|end| txn.date > end)
        {
            return false;
        }
        if let Some(category_id) = &self.category_id {
            if txn.category_id.as_ref() != Some(category_id) {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                txn.description.to_lowercase().contains(&needle)
                    || txn
                        .notes
                        .as_deref()
                        .is_some_and(|notes| notes.to_lowercase().contains(&needle))
                    || txn.tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }
}

pub struct TransactionService;

impl TransactionService {
    /// Adds a transaction and keeps the active list sorted by date.
    pub fn add(data: &mut DashboardData, txn: Transaction) -> CoreResult<String> {
        Self::validate(data, &txn)?;
        let id = txn.id.clone();
        debug!(id = %id, account = %txn.account_id, amount = txn.amount, "added transaction");
        data.transactions.push(txn);
        data.sort_transactions();
        Ok(id)
    }

    /// Adds every transaction or none of them.
    pub fn add_many(data: &mut DashboardData, txns: Vec<Transaction>) -> CoreResult<Vec<String>> {
        for txn in &txns {
            Self::validate(data, txn)?;
        }
        let ids: Vec<String> = txns.iter().map(|txn| txn.id.clone()).collect();
        data.transactions.extend(txns);
        data.sort_transactions();
        debug!(count = ids.len(), "added transactions");
        Ok(ids)
    }

    /// Edits one transaction through `mutator`. The sibling leg of a transfer is not
    /// touched. Only references the mutator changed are checked, so a transaction on a
    /// trashed account or with a stale category can still be edited.
    pub fn update<F>(data: &mut DashboardData, id: &str, mutator: F) -> CoreResult<()>
    where
        F: FnOnce(&mut Transaction),
    {
        let position = data
            .transactions
            .iter()
            .position(|txn| txn.id == id)
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))?;
        let mut candidate = data.transactions[position].clone();
        mutator(&mut candidate);
        candidate.id = id.to_string();
        Self::validate_against(data, &candidate, Some(&data.transactions[position]))?;
        let date_changed = candidate.date != data.transactions[position].date;
        data.transactions[position] = candidate;
        if date_changed {
            data.sort_transactions();
        }
        Ok(())
    }

    /// Applies `edit` to every listed active transaction. Unknown ids are skipped.
    /// Returns the number of transactions changed.
    pub fn bulk_update<I, S>(data: &mut DashboardData, ids: I, edit: &BulkEdit) -> CoreResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if let Some(category_id) = &edit.category_id {
            let category = data
                .category(category_id)
                .ok_or_else(|| CoreError::CategoryNotFound(category_id.clone()))?;
            if let Some(sub_id) = &edit.sub_category_id {
                if category.subcategory(sub_id).is_none() {
                    return Err(CoreError::CategoryNotFound(sub_id.clone()));
                }
            }
        }
        if let Some(budget_id) = &edit.budget_id {
            if data.budget(budget_id).is_none() {
                return Err(CoreError::BudgetNotFound(budget_id.clone()));
            }
        }

        let wanted: HashSet<String> = ids.into_iter().map(|id| id.as_ref().to_string()).collect();
        let mut changed = 0usize;
        for txn in data
            .transactions
            .iter_mut()
            .filter(|txn| wanted.contains(&txn.id))
        {
            if let Some(category_id) = &edit.category_id {
                txn.category_id = Some(category_id.clone());
                txn.sub_category_id = edit.sub_category_id.clone();
            }
            if let Some(classification) = edit.classification {
                txn.classification = Some(classification);
            }
            if edit.clear_budget {
                txn.budget_id = None;
            }
            if let Some(budget_id) = &edit.budget_id {
                txn.budget_id = Some(budget_id.clone());
            }
            for tag in &edit.remove_tags {
                txn.tags.remove(tag);
            }
            txn.tags.extend(
                edit.add_tags
                    .iter()
                    .map(|tag| tag.trim())
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string),
            );
            changed += 1;
        }
        debug!(requested = wanted.len(), changed, "bulk edited transactions");
        Ok(changed)
    }

    /// Active transactions matching `filter`, in list (date) order.
    pub fn filter<'a>(data: &'a DashboardData, filter: &TransactionFilter) -> Vec<&'a Transaction> {
        data.transactions
            .iter()
            .filter(|txn| filter.matches(txn))
            .collect()
    }

    fn validate(data: &DashboardData, txn: &Transaction) -> CoreResult<()> {
        Self::validate_against(data, txn, None)
    }

    /// With `previous`, references equal to the stored ones are accepted as they are.
    fn validate_against(
        data: &DashboardData,
        txn: &Transaction,
        previous: Option<&Transaction>,
    ) -> CoreResult<()> {
        if !txn.amount.is_finite() {
            return Err(CoreError::Validation("amount must be a number".into()));
        }
        let account_changed = previous.map_or(true, |old| old.account_id != txn.account_id);
        if account_changed && data.account(&txn.account_id).is_none() {
            return Err(CoreError::AccountNotFound(txn.account_id.clone()));
        }
        let category_changed = previous.map_or(true, |old| {
            old.category_id != txn.category_id || old.sub_category_id != txn.sub_category_id
        });
        if category_changed {
            Self::validate_category(data, txn)?;
        }
        let budget_changed = previous.map_or(true, |old| old.budget_id != txn.budget_id);
        if let Some(budget_id) = txn.budget_id.as_ref().filter(|_| budget_changed) {
            if data.budget(budget_id).is_none() {
                return Err(CoreError::BudgetNotFound(budget_id.clone()));
            }
        }
        Ok(())
    }

    fn validate_category(data: &DashboardData, txn: &Transaction) -> CoreResult<()> {
        match (&txn.category_id, &txn.sub_category_id) {
            (Some(category_id), sub) => {
                let category = data
                    .category(category_id)
                    .ok_or_else(|| CoreError::CategoryNotFound(category_id.clone()))?;
                if let Some(sub_id) = sub {
                    if category.subcategory(sub_id).is_none() {
                        return Err(CoreError::CategoryNotFound(sub_id.clone()));
                    }
                }
            }
            (None, Some(_)) => {
                return Err(CoreError::Validation(
                    "a subcategory requires a category".into(),
                ));
            }
            (None, None) => {}
        }
        Ok(())
    }
}
