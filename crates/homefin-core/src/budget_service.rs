//! Budget attribution and budget management.
//!
//! A transaction counts toward a budget when it carries the budget's id explicitly, no
//! matter its date or category. Otherwise it must be a non-transfer expense dated inside
//! the budget's period window and, for restricted budgets, in one of the listed
//! categories.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use homefin_domain::{
    AllocationStatus, Budget, BudgetPeriod, BudgetSpend, DashboardData, DateWindow, Transaction,
};

use crate::{ledger_service::LedgerService, CoreError, CoreResult};

/// One budget with its spend for the period around the reference date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetSummaryRow {
    pub budget_id: String,
    pub name: String,
    pub period: BudgetPeriod,
    pub target: f64,
    pub spend: BudgetSpend,
    pub percent_used: Option<f64>,
}

pub struct BudgetService;

impl BudgetService {
    /// Returns `true` when `txn` counts toward `budget` inside `window`.
    pub fn attributes_to(budget: &Budget, txn: &Transaction, window: DateWindow) -> bool {
        if let Some(linked) = txn.budget_id.as_deref() {
            if linked == budget.id {
                return true;
            }
        }
        txn.is_expense()
            && !txn.is_transfer
            && window.contains(txn.date)
            && budget.covers_category(txn.category_id.as_deref())
    }

    pub fn budget_spend(
        budget: &Budget,
        transactions: &[Transaction],
        reference: NaiveDate,
    ) -> BudgetSpend {
        let window = LedgerService::period_window(budget.period, reference);
        let (spent, matched) = transactions
            .iter()
            .filter(|txn| Self::attributes_to(budget, txn, window))
            .fold((0.0, 0usize), |(total, count), txn| {
                (total + txn.amount.abs(), count + 1)
            });
        BudgetSpend {
            budget_id: budget.id.clone(),
            window,
            spent,
            remaining: budget.amount - spent,
            overspent: spent > budget.amount,
            matched,
        }
    }

    /// Allocated versus spent per listed category. Empty for unrestricted budgets.
    pub fn allocation_breakdown(
        budget: &Budget,
        transactions: &[Transaction],
        reference: NaiveDate,
    ) -> Vec<AllocationStatus> {
        let window = LedgerService::period_window(budget.period, reference);
        budget
            .categories
            .iter()
            .map(|entry| {
                let spent: f64 = transactions
                    .iter()
                    .filter(|txn| txn.category_id.as_deref() == Some(entry.category_id.as_str()))
                    .filter(|txn| Self::attributes_to(budget, txn, window))
                    .map(|txn| txn.amount.abs())
                    .sum();
                AllocationStatus {
                    category_id: entry.category_id.clone(),
                    allocated: entry.allocated_amount,
                    spent,
                    remaining: entry.allocated_amount - spent,
                }
            })
            .collect()
    }

    /// Spend of every budget in the profile, in list order.
    pub fn summarize_budgets(data: &DashboardData, reference: NaiveDate) -> Vec<BudgetSummaryRow> {
        data.budgets
            .iter()
            .map(|budget| {
                let spend = Self::budget_spend(budget, &data.transactions, reference);
                BudgetSummaryRow {
                    budget_id: budget.id.clone(),
                    name: budget.name.clone(),
                    period: budget.period,
                    target: budget.amount,
                    percent_used: spend.percent_used(budget.amount),
                    spend,
                }
            })
            .collect()
    }

    pub fn add(data: &mut DashboardData, budget: Budget) -> CoreResult<String> {
        Self::validate(data, &budget)?;
        let id = budget.id.clone();
        debug!(id = %id, name = %budget.name, "added budget");
        data.budgets.push(budget);
        Ok(id)
    }

    /// Applies `mutator` to a copy of the budget and stores it if it still validates.
    pub fn update<F>(data: &mut DashboardData, id: &str, mutator: F) -> CoreResult<()>
    where
        F: FnOnce(&mut Budget),
    {
        let position = data
            .budgets
            .iter()
            .position(|budget| budget.id == id)
            .ok_or_else(|| CoreError::BudgetNotFound(id.to_string()))?;
        let mut candidate = data.budgets[position].clone();
        mutator(&mut candidate);
        candidate.id = id.to_string();
        Self::validate(data, &candidate)?;
        data.budgets[position] = candidate;
        Ok(())
    }

    /// Removes a budget and clears explicit links to it.
    pub fn remove(data: &mut DashboardData, id: &str) -> CoreResult<Budget> {
        let position = data
            .budgets
            .iter()
            .position(|budget| budget.id == id)
            .ok_or_else(|| CoreError::BudgetNotFound(id.to_string()))?;
        let removed = data.budgets.remove(position);
        let mut unlinked = 0usize;
        let linked = data
            .transactions
            .iter_mut()
            .chain(data.trash.iter_mut().map(|entry| &mut entry.transaction));
        for txn in linked {
            if txn.budget_id.as_deref() == Some(id) {
                txn.budget_id = None;
                unlinked += 1;
            }
        }
        info!(id, unlinked, "removed budget");
        Ok(removed)
    }

    fn validate(data: &DashboardData, budget: &Budget) -> CoreResult<()> {
        if budget.name.trim().is_empty() {
            return Err(CoreError::Validation("budget name is required".into()));
        }
        if !budget.amount.is_finite() || budget.amount < 0.0 {
            return Err(CoreError::Validation(
                "budget amount must be a non-negative number".into(),
            ));
        }
        for entry in &budget.categories {
            if data.category(&entry.category_id).is_none() {
                return Err(CoreError::CategoryNotFound(entry.category_id.clone()));
            }
        }
        Ok(())
    }
}
