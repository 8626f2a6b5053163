//! Budgets and their reporting structures.

use serde::{Deserialize, Serialize};

use crate::common::*;

/// Spending target for a period, optionally restricted to a set of categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: String,
    pub name: String,
    pub amount: f64,
    #[serde(default)]
    pub period: BudgetPeriod,
    /// Empty means the budget covers every expense in the period.
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<BudgetCategory>,
}

impl Budget {
    pub fn new(name: impl Into<String>, amount: f64, period: BudgetPeriod) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            amount,
            period,
            categories: Vec::new(),
        }
    }

    pub fn with_category(mut self, category_id: impl Into<String>, allocated_amount: f64) -> Self {
        self.categories.push(BudgetCategory {
            category_id: category_id.into(),
            allocated_amount,
        });
        self
    }

    pub fn is_restricted(&self) -> bool {
        !self.categories.is_empty()
    }

    pub fn covers_category(&self, category_id: Option<&str>) -> bool {
        if !self.is_restricted() {
            return true;
        }
        match category_id {
            Some(id) => self.categories.iter().any(|entry| entry.category_id == id),
            None => false,
        }
    }
}

impl Identifiable for Budget {
    fn id(&self) -> &str {
        &self.id
    }
}

impl NamedEntity for Budget {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Displayable for Budget {
    fn display_label(&self) -> String {
        format!("{} ({} {:.2})", self.name, self.period, self.amount)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCategory {
    pub category_id: String,
    #[serde(default)]
    pub allocated_amount: f64,
}

/// Result of attributing transactions to a budget for one period window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetSpend {
    pub budget_id: String,
    pub window: DateWindow,
    pub spent: f64,
    pub remaining: f64,
    pub overspent: bool,
    /// Number of transactions counted toward `spent`.
    pub matched: usize,
}

impl BudgetSpend {
    /// Share of the target consumed, in percent. `None` for zero targets.
    pub fn percent_used(&self, target: f64) -> Option<f64> {
        if target.abs() > f64::EPSILON {
            Some(self.spent / target * 100.0)
        } else {
            None
        }
    }
}

/// Allocated versus spent amounts for one restricted category of a budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationStatus {
    pub category_id: String,
    pub allocated: f64,
    pub spent: f64,
    pub remaining: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrestricted_budget_covers_everything() {
        let budget = Budget::new("All", 100.0, BudgetPeriod::Monthly);
        assert!(budget.covers_category(None));
        assert!(budget.covers_category(Some("food")));
    }

    #[test]
    fn restricted_budget_requires_listed_category() {
        let budget = Budget::new("Food", 100.0, BudgetPeriod::Weekly).with_category("food", 100.0);
        assert!(budget.covers_category(Some("food")));
        assert!(!budget.covers_category(Some("fuel")));
        assert!(!budget.covers_category(None));
    }

    #[test]
    fn period_serialises_lowercase() {
        let budget = Budget::new("Year", 1.0, BudgetPeriod::Yearly);
        let json = serde_json::to_value(&budget).unwrap();
        assert_eq!(json["period"], "yearly");
    }
}
