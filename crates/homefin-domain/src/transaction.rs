//! Domain models for ledger transactions.

use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::common::*;

/// A signed movement of money on one account: positive is inflow, negative is outflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    #[serde(deserialize_with = "flexible_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_id: Option<String>,
    #[serde(default)]
    pub is_transfer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Transaction {
    pub fn new(
        account_id: impl Into<String>,
        date: NaiveDate,
        description: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            id: new_id(),
            account_id: account_id.into(),
            date,
            description: description.into(),
            amount,
            category_id: None,
            sub_category_id: None,
            tags: BTreeSet::new(),
            classification: None,
            budget_id: None,
            is_transfer: false,
            notes: None,
        }
    }

    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn with_subcategory(mut self, sub_category_id: impl Into<String>) -> Self {
        self.sub_category_id = Some(sub_category_id.into());
        self
    }

    pub fn with_budget(mut self, budget_id: impl Into<String>) -> Self {
        self.budget_id = Some(budget_id.into());
        self
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_expense(&self) -> bool {
        self.amount < 0.0
    }

    pub fn is_income(&self) -> bool {
        self.amount > 0.0
    }
}

impl Identifiable for Transaction {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Displayable for Transaction {
    fn display_label(&self) -> String {
        format!("{} {} {:.2}", self.date, self.description, self.amount)
    }
}

/// Spending classification used by the needs/wants dashboard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Need,
    Want,
    Must,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Classification::Need => "need",
            Classification::Want => "want",
            Classification::Must => "must",
        };
        f.write_str(label)
    }
}

/// A transaction sitting in the trash together with its deletion time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrashedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    #[serde(default = "load_time", deserialize_with = "lenient_timestamp")]
    pub deleted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_optional_fields_default() {
        let json = r#"{
            "id": "t1",
            "accountId": "a1",
            "date": "2024-01-03",
            "description": "Groceries",
            "amount": -75.5,
            "tags": null
        }"#;
        let txn: Transaction = serde_json::from_str(json).unwrap();
        assert!(txn.tags.is_empty());
        assert!(!txn.is_transfer);
        assert_eq!(txn.category_id, None);
        assert!(txn.is_expense());
    }

    #[test]
    fn trashed_transaction_flattens_fields() {
        let txn = Transaction::new("a1", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), "Pay", 10.0)
            .with_classification(Classification::Need);
        let trashed = TrashedTransaction {
            transaction: txn.clone(),
            deleted_at: Utc::now(),
        };
        let value = serde_json::to_value(&trashed).unwrap();
        assert_eq!(value["accountId"], "a1");
        assert_eq!(value["classification"], "need");
        assert!(value.get("deletedAt").is_some());

        let back: TrashedTransaction = serde_json::from_value(value).unwrap();
        assert_eq!(back.transaction, txn);
    }
}
