//! Accounts tracked within a profile.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::*;

/// Represents a financial account. Its balance is always derived from transactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AccountKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment: Option<f64>,
    /// Day of month the payment is due.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_limit: Option<f64>,
    #[serde(default)]
    pub is_archived: bool,
}

impl Account {
    /// Creates a new, unarchived account of the given kind.
    pub fn new(name: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            kind,
            interest_rate: None,
            installment: None,
            due_date: None,
            credit_limit: None,
            is_archived: false,
        }
    }

    pub fn with_credit_limit(mut self, limit: f64) -> Self {
        self.credit_limit = Some(limit);
        self
    }

    pub fn with_debt_terms(mut self, interest_rate: f64, installment: f64, due_day: u32) -> Self {
        self.interest_rate = Some(interest_rate);
        self.installment = Some(installment);
        self.due_date = Some(due_day);
        self
    }

    pub fn is_liability(&self) -> bool {
        self.kind.is_liability()
    }
}

impl Identifiable for Account {
    fn id(&self) -> &str {
        &self.id
    }
}

impl NamedEntity for Account {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Displayable for Account {
    fn display_label(&self) -> String {
        format!("{} ({})", self.name, self.kind)
    }
}

/// Enumerates the supported account classifications.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AccountKind {
    Bank,
    #[serde(rename = "Credit Card")]
    CreditCard,
    Loan,
    Investment,
    Cash,
}

impl AccountKind {
    /// Credit cards and loans are reported as liabilities.
    pub fn is_liability(self) -> bool {
        matches!(self, AccountKind::CreditCard | AccountKind::Loan)
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccountKind::Bank => "Bank",
            AccountKind::CreditCard => "Credit Card",
            AccountKind::Loan => "Loan",
            AccountKind::Investment => "Investment",
            AccountKind::Cash => "Cash",
        };
        f.write_str(label)
    }
}

/// An account sitting in the trash, waiting for restore or purge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrashedAccount {
    #[serde(flatten)]
    pub account: Account,
    #[serde(default = "load_time", deserialize_with = "lenient_timestamp")]
    pub deleted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_card_kind_uses_spaced_label() {
        let account = Account::new("Visa", AccountKind::CreditCard);
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["type"], "Credit Card");
        assert_eq!(json["isArchived"], false);
        assert!(json.get("creditLimit").is_none());
    }

    #[test]
    fn liabilities_are_cards_and_loans() {
        assert!(AccountKind::CreditCard.is_liability());
        assert!(AccountKind::Loan.is_liability());
        assert!(!AccountKind::Bank.is_liability());
        assert!(!AccountKind::Investment.is_liability());
        assert!(!AccountKind::Cash.is_liability());
    }
}
