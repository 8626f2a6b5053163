//! Profile bundles: the complete persisted state of one user.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    account::{Account, TrashedAccount},
    budget::Budget,
    category::Category,
    common::null_as_default,
    transaction::{Transaction, TrashedTransaction},
};

/// One independent bookkeeping context ("dashboard").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub accounts: Vec<Account>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub transactions: Vec<Transaction>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<Category>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub trash: Vec<TrashedTransaction>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub trashed_accounts: Vec<TrashedAccount>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub budgets: Vec<Budget>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub widget_settings: WidgetSettings,
}

impl DashboardData {
    pub fn account(&self, id: &str) -> Option<&Account> {
        self.accounts.iter().find(|account| account.id == id)
    }

    pub fn account_mut(&mut self, id: &str) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|account| account.id == id)
    }

    pub fn transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|txn| txn.id == id)
    }

    pub fn transaction_mut(&mut self, id: &str) -> Option<&mut Transaction> {
        self.transactions.iter_mut().find(|txn| txn.id == id)
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    pub fn category_mut(&mut self, id: &str) -> Option<&mut Category> {
        self.categories.iter_mut().find(|category| category.id == id)
    }

    pub fn budget(&self, id: &str) -> Option<&Budget> {
        self.budgets.iter().find(|budget| budget.id == id)
    }

    /// Re-sorts active transactions ascending by date. The sort is stable.
    pub fn sort_transactions(&mut self) {
        self.transactions.sort_by_key(|txn| txn.date);
    }
}

/// Dashboard widget toggles. Keys missing from persisted data fall back to the template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetSettings {
    pub show_net_worth: bool,
    pub show_cash_flow: bool,
    pub show_budgets: bool,
    pub show_recent_transactions: bool,
    pub show_category_breakdown: bool,
    pub show_debt_overview: bool,
    pub show_needs_wants: bool,
    pub recent_transaction_count: u32,
    pub trend_months: u32,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            show_net_worth: true,
            show_cash_flow: true,
            show_budgets: true,
            show_recent_transactions: true,
            show_category_breakdown: true,
            show_debt_overview: true,
            show_needs_wants: false,
            recent_transaction_count: 10,
            trend_months: 6,
        }
    }
}

/// Identifies one of the two profiles every user owns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    #[default]
    Personal,
    Home,
}

impl ProfileKind {
    pub fn display_name(self) -> &'static str {
        match self {
            ProfileKind::Personal => "Personal",
            ProfileKind::Home => "Home",
        }
    }

    pub fn other(self) -> Self {
        match self {
            ProfileKind::Personal => ProfileKind::Home,
            ProfileKind::Home => ProfileKind::Personal,
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// The persisted per-user object: two profiles plus shared preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileBundle {
    #[serde(default, deserialize_with = "null_as_default")]
    pub personal: DashboardData,
    #[serde(default, deserialize_with = "null_as_default")]
    pub home: DashboardData,
    #[serde(default, deserialize_with = "null_as_default")]
    pub theme: Theme,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active_dashboard: ProfileKind,
    #[serde(default = "ProfileBundle::default_currency")]
    pub currency: String,
}

impl Default for ProfileBundle {
    fn default() -> Self {
        Self {
            personal: DashboardData::default(),
            home: DashboardData::default(),
            theme: Theme::default(),
            active_dashboard: ProfileKind::default(),
            currency: Self::default_currency(),
        }
    }
}

impl ProfileBundle {
    pub fn default_currency() -> String {
        "USD".into()
    }

    pub fn profile(&self, kind: ProfileKind) -> &DashboardData {
        match kind {
            ProfileKind::Personal => &self.personal,
            ProfileKind::Home => &self.home,
        }
    }

    pub fn profile_mut(&mut self, kind: ProfileKind) -> &mut DashboardData {
        match kind {
            ProfileKind::Personal => &mut self.personal,
            ProfileKind::Home => &mut self.home,
        }
    }

    pub fn active(&self) -> &DashboardData {
        self.profile(self.active_dashboard)
    }

    pub fn active_mut(&mut self) -> &mut DashboardData {
        self.profile_mut(self.active_dashboard)
    }

    /// Borrows both profiles mutably, source first.
    pub fn split_mut(
        &mut self,
        from: ProfileKind,
    ) -> (&mut DashboardData, &mut DashboardData) {
        match from {
            ProfileKind::Personal => (&mut self.personal, &mut self.home),
            ProfileKind::Home => (&mut self.home, &mut self.personal),
        }
    }
}
