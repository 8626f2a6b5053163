//! Flattens transactions into rows for an external CSV/XLSX/PDF renderer.

use chrono::NaiveDate;
use serde::Serialize;

use homefin_domain::{DashboardData, Transaction};

use crate::{
    ledger_service::LedgerService,
    transaction_service::{TransactionFilter, TransactionService},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub date: NaiveDate,
    pub description: String,
    pub account: String,
    pub category: String,
    pub subcategory: String,
    /// Tags joined with `", "`.
    pub tags: String,
    pub debit: Option<f64>,
    pub credit: Option<f64>,
    pub notes: String,
}

pub struct ExportService;

impl ExportService {
    pub fn row(data: &DashboardData, txn: &Transaction) -> ExportRow {
        let category = txn
            .category_id
            .as_deref()
            .and_then(|id| data.category(id));
        let subcategory = category
            .zip(txn.sub_category_id.as_deref())
            .and_then(|(category, sub_id)| category.subcategory(sub_id));
        let (debit, credit) = if txn.amount < 0.0 {
            (Some(txn.amount.abs()), None)
        } else {
            (None, Some(txn.amount))
        };
        ExportRow {
            date: txn.date,
            description: txn.description.clone(),
            account: LedgerService::account_label(&data.accounts, &txn.account_id).to_string(),
            category: category.map(|c| c.name.clone()).unwrap_or_default(),
            subcategory: subcategory.map(|s| s.name.clone()).unwrap_or_default(),
            tags: txn.tags.iter().cloned().collect::<Vec<_>>().join(", "),
            debit,
            credit,
            notes: txn.notes.clone().unwrap_or_default(),
        }
    }

    /// Rows for every active transaction matching `filter`, in date order.
    pub fn rows(data: &DashboardData, filter: &TransactionFilter) -> Vec<ExportRow> {
        TransactionService::filter(data, filter)
            .into_iter()
            .map(|txn| Self::row(data, txn))
            .collect()
    }
}
