//! Validation and bulk commit of externally parsed transaction rows.
//!
//! File parsing (CSV/XLSX) happens outside the core. Each row is validated on its own;
//! offending rows are reported with a reason and skipped, the rest are committed in a
//! single batch.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use homefin_domain::{DashboardData, Transaction};

use crate::{category_service::CategoryService, CoreError, CoreResult};

/// Date layouts accepted by the importer, in the order they are tried.
pub const IMPORT_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionType::Income => "Income",
            TransactionType::Expense => "Expense",
            TransactionType::Transfer => "Transfer",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    pub date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub debit_amount: Option<f64>,
    #[serde(default)]
    pub credit_amount: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub transaction_type: TransactionType,
}

/// Per-row result of an import.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RowOutcome {
    Accepted { line: usize, transaction_id: String },
    Rejected { line: usize, reason: String },
}

impl RowOutcome {
    pub fn line(&self) -> usize {
        match self {
            RowOutcome::Accepted { line, .. } | RowOutcome::Rejected { line, .. } => *line,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, RowOutcome::Accepted { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub outcomes: Vec<RowOutcome>,
    pub categories_created: usize,
    pub subcategories_created: usize,
}

impl ImportReport {
    pub fn imported(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_accepted()).count()
    }

    pub fn rejected(&self) -> impl Iterator<Item = (usize, &str)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            RowOutcome::Rejected { line, reason } => Some((*line, reason.as_str())),
            RowOutcome::Accepted { .. } => None,
        })
    }
}

/// A row that passed validation: a parsed date and a signed amount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedRow {
    pub date: NaiveDate,
    pub amount: f64,
}

pub struct ImportService;

impl ImportService {
    /// Parses `raw` trying ISO first, then day-first, then month-first.
    pub fn parse_date(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        IMPORT_DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
    }

    /// Checks the date and the debit/credit rule for the row's type.
    pub fn validate_row(row: &ImportRow) -> Result<ValidatedRow, String> {
        let date = Self::parse_date(&row.date)
            .ok_or_else(|| format!("unrecognised date `{}`", row.date.trim()))?;
        let debit = row.debit_amount.unwrap_or(0.0);
        let credit = row.credit_amount.unwrap_or(0.0);
        if !debit.is_finite() || !credit.is_finite() {
            return Err("amounts must be numbers".into());
        }
        let amount = match row.transaction_type {
            TransactionType::Income => {
                if debit != 0.0 {
                    return Err("income rows cannot have a debit amount".into());
                }
                if credit <= 0.0 {
                    return Err("income rows need a credit amount greater than zero".into());
                }
                credit
            }
            TransactionType::Expense => {
                if credit != 0.0 {
                    return Err("expense rows cannot have a credit amount".into());
                }
                if debit <= 0.0 {
                    return Err("expense rows need a debit amount greater than zero".into());
                }
                -debit
            }
            TransactionType::Transfer => match (debit != 0.0, credit != 0.0) {
                (true, false) => -debit.abs(),
                (false, true) => credit.abs(),
                _ => {
                    return Err(
                        "transfer rows need exactly one of debit or credit".into(),
                    )
                }
            },
        };
        Ok(ValidatedRow { date, amount })
    }

    /// Validates every row and commits the valid ones to `account_id`. Categories
    /// named by valid rows are matched or created in the registry.
    pub fn import(
        data: &mut DashboardData,
        account_id: &str,
        rows: &[ImportRow],
    ) -> CoreResult<ImportReport> {
        if data.account(account_id).is_none() {
            return Err(CoreError::AccountNotFound(account_id.to_string()));
        }

        let mut report = ImportReport::default();
        let mut accepted = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            let line = index + 1;
            let validated = match Self::validate_row(row) {
                Ok(validated) => validated,
                Err(reason) => {
                    warn!(line, %reason, "rejected import row");
                    report.outcomes.push(RowOutcome::Rejected { line, reason });
                    continue;
                }
            };

            let mut txn = Transaction::new(
                account_id,
                validated.date,
                row.description.trim(),
                validated.amount,
            );
            txn.is_transfer = row.transaction_type == TransactionType::Transfer;
            txn.notes = row
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|notes| !notes.is_empty())
                .map(str::to_string);
            if let Some(category) = row.category.as_deref() {
                if let Some((resolved, new_category, new_sub)) =
                    CategoryService::resolve(data, category, row.subcategory.as_deref())
                {
                    txn.category_id = Some(resolved.category_id);
                    txn.sub_category_id = resolved.sub_category_id;
                    report.categories_created += usize::from(new_category);
                    report.subcategories_created += usize::from(new_sub);
                }
            }
            report.outcomes.push(RowOutcome::Accepted {
                line,
                transaction_id: txn.id.clone(),
            });
            accepted.push(txn);
        }

        data.transactions.extend(accepted);
        data.sort_transactions();
        info!(
            rows = rows.len(),
            imported = report.imported(),
            rejected = rows.len() - report.imported(),
            "imported transactions"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use homefin_domain::{Account, AccountKind, Category};

    use super::*;
    use crate::LedgerService;

    fn row(date: &str, kind: TransactionType, debit: Option<f64>, credit: Option<f64>) -> ImportRow {
        ImportRow {
            date: date.into(),
            description: "row".into(),
            debit_amount: debit,
            credit_amount: credit,
            category: None,
            subcategory: None,
            notes: None,
            transaction_type: kind,
        }
    }

    #[test]
    fn dates_try_iso_then_day_first_then_month_first() {
        let ymd = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(ImportService::parse_date("2024-03-04"), Some(ymd(2024, 3, 4)));
        assert_eq!(ImportService::parse_date("03/04/2024"), Some(ymd(2024, 4, 3)));
        assert_eq!(ImportService::parse_date("12/25/2024"), Some(ymd(2024, 12, 25)));
        assert_eq!(ImportService::parse_date("25-12-2024"), None);
    }

    #[test]
    fn type_rules_are_enforced() {
        use TransactionType::*;
        assert_eq!(
            ImportService::validate_row(&row("2024-01-01", Income, None, Some(10.0)))
                .unwrap()
                .amount,
            10.0
        );
        assert!(ImportService::validate_row(&row("2024-01-01", Income, Some(1.0), Some(10.0))).is_err());
        assert!(ImportService::validate_row(&row("2024-01-01", Income, None, Some(0.0))).is_err());
        assert_eq!(
            ImportService::validate_row(&row("2024-01-01", Expense, Some(7.5), Some(0.0)))
                .unwrap()
                .amount,
            -7.5
        );
        assert!(ImportService::validate_row(&row("2024-01-01", Expense, Some(7.5), Some(1.0))).is_err());
        assert_eq!(
            ImportService::validate_row(&row("2024-01-01", Transfer, Some(20.0), None))
                .unwrap()
                .amount,
            -20.0
        );
        assert!(ImportService::validate_row(&row("2024-01-01", Transfer, Some(1.0), Some(1.0))).is_err());
        assert!(ImportService::validate_row(&row("2024-01-01", Transfer, None, None)).is_err());
    }

    #[test]
    fn bad_rows_are_reported_and_good_rows_committed() {
        let mut data = DashboardData::default();
        let account = Account::new("Checking", AccountKind::Bank);
        let account_id = account.id.clone();
        data.accounts.push(account);
        data.categories.push(Category::new("Food"));

        let mut groceries = row("05/01/2024", TransactionType::Expense, Some(42.0), None);
        groceries.category = Some("food".into());
        groceries.subcategory = Some("Groceries".into());
        let rows = vec![
            row("2024-01-01", TransactionType::Income, None, Some(2500.0)),
            row("not a date", TransactionType::Income, None, Some(1.0)),
            groceries,
            row("2024-01-09", TransactionType::Expense, None, Some(3.0)),
        ];

        let report = ImportService::import(&mut data, &account_id, &rows).unwrap();
        assert_eq!(report.imported(), 2);
        let rejected: Vec<usize> = report.rejected().map(|(line, _)| line).collect();
        assert_eq!(rejected, [2, 4]);
        assert_eq!(report.categories_created, 0);
        assert_eq!(report.subcategories_created, 1);
        assert_eq!(data.categories.len(), 1);
        assert_eq!(
            LedgerService::account_balance(&data.transactions, &account_id),
            2458.0
        );
        assert!(data.transactions[1].sub_category_id.is_some());
    }

    #[test]
    fn unknown_account_aborts_before_any_write() {
        let mut data = DashboardData::default();
        let rows = vec![row("2024-01-01", TransactionType::Income, None, Some(1.0))];
        assert!(ImportService::import(&mut data, "ghost", &rows).is_err());
        assert!(data.transactions.is_empty());
    }
}
