//! Pure derivations over a profile's transaction list: balances, running totals,
//! period windows, net worth and dashboard aggregates.
//!
//! Nothing here filters trash. Callers pass the active transaction list.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use homefin_domain::{
    Account, AccountKind, BudgetPeriod, Category, Classification, DateWindow, Transaction,
};

pub const UNKNOWN_ACCOUNT: &str = "Unknown Account";
pub const UNCATEGORIZED: &str = "Uncategorized";

/// One row of an account's running balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunningBalanceEntry {
    pub transaction_id: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub balance: f64,
}

/// Assets, liabilities and their net.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct NetWorth {
    pub assets: f64,
    /// Expressed as a positive magnitude.
    pub liabilities: f64,
    /// Signed sum of every account balance.
    pub net_worth: f64,
}

/// Income and expense totals for a window, transfers excluded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PeriodTotals {
    pub window: Option<DateWindow>,
    pub income: f64,
    /// Expressed as a positive magnitude.
    pub expenses: f64,
    pub net: f64,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategorySpend {
    pub category_id: Option<String>,
    pub name: String,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ClassificationTotals {
    pub need: f64,
    pub want: f64,
    pub must: f64,
    pub unclassified: f64,
}

/// Outstanding position of a credit card or loan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebtStatus {
    pub account_id: String,
    pub name: String,
    pub kind: AccountKind,
    pub outstanding: f64,
    pub credit_limit: Option<f64>,
    pub available_credit: Option<f64>,
    pub utilization_percent: Option<f64>,
    pub interest_rate: Option<f64>,
    pub installment: Option<f64>,
    pub next_due_date: Option<NaiveDate>,
}

pub struct LedgerService;

impl LedgerService {
    /// Sums `amount` over every transaction owned by `account_id`.
    pub fn account_balance(transactions: &[Transaction], account_id: &str) -> f64 {
        transactions
            .iter()
            .filter(|txn| txn.account_id == account_id)
            .map(|txn| txn.amount)
            .sum()
    }

    /// Balances of every account, keyed by account id.
    pub fn balances(accounts: &[Account], transactions: &[Transaction]) -> HashMap<String, f64> {
        let mut balances: HashMap<String, f64> = accounts
            .iter()
            .map(|account| (account.id.clone(), 0.0))
            .collect();
        for txn in transactions {
            if let Some(total) = balances.get_mut(&txn.account_id) {
                *total += txn.amount;
            }
        }
        balances
    }

    /// Running balance for `account_id`, reporting only rows dated within the inclusive
    /// `[start, end]` range while carrying the total accumulated before `start`.
    /// Same-date rows keep their list order.
    pub fn running_balance(
        transactions: &[Transaction],
        account_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Vec<RunningBalanceEntry> {
        let mut owned: Vec<&Transaction> = transactions
            .iter()
            .filter(|txn| txn.account_id == account_id)
            .collect();
        owned.sort_by_key(|txn| txn.date);

        let mut balance = 0.0;
        let mut rows = Vec::new();
        for txn in owned {
            if end.is_some_and(|end| txn.date > end) {
                break;
            }
            balance += txn.amount;
            if start.is_some_and(|start| txn.date < start) {
                continue;
            }
            rows.push(RunningBalanceEntry {
                transaction_id: txn.id.clone(),
                date: txn.date,
                amount: txn.amount,
                balance,
            });
        }
        rows
    }

    /// Resolves the period containing `reference`: ISO week starting Monday, calendar
    /// month, or calendar year.
    pub fn period_window(period: BudgetPeriod, reference: NaiveDate) -> DateWindow {
        let (start, end) = match period {
            BudgetPeriod::Weekly => {
                let offset = reference.weekday().num_days_from_monday() as i64;
                let start = reference - Duration::days(offset);
                (start, start + Duration::days(7))
            }
            BudgetPeriod::Monthly => {
                let start = reference - Duration::days(reference.day0() as i64);
                (start, month_start(start.year(), start.month0() as i32 + 1))
            }
            BudgetPeriod::Yearly => {
                let start = reference - Duration::days(reference.ordinal0() as i64);
                let end = NaiveDate::from_ymd_opt(reference.year() + 1, 1, 1)
                    .unwrap_or(NaiveDate::MAX);
                (start, end)
            }
        };
        DateWindow { start, end }
    }

    /// Net worth with the split assets/liabilities presentation.
    pub fn net_worth(accounts: &[Account], transactions: &[Transaction]) -> NetWorth {
        let balances = Self::balances(accounts, transactions);
        let mut worth = NetWorth::default();
        for account in accounts {
            let balance = balances.get(&account.id).copied().unwrap_or_default();
            if account.is_liability() {
                worth.liabilities += balance.abs();
            } else {
                worth.assets += balance;
            }
            worth.net_worth += balance;
        }
        worth
    }

    /// Income/expense totals inside `window`. Transfers never count.
    pub fn period_totals(transactions: &[Transaction], window: DateWindow) -> PeriodTotals {
        let mut totals = PeriodTotals {
            window: Some(window),
            ..PeriodTotals::default()
        };
        for txn in transactions
            .iter()
            .filter(|txn| !txn.is_transfer && window.contains(txn.date))
        {
            if txn.amount >= 0.0 {
                totals.income += txn.amount;
            } else {
                totals.expenses += txn.amount.abs();
            }
            totals.transaction_count += 1;
        }
        totals.net = totals.income - totals.expenses;
        totals
    }

    /// One [`PeriodTotals`] per calendar month, oldest first, ending with the month
    /// that contains `reference`.
    pub fn monthly_trend(
        transactions: &[Transaction],
        reference: NaiveDate,
        months: u32,
    ) -> Vec<PeriodTotals> {
        let anchor = reference.year() * 12 + reference.month0() as i32;
        (0..months as i32)
            .rev()
            .map(|back| {
                let index = anchor - back;
                let start = month_start(0, index);
                let end = month_start(0, index + 1);
                Self::period_totals(transactions, DateWindow { start, end })
            })
            .collect()
    }

    /// Expense totals per category inside `window`, largest first. Transactions without a
    /// known category land in the "Uncategorized" bucket.
    pub fn category_breakdown(
        transactions: &[Transaction],
        categories: &[Category],
        window: DateWindow,
    ) -> Vec<CategorySpend> {
        let mut rows: Vec<CategorySpend> = Vec::new();
        for txn in transactions
            .iter()
            .filter(|txn| txn.is_expense() && !txn.is_transfer && window.contains(txn.date))
        {
            let category = txn
                .category_id
                .as_deref()
                .and_then(|id| categories.iter().find(|category| category.id == id));
            let key = category.map(|category| category.id.clone());
            match rows.iter_mut().find(|row| row.category_id == key) {
                Some(row) => row.total += txn.amount.abs(),
                None => rows.push(CategorySpend {
                    category_id: key,
                    name: category
                        .map(|category| category.name.clone())
                        .unwrap_or_else(|| UNCATEGORIZED.to_string()),
                    total: txn.amount.abs(),
                }),
            }
        }
        rows.sort_by(|a, b| b.total.total_cmp(&a.total));
        rows
    }

    /// Expense totals split by need/want/must classification.
    pub fn classification_breakdown(
        transactions: &[Transaction],
        window: DateWindow,
    ) -> ClassificationTotals {
        let mut totals = ClassificationTotals::default();
        for txn in transactions
            .iter()
            .filter(|txn| txn.is_expense() && !txn.is_transfer && window.contains(txn.date))
        {
            let bucket = match txn.classification {
                Some(Classification::Need) => &mut totals.need,
                Some(Classification::Want) => &mut totals.want,
                Some(Classification::Must) => &mut totals.must,
                None => &mut totals.unclassified,
            };
            *bucket += txn.amount.abs();
        }
        totals
    }

    /// Debt position of every credit card and loan account that is not archived.
    pub fn debt_overview(
        accounts: &[Account],
        transactions: &[Transaction],
        today: NaiveDate,
    ) -> Vec<DebtStatus> {
        accounts
            .iter()
            .filter(|account| account.is_liability() && !account.is_archived)
            .map(|account| {
                let balance = Self::account_balance(transactions, &account.id);
                let outstanding = if balance < 0.0 { balance.abs() } else { 0.0 };
                let limit = account.credit_limit.filter(|limit| *limit > 0.0);
                DebtStatus {
                    account_id: account.id.clone(),
                    name: account.name.clone(),
                    kind: account.kind,
                    outstanding,
                    credit_limit: account.credit_limit,
                    available_credit: limit.map(|limit| limit - outstanding),
                    utilization_percent: limit.map(|limit| outstanding / limit * 100.0),
                    interest_rate: account.interest_rate,
                    installment: account.installment,
                    next_due_date: account.due_date.and_then(|day| next_due_date(today, day)),
                }
            })
            .collect()
    }

    /// Display name for an account id, tolerating dangling references.
    pub fn account_label<'a>(accounts: &'a [Account], account_id: &str) -> &'a str {
        accounts
            .iter()
            .find(|account| account.id == account_id)
            .map(|account| account.name.as_str())
            .unwrap_or(UNKNOWN_ACCOUNT)
    }
}

/// First day of the month at `year * 12 + month_index` (month_index is zero-based and
/// may overflow into following years).
fn month_start(year: i32, month_index: i32) -> NaiveDate {
    let absolute = year * 12 + month_index;
    NaiveDate::from_ymd_opt(
        absolute.div_euclid(12),
        absolute.rem_euclid(12) as u32 + 1,
        1,
    )
    .unwrap_or(NaiveDate::MAX)
}

/// Next occurrence of `due_day` on or after `today`, clamped to short months.
fn next_due_date(today: NaiveDate, due_day: u32) -> Option<NaiveDate> {
    if due_day == 0 || due_day > 31 {
        return None;
    }
    let index = today.year() * 12 + today.month0() as i32;
    let this_month = clamped_day(index, due_day);
    if this_month >= today {
        Some(this_month)
    } else {
        Some(clamped_day(index + 1, due_day))
    }
}

fn clamped_day(month_index: i32, day: u32) -> NaiveDate {
    let start = month_start(0, month_index);
    let last = month_start(0, month_index + 1) - Duration::days(1);
    let target = start + Duration::days(day as i64 - 1);
    target.min(last)
}
