//! Business logic helpers for validated account mutations.

use chrono::NaiveDate;
use tracing::debug;

use homefin_domain::{names_match, Account, DashboardData, Transaction};

use crate::{CoreError, CoreResult};

/// Description given to the transaction that seeds a new account's balance.
pub const OPENING_BALANCE: &str = "Opening Balance";

/// Provides validated mutations for [`Account`] entities.
///
/// Account balances are never stored: a non-zero opening balance is recorded as an
/// ordinary transaction so the derived balance picks it up.
pub struct AccountService;

impl AccountService {
    pub fn create(
        data: &mut DashboardData,
        account: Account,
        opening_balance: f64,
        date: NaiveDate,
    ) -> CoreResult<String> {
        Self::validate(data, None, &account)?;
        if !opening_balance.is_finite() {
            return Err(CoreError::Validation(
                "opening balance must be a number".into(),
            ));
        }
        let id = account.id.clone();
        if opening_balance != 0.0 {
            data.transactions.push(Transaction::new(
                &id,
                date,
                OPENING_BALANCE,
                opening_balance,
            ));
            data.sort_transactions();
        }
        debug!(id = %id, name = %account.name, kind = %account.kind, "created account");
        data.accounts.push(account);
        Ok(id)
    }

    /// Applies `mutator` to a copy of the account; stored only if it still validates.
    pub fn update<F>(data: &mut DashboardData, id: &str, mutator: F) -> CoreResult<()>
    where
        F: FnOnce(&mut Account),
    {
        let position = data
            .accounts
            .iter()
            .position(|account| account.id == id)
            .ok_or_else(|| CoreError::AccountNotFound(id.to_string()))?;
        let mut candidate = data.accounts[position].clone();
        mutator(&mut candidate);
        candidate.id = id.to_string();
        Self::validate(data, Some(id), &candidate)?;
        data.accounts[position] = candidate;
        Ok(())
    }

    pub fn set_archived(data: &mut DashboardData, id: &str, archived: bool) -> CoreResult<()> {
        let account = data
            .account_mut(id)
            .ok_or_else(|| CoreError::AccountNotFound(id.to_string()))?;
        account.is_archived = archived;
        Ok(())
    }

    /// Accounts that are not archived, in list order.
    pub fn active_accounts(data: &DashboardData) -> Vec<&Account> {
        data.accounts
            .iter()
            .filter(|account| !account.is_archived)
            .collect()
    }

    fn validate(data: &DashboardData, exclude: Option<&str>, account: &Account) -> CoreResult<()> {
        let name = account.name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("account name is required".into()));
        }
        let duplicate = data.accounts.iter().any(|existing| {
            names_match(&existing.name, name) && exclude != Some(existing.id.as_str())
        });
        if duplicate {
            return Err(CoreError::Validation(format!(
                "Account `{name}` already exists"
            )));
        }
        if let Some(day) = account.due_date {
            if !(1..=31).contains(&day) {
                return Err(CoreError::Validation(format!(
                    "due day {day} is outside 1-31"
                )));
            }
        }
        if let Some(limit) = account.credit_limit {
            if !limit.is_finite() || limit < 0.0 {
                return Err(CoreError::Validation(
                    "credit limit must be a non-negative number".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use homefin_domain::AccountKind;

    use super::*;
    use crate::LedgerService;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn create_records_opening_balance_as_transaction() {
        let mut data = DashboardData::default();
        let id = AccountService::create(
            &mut data,
            Account::new("Checking", AccountKind::Bank),
            1000.0,
            date(),
        )
        .unwrap();
        assert_eq!(data.transactions.len(), 1);
        assert_eq!(data.transactions[0].description, OPENING_BALANCE);
        assert_eq!(LedgerService::account_balance(&data.transactions, &id), 1000.0);
    }

    #[test]
    fn zero_opening_balance_writes_nothing() {
        let mut data = DashboardData::default();
        AccountService::create(&mut data, Account::new("Cash", AccountKind::Cash), 0.0, date())
            .unwrap();
        assert!(data.transactions.is_empty());
        assert_eq!(data.accounts.len(), 1);
    }

    #[test]
    fn create_rejects_duplicate_names() {
        let mut data = DashboardData::default();
        AccountService::create(&mut data, Account::new("Visa", AccountKind::CreditCard), 0.0, date())
            .unwrap();
        let err = AccountService::create(
            &mut data,
            Account::new(" visa", AccountKind::CreditCard),
            -50.0,
            date(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(data.accounts.len(), 1);
        assert!(data.transactions.is_empty());
    }

    #[test]
    fn update_validates_due_day() {
        let mut data = DashboardData::default();
        let id = AccountService::create(
            &mut data,
            Account::new("Car Loan", AccountKind::Loan),
            -9000.0,
            date(),
        )
        .unwrap();
        let err = AccountService::update(&mut data, &id, |account| account.due_date = Some(40))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        AccountService::update(&mut data, &id, |account| {
            account.due_date = Some(15);
            account.interest_rate = Some(4.5);
        })
        .unwrap();
        assert_eq!(data.account(&id).unwrap().due_date, Some(15));
    }

    #[test]
    fn archived_accounts_are_hidden_from_active_list() {
        let mut data = DashboardData::default();
        let old = AccountService::create(&mut data, Account::new("Old", AccountKind::Bank), 0.0, date())
            .unwrap();
        AccountService::create(&mut data, Account::new("New", AccountKind::Bank), 0.0, date())
            .unwrap();
        AccountService::set_archived(&mut data, &old, true).unwrap();
        let active: Vec<_> = AccountService::active_accounts(&data)
            .into_iter()
            .map(|account| account.name.as_str())
            .collect();
        assert_eq!(active, ["New"]);
        assert!(AccountService::set_archived(&mut data, "ghost", true).is_err());
    }
}
