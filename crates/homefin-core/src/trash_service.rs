//! Soft delete with a fixed retention window.
//!
//! Transactions and accounts move `Active -> Trashed -> {Active, Purged}`. Purging an
//! account also deletes every transaction (active or trashed) that it owns; trashing
//! or restoring the account alone leaves its transactions untouched.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use homefin_domain::{names_match, DashboardData, TrashedAccount, TrashedTransaction};

use crate::{CoreError, CoreResult};

/// Seven days, in milliseconds.
pub const TRASH_RETENTION_MS: i64 = 604_800_000;

pub fn trash_retention() -> Duration {
    Duration::milliseconds(TRASH_RETENTION_MS)
}

/// Counts reported by purge and sweep operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeReport {
    pub transactions_purged: usize,
    pub accounts_purged: usize,
    /// Transactions deleted because their account was purged.
    pub cascaded_transactions: usize,
}

impl PurgeReport {
    pub fn is_empty(&self) -> bool {
        *self == PurgeReport::default()
    }
}

pub struct TrashService;

impl TrashService {
    pub fn trash_transaction(
        data: &mut DashboardData,
        id: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let position = data
            .transactions
            .iter()
            .position(|txn| txn.id == id)
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))?;
        let transaction = data.transactions.remove(position);
        data.trash.push(TrashedTransaction {
            transaction,
            deleted_at: now,
        });
        debug!(id, "moved transaction to trash");
        Ok(())
    }

    /// Trashes every listed id that is active; unknown ids are skipped.
    pub fn trash_transactions<I, S>(data: &mut DashboardData, ids: I, now: DateTime<Utc>) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted = id_set(ids);
        let (moved, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut data.transactions)
            .into_iter()
            .partition(|txn| wanted.contains(txn.id.as_str()));
        data.transactions = kept;
        let count = moved.len();
        data.trash.extend(
            moved
                .into_iter()
                .map(|transaction| TrashedTransaction {
                    transaction,
                    deleted_at: now,
                }),
        );
        debug!(count, "moved transactions to trash");
        count
    }

    pub fn restore_transaction(data: &mut DashboardData, id: &str) -> CoreResult<()> {
        if Self::restore_transactions(data, [id]) == 0 {
            return Err(CoreError::TransactionNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Moves listed trash entries back to the active list, then re-sorts it by date.
    pub fn restore_transactions<I, S>(data: &mut DashboardData, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted = id_set(ids);
        let (restored, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut data.trash)
            .into_iter()
            .partition(|entry| wanted.contains(entry.transaction.id.as_str()));
        data.trash = kept;
        let count = restored.len();
        if count > 0 {
            data.transactions
                .extend(restored.into_iter().map(|entry| entry.transaction));
            data.sort_transactions();
        }
        debug!(count, "restored transactions from trash");
        count
    }

    pub fn permanently_delete_transaction(data: &mut DashboardData, id: &str) -> CoreResult<()> {
        if Self::permanently_delete_transactions(data, [id]) == 0 {
            return Err(CoreError::TransactionNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Drops listed entries from the trash. Active transactions are never touched.
    pub fn permanently_delete_transactions<I, S>(data: &mut DashboardData, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted = id_set(ids);
        let before = data.trash.len();
        data.trash
            .retain(|entry| !wanted.contains(entry.transaction.id.as_str()));
        before - data.trash.len()
    }

    /// Purges every trashed transaction.
    pub fn empty_trash(data: &mut DashboardData) -> usize {
        let count = data.trash.len();
        data.trash.clear();
        info!(count, "emptied transaction trash");
        count
    }

    /// Hides an account in the trash. Its transactions stay where they are.
    pub fn trash_account(data: &mut DashboardData, id: &str, now: DateTime<Utc>) -> CoreResult<()> {
        let position = data
            .accounts
            .iter()
            .position(|account| account.id == id)
            .ok_or_else(|| CoreError::AccountNotFound(id.to_string()))?;
        let account = data.accounts.remove(position);
        data.trashed_accounts.push(TrashedAccount {
            account,
            deleted_at: now,
        });
        debug!(id, "moved account to trash");
        Ok(())
    }

    /// Fails, leaving the entry in the trash, when an active account already uses the
    /// same name.
    pub fn restore_account(data: &mut DashboardData, id: &str) -> CoreResult<()> {
        let position = data
            .trashed_accounts
            .iter()
            .position(|entry| entry.account.id == id)
            .ok_or_else(|| CoreError::AccountNotFound(id.to_string()))?;
        let name = &data.trashed_accounts[position].account.name;
        if data
            .accounts
            .iter()
            .any(|account| names_match(&account.name, name))
        {
            return Err(CoreError::Validation(format!(
                "Account `{}` already exists",
                name.trim()
            )));
        }
        let entry = data.trashed_accounts.remove(position);
        data.accounts.push(entry.account);
        debug!(id, "restored account from trash");
        Ok(())
    }

    /// Purges a trashed account and every transaction it owns.
    pub fn permanently_delete_account(
        data: &mut DashboardData,
        id: &str,
    ) -> CoreResult<PurgeReport> {
        let position = data
            .trashed_accounts
            .iter()
            .position(|entry| entry.account.id == id)
            .ok_or_else(|| CoreError::AccountNotFound(id.to_string()))?;
        data.trashed_accounts.remove(position);
        let cascaded = cascade_account_purge(data, &HashSet::from([id.to_string()]));
        info!(id, cascaded, "purged account");
        Ok(PurgeReport {
            transactions_purged: 0,
            accounts_purged: 1,
            cascaded_transactions: cascaded,
        })
    }

    /// Purges every trashed account, with the transaction cascade.
    pub fn empty_account_trash(data: &mut DashboardData) -> PurgeReport {
        let purged: HashSet<String> = data
            .trashed_accounts
            .drain(..)
            .map(|entry| entry.account.id)
            .collect();
        let cascaded = cascade_account_purge(data, &purged);
        PurgeReport {
            transactions_purged: 0,
            accounts_purged: purged.len(),
            cascaded_transactions: cascaded,
        }
    }

    /// Drops trash entries whose deletion is older than the retention window. Runs once
    /// per profile load; expired entries are not recoverable afterwards.
    pub fn sweep_expired(data: &mut DashboardData, now: DateTime<Utc>) -> PurgeReport {
        let retention = trash_retention();
        let expired = |deleted_at: DateTime<Utc>| now - deleted_at > retention;

        let before = data.trash.len();
        data.trash.retain(|entry| !expired(entry.deleted_at));
        let transactions_purged = before - data.trash.len();

        let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut data.trashed_accounts)
            .into_iter()
            .partition(|entry| expired(entry.deleted_at));
        data.trashed_accounts = kept;
        let purged: HashSet<String> = gone.into_iter().map(|entry| entry.account.id).collect();
        let cascaded_transactions = cascade_account_purge(data, &purged);

        let report = PurgeReport {
            transactions_purged,
            accounts_purged: purged.len(),
            cascaded_transactions,
        };
        if !report.is_empty() {
            info!(?report, "swept expired trash");
        }
        report
    }
}

fn id_set<I, S>(ids: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter().map(|id| id.as_ref().to_string()).collect()
}

fn cascade_account_purge(data: &mut DashboardData, account_ids: &HashSet<String>) -> usize {
    if account_ids.is_empty() {
        return 0;
    }
    let before = data.transactions.len() + data.trash.len();
    data.transactions
        .retain(|txn| !account_ids.contains(&txn.account_id));
    data.trash
        .retain(|entry| !account_ids.contains(&entry.transaction.account_id));
    before - data.transactions.len() - data.trash.len()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};
    use homefin_domain::{Account, AccountKind, Transaction};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap()
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn seeded() -> (DashboardData, Vec<String>) {
        let mut data = DashboardData::default();
        let account = Account::new("Checking", AccountKind::Bank);
        let account_id = account.id.clone();
        data.accounts.push(account);
        for (day, amount) in [(1, 100.0), (2, -20.0), (3, -5.0)] {
            data.transactions
                .push(Transaction::new(&account_id, d(day), "row", amount));
        }
        let ids = data.transactions.iter().map(|txn| txn.id.clone()).collect();
        (data, ids)
    }

    #[test]
    fn restore_resorts_by_date() {
        let (mut data, ids) = seeded();
        TrashService::trash_transaction(&mut data, &ids[0], now()).unwrap();
        assert_eq!(data.transactions[0].id, ids[1]);
        TrashService::restore_transaction(&mut data, &ids[0]).unwrap();
        let order: Vec<_> = data.transactions.iter().map(|txn| txn.id.clone()).collect();
        assert_eq!(order, ids);
        assert!(data.trash.is_empty());
    }

    #[test]
    fn single_item_ops_on_unknown_ids_fail_without_change() {
        let (mut data, _) = seeded();
        let err = TrashService::trash_transaction(&mut data, "nope", now()).unwrap_err();
        assert!(err.is_not_found());
        assert!(TrashService::restore_transaction(&mut data, "nope").is_err());
        assert!(TrashService::permanently_delete_transaction(&mut data, "nope").is_err());
        assert_eq!(data.transactions.len(), 3);
    }

    #[test]
    fn bulk_ops_skip_unknown_ids() {
        let (mut data, ids) = seeded();
        let moved = TrashService::trash_transactions(
            &mut data,
            [ids[0].as_str(), "missing", ids[2].as_str()],
            now(),
        );
        assert_eq!(moved, 2);
        assert_eq!(data.trash.len(), 2);

        let restored = TrashService::restore_transactions(&mut data, [ids[2].clone(), "ghost".to_string()]);
        assert_eq!(restored, 1);

        let purged = TrashService::permanently_delete_transactions(&mut data, [&ids[0], &ids[1]]);
        assert_eq!(purged, 1, "active transaction must not be purged");
        assert_eq!(data.transactions.len(), 2);
        assert!(data.trash.is_empty());
    }

    #[test]
    fn trashing_an_account_leaves_transactions() {
        let (mut data, _) = seeded();
        let account_id = data.accounts[0].id.clone();
        TrashService::trash_account(&mut data, &account_id, now()).unwrap();
        assert!(data.accounts.is_empty());
        assert_eq!(data.transactions.len(), 3);
        TrashService::restore_account(&mut data, &account_id).unwrap();
        assert_eq!(data.accounts.len(), 1);
    }

    #[test]
    fn restoring_an_account_keeps_names_unique() {
        let (mut data, _) = seeded();
        let account_id = data.accounts[0].id.clone();
        TrashService::trash_account(&mut data, &account_id, now()).unwrap();
        data.accounts.push(Account::new("  checking ", AccountKind::Bank));

        let err = TrashService::restore_account(&mut data, &account_id).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(data.accounts.len(), 1);
        assert_eq!(data.trashed_accounts.len(), 1);
        assert_eq!(data.trashed_accounts[0].account.id, account_id);
    }

    #[test]
    fn purging_an_account_cascades_to_active_and_trashed_transactions() {
        let (mut data, ids) = seeded();
        let account_id = data.accounts[0].id.clone();
        let keep = Transaction::new("other", d(4), "keep", 1.0);
        data.transactions.push(keep);
        TrashService::trash_transaction(&mut data, &ids[1], now()).unwrap();
        TrashService::trash_account(&mut data, &account_id, now()).unwrap();

        let report = TrashService::permanently_delete_account(&mut data, &account_id).unwrap();
        assert_eq!(report.accounts_purged, 1);
        assert_eq!(report.cascaded_transactions, 3);
        assert_eq!(data.transactions.len(), 1);
        assert_eq!(data.transactions[0].description, "keep");
        assert!(data.trash.is_empty());
    }

    #[test]
    fn purging_an_active_account_is_rejected() {
        let (mut data, _) = seeded();
        let account_id = data.accounts[0].id.clone();
        assert!(TrashService::permanently_delete_account(&mut data, &account_id).is_err());
        assert_eq!(data.transactions.len(), 3);
    }

    #[test]
    fn sweep_uses_seven_day_boundary() {
        let (mut data, ids) = seeded();
        TrashService::trash_transaction(&mut data, &ids[0], now() - Duration::days(8)).unwrap();
        TrashService::trash_transaction(&mut data, &ids[1], now() - Duration::days(6)).unwrap();
        TrashService::trash_transaction(&mut data, &ids[2], now() - trash_retention()).unwrap();

        let report = TrashService::sweep_expired(&mut data, now());
        assert_eq!(report.transactions_purged, 1);
        let remaining: Vec<_> = data
            .trash
            .iter()
            .map(|entry| entry.transaction.id.clone())
            .collect();
        assert_eq!(remaining, vec![ids[1].clone(), ids[2].clone()]);
    }

    #[test]
    fn sweep_cascades_expired_accounts() {
        let (mut data, _) = seeded();
        let account_id = data.accounts[0].id.clone();
        TrashService::trash_account(&mut data, &account_id, now() - Duration::days(10)).unwrap();
        let report = TrashService::sweep_expired(&mut data, now());
        assert_eq!(report.accounts_purged, 1);
        assert_eq!(report.cascaded_transactions, 3);
        assert!(data.transactions.is_empty());
        assert!(data.trashed_accounts.is_empty());
    }
}
