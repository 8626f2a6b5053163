use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    sync::Mutex,
};

use homefin_domain::{DashboardData, ProfileBundle};

use crate::{transfer_service::TransferService, CoreError};

/// Describes a persisted backup artifact for a user's bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleBackupInfo {
    pub user: String,
    pub id: String,
    pub created_at: String,
    pub path: PathBuf,
}

/// Abstraction over persistence backends capable of storing profile bundles.
pub trait BundleStorage: Send + Sync {
    /// Returns `Ok(None)` when the user has no bundle yet.
    fn load_bundle(&self, user: &str) -> Result<Option<ProfileBundle>, CoreError>;
    fn save_bundle(&self, user: &str, bundle: &ProfileBundle) -> Result<(), CoreError>;
    fn list_users(&self) -> Result<Vec<String>, CoreError>;
    fn delete_bundle(&self, user: &str) -> Result<(), CoreError>;

    fn backup_bundle(
        &self,
        user: &str,
        bundle: &ProfileBundle,
        note: Option<&str>,
    ) -> Result<BundleBackupInfo, CoreError> {
        let _ = (bundle, note);
        Err(CoreError::Storage(format!(
            "backups are not supported for `{user}` by this backend"
        )))
    }

    fn list_backups(&self, _user: &str) -> Result<Vec<BundleBackupInfo>, CoreError> {
        Ok(Vec::new())
    }
}

/// Keeps bundles in memory. Used by hosts without a filesystem and by tests.
#[derive(Debug, Default)]
pub struct MemoryBundleStorage {
    bundles: Mutex<HashMap<String, ProfileBundle>>,
    fail_saves: Mutex<bool>,
}

impl MemoryBundleStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bundle(user: &str, bundle: ProfileBundle) -> Self {
        let storage = Self::default();
        if let Ok(mut bundles) = storage.bundles.lock() {
            bundles.insert(user.to_string(), bundle);
        }
        storage
    }

    /// Makes every following save fail, to exercise error paths.
    pub fn set_fail_saves(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_saves.lock() {
            *flag = fail;
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, ProfileBundle>>, CoreError> {
        self.bundles
            .lock()
            .map_err(|_| CoreError::Storage("memory storage lock poisoned".into()))
    }
}

impl BundleStorage for MemoryBundleStorage {
    fn load_bundle(&self, user: &str) -> Result<Option<ProfileBundle>, CoreError> {
        Ok(self.lock()?.get(user).cloned())
    }

    fn save_bundle(&self, user: &str, bundle: &ProfileBundle) -> Result<(), CoreError> {
        if self.fail_saves.lock().map(|flag| *flag).unwrap_or(false) {
            return Err(CoreError::Storage(format!("save of `{user}` refused")));
        }
        self.lock()?.insert(user.to_string(), bundle.clone());
        Ok(())
    }

    fn list_users(&self) -> Result<Vec<String>, CoreError> {
        let mut users: Vec<String> = self.lock()?.keys().cloned().collect();
        users.sort();
        Ok(users)
    }

    fn delete_bundle(&self, user: &str) -> Result<(), CoreError> {
        self.lock()?.remove(user);
        Ok(())
    }
}

/// Detects dangling references and unbalanced transfers within one profile. These are
/// tolerated states, reported for display only.
pub fn bundle_warnings(data: &DashboardData) -> Vec<String> {
    let account_ids: HashSet<&str> = data.accounts.iter().map(|a| a.id.as_str()).collect();
    let trashed_accounts: HashSet<&str> = data
        .trashed_accounts
        .iter()
        .map(|entry| entry.account.id.as_str())
        .collect();
    let category_ids: HashSet<&str> = data.categories.iter().map(|c| c.id.as_str()).collect();
    let budget_ids: HashSet<&str> = data.budgets.iter().map(|b| b.id.as_str()).collect();
    let mut warnings = Vec::new();

    for txn in &data.transactions {
        let account = txn.account_id.as_str();
        if trashed_accounts.contains(account) {
            warnings.push(format!(
                "transaction {} belongs to trashed account {}",
                txn.id, txn.account_id
            ));
        } else if !account_ids.contains(account) {
            warnings.push(format!(
                "transaction {} references unknown account {}",
                txn.id, txn.account_id
            ));
        }
        if let Some(category) = txn.category_id.as_deref() {
            if !category_ids.contains(category) {
                warnings.push(format!(
                    "transaction {} references missing category {}",
                    txn.id, category
                ));
            }
        }
        if let Some(budget) = txn.budget_id.as_deref() {
            if !budget_ids.contains(budget) {
                warnings.push(format!(
                    "transaction {} references missing budget {}",
                    txn.id, budget
                ));
            }
        }
        if txn.is_transfer && txn.id.ends_with("-from") {
            match TransferService::find_sibling_leg(&data.transactions, txn) {
                Some(sibling) if sibling.amount + txn.amount != 0.0 => warnings.push(format!(
                    "transfer {} legs are unbalanced ({} vs {})",
                    txn.id, txn.amount, sibling.amount
                )),
                _ => {}
            }
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use homefin_domain::{Account, AccountKind, Transaction};

    use super::*;

    #[test]
    fn memory_storage_round_trips_and_lists_users() {
        let storage = MemoryBundleStorage::new();
        assert_eq!(storage.load_bundle("ana").unwrap(), None);
        storage.save_bundle("ana", &ProfileBundle::default()).unwrap();
        storage.save_bundle("bo", &ProfileBundle::default()).unwrap();
        assert_eq!(storage.list_users().unwrap(), ["ana", "bo"]);
        assert!(storage.load_bundle("ana").unwrap().is_some());
        storage.delete_bundle("ana").unwrap();
        assert_eq!(storage.list_users().unwrap(), ["bo"]);
        assert!(storage.list_backups("bo").unwrap().is_empty());
    }

    #[test]
    fn failing_saves_surface_as_storage_errors() {
        let storage = MemoryBundleStorage::new();
        storage.set_fail_saves(true);
        let err = storage
            .save_bundle("ana", &ProfileBundle::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
    }

    #[test]
    fn warnings_cover_dangling_references() {
        let mut data = DashboardData::default();
        let account = Account::new("Checking", AccountKind::Bank);
        let account_id = account.id.clone();
        data.accounts.push(account);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        data.transactions
            .push(Transaction::new(&account_id, date, "ok", 1.0));
        data.transactions.push(
            Transaction::new("ghost", date, "orphan", 1.0)
                .with_category("no-such-category"),
        );

        let warnings = bundle_warnings(&data);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("unknown account ghost"));
        assert!(warnings[1].contains("missing category"));
    }
}
