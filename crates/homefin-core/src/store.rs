//! Explicit state container for one user's bundle.
//!
//! Every mutating call applies a service to the in-memory bundle and then writes the
//! bundle through [`BundleStorage`]. A failed write after an ordinary mutation is
//! logged and the in-memory change stands; the cross-profile transfer is persisted
//! synchronously and rolled back if the write fails.

use std::sync::Arc;

use tracing::{debug, info, warn};

use homefin_domain::{Account, DashboardData, ProfileBundle, ProfileKind, Transaction};

use crate::{
    account_service::AccountService,
    import_service::{ImportReport, ImportRow, ImportService},
    profile_service::{LoadReport, ProfileService},
    storage::BundleStorage,
    time::Clock,
    transaction_service::TransactionService,
    transfer_service::{TransferLegs, TransferRequest, TransferService},
    trash_service::TrashService,
    CoreError, CoreResult,
};

pub struct ProfileStore {
    user: String,
    bundle: ProfileBundle,
    storage: Arc<dyn BundleStorage>,
    clock: Arc<dyn Clock>,
    load_report: LoadReport,
}

impl ProfileStore {
    /// Loads (or seeds) the user's bundle and runs the load-time sanitation pass.
    pub fn open(
        user: impl Into<String>,
        storage: Arc<dyn BundleStorage>,
        clock: Arc<dyn Clock>,
    ) -> CoreResult<Self> {
        let user = user.into();
        let (mut bundle, fresh) = match storage.load_bundle(&user)? {
            Some(bundle) => (bundle, false),
            None => (ProfileService::default_bundle(), true),
        };
        let load_report = ProfileService::sanitize(&mut bundle, clock.now());
        let swept = !load_report.personal.is_empty() || !load_report.home.is_empty();
        let store = Self {
            user,
            bundle,
            storage,
            clock,
            load_report,
        };
        if fresh || swept {
            store.persist();
        }
        info!(user = %store.user, fresh, "opened profile store");
        Ok(store)
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn bundle(&self) -> &ProfileBundle {
        &self.bundle
    }

    pub fn active(&self) -> &DashboardData {
        self.bundle.active()
    }

    pub fn profile(&self, kind: ProfileKind) -> &DashboardData {
        self.bundle.profile(kind)
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Applies `action` to the bundle and persists on success.
    pub fn update<T, F>(&mut self, action: F) -> CoreResult<T>
    where
        F: FnOnce(&mut ProfileBundle, &dyn Clock) -> CoreResult<T>,
    {
        let value = action(&mut self.bundle, self.clock.as_ref())?;
        self.persist();
        Ok(value)
    }

    /// Applies `action` to the active profile and persists on success.
    pub fn update_active<T, F>(&mut self, action: F) -> CoreResult<T>
    where
        F: FnOnce(&mut DashboardData, &dyn Clock) -> CoreResult<T>,
    {
        self.update(|bundle, clock| action(bundle.active_mut(), clock))
    }

    pub fn switch_dashboard(&mut self, kind: ProfileKind) {
        ProfileService::switch_dashboard(&mut self.bundle, kind);
        self.persist();
    }

    pub fn create_account(&mut self, account: Account, opening_balance: f64) -> CoreResult<String> {
        self.update_active(|data, clock| {
            AccountService::create(data, account, opening_balance, clock.today())
        })
    }

    pub fn add_transaction(&mut self, txn: Transaction) -> CoreResult<String> {
        self.update_active(|data, _| TransactionService::add(data, txn))
    }

    pub fn add_transfer(&mut self, request: &TransferRequest) -> CoreResult<TransferLegs> {
        self.update_active(|data, clock| TransferService::add_transfer(data, request, clock))
    }

    pub fn trash_transactions<I, S>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let moved = self
            .update_active(|data, clock| Ok(TrashService::trash_transactions(data, ids, clock.now())))
            .unwrap_or(0);
        debug!(moved, "trashed transactions");
        moved
    }

    pub fn restore_transactions<I, S>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.update_active(|data, _| Ok(TrashService::restore_transactions(data, ids)))
            .unwrap_or(0)
    }

    pub fn import_transactions(
        &mut self,
        account_id: &str,
        rows: &[ImportRow],
    ) -> CoreResult<ImportReport> {
        self.update_active(|data, _| ImportService::import(data, account_id, rows))
    }

    /// Writes both legs across profiles as one unit. If the bundle cannot be saved the
    /// in-memory state is restored to what it was before the call.
    pub fn add_inter_dashboard_transfer(
        &mut self,
        request: &TransferRequest,
        from_profile: ProfileKind,
        to_profile: ProfileKind,
    ) -> CoreResult<TransferLegs> {
        let snapshot = self.bundle.clone();
        let legs = TransferService::add_inter_dashboard_transfer(
            &mut self.bundle,
            request,
            from_profile,
            to_profile,
            self.clock.as_ref(),
        )?;
        if let Err(err) = self.storage.save_bundle(&self.user, &self.bundle) {
            warn!(user = %self.user, error = %err, "rolling back cross-profile transfer");
            self.bundle = snapshot;
            return Err(CoreError::CrossProfileTransfer(format!(
                "could not persist both legs: {err}"
            )));
        }
        Ok(legs)
    }

    /// Persists the current bundle, returning any storage error.
    pub fn save(&self) -> CoreResult<()> {
        self.storage.save_bundle(&self.user, &self.bundle)
    }

    fn persist(&self) {
        if let Err(err) = self.save() {
            warn!(user = %self.user, error = %err, "failed to persist profile bundle");
        }
    }
}
