//! Wires configuration, JSON storage and the profile store for one user.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use homefin_config::{paths, Config, ConfigManager, DefaultDashboard, Theme as ConfigTheme};
use homefin_core::{
    storage::{BundleBackupInfo, BundleStorage},
    Clock, ProfileService, ProfileStore, SystemClock,
};
use homefin_domain::{ProfileKind, Theme};
use homefin_storage_json::{JsonBundleStorage, StoragePaths};
use tracing::info;

use crate::errors::{HomefinError, HomefinResult};

pub const DEFAULT_USER: &str = "default";

pub struct Session {
    config: Config,
    config_manager: ConfigManager,
    data_root: PathBuf,
    storage: Arc<JsonBundleStorage>,
    clock: Arc<dyn Clock>,
    store: ProfileStore,
}

impl Session {
    /// Opens a session rooted at `$HOMEFIN_HOME` (or `~/.homefin`) using the wall clock.
    pub fn open_default(user: Option<&str>) -> HomefinResult<Self> {
        Self::open(&paths::app_data_dir(), user, Arc::new(SystemClock))
    }

    /// Loads the config under `base`, then opens `user` (or the last user, or
    /// [`DEFAULT_USER`]). A brand-new bundle picks up the configured currency, theme and
    /// default dashboard.
    pub fn open(base: &Path, user: Option<&str>, clock: Arc<dyn Clock>) -> HomefinResult<Self> {
        let config_manager = ConfigManager::with_base_dir(base)?;
        let mut config = config_manager.load()?;
        let data_root = config.data_root.clone().unwrap_or_else(|| base.to_path_buf());
        let storage = Arc::new(JsonBundleStorage::with_retention(
            StoragePaths::under(&data_root),
            config.backup_retention,
        )?);

        let user = user
            .map(str::to_string)
            .or_else(|| config.last_user.clone())
            .unwrap_or_else(|| DEFAULT_USER.to_string());
        let store = open_store(&storage, &clock, &config, &user)?;

        if config.last_user.as_deref() != Some(user.as_str()) {
            config.last_user = Some(user);
            config_manager.save(&config)?;
        }
        Ok(Self {
            config,
            config_manager,
            data_root,
            storage,
            clock,
            store,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_manager(&self) -> &ConfigManager {
        &self.config_manager
    }

    /// Applies `mutator` to a copy of the config and saves it. Invalid results are
    /// rejected and leave the current config untouched.
    pub fn update_config<F>(&mut self, mutator: F) -> HomefinResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut next = self.config.clone();
        mutator(&mut next);
        self.config_manager.save(&next)?;
        self.config = next;
        Ok(())
    }

    /// Replaces the config with a named backup. Storage settings apply on the next start.
    pub fn restore_config(&mut self, backup_name: &str) -> HomefinResult<()> {
        let mut restored = self.config_manager.restore(backup_name)?;
        restored.last_user = Some(self.store.user().to_string());
        self.config_manager.save(&restored)?;
        self.config = restored;
        info!(backup = backup_name, "restored configuration");
        Ok(())
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ProfileStore {
        &mut self.store
    }

    pub fn storage(&self) -> &JsonBundleStorage {
        &self.storage
    }

    /// Directory holding `bundles/` and `backups/`.
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Switches to another user's bundle and remembers it as the last user.
    pub fn switch_user(&mut self, user: &str) -> HomefinResult<()> {
        self.store = open_store(&self.storage, &self.clock, &self.config, user)?;
        self.config.last_user = Some(user.to_string());
        self.config_manager.save(&self.config)?;
        Ok(())
    }

    pub fn backup(&self, note: Option<&str>) -> HomefinResult<BundleBackupInfo> {
        Ok(self
            .storage
            .backup_bundle(self.store.user(), self.store.bundle(), note)?)
    }

    /// Rolls the current user's bundle back to the backup named `id` and reloads it.
    /// The bundle being replaced is itself kept as a backup.
    pub fn restore_backup(&mut self, id: &str) -> HomefinResult<()> {
        let user = self.store.user().to_string();
        let info = self
            .storage
            .list_backups(&user)?
            .into_iter()
            .find(|backup| backup.id == id)
            .ok_or_else(|| HomefinError::command(format!("no backup named `{id}`")))?;
        self.storage.restore_backup(&info)?;
        self.store = open_store(&self.storage, &self.clock, &self.config, &user)?;
        info!(user = %user, backup = id, "restored bundle from backup");
        Ok(())
    }
}

fn open_store(
    storage: &Arc<JsonBundleStorage>,
    clock: &Arc<dyn Clock>,
    config: &Config,
    user: &str,
) -> HomefinResult<ProfileStore> {
    let fresh = storage.load_bundle(user)?.is_none();
    let shared: Arc<dyn BundleStorage> = storage.clone();
    let mut store = ProfileStore::open(user, shared, clock.clone())?;
    if fresh {
        store.update(|bundle, _| {
            ProfileService::set_currency(bundle, &config.currency)?;
            ProfileService::set_theme(bundle, theme_from(config.theme));
            ProfileService::switch_dashboard(bundle, dashboard_from(config.default_dashboard));
            Ok(())
        })?;
        info!(user, "created bundle from config defaults");
    }
    Ok(store)
}

fn theme_from(theme: ConfigTheme) -> Theme {
    match theme {
        ConfigTheme::Light => Theme::Light,
        ConfigTheme::Dark => Theme::Dark,
    }
}

fn dashboard_from(choice: DefaultDashboard) -> ProfileKind {
    match choice {
        DefaultDashboard::Personal => ProfileKind::Personal,
        DefaultDashboard::Home => ProfileKind::Home,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use homefin_core::FixedClock;
    use tempfile::tempdir;

    use super::*;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::at(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()))
    }

    #[test]
    fn new_bundle_uses_config_defaults_and_remembers_user() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(dir.path()).unwrap();
        manager
            .save(&Config {
                currency: "eur".into(),
                theme: ConfigTheme::Dark,
                default_dashboard: DefaultDashboard::Home,
                ..Config::default()
            })
            .unwrap();

        let session = Session::open(dir.path(), Some("ana"), clock()).unwrap();
        let bundle = session.store().bundle();
        assert_eq!(bundle.currency, "EUR");
        assert_eq!(bundle.theme, Theme::Dark);
        assert_eq!(bundle.active_dashboard, ProfileKind::Home);
        assert_eq!(manager.load().unwrap().last_user.as_deref(), Some("ana"));

        let again = Session::open(dir.path(), None, clock()).unwrap();
        assert_eq!(again.store().user(), "ana");
    }

    #[test]
    fn switching_users_keeps_bundles_apart() {
        let dir = tempdir().unwrap();
        let mut session = Session::open(dir.path(), Some("ana"), clock()).unwrap();
        session
            .store_mut()
            .update_active(|data, _| {
                data.categories.clear();
                Ok(())
            })
            .unwrap();
        session.switch_user("bo").unwrap();
        assert!(!session.store().active().categories.is_empty());
        session.switch_user("ana").unwrap();
        assert!(session.store().active().categories.is_empty());
        assert_eq!(session.storage().list_users().unwrap(), ["ana", "bo"]);
    }

    #[test]
    fn config_updates_are_validated_and_restorable() {
        let dir = tempdir().unwrap();
        let mut session = Session::open(dir.path(), Some("ana"), clock()).unwrap();
        session
            .update_config(|config| config.backup_retention = 9)
            .unwrap();
        let name = session.config_manager().backup(session.config(), None).unwrap();

        assert!(session.update_config(|config| config.currency = "EURO".into()).is_err());
        assert_eq!(session.config().currency, "USD");

        session.update_config(|config| config.backup_retention = 2).unwrap();
        session.restore_config(&name).unwrap();
        assert_eq!(session.config().backup_retention, 9);
        assert_eq!(session.config().last_user.as_deref(), Some("ana"));
    }
}
