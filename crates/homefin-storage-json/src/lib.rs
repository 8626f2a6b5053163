use std::{
    cmp::Reverse,
    ffi::OsString,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDateTime, Utc};
use homefin_core::{
    storage::{BundleBackupInfo, BundleStorage},
    CoreError, LedgerService,
};
use homefin_domain::{ProfileBundle, ProfileKind};
use tracing::{debug, warn};

const BUNDLE_EXTENSION: &str = "json";
const BACKUP_STAMP: &str = "%Y%m%d_%H%M%S";
const STAGING_SUFFIX: &str = ".tmp";
pub const DEFAULT_RETENTION: usize = 5;

/// Directories used by [`JsonBundleStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub bundle_root: PathBuf,
    pub backup_root: PathBuf,
}

impl StoragePaths {
    /// `<root>/bundles` and `<root>/backups`.
    pub fn under(root: &Path) -> Self {
        Self {
            bundle_root: root.join("bundles"),
            backup_root: root.join("backups"),
        }
    }
}

/// Filesystem-backed JSON persistence: one `<user>.json` file per user, written via a
/// temporary file and a rename. The previous file is copied to a timestamped backup
/// before each overwrite and old backups are pruned past the retention count.
#[derive(Debug, Clone)]
pub struct JsonBundleStorage {
    bundles_dir: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl JsonBundleStorage {
    pub fn new(paths: StoragePaths) -> Result<Self, CoreError> {
        Self::with_retention(paths, DEFAULT_RETENTION)
    }

    pub fn with_retention(paths: StoragePaths, retention: usize) -> Result<Self, CoreError> {
        fs::create_dir_all(&paths.bundle_root)?;
        fs::create_dir_all(&paths.backup_root)?;
        Ok(Self {
            bundles_dir: paths.bundle_root,
            backups_dir: paths.backup_root,
            retention: retention.max(1),
        })
    }

    pub fn bundle_path(&self, user: &str) -> PathBuf {
        self.bundles_dir
            .join(format!("{}.{}", canonical_name(user), BUNDLE_EXTENSION))
    }

    pub fn backup_path(&self, user: &str, backup: &str) -> PathBuf {
        self.backup_dir(user).join(backup)
    }

    pub fn list_bundle_metadata(&self) -> Result<Vec<BundleMetadata>, CoreError> {
        let mut entries = Vec::new();
        for slug in self.list_users()? {
            let path = self.bundle_path(&slug);
            let bundle = load_bundle_from_path(&path)?;
            let net_worth = |kind: ProfileKind| {
                let data = bundle.profile(kind);
                LedgerService::net_worth(&data.accounts, &data.transactions).net_worth
            };
            entries.push(BundleMetadata {
                modified_at: fs::metadata(&path)
                    .and_then(|meta| meta.modified())
                    .ok()
                    .map(DateTime::<Utc>::from),
                account_count: bundle.personal.accounts.len() + bundle.home.accounts.len(),
                transaction_count: bundle.personal.transactions.len()
                    + bundle.home.transactions.len(),
                personal_net_worth: net_worth(ProfileKind::Personal),
                home_net_worth: net_worth(ProfileKind::Home),
                currency: bundle.currency.clone(),
                user: slug,
                path,
            });
        }
        Ok(entries)
    }

    pub fn list_backup_metadata(&self, user: &str) -> Result<Vec<BackupMetadata>, CoreError> {
        let mut rows = Vec::new();
        for entry in self.list_backups(user)? {
            let size_bytes = fs::metadata(&entry.path)
                .map(|meta| meta.len())
                .unwrap_or(0);
            rows.push(BackupMetadata {
                name: entry.id.clone(),
                created_at: parse_backup_timestamp(&entry.id),
                size_bytes,
                path: entry.path,
            });
        }
        rows.sort_by_key(|meta| Reverse(meta.created_at));
        Ok(rows)
    }

    /// Copies a backup over the user's bundle and returns the restored bundle.
    pub fn restore_backup(&self, backup: &BundleBackupInfo) -> Result<ProfileBundle, CoreError> {
        if !backup.path.exists() {
            return Err(CoreError::Storage(format!(
                "backup `{}` not found",
                backup.id
            )));
        }
        let restored = load_bundle_from_path(&backup.path)?;
        self.save_bundle(&backup.user, &restored)?;
        Ok(restored)
    }

    pub fn delete_backup(&self, user: &str, backup_id: &str) -> Result<(), CoreError> {
        let path = self.backup_path(user, backup_id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn backup_dir(&self, user: &str) -> PathBuf {
        self.backups_dir.join(canonical_name(user))
    }

    fn backup_file_name(&self, user: &str, note: Option<&str>) -> String {
        let stamp = Utc::now().format(BACKUP_STAMP);
        match note.and_then(note_slug) {
            Some(slug) => format!("{}_{stamp}_{slug}.{BUNDLE_EXTENSION}", canonical_name(user)),
            None => format!("{}_{stamp}.{BUNDLE_EXTENSION}", canonical_name(user)),
        }
    }

    fn backup_existing_file(&self, user: &str, path: &Path) -> Result<(), CoreError> {
        if !path.exists() {
            return Ok(());
        }
        let dir = self.backup_dir(user);
        fs::create_dir_all(&dir)?;
        let backup_path = dir.join(self.backup_file_name(user, None));
        fs::copy(path, &backup_path)?;
        self.prune_backups(user)
    }

    fn prune_backups(&self, user: &str) -> Result<(), CoreError> {
        let entries = self.list_backups(user)?;
        for entry in entries.into_iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(&entry.path) {
                warn!(path = %entry.path.display(), error = %err, "failed to prune backup");
            }
        }
        Ok(())
    }
}

impl BundleStorage for JsonBundleStorage {
    fn load_bundle(&self, user: &str) -> Result<Option<ProfileBundle>, CoreError> {
        let path = self.bundle_path(user);
        if !path.exists() {
            return Ok(None);
        }
        load_bundle_from_path(&path).map(Some)
    }

    fn save_bundle(&self, user: &str, bundle: &ProfileBundle) -> Result<(), CoreError> {
        let path = self.bundle_path(user);
        self.backup_existing_file(user, &path)?;
        save_bundle_to_path(bundle, &path)?;
        debug!(user, path = %path.display(), "saved bundle");
        Ok(())
    }

    fn list_users(&self) -> Result<Vec<String>, CoreError> {
        if !self.bundles_dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.bundles_dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(BUNDLE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete_bundle(&self, user: &str) -> Result<(), CoreError> {
        let path = self.bundle_path(user);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn backup_bundle(
        &self,
        user: &str,
        bundle: &ProfileBundle,
        note: Option<&str>,
    ) -> Result<BundleBackupInfo, CoreError> {
        let dir = self.backup_dir(user);
        fs::create_dir_all(&dir)?;
        let file_name = self.backup_file_name(user, note);
        let path = dir.join(&file_name);
        replace_file(&path, &serialize_bundle(bundle)?)?;
        self.prune_backups(user)?;
        Ok(BundleBackupInfo {
            user: canonical_name(user),
            created_at: parse_backup_timestamp(&file_name)
                .map(|at| at.to_rfc3339())
                .unwrap_or_default(),
            id: file_name,
            path,
        })
    }

    fn list_backups(&self, user: &str) -> Result<Vec<BundleBackupInfo>, CoreError> {
        let dir = self.backup_dir(user);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let slug = canonical_name(user);
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BUNDLE_EXTENSION) {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
                entries.push(BundleBackupInfo {
                    user: slug.clone(),
                    id: file_name.to_string(),
                    created_at: parse_backup_timestamp(file_name)
                        .map(|at| at.to_rfc3339())
                        .unwrap_or_default(),
                    path: path.clone(),
                });
            }
        }
        entries.sort_by_key(|info| Reverse(parse_backup_timestamp(&info.id)));
        Ok(entries)
    }
}

/// Saves a bundle to an arbitrary path on disk.
pub fn save_bundle_to_path(bundle: &ProfileBundle, path: &Path) -> Result<(), CoreError> {
    replace_file(path, &serialize_bundle(bundle)?)
}

/// Loads a bundle from the provided path. Missing or `null` collections and missing
/// widget keys are filled in during deserialisation.
pub fn load_bundle_from_path(path: &Path) -> Result<ProfileBundle, CoreError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| CoreError::Serde(err.to_string()))
}

#[derive(Debug, Clone)]
pub struct BundleMetadata {
    pub user: String,
    pub path: PathBuf,
    pub modified_at: Option<DateTime<Utc>>,
    pub currency: String,
    pub account_count: usize,
    pub transaction_count: usize,
    pub personal_net_worth: f64,
    pub home_net_worth: f64,
}

#[derive(Debug, Clone)]
pub struct BackupMetadata {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub size_bytes: u64,
    pub path: PathBuf,
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "user".into()
    } else {
        sanitized
    }
}

/// Lowercase ASCII words of `note` joined by `-`.
fn note_slug(note: &str) -> Option<String> {
    let words: Vec<String> = note
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    (!words.is_empty()).then(|| words.join("-"))
}

/// Reads `<slug>_<YYYYMMDD>_<HHMMSS>[_note].json`.
fn parse_backup_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let stem = name.strip_suffix(&format!(".{BUNDLE_EXTENSION}"))?;
    let segments: Vec<&str> = stem.split('_').collect();
    segments.windows(2).rev().find_map(|pair| {
        let digits = |part: &str, len| part.len() == len && part.bytes().all(|b| b.is_ascii_digit());
        if !digits(pair[0], 8) || !digits(pair[1], 6) {
            return None;
        }
        NaiveDateTime::parse_from_str(&format!("{}_{}", pair[0], pair[1]), BACKUP_STAMP)
            .ok()
            .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
    })
}

/// Writes `contents` beside `path` and renames it into place.
fn replace_file(path: &Path, contents: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut staging = OsString::from(path.as_os_str());
    staging.push(STAGING_SUFFIX);
    let staging = PathBuf::from(staging);
    let mut file = File::create(&staging)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    drop(file);
    fs::rename(&staging, path)?;
    Ok(())
}

fn serialize_bundle(bundle: &ProfileBundle) -> Result<String, CoreError> {
    serde_json::to_string_pretty(bundle).map_err(|err| CoreError::Serde(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_are_filesystem_safe() {
        assert_eq!(canonical_name(" Ana Maria "), "ana_maria");
        assert_eq!(canonical_name("bo-2"), "bo-2");
        assert_eq!(canonical_name("???"), "user");
    }

    #[test]
    fn backup_timestamps_parse_with_or_without_note() {
        let plain = parse_backup_timestamp("ana_20240501_093015.json").unwrap();
        assert_eq!(plain.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-05-01 09:30:15");
        let noted = parse_backup_timestamp("ana_20240501_093015_before-import.json").unwrap();
        assert_eq!(noted, plain);
        let spaced = parse_backup_timestamp("ana_maria_20240501_093015.json").unwrap();
        assert_eq!(spaced, plain);
        assert!(parse_backup_timestamp("ana.json").is_none());
        assert!(parse_backup_timestamp("ana_20240501_0930.json").is_none());
    }

    #[test]
    fn notes_are_slugged() {
        assert_eq!(
            note_slug("  Before Import v2. ").as_deref(),
            Some("before-import-v2")
        );
        assert_eq!(note_slug("!!!"), None);
    }
}
