//! Disk persistence for [`Config`]: validated saves that never leave a half-written
//! file, plus note-labelled snapshots trimmed to the configured retention.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{paths, Config, ConfigError};

const SNAPSHOT_PREFIX: &str = "config";
const SNAPSHOT_STAMP: &str = "%Y%m%d_%H%M%S";
const JSON_EXTENSION: &str = "json";

/// A snapshot file under the backups directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigBackup {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl ConfigBackup {
    /// Reads `config_<YYYYMMDD>_<HHMMSS>[_note].json`. Other JSON files are listed with
    /// no timestamp.
    fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(&format!(".{JSON_EXTENSION}"))?;
        let mut parts = stem
            .strip_prefix(SNAPSHOT_PREFIX)
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or_default()
            .splitn(3, '_');
        let created_at = match (parts.next(), parts.next()) {
            (Some(date), Some(time)) => {
                NaiveDateTime::parse_from_str(&format!("{date}_{time}"), SNAPSHOT_STAMP)
                    .ok()
                    .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
            }
            _ => None,
        };
        let note = created_at
            .and(parts.next())
            .filter(|note| !note.is_empty())
            .map(str::to_string);
        Some(Self {
            name: name.to_string(),
            created_at,
            note,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
    backups_dir: PathBuf,
}

impl ConfigManager {
    pub fn new(config_path: PathBuf, backups_dir: PathBuf) -> Self {
        Self {
            config_path,
            backups_dir,
        }
    }

    /// `<base>/config/config.json` with snapshots under `<base>/config/backups`.
    pub fn with_base_dir(base: &Path) -> Result<Self, ConfigError> {
        let manager = Self::new(paths::config_file(base), paths::config_backups_dir(base));
        fs::create_dir_all(&manager.backups_dir)?;
        Ok(manager)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// Reads the config file, or returns defaults when none exists yet.
    pub fn load(&self) -> Result<Config, ConfigError> {
        match fs::read_to_string(&self.config_path) {
            Ok(data) => parse(&data),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Config::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Validates `config` and replaces the file through a temporary sibling.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        config.validate()?;
        replace_file(&self.config_path, &render(config)?)
    }

    /// Writes a snapshot of `config`, then drops the oldest snapshots beyond
    /// `config.backup_retention`.
    pub fn backup(&self, config: &Config, note: Option<&str>) -> Result<String, ConfigError> {
        let mut name = format!(
            "{SNAPSHOT_PREFIX}_{}",
            Utc::now().format(SNAPSHOT_STAMP)
        );
        if let Some(slug) = note.and_then(slugify) {
            name = format!("{name}_{slug}");
        }
        name = format!("{name}.{JSON_EXTENSION}");

        fs::create_dir_all(&self.backups_dir)?;
        replace_file(&self.backups_dir.join(&name), &render(config)?)?;
        self.prune(config.backup_retention.max(1))?;
        Ok(name)
    }

    /// Loads the named snapshot and makes it the current config.
    pub fn restore(&self, backup_name: &str) -> Result<Config, ConfigError> {
        if backup_name.contains(['/', '\\']) || backup_name.starts_with('.') {
            return Err(ConfigError::Invalid(format!(
                "`{backup_name}` is not a backup name"
            )));
        }
        let data = match fs::read_to_string(self.backups_dir.join(backup_name)) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::Invalid(format!(
                    "configuration backup `{backup_name}` not found"
                )))
            }
            Err(err) => return Err(err.into()),
        };
        let config = parse(&data)?;
        self.save(&config)?;
        Ok(config)
    }

    /// Snapshots, newest first.
    pub fn list_backups(&self) -> Result<Vec<ConfigBackup>, ConfigError> {
        let entries = match fs::read_dir(&self.backups_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(backup) = entry
                .file_name()
                .to_str()
                .and_then(ConfigBackup::from_file_name)
            {
                backups.push(backup);
            }
        }
        backups.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(backups)
    }

    fn prune(&self, keep: usize) -> Result<(), ConfigError> {
        for stale in self.list_backups()?.into_iter().skip(keep) {
            fs::remove_file(self.backups_dir.join(&stale.name))?;
        }
        Ok(())
    }
}

fn parse(data: &str) -> Result<Config, ConfigError> {
    serde_json::from_str(data).map_err(|err| ConfigError::Serde(err.to_string()))
}

fn render(config: &Config) -> Result<String, ConfigError> {
    serde_json::to_string_pretty(config).map_err(|err| ConfigError::Serde(err.to_string()))
}

/// Lowercase ASCII words joined by `-`; `None` when nothing usable remains.
fn slugify(note: &str) -> Option<String> {
    let words: Vec<String> = note
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    (!words.is_empty()).then(|| words.join("-"))
}

fn replace_file(path: &Path, contents: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);
    {
        let mut file = fs::File::create(&staging)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&staging, path)?;
    Ok(())
}
