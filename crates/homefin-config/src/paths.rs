use std::{env, path::PathBuf};

use dirs::home_dir;

/// Overrides the data directory when set.
pub const HOME_ENV: &str = "HOMEFIN_HOME";

const DEFAULT_DIR_NAME: &str = ".homefin";
const CONFIG_DIR: &str = "config";
const CONFIG_FILE: &str = "config.json";
const CONFIG_BACKUP_DIR: &str = "backups";

/// Returns the application data directory: `$HOMEFIN_HOME`, else `~/.homefin`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

pub fn config_file(base: &std::path::Path) -> PathBuf {
    base.join(CONFIG_DIR).join(CONFIG_FILE)
}

pub fn config_backups_dir(base: &std::path::Path) -> PathBuf {
    base.join(CONFIG_DIR).join(CONFIG_BACKUP_DIR)
}
