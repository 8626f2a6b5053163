use serde::{de::Deserializer, Deserialize, Serialize};
use std::{fmt, path::PathBuf};

use crate::{paths::app_data_dir, ConfigError};

pub const DEFAULT_BACKUP_RETENTION: usize = 5;

/// Stores host preferences. Unknown or missing keys fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub currency: String,
    pub theme: Theme,
    pub default_dashboard: DefaultDashboard,
    /// Root for bundles and backups. Defaults to [`app_data_dir`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_root: Option<PathBuf>,
    pub backup_retention: usize,
    /// `tracing` filter directive, e.g. `homefin=debug`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_user: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency: "USD".into(),
            theme: Theme::default(),
            default_dashboard: DefaultDashboard::default(),
            data_root: None,
            backup_retention: DEFAULT_BACKUP_RETENTION,
            log_filter: None,
            last_user: None,
        }
    }
}

impl Config {
    pub fn resolve_data_root(&self) -> PathBuf {
        match &self.data_root {
            Some(path) => path.clone(),
            None => app_data_dir(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let code = self.currency.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::Invalid(format!(
                "currency `{}` is not a three-letter code",
                self.currency
            )));
        }
        if self.backup_retention == 0 {
            return Err(ConfigError::Invalid(
                "backup_retention must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Anything other than `dark` reads as the light theme.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "dark" => Theme::Dark,
            _ => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        })
    }
}

impl<'de> Deserialize<'de> for Theme {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.as_deref().map(Theme::parse).unwrap_or_default())
    }
}

/// Profile shown when a user's bundle is first created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DefaultDashboard {
    #[default]
    Personal,
    Home,
}

impl fmt::Display for DefaultDashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DefaultDashboard::Personal => "personal",
            DefaultDashboard::Home => "home",
        })
    }
}
