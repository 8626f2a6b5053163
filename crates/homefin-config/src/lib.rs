//! homefin-config
//!
//! Persistent user preferences: the Config model, data-directory resolution and
//! disk persistence with backups.

pub mod error;
pub mod manager;
pub mod model;
pub mod paths;

pub use error::ConfigError;
pub use manager::{ConfigBackup, ConfigManager};
pub use model::{Config, DefaultDashboard, Theme};
