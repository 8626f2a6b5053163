use homefin_config::ConfigError;
use homefin_core::CoreError;
use thiserror::Error;

/// Error type for the facade: wraps the crate-level errors plus command failures.
#[derive(Debug, Error)]
pub enum HomefinError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Line editor error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
    #[error("{0}")]
    Command(String),
}

impl HomefinError {
    pub fn command(message: impl Into<String>) -> Self {
        HomefinError::Command(message.into())
    }
}

pub type HomefinResult<T> = Result<T, HomefinError>;
