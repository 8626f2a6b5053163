use std::{fmt, io};

use chrono::NaiveDate;
use homefin_config::ConfigError;
use homefin_core::CoreError;
use homefin_domain::{names_match, Account, Category, DashboardData};
use thiserror::Error;

use crate::{
    cli::{
        commands,
        output::{self, MessageKind},
    },
    errors::HomefinError,
    session::Session,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

/// Failure of a single command. The shell reports it and moves on to the next line.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command `{name}`; {hint}")]
    UnknownCommand { name: String, hint: String },
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    App(#[from] HomefinError),
}

impl CommandError {
    /// Unknown-command error, suggesting the closest registered name when one is near.
    pub fn unknown(name: &str) -> Self {
        let hint = match commands::suggest(name) {
            Some(candidate) => format!("did you mean `{candidate}`?"),
            None => "try `help`".to_string(),
        };
        CommandError::UnknownCommand {
            name: name.to_string(),
            hint,
        }
    }
}

impl From<CoreError> for CommandError {
    fn from(err: CoreError) -> Self {
        CommandError::App(err.into())
    }
}

impl From<ConfigError> for CommandError {
    fn from(err: ConfigError) -> Self {
        CommandError::App(err.into())
    }
}

impl From<io::Error> for CommandError {
    fn from(err: io::Error) -> Self {
        CommandError::App(err.into())
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        CommandError::App(err.into())
    }
}

impl From<CommandError> for HomefinError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::App(inner) => inner,
            other => HomefinError::Command(other.to_string()),
        }
    }
}

pub type CommandResult = Result<LoopControl, CommandError>;

/// State shared by every command: the open session, the output sink and the
/// running/error counters of the current run.
pub struct ShellContext<'w> {
    pub session: Session,
    out: &'w mut dyn io::Write,
    running: bool,
    failures: usize,
}

impl<'w> ShellContext<'w> {
    pub fn new(session: Session, out: &'w mut dyn io::Write) -> Self {
        Self {
            session,
            out,
            running: true,
            failures: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    pub fn dispatch(&mut self, command: &str, args: &[&str]) -> CommandResult {
        let handler = commands::registry()
            .get(command)
            .map(|definition| definition.handler)
            .ok_or_else(|| CommandError::unknown(command))?;
        let control = handler(self, args)?;
        if control == LoopControl::Exit {
            self.running = false;
        }
        Ok(control)
    }

    pub fn report_error(&mut self, err: CommandError) -> io::Result<()> {
        self.failures += 1;
        output::write_message(&mut *self.out, MessageKind::Error, err)
    }

    pub fn emit(
        &mut self,
        kind: MessageKind,
        message: impl fmt::Display,
    ) -> Result<(), CommandError> {
        Ok(output::write_message(&mut *self.out, kind, message)?)
    }

    pub fn info(&mut self, message: impl fmt::Display) -> Result<(), CommandError> {
        self.emit(MessageKind::Info, message)
    }

    pub fn success(&mut self, message: impl fmt::Display) -> Result<(), CommandError> {
        self.emit(MessageKind::Success, message)
    }

    pub fn warning(&mut self, message: impl fmt::Display) -> Result<(), CommandError> {
        self.emit(MessageKind::Warning, message)
    }

    pub fn section(&mut self, title: impl fmt::Display) -> Result<(), CommandError> {
        self.emit(MessageKind::Section, title)
    }

    pub fn line(&mut self, text: impl fmt::Display) -> Result<(), CommandError> {
        self.emit(MessageKind::Plain, text)
    }

    pub fn prompt(&self) -> String {
        let store = self.session.store();
        format!("homefin {}@{}> ", store.user(), store.bundle().active_dashboard)
    }

    pub fn data(&self) -> &DashboardData {
        self.session.store().active()
    }

    pub fn currency(&self) -> &str {
        &self.session.store().bundle().currency
    }

    pub fn money(&self, amount: f64) -> String {
        output::money(amount, self.currency())
    }

    pub fn today(&self) -> NaiveDate {
        self.session.store().clock().today()
    }
}

/// Looks an account up by id or case-insensitive name.
pub fn find_account<'a>(data: &'a DashboardData, key: &str) -> Result<&'a Account, CommandError> {
    data.account(key)
        .or_else(|| data.accounts.iter().find(|account| names_match(&account.name, key)))
        .ok_or_else(|| CommandError::InvalidArgument(format!("no account named `{key}`")))
}

pub fn find_category<'a>(data: &'a DashboardData, key: &str) -> Result<&'a Category, CommandError> {
    data.category(key)
        .or_else(|| {
            data.categories
                .iter()
                .find(|category| names_match(&category.name, key))
        })
        .ok_or_else(|| CommandError::InvalidArgument(format!("no category named `{key}`")))
}

pub fn parse_amount(raw: &str) -> Result<f64, CommandError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CommandError::InvalidArgument(format!("`{raw}` is not an amount")))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| CommandError::InvalidArgument(format!("`{raw}` is not a YYYY-MM-DD date")))
}
