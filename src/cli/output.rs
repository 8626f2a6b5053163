use colored::Colorize;
use std::{fmt, io};

/// Message categories used by the CLI output helpers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
    Section,
    /// Table rows and other data, printed without a label.
    Plain,
}

fn build_label(kind: MessageKind) -> (&'static str, &'static str) {
    match kind {
        MessageKind::Info => ("INFO", "[i]"),
        MessageKind::Success => ("SUCCESS", "[ok]"),
        MessageKind::Warning => ("WARNING", "[!]"),
        MessageKind::Error => ("ERROR", "[x]"),
        MessageKind::Section | MessageKind::Plain => ("", ""),
    }
}

/// Renders `message` with its label but without colour.
pub fn format_message(kind: MessageKind, message: impl fmt::Display) -> String {
    let text = message.to_string();
    match kind {
        MessageKind::Section => format!("=== {} ===", text.trim()),
        MessageKind::Plain => text,
        _ => {
            let (label, icon) = build_label(kind);
            format!("{label}: {icon} {text}")
        }
    }
}

fn apply_style(kind: MessageKind, formatted: String) -> String {
    match kind {
        MessageKind::Success => formatted.bright_green().to_string(),
        MessageKind::Warning => formatted.bright_yellow().to_string(),
        MessageKind::Error => formatted.bright_red().to_string(),
        MessageKind::Section => formatted.bold().to_string(),
        MessageKind::Info | MessageKind::Plain => formatted,
    }
}

/// Writes one styled line. Sections are preceded by a blank line.
pub fn write_message(
    out: &mut dyn io::Write,
    kind: MessageKind,
    message: impl fmt::Display,
) -> io::Result<()> {
    let styled = apply_style(kind, format_message(kind, message));
    match kind {
        MessageKind::Section => writeln!(out, "\n{styled}"),
        _ => writeln!(out, "{styled}"),
    }
}

/// Formats an amount with two decimals and the bundle currency.
pub fn money(amount: f64, currency: &str) -> String {
    // Avoid printing "-0.00".
    let amount = if amount.abs() < 0.005 { 0.0 } else { amount };
    format!("{amount:.2} {currency}")
}
