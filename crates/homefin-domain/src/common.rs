//! Shared traits, identifiers, budgeting periods and serde helpers.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Exposes a stable identifier for entities stored in a profile.
pub trait Identifiable {
    fn id(&self) -> &str;
}

/// Provides read-only access to an entity's display name.
pub trait NamedEntity {
    fn name(&self) -> &str;
}

/// Converts an entity into a user-facing display label.
pub trait Displayable {
    fn display_label(&self) -> String;
}

/// Generates a fresh opaque identifier for accounts, categories and budgets.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Compares two names the way the registry does: trimmed and case-insensitive.
pub fn names_match(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
/// Enumerates the cadences a budget can be tracked against.
pub enum BudgetPeriod {
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BudgetPeriod::Weekly => "Weekly",
            BudgetPeriod::Monthly => "Monthly",
            BudgetPeriod::Yearly => "Yearly",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Half-open `[start, end)` date range.
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateWindowError> {
        if end <= start {
            return Err(DateWindowError::InvalidRange);
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Errors that can occur when constructing [`DateWindow`] values.
pub enum DateWindowError {
    InvalidRange,
}

impl fmt::Display for DateWindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateWindowError::InvalidRange => f.write_str("date window end must be after start"),
        }
    }
}

impl std::error::Error for DateWindowError {}

/// Deserialises `null` as the type's default, so partial bundles load cleanly.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deletion time used when a trash entry carries none it can be read from.
pub fn load_time() -> DateTime<Utc> {
    Utc::now()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStamp {
    Text(String),
    Other(de::IgnoredAny),
}

/// Reads a trash deletion time. `null`, garbage or a non-string value fall back to
/// [`load_time`], giving the entry a fresh retention window.
pub fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let stamp = match Option::<RawStamp>::deserialize(deserializer)? {
        Some(RawStamp::Text(raw)) => parse_timestamp(&raw),
        Some(RawStamp::Other(_)) | None => None,
    };
    Ok(stamp.unwrap_or_else(load_time))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(stamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(stamp.with_timezone(&Utc));
    }
    parse_flexible_date(trimmed)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Accepts either a plain `YYYY-MM-DD` date or a full RFC 3339 timestamp.
pub fn flexible_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flexible_date(&raw)
        .ok_or_else(|| de::Error::custom(format!("unrecognised date `{raw}`")))
}

fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(stamp.date_naive());
    }
    // Timestamps without offset, e.g. `2024-01-03T10:00:00`.
    trimmed
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn window_is_half_open() {
        let window = DateWindow::new(d(2024, 1, 1), d(2024, 2, 1)).unwrap();
        assert!(window.contains(d(2024, 1, 1)));
        assert!(window.contains(d(2024, 1, 31)));
        assert!(!window.contains(d(2024, 2, 1)));
    }

    #[test]
    fn window_rejects_inverted_range() {
        assert_eq!(
            DateWindow::new(d(2024, 2, 1), d(2024, 1, 1)),
            Err(DateWindowError::InvalidRange)
        );
    }

    #[test]
    fn flexible_dates_accept_timestamps() {
        assert_eq!(parse_flexible_date("2024-01-03"), Some(d(2024, 1, 3)));
        assert_eq!(
            parse_flexible_date("2024-01-03T23:10:00.000Z"),
            Some(d(2024, 1, 3))
        );
        assert_eq!(parse_flexible_date("2024-01-03T08:00:00"), Some(d(2024, 1, 3)));
        assert_eq!(parse_flexible_date("yesterday"), None);
    }

    #[test]
    fn timestamps_fall_back_to_midnight_for_bare_dates() {
        assert_eq!(
            parse_timestamp("2024-01-03T10:00:00+02:00").map(|at| at.to_rfc3339()),
            Some("2024-01-03T08:00:00+00:00".into())
        );
        assert_eq!(
            parse_timestamp("2024-01-03").map(|at| at.to_rfc3339()),
            Some("2024-01-03T00:00:00+00:00".into())
        );
        assert_eq!(parse_timestamp("soon"), None);
    }

    #[test]
    fn names_match_ignores_case_and_padding() {
        assert!(names_match("  Groceries ", "groceries"));
        assert!(!names_match("Groceries", "Grocery"));
    }
}
