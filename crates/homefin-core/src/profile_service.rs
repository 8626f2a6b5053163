//! Bundle-level operations: load-time sanitation, seeding and shared preferences.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use homefin_domain::{Category, DashboardData, ProfileBundle, ProfileKind, Theme, WidgetSettings};

use crate::{
    storage::bundle_warnings,
    trash_service::{PurgeReport, TrashService},
    CoreError, CoreResult,
};

/// Categories given to a freshly created profile.
const SEED_CATEGORIES: &[(&str, &[&str])] = &[
    ("Income", &["Salary", "Interest", "Gifts"]),
    ("Housing", &["Rent", "Utilities", "Maintenance"]),
    ("Food", &["Groceries", "Dining Out"]),
    ("Transport", &["Fuel", "Public Transport"]),
    ("Health", &[]),
    ("Entertainment", &[]),
];

/// What the load-time pass changed or noticed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub personal: PurgeReport,
    pub home: PurgeReport,
    pub warnings: Vec<String>,
}

impl LoadReport {
    pub fn purged(&self, kind: ProfileKind) -> &PurgeReport {
        match kind {
            ProfileKind::Personal => &self.personal,
            ProfileKind::Home => &self.home,
        }
    }
}

pub struct ProfileService;

impl ProfileService {
    /// A new bundle whose two profiles start with the seed categories.
    pub fn default_bundle() -> ProfileBundle {
        let mut bundle = ProfileBundle::default();
        for kind in [ProfileKind::Personal, ProfileKind::Home] {
            bundle.profile_mut(kind).categories = seed_categories();
        }
        bundle
    }

    /// Runs after deserialisation: re-sorts active transactions, sweeps expired trash in
    /// both profiles and collects consistency warnings. Structural repairs (missing or
    /// `null` arrays, missing widget keys, timestamp dates) already happened in serde.
    pub fn sanitize(bundle: &mut ProfileBundle, now: DateTime<Utc>) -> LoadReport {
        let mut report = LoadReport::default();
        for kind in [ProfileKind::Personal, ProfileKind::Home] {
            let data = bundle.profile_mut(kind);
            data.sort_transactions();
            let purged = TrashService::sweep_expired(data, now);
            for warning in bundle_warnings(data) {
                warn!(profile = %kind, "{warning}");
                report.warnings.push(format!("{kind}: {warning}"));
            }
            match kind {
                ProfileKind::Personal => report.personal = purged,
                ProfileKind::Home => report.home = purged,
            }
        }
        info!(warnings = report.warnings.len(), "sanitized profile bundle");
        if bundle.currency.trim().is_empty() {
            bundle.currency = ProfileBundle::default_currency();
        }
        report
    }

    pub fn switch_dashboard(bundle: &mut ProfileBundle, kind: ProfileKind) {
        bundle.active_dashboard = kind;
    }

    pub fn set_theme(bundle: &mut ProfileBundle, theme: Theme) {
        bundle.theme = theme;
    }

    /// Accepts three-letter alphabetic codes, stored upper-case.
    pub fn set_currency(bundle: &mut ProfileBundle, code: &str) -> CoreResult<()> {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CoreError::Validation(format!(
                "`{code}` is not a three-letter currency code"
            )));
        }
        bundle.currency = code.to_ascii_uppercase();
        Ok(())
    }

    pub fn update_widget_settings<F>(data: &mut DashboardData, mutator: F) -> CoreResult<()>
    where
        F: FnOnce(&mut WidgetSettings),
    {
        let mut candidate = data.widget_settings.clone();
        mutator(&mut candidate);
        if candidate.trend_months == 0 || candidate.trend_months > 24 {
            return Err(CoreError::Validation(
                "trend months must be between 1 and 24".into(),
            ));
        }
        data.widget_settings = candidate;
        Ok(())
    }
}

fn seed_categories() -> Vec<Category> {
    SEED_CATEGORIES
        .iter()
        .map(|(name, subs)| {
            subs.iter()
                .fold(Category::new(*name), |category, sub| category.with_subcategory(*sub))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone};
    use homefin_domain::{Transaction, TrashedTransaction};

    use super::*;

    #[test]
    fn default_bundle_seeds_both_profiles_independently() {
        let bundle = ProfileService::default_bundle();
        assert_eq!(bundle.personal.categories.len(), SEED_CATEGORIES.len());
        assert_eq!(bundle.home.categories.len(), SEED_CATEGORIES.len());
        assert_ne!(bundle.personal.categories[0].id, bundle.home.categories[0].id);
        assert_eq!(bundle.personal.categories[2].subcategories.len(), 2);
    }

    #[test]
    fn sanitize_sweeps_each_profile_and_sorts() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap();
        let date = |d| NaiveDate::from_ymd_opt(2024, 6, d).unwrap();
        let mut bundle = ProfileBundle::default();
        bundle.personal.transactions = vec![
            Transaction::new("a", date(9), "later", -1.0),
            Transaction::new("a", date(2), "earlier", -1.0),
        ];
        bundle.home.trash.push(TrashedTransaction {
            transaction: Transaction::new("b", date(1), "old", -1.0),
            deleted_at: now - Duration::days(8),
        });
        bundle.home.trash.push(TrashedTransaction {
            transaction: Transaction::new("b", date(1), "recent", -1.0),
            deleted_at: now - Duration::days(6),
        });

        let report = ProfileService::sanitize(&mut bundle, now);
        assert_eq!(bundle.personal.transactions[0].description, "earlier");
        assert_eq!(report.purged(ProfileKind::Home).transactions_purged, 1);
        assert!(report.purged(ProfileKind::Personal).is_empty());
        assert_eq!(bundle.home.trash.len(), 1);
        assert_eq!(bundle.home.trash[0].transaction.description, "recent");
    }

    #[test]
    fn currency_codes_are_validated() {
        let mut bundle = ProfileBundle::default();
        ProfileService::set_currency(&mut bundle, " eur ").unwrap();
        assert_eq!(bundle.currency, "EUR");
        assert!(ProfileService::set_currency(&mut bundle, "EURO").is_err());
        assert_eq!(bundle.currency, "EUR");
    }

    #[test]
    fn widget_settings_reject_out_of_range_trend() {
        let mut data = DashboardData::default();
        ProfileService::update_widget_settings(&mut data, |w| w.show_needs_wants = true).unwrap();
        assert!(data.widget_settings.show_needs_wants);
        assert!(ProfileService::update_widget_settings(&mut data, |w| w.trend_months = 0).is_err());
        assert_eq!(data.widget_settings.trend_months, 6);
    }
}
