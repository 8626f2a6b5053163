//! Paired debit/credit legs for transfers inside a profile and across profiles.
//!
//! The legs share an id stem (`<millis>-<random>`) with `-from`/`-to` suffixes. The
//! stem is only for traceability: once written, each leg is an ordinary transaction
//! and editing or trashing one never touches the other.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use homefin_domain::{DashboardData, ProfileBundle, ProfileKind, Transaction};

use crate::{time::Clock, CoreError, CoreResult};

const FROM_SUFFIX: &str = "-from";
const TO_SUFFIX: &str = "-to";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferRequest {
    pub from_account_id: String,
    pub to_account_id: String,
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TransferRequest {
    pub fn new(
        from_account_id: impl Into<String>,
        to_account_id: impl Into<String>,
        amount: f64,
        date: NaiveDate,
    ) -> Self {
        Self {
            from_account_id: from_account_id.into(),
            to_account_id: to_account_id.into(),
            amount,
            date,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Copies of the two legs that were written.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferLegs {
    pub from: Transaction,
    pub to: Transaction,
}

impl TransferLegs {
    pub fn net(&self) -> f64 {
        self.from.amount + self.to.amount
    }
}

pub struct TransferService;

impl TransferService {
    /// Moves money between two accounts of the same profile.
    pub fn add_transfer(
        data: &mut DashboardData,
        request: &TransferRequest,
        clock: &dyn Clock,
    ) -> CoreResult<TransferLegs> {
        if request.from_account_id == request.to_account_id {
            warn!(account = %request.from_account_id, "rejected transfer to the same account");
            return Err(CoreError::Validation("same account".into()));
        }
        let amount = validated_amount(request.amount)?;
        let from_name = data
            .account(&request.from_account_id)
            .map(|account| account.name.clone())
            .ok_or_else(|| CoreError::AccountNotFound(request.from_account_id.clone()))?;
        let to_name = data
            .account(&request.to_account_id)
            .map(|account| account.name.clone())
            .ok_or_else(|| CoreError::AccountNotFound(request.to_account_id.clone()))?;

        let legs = build_legs(
            request,
            amount,
            format!("Transfer to {to_name}"),
            format!("Transfer from {from_name}"),
            clock,
        );
        data.transactions.push(legs.from.clone());
        data.transactions.push(legs.to.clone());
        info!(from = %from_name, to = %to_name, amount, "recorded transfer");
        Ok(legs)
    }

    /// Moves money from an account of one profile to an account of the other. Each
    /// leg's description names the counterpart profile, since its account is not
    /// addressable from the reading profile.
    pub fn add_inter_dashboard_transfer(
        bundle: &mut ProfileBundle,
        request: &TransferRequest,
        from_profile: ProfileKind,
        to_profile: ProfileKind,
        clock: &dyn Clock,
    ) -> CoreResult<TransferLegs> {
        if from_profile == to_profile {
            return Err(CoreError::CrossProfileTransfer(format!(
                "source and destination are both the {from_profile} profile"
            )));
        }
        let amount = validated_amount(request.amount)
            .map_err(|err| CoreError::CrossProfileTransfer(err.to_string()))?;
        let (source, target) = bundle.split_mut(from_profile);
        if source.account(&request.from_account_id).is_none() {
            return Err(CoreError::CrossProfileTransfer(format!(
                "account {} not found in the {from_profile} profile",
                request.from_account_id
            )));
        }
        if target.account(&request.to_account_id).is_none() {
            return Err(CoreError::CrossProfileTransfer(format!(
                "account {} not found in the {to_profile} profile",
                request.to_account_id
            )));
        }

        let legs = build_legs(
            request,
            amount,
            format!("Transfer to {}", to_profile.display_name()),
            format!("Transfer from {}", from_profile.display_name()),
            clock,
        );
        source.transactions.push(legs.from.clone());
        target.transactions.push(legs.to.clone());
        info!(from = %from_profile, to = %to_profile, amount, "recorded cross-profile transfer");
        Ok(legs)
    }

    /// Looks up the other leg of a transfer by its id stem. Read-only: legs are never
    /// updated together.
    pub fn find_sibling_leg<'a>(
        transactions: &'a [Transaction],
        leg: &Transaction,
    ) -> Option<&'a Transaction> {
        if !leg.is_transfer {
            return None;
        }
        let sibling_id = if let Some(stem) = leg.id.strip_suffix(FROM_SUFFIX) {
            format!("{stem}{TO_SUFFIX}")
        } else if let Some(stem) = leg.id.strip_suffix(TO_SUFFIX) {
            format!("{stem}{FROM_SUFFIX}")
        } else {
            return None;
        };
        transactions.iter().find(|txn| txn.id == sibling_id)
    }
}

fn validated_amount(amount: f64) -> CoreResult<f64> {
    if !amount.is_finite() || amount == 0.0 {
        return Err(CoreError::Validation(
            "transfer amount must be a non-zero number".into(),
        ));
    }
    Ok(amount.abs())
}

fn build_legs(
    request: &TransferRequest,
    amount: f64,
    from_description: String,
    to_description: String,
    clock: &dyn Clock,
) -> TransferLegs {
    let random = Uuid::new_v4().simple().to_string();
    let stem = format!("{}-{}", clock.now().timestamp_millis(), &random[..8]);
    let leg = |suffix: &str, account_id: &str, description: String, amount: f64| {
        let mut txn = Transaction::new(account_id, request.date, description, amount);
        txn.id = format!("{stem}{suffix}");
        txn.is_transfer = true;
        txn.notes = request.notes.clone();
        txn
    };
    TransferLegs {
        from: leg(FROM_SUFFIX, &request.from_account_id, from_description, -amount),
        to: leg(TO_SUFFIX, &request.to_account_id, to_description, amount),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use homefin_domain::{Account, AccountKind};

    use super::*;
    use crate::{time::FixedClock, LedgerService};

    fn clock() -> FixedClock {
        FixedClock::at(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn profile() -> (DashboardData, String, String) {
        let mut data = DashboardData::default();
        let checking = Account::new("Checking", AccountKind::Bank);
        let savings = Account::new("Savings", AccountKind::Bank);
        let ids = (checking.id.clone(), savings.id.clone());
        data.accounts.push(checking);
        data.accounts.push(savings);
        (data, ids.0, ids.1)
    }

    #[test]
    fn legs_share_stem_and_describe_counterpart() {
        let (mut data, checking, savings) = profile();
        let request = TransferRequest::new(&checking, &savings, -40.0, date()).with_notes("rent");
        let legs = TransferService::add_transfer(&mut data, &request, &clock()).unwrap();

        assert_eq!(legs.from.amount, -40.0);
        assert_eq!(legs.to.amount, 40.0);
        assert_eq!(legs.net(), 0.0);
        assert_eq!(legs.from.description, "Transfer to Savings");
        assert_eq!(legs.to.description, "Transfer from Checking");
        assert!(legs.from.id.starts_with("1714564800000-"));
        assert_eq!(
            legs.from.id.trim_end_matches("-from"),
            legs.to.id.trim_end_matches("-to")
        );
        assert_eq!(legs.to.notes.as_deref(), Some("rent"));
        assert_eq!(LedgerService::account_balance(&data.transactions, &savings), 40.0);
    }

    #[test]
    fn zero_amount_is_rejected_without_writes() {
        let (mut data, checking, savings) = profile();
        let request = TransferRequest::new(&checking, &savings, 0.0, date());
        let err = TransferService::add_transfer(&mut data, &request, &clock()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(data.transactions.is_empty());
    }

    #[test]
    fn unknown_destination_is_rejected_without_writes() {
        let (mut data, checking, _) = profile();
        let request = TransferRequest::new(&checking, "ghost", 10.0, date());
        let err = TransferService::add_transfer(&mut data, &request, &clock()).unwrap_err();
        assert!(matches!(err, CoreError::AccountNotFound(ref id) if id == "ghost"));
        assert!(data.transactions.is_empty());
    }

    #[test]
    fn sibling_lookup_follows_suffixes() {
        let (mut data, checking, savings) = profile();
        let request = TransferRequest::new(&checking, &savings, 15.0, date());
        let legs = TransferService::add_transfer(&mut data, &request, &clock()).unwrap();
        let sibling = TransferService::find_sibling_leg(&data.transactions, &legs.from).unwrap();
        assert_eq!(sibling.id, legs.to.id);
        let back = TransferService::find_sibling_leg(&data.transactions, &legs.to).unwrap();
        assert_eq!(back.id, legs.from.id);
    }

    #[test]
    fn cross_profile_legs_name_the_other_profile() {
        let mut bundle = ProfileBundle::default();
        let wallet = Account::new("Wallet", AccountKind::Cash);
        let pot = Account::new("House Pot", AccountKind::Bank);
        let (wallet_id, pot_id) = (wallet.id.clone(), pot.id.clone());
        bundle.personal.accounts.push(wallet);
        bundle.home.accounts.push(pot);

        let request = TransferRequest::new(&wallet_id, &pot_id, 120.0, date());
        let legs = TransferService::add_inter_dashboard_transfer(
            &mut bundle,
            &request,
            ProfileKind::Personal,
            ProfileKind::Home,
            &clock(),
        )
        .unwrap();

        assert_eq!(legs.from.description, "Transfer to Home");
        assert_eq!(legs.to.description, "Transfer from Personal");
        assert_eq!(bundle.personal.transactions.len(), 1);
        assert_eq!(bundle.home.transactions.len(), 1);
        assert_eq!(
            LedgerService::account_balance(&bundle.home.transactions, &pot_id),
            120.0
        );
    }

    #[test]
    fn cross_profile_failure_is_distinguishable() {
        let mut bundle = ProfileBundle::default();
        let wallet = Account::new("Wallet", AccountKind::Cash);
        let wallet_id = wallet.id.clone();
        bundle.personal.accounts.push(wallet);

        let request = TransferRequest::new(&wallet_id, "missing", 5.0, date());
        let err = TransferService::add_inter_dashboard_transfer(
            &mut bundle,
            &request,
            ProfileKind::Personal,
            ProfileKind::Home,
            &clock(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::CrossProfileTransfer(_)));
        assert!(bundle.personal.transactions.is_empty());
        assert!(bundle.home.transactions.is_empty());
    }
}
