use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use homefin_core::{Clock, FixedClock, LedgerService};
use homefin_domain::ProfileKind;
use tempfile::{tempdir, TempDir};

use super::{run_script, RunSummary};
use crate::session::Session;

fn clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::at(Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap()))
}

fn session(dir: &TempDir) -> Session {
    Session::open(dir.path(), Some("tester"), clock()).unwrap()
}

fn run(session: Session, script: &str) -> (Session, RunSummary, String) {
    colored::control::set_override(false);
    let mut out = Vec::new();
    let (session, summary) = run_script(session, script.as_bytes(), &mut out).unwrap();
    (session, summary, String::from_utf8(out).unwrap())
}

fn balance(session: &Session, name: &str) -> f64 {
    let data = session.store().active();
    let account = data
        .accounts
        .iter()
        .find(|account| account.name == name)
        .unwrap();
    LedgerService::account_balance(&data.transactions, &account.id)
}

#[test]
fn accounts_transactions_and_balances() {
    let dir = tempdir().unwrap();
    let script = r#"
        # comments and blank lines are skipped
        account add Checking bank 1000
        account add "Visa Card" credit
        txn add checking 2024-05-02 -45.5 "Corner shop" Food Groceries
        txn add "visa card" 2024-05-03 -120 "Concert tickets" Entertainment
        balance Checking
        networth
    "#;
    let (session, summary, output) = run(session(&dir), script);

    assert_eq!(summary.failed, 0, "{output}");
    assert_eq!(summary.executed, 6);
    assert!(output.contains("Created account `Checking` (Bank)."));
    assert!(output.contains("Checking: 954.50 USD"));
    assert!(output.contains("Assets:      954.50 USD"));
    assert!(output.contains("Liabilities: 120.00 USD"));
    assert!(output.contains("Net worth:   834.50 USD"));
    assert_eq!(balance(&session, "Visa Card"), -120.0);

    let food = session
        .store()
        .active()
        .categories
        .iter()
        .find(|category| category.name == "Food")
        .unwrap()
        .id
        .clone();
    let shop = session
        .store()
        .active()
        .transactions
        .iter()
        .find(|txn| txn.description == "Corner shop")
        .unwrap();
    assert_eq!(shop.category_id.as_deref(), Some(food.as_str()));
    assert!(shop.sub_category_id.is_some());
}

#[test]
fn failures_are_reported_and_the_run_continues() {
    let dir = tempdir().unwrap();
    let script = "\
        frobnicate\n\
        account add Savings spaceship\n\
        txn add Nowhere 2024-05-01 10 Lost\n\
        account add Savings bank\n\
        account add savings cash\n\
        balance Savings\n";
    let (_, summary, output) = run(session(&dir), script);

    assert_eq!(summary.executed, 6);
    assert_eq!(summary.failed, 4, "{output}");
    assert!(output.contains("ERROR: [x] unknown command `frobnicate`"));
    assert!(output.contains("unknown account type `spaceship`"));
    assert!(output.contains("no account named `Nowhere`"));
    assert!(output.contains("Savings: 0.00 USD"));
}

#[test]
fn transfers_stay_balanced_within_and_across_profiles() {
    let dir = tempdir().unwrap();
    let script = "\
        account add Checking bank 500\n\
        account add Savings bank\n\
        transfer Checking Savings 200 2024-05-10 rainy day\n\
        profile home\n\
        account add Household bank\n\
        profile personal\n\
        transfer-profile Checking Household 50 2024-05-11\n\
        networth\n";
    let (session, summary, output) = run(session(&dir), script);

    assert_eq!(summary.failed, 0, "{output}");
    assert!(output.contains("Transferred 200.00 USD from `Checking` to `Savings`."));
    assert!(output.contains("in the Home profile."));
    assert_eq!(balance(&session, "Checking"), 250.0);
    assert_eq!(balance(&session, "Savings"), 200.0);

    let home = session.store().profile(ProfileKind::Home);
    assert_eq!(LedgerService::net_worth(&home.accounts, &home.transactions).net_worth, 50.0);
    assert!(home.transactions.iter().all(|txn| txn.is_transfer));
    assert!(output.contains("Net worth:   450.00 USD"));
}

#[test]
fn trash_restore_and_purge_cycle() {
    let dir = tempdir().unwrap();
    let (session, summary, output) = run(
        session(&dir),
        "account add Cash cash 20\ntxn add Cash 2024-05-04 -5 Coffee\n",
    );
    assert_eq!(summary.failed, 0, "{output}");
    let coffee = session
        .store()
        .active()
        .transactions
        .iter()
        .find(|txn| txn.description == "Coffee")
        .unwrap()
        .id
        .clone();
    let prefix = &coffee[..8];

    let script = format!(
        "txn trash {prefix}\nbalance Cash\ntrash list\ntxn restore {prefix}\nbalance Cash\n"
    );
    let (session, summary, output) = run(session, &script);
    assert_eq!(summary.failed, 0, "{output}");
    assert!(output.contains("Moved 1 transaction(s) to trash."));
    assert!(output.contains("Cash: 20.00 USD"));
    assert!(output.contains("Coffee  deleted 2024-05-20 12:00"));
    assert!(output.contains("Cash: 15.00 USD"));

    let (session, summary, output) = run(
        session,
        "account trash Cash\naccount purge Cash\ntrash list\n",
    );
    assert_eq!(summary.failed, 0, "{output}");
    assert!(output.contains("Purged account `Cash` and 2 transaction(s)."));
    assert!(output.contains("Trash is empty."));
    assert!(session.store().active().transactions.is_empty());
}

#[test]
fn categories_and_budgets() {
    let dir = tempdir().unwrap();
    let script = "\
        category add Pets\n\
        category sub Pets Vet\n\
        category up Pets\n\
        account add Checking bank 1000\n\
        budget add Living 300 monthly Food=200 Pets=100\n\
        txn add Checking 2024-05-05 -80 Vet Pets Vet\n\
        txn add Checking 2024-05-06 -150 Groceries Food\n\
        txn add Checking 2024-04-06 -999 \"Last month\" Food\n\
        budget list 2024-05-20\n\
        budget show Living 2024-05-20\n\
        category delete Pets\n\
        budget show Living 2024-05-20\n";
    let (session, summary, output) = run(session(&dir), script);

    assert_eq!(summary.failed, 0, "{output}");
    assert!(output.contains("spent 230.00 USD of 300.00 USD (77%)"));
    assert!(output.contains("Pets             80.00 USD of 100.00 USD allocated"));
    let budget = &session.store().active().budgets[0];
    assert_eq!(budget.categories.len(), 1);
    assert!(session
        .store()
        .active()
        .transactions
        .iter()
        .find(|txn| txn.description == "Vet")
        .unwrap()
        .category_id
        .is_none());

    let names: Vec<&str> = session
        .store()
        .active()
        .categories
        .iter()
        .map(|category| category.name.as_str())
        .collect();
    assert!(!names.contains(&"Pets"));
}

#[test]
fn import_and_export_through_files() {
    let dir = tempdir().unwrap();
    let rows = dir.path().join("rows.json");
    std::fs::write(
        &rows,
        r#"[
            {"date": "2024-05-01", "description": "Salary", "creditAmount": 2500, "transactionType": "Income", "category": "Income", "subcategory": "Salary"},
            {"date": "15/05/2024", "description": "Fuel", "debitAmount": 60, "transactionType": "Expense", "category": "Transport"},
            {"date": "not a date", "description": "Broken", "debitAmount": 1, "transactionType": "Expense"}
        ]"#,
    )
    .unwrap();
    let export = dir.path().join("export.json");
    let script = format!(
        "account add Checking bank\nimport Checking \"{}\"\nexport \"{}\" Checking\n",
        rows.display(),
        export.display()
    );
    let (session, summary, output) = run(session(&dir), &script);

    assert_eq!(summary.failed, 0, "{output}");
    assert!(output.contains("Imported 2 row(s); 1 rejected."));
    assert!(output.contains("WARNING: [!] line 3:"));
    assert_eq!(balance(&session, "Checking"), 2440.0);

    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&export).unwrap()).unwrap();
    let exported = exported.as_array().unwrap();
    assert_eq!(exported.len(), 2);
    assert_eq!(exported[1]["description"], "Fuel");
    assert_eq!(exported[1]["category"], "Transport");
}

#[test]
fn summary_reports_months_and_exit_stops_the_run() {
    let dir = tempdir().unwrap();
    let script = "\
        account add Checking bank\n\
        txn add Checking 2024-04-10 1000 Pay Income\n\
        txn add Checking 2024-05-10 -250 Rent Housing\n\
        summary 2 2024-05-20\n\
        exit\n\
        account add Never bank\n";
    let (session, summary, output) = run(session(&dir), script);

    assert_eq!(summary.failed, 0, "{output}");
    assert_eq!(summary.executed, 5);
    assert!(output.contains("2024-04  income    1000.00 USD"));
    assert!(output.contains("expenses     250.00 USD"));
    assert!(session.store().active().accounts.iter().all(|a| a.name != "Never"));
}

#[test]
fn settings_persist_between_sessions() {
    let dir = tempdir().unwrap();
    let (_, summary, output) = run(
        session(&dir),
        "currency eur\ntheme dark\nwidgets trend 12\nwidgets trend 30\n",
    );
    assert_eq!(summary.failed, 1, "{output}");
    assert!(output.contains("Currency set to EUR."));
    assert!(output.contains("trend months must be between 1 and 24"));

    let reopened = session(&dir);
    assert_eq!(reopened.store().bundle().currency, "EUR");
    assert_eq!(reopened.store().active().widget_settings.trend_months, 12);
}

#[test]
fn expired_trash_is_gone_after_reopening() {
    let dir = tempdir().unwrap();
    let (session, _, _) = run(
        session(&dir),
        "account add Cash cash 10\ntxn add Cash 2024-05-01 -3 Gum\n",
    );
    let id = session
        .store()
        .active()
        .transactions
        .iter()
        .find(|txn| txn.description == "Gum")
        .unwrap()
        .id
        .clone();
    let (_, _, output) = run(session, &format!("txn trash {id}\n"));
    assert!(output.contains("Moved 1 transaction(s) to trash."));

    let later: Arc<dyn Clock> = Arc::new(FixedClock::at(
        Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap() + Duration::days(8),
    ));
    let reopened = Session::open(dir.path(), Some("tester"), later).unwrap();
    assert!(reopened.store().active().trash.is_empty());
    assert_eq!(reopened.store().load_report().personal.transactions_purged, 1);
    let remaining = &reopened.store().active().transactions;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].date, NaiveDate::from_ymd_opt(2024, 5, 20).unwrap());
}

#[test]
fn config_command_updates_and_restores_preferences() {
    let dir = tempdir().unwrap();
    let script = "\
        config set retention 8\n\
        config set dashboard home\n\
        config backup pre change\n\
        config set currency euro\n\
        config set retention 3\n\
        config backups\n\
        config show\n";
    let (session, summary, output) = run(session(&dir), script);

    assert_eq!(summary.failed, 1, "{output}");
    assert!(output.contains("Config `retention` updated."));
    assert!(output.contains("currency `EURO` is not a three-letter code"));
    assert!(output.contains("=== Configuration backups ==="));
    assert!(output.contains("retention          3"));
    assert_eq!(session.config().currency, "USD");

    let backup = session.config_manager().list_backups().unwrap().remove(0).name;
    assert!(backup.ends_with("_pre-change.json"));
    let (session, summary, output) = run(session, &format!("config restore {backup}\n"));
    assert_eq!(summary.failed, 0, "{output}");
    assert_eq!(session.config().backup_retention, 8);
    assert_eq!(
        session.config().default_dashboard,
        homefin_config::DefaultDashboard::Home
    );
}

#[test]
fn rollback_restores_a_named_backup() {
    let dir = tempdir().unwrap();
    let (session, summary, output) = run(
        session(&dir),
        "account add Checking bank 100\nbackup clean slate\naccount add Savings bank 50\n",
    );
    assert_eq!(summary.failed, 0, "{output}");
    let id = session
        .storage()
        .list_backup_metadata("tester")
        .unwrap()
        .into_iter()
        .map(|meta| meta.name)
        .find(|name| name.ends_with("_clean-slate.json"))
        .unwrap();

    let (session, summary, output) = run(
        session,
        &format!("rollback {id}\nusers\nrollback missing.json\nbackups delete {id}\n"),
    );
    assert_eq!(summary.failed, 1, "{output}");
    assert!(output.contains(&format!("Restored bundle from {id}.")));
    assert!(output.contains("no backup named `missing.json`"));
    assert!(output.contains("tester           1 account(s), 1 transaction(s)"));
    let names: Vec<&str> = session
        .store()
        .active()
        .accounts
        .iter()
        .map(|account| account.name.as_str())
        .collect();
    assert_eq!(names, ["Checking"]);
    assert!(session
        .storage()
        .list_backup_metadata("tester")
        .unwrap()
        .iter()
        .all(|meta| meta.name != id));
}
