use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

fn cli(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("homefin_cli").unwrap();
    cmd.env("HOMEFIN_HOME", home.path())
        .env("HOMEFIN_USER", "alex")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn script_mode_records_and_reports() {
    let home = TempDir::new().unwrap();
    let input = "\
account add Checking bank 1200
account add \"Rewards Card\" credit
txn add \"Rewards Card\" 2024-03-02 -80 Groceries Food Groceries
transfer Checking \"Rewards Card\" 80 2024-03-10 \"card payment\"
balance Checking
balance \"Rewards Card\"
networth
exit
";
    cli(&home)
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Created account `Checking` (Bank)."))
        .stdout(contains("Checking: 1120.00 USD"))
        .stdout(contains("Rewards Card: 0.00 USD"))
        .stdout(contains("Net worth:   1120.00 USD"));

    let bundle = home.path().join("bundles").join("alex.json");
    let json = std::fs::read_to_string(bundle).unwrap();
    assert!(json.contains("\"Rewards Card\""));
    assert!(json.contains("\"isTransfer\": true"));
}

#[test]
fn state_survives_between_runs() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .write_stdin("account add Wallet cash 40\nprofile home\ncurrency gbp\n")
        .assert()
        .success();

    cli(&home)
        .write_stdin("profile\ncurrency\nprofile personal\nbalance Wallet\n")
        .assert()
        .success()
        .stdout(contains("Active profile: Home"))
        .stdout(contains("Currency: GBP"))
        .stdout(contains("Wallet: 40.00 GBP"));

    let config =
        std::fs::read_to_string(home.path().join("config").join("config.json")).unwrap();
    assert!(config.contains("alex"));
}

#[test]
fn failing_commands_set_the_exit_status() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .write_stdin("balanse Checking\nbalance Checking\n")
        .assert()
        .failure()
        .code(1)
        .stdout(contains("did you mean `balance`?"))
        .stdout(contains("no account named `Checking`"))
        .stderr(contains("2 of 2 command(s) failed"));
}

#[test]
fn help_and_version() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .write_stdin("help\nhelp transfer\nversion\n")
        .assert()
        .success()
        .stdout(contains("=== Available commands ==="))
        .stdout(contains("Usage: transfer <from> <to> <amount> [date] [notes]"))
        .stdout(contains(concat!("homefin ", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn backups_are_listed_after_creation() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .write_stdin("account add Checking bank\nbackup before import\nbackups\n")
        .assert()
        .success()
        .stdout(contains("Backup created: "))
        .stdout(contains("=== Backups for alex ==="));
}
