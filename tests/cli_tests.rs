use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn erpledger_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("erpledger"));
    cmd.env_remove("RUST_LOG")
        .env_remove("ERPLEDGER_API_KEY")
        .env_remove("ERPLEDGER_API_SECRET");
    cmd
}

/// Initialize a config directory and return its path
fn setup_config(temp_dir: &TempDir) -> PathBuf {
    let config_path = temp_dir.path().join("erpledger-config");
    erpledger_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success();
    config_path
}

fn write_json(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

const ACCOUNTS: &str = r#"[
    {"name": "Caja - E", "account_name": "Caja", "account_number": "1.1.1", "parent_account": "Disponibilidades - E", "is_group": 0, "account_type": "Cash"},
    {"name": "Activo - E", "account_name": "Activo", "account_number": "1", "is_group": 1, "root_type": "Asset"},
    {"name": "Disponibilidades - E", "account_name": "Disponibilidades", "account_number": "1.1", "parent_account": "Activo - E", "is_group": 1},
    {"name": "Pasivo - E", "account_name": "Pasivo", "account_number": "2", "is_group": 1, "root_type": "Liability"}
]"#;

const MOVEMENTS: &str = r#"{"success": true, "data": [
    {"name": "GL-1", "posting_date": "2023-12-31", "debit": 99, "voucher_type": "Journal Entry", "voucher_no": "JV-OLD"},
    {"name": "GL-2", "posting_date": "2024-01-05", "debit": 1000, "voucher_type": "Sales Invoice", "voucher_no": "FC-0001", "remarks": "Venta contado"},
    {"name": "GL-3", "posting_date": "2024-02-10", "credit": 250, "voucher_type": "Payment Entry", "voucher_no": "PAY-0001"},
    {"name": "GL-4", "posting_date": "2024-03-01", "debit": 500, "voucher_type": "Journal Entry", "voucher_no": "JV-DRAFT", "docstatus": 0}
]}"#;

const INVOICES: &str = r#"[
    {"name": "A", "posting_date": "2024-04-01", "outstanding_amount": 100},
    {"name": "B", "posting_date": "2024-04-15", "outstanding_amount": 50},
    {"name": "C", "posting_date": "2024-04-20", "outstanding_amount": 70, "custom_conciliation_id": "CONC-PAY-20240101-OLD001"}
]"#;

#[test]
fn test_help() {
    erpledger_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("payment allocation client"));
}

#[test]
fn test_version() {
    erpledger_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("erpledger"));
}

#[test]
fn test_init_creates_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("erpledger-config");

    erpledger_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized erpledger config"));

    let content = fs::read_to_string(config_path.join("config.toml")).unwrap();
    assert!(content.contains("[server]"));
    assert!(content.contains("page_size = 12"));
}

#[test]
fn test_init_fails_if_exists() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);

    erpledger_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_status_without_init() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nonexistent");

    erpledger_cmd()
        .args(["-C", config_path.to_str().unwrap(), "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_status_after_init() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);

    erpledger_cmd()
        .args(["-C", config_path.to_str().unwrap(), "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("erpledger Status"))
        .stdout(predicate::str::contains("http://localhost:8000"))
        .stdout(predicate::str::contains("Credentials:      missing"))
        .stdout(predicate::str::contains("Ledger page size: 12"));
}

#[test]
fn test_credentials_from_environment() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);

    erpledger_cmd()
        .env("ERPLEDGER_API_KEY", "key")
        .env("ERPLEDGER_API_SECRET", "secret")
        .args(["-C", config_path.to_str().unwrap(), "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Credentials:      configured"));
}

#[test]
fn test_accounts_from_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);
    let snapshot = write_json(temp_dir.path(), "accounts.json", ACCOUNTS);

    erpledger_cmd()
        .args([
            "-C",
            config_path.to_str().unwrap(),
            "accounts",
            "--snapshot",
            snapshot.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Disponibilidades"))
        .stdout(predicate::str::contains("Total: 4 accounts in 2 root(s)"));
}

#[test]
fn test_accounts_bad_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);
    let snapshot = write_json(temp_dir.path(), "accounts.json", "not json");

    erpledger_cmd()
        .args([
            "-C",
            config_path.to_str().unwrap(),
            "accounts",
            "--snapshot",
            snapshot.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read snapshot"));
}

#[test]
fn test_ledger_snapshot_with_period() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);
    let snapshot = write_json(temp_dir.path(), "movements.json", MOVEMENTS);

    erpledger_cmd()
        .args([
            "-C",
            config_path.to_str().unwrap(),
            "ledger",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--period",
            "2024-01-01..2024-12-31",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("JV-OLD").not())
        .stdout(predicate::str::contains("Page 1/1 (3 movements)"))
        .stdout(predicate::str::contains("$1,000.00"))
        .stdout(predicate::str::contains("Balance: $750.00"))
        .stdout(predicate::str::contains("not included in the balance"));
}

#[test]
fn test_ledger_snapshot_audit_counts_drafts() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);
    let snapshot = write_json(temp_dir.path(), "movements.json", MOVEMENTS);

    erpledger_cmd()
        .args([
            "-C",
            config_path.to_str().unwrap(),
            "ledger",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--audit",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("JV-OLD"))
        .stdout(predicate::str::contains("Page 1/1 (4 movements)"))
        .stdout(predicate::str::contains("Balance: $1,349.00"));
}

#[test]
fn test_ledger_search_filters_rows() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);
    let snapshot = write_json(temp_dir.path(), "movements.json", MOVEMENTS);

    erpledger_cmd()
        .args([
            "-C",
            config_path.to_str().unwrap(),
            "ledger",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "-s",
            "VENTA",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("FC-0001"))
        .stdout(predicate::str::contains("(1 movements)"));
}

#[test]
fn test_ledger_snapshot_rejects_fiscal_year() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);
    let snapshot = write_json(temp_dir.path(), "movements.json", MOVEMENTS);

    erpledger_cmd()
        .args([
            "-C",
            config_path.to_str().unwrap(),
            "ledger",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--fiscal-year",
            "2024",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("use --period with --snapshot"));
}

#[test]
fn test_ledger_invalid_period() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);
    let snapshot = write_json(temp_dir.path(), "movements.json", MOVEMENTS);

    erpledger_cmd()
        .args([
            "-C",
            config_path.to_str().unwrap(),
            "ledger",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--period",
            "2024-12-31..2024-01-01",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("end is before start"));
}

#[test]
fn test_payment_allocate_preview() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);
    let invoices = write_json(temp_dir.path(), "invoices.json", INVOICES);

    erpledger_cmd()
        .args([
            "-C",
            config_path.to_str().unwrap(),
            "payment",
            "allocate",
            "--party-type",
            "customer",
            "--party",
            "ACME S.A.",
            "--invoices",
            invoices.to_str().unwrap(),
            "-s",
            "A",
            "-s",
            "B",
            "-m",
            "Caja - E:120",
            "--date",
            "2024-05-10",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("$100.00"))
        .stdout(predicate::str::contains("$20.00"))
        .stdout(predicate::str::contains("$30.00"))
        .stdout(predicate::str::contains("Applied:         $120.00"))
        .stdout(predicate::str::contains("CONC-PAY-20240510-"))
        .stdout(predicate::str::contains("(auto)"));
}

#[test]
fn test_payment_allocate_existing_group() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);
    let invoices = write_json(temp_dir.path(), "invoices.json", INVOICES);

    erpledger_cmd()
        .args([
            "-C",
            config_path.to_str().unwrap(),
            "payment",
            "allocate",
            "--party-type",
            "customer",
            "--party",
            "ACME S.A.",
            "--invoices",
            invoices.to_str().unwrap(),
            "--group",
            "CONC-PAY-20240101-OLD001",
            "-w",
            "IIBB:70",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Conciliation:    CONC-PAY-20240101-OLD001 (group)",
        ))
        .stdout(predicate::str::contains("Withholdings:    $70.00"));
}

#[test]
fn test_payment_allocate_unknown_invoice() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);
    let invoices = write_json(temp_dir.path(), "invoices.json", INVOICES);

    erpledger_cmd()
        .args([
            "-C",
            config_path.to_str().unwrap(),
            "payment",
            "allocate",
            "--party-type",
            "customer",
            "--party",
            "ACME S.A.",
            "--invoices",
            invoices.to_str().unwrap(),
            "-s",
            "Z",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not among the open invoices"));
}

#[test]
fn test_payment_allocate_bad_method() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);
    let invoices = write_json(temp_dir.path(), "invoices.json", INVOICES);

    erpledger_cmd()
        .args([
            "-C",
            config_path.to_str().unwrap(),
            "payment",
            "allocate",
            "--party-type",
            "customer",
            "--party",
            "ACME S.A.",
            "--invoices",
            invoices.to_str().unwrap(),
            "-m",
            "Caja - E:lots",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid payment amount 'lots'"));
}

#[test]
fn test_payment_allocate_bad_party_type() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);

    erpledger_cmd()
        .args([
            "-C",
            config_path.to_str().unwrap(),
            "payment",
            "allocate",
            "--party-type",
            "employee",
            "--party",
            "Someone",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("use customer or supplier"));
}

#[test]
fn test_unknown_catalog() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);

    erpledger_cmd()
        .args(["-C", config_path.to_str().unwrap(), "catalog", "planets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("use one of"));
}

#[test]
fn test_unknown_voucher_type() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);

    erpledger_cmd()
        .args([
            "-C",
            config_path.to_str().unwrap(),
            "voucher",
            "Timesheet",
            "TS-0001",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown voucher type 'Timesheet'"));
}

#[test]
fn test_ledger_status_needs_the_server() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);
    let snapshot = write_json(temp_dir.path(), "movements.json", MOVEMENTS);

    erpledger_cmd()
        .args([
            "-C",
            config_path.to_str().unwrap(),
            "ledger",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--status",
            "draft",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_ledger_unknown_status() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);

    erpledger_cmd()
        .args([
            "-C",
            config_path.to_str().unwrap(),
            "ledger",
            "Caja - E",
            "--status",
            "posted",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("use confirmed, draft or cancelled"));
}

#[test]
fn test_company_requires_a_name() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);

    erpledger_cmd()
        .args(["-C", config_path.to_str().unwrap(), "company"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No company given"));
}
