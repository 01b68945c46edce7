use std::cmp::Ordering;
use std::collections::HashMap;

use erpledger::accounts::{
    balances_by_account, build_account_tree, compare_account_numbers, flatten_tree, Account,
    AccountBalance, AccountNode, TrialBalanceRow,
};

fn account(name: &str, number: Option<&str>, parent: Option<&str>) -> Account {
    Account {
        name: name.to_string(),
        account_name: Some(name.to_string()),
        account_number: number.map(str::to_string),
        parent_account: parent.map(str::to_string),
        is_group: false,
        root_type: None,
        account_type: None,
        account_currency: None,
    }
}

fn chart() -> Vec<Account> {
    vec![
        account("Caja", Some("1.1.1"), Some("Disponibilidades")),
        account("Pasivo", Some("2"), None),
        account("Banco Nación", Some("1.1.2"), Some("Disponibilidades")),
        account("Activo", Some("1"), None),
        account("Disponibilidades", Some("1.1"), Some("Activo")),
        account("Proveedores", Some("2.1"), Some("Pasivo")),
        account("Huérfana", Some("9"), Some("No existe")),
    ]
}

fn assert_levels(node: &AccountNode, depth: usize) {
    assert_eq!(node.level, depth, "level of {}", node.account.name);
    for child in &node.children {
        assert_eq!(child.account.parent_account.as_deref(), Some(node.account.name.as_str()));
        assert_levels(child, depth + 1);
    }
}

#[test]
fn test_account_numbers_compare_per_segment() {
    assert_eq!(compare_account_numbers(Some("1.2"), Some("1.2.1")), Ordering::Less);
    assert_eq!(compare_account_numbers(Some("1.2.1"), Some("1.10")), Ordering::Less);
    assert_eq!(compare_account_numbers(Some("1.2"), Some("1.10")), Ordering::Less);
    assert_eq!(compare_account_numbers(Some("1-2"), Some("1/2")), Ordering::Equal);
    assert_eq!(compare_account_numbers(None, Some("9")), Ordering::Greater);
    assert_eq!(compare_account_numbers(Some(""), Some("9")), Ordering::Greater);
    assert_eq!(compare_account_numbers(None, None), Ordering::Equal);
}

#[test]
fn test_roots_sorted_numerically_not_lexicographically() {
    let accounts = vec![
        account("Diez", Some("1.10"), None),
        account("Dos punto uno", Some("1.2.1"), None),
        account("Dos", Some("1.2"), None),
        account("Sin número", None, None),
    ];

    let forest = build_account_tree(&accounts);
    let names: Vec<&str> = forest.iter().map(|n| n.account.name.as_str()).collect();

    assert_eq!(names, ["Dos", "Dos punto uno", "Diez", "Sin número"]);
}

#[test]
fn test_forest_levels_and_every_account_once() {
    let accounts = chart();
    let forest = build_account_tree(&accounts);

    for root in &forest {
        assert_levels(root, 0);
    }

    let flat = flatten_tree(&forest);
    assert_eq!(flat.len(), accounts.len());
    for account in &accounts {
        let count = flat.iter().filter(|n| n.account.name == account.name).count();
        assert_eq!(count, 1, "{} appears {} times", account.name, count);
    }
}

#[test]
fn test_missing_parent_becomes_root() {
    let forest = build_account_tree(&chart());
    let roots: Vec<&str> = forest.iter().map(|n| n.account.name.as_str()).collect();

    assert_eq!(roots, ["Activo", "Pasivo", "Huérfana"]);
}

#[test]
fn test_children_sorted_alphabetically() {
    let forest = build_account_tree(&chart());
    let disponibilidades = &forest[0].children[0];

    let children: Vec<&str> = disponibilidades
        .children
        .iter()
        .map(|n| n.account.name.as_str())
        .collect();
    assert_eq!(children, ["Banco Nación", "Caja"]);
}

#[test]
fn test_duplicate_names_keep_first_record() {
    let mut accounts = chart();
    accounts.push(account("Caja", Some("7"), None));

    let forest = build_account_tree(&accounts);
    let flat = flatten_tree(&forest);

    assert_eq!(flat.len(), accounts.len() - 1);
    let caja = flat.iter().find(|n| n.account.name == "Caja").unwrap();
    assert_eq!(caja.account.account_number.as_deref(), Some("1.1.1"));
    assert_eq!(caja.level, 2);
}

#[test]
fn test_totals_aggregate_children() {
    let forest = build_account_tree(&chart());
    let mut balances = HashMap::new();
    balances.insert(
        "Caja".to_string(),
        AccountBalance {
            debit: 100.0,
            credit: 40.0,
            balance: 60.0,
        },
    );
    balances.insert(
        "Banco Nación".to_string(),
        AccountBalance {
            debit: 500.0,
            credit: 0.0,
            balance: 500.0,
        },
    );
    balances.insert(
        "Disponibilidades".to_string(),
        AccountBalance {
            debit: 1.0,
            credit: 0.0,
            balance: 1.0,
        },
    );

    let activo = &forest[0];
    let totals = activo.totals(&balances);

    assert_eq!(totals.debit, 601.0);
    assert_eq!(totals.credit, 40.0);
    assert_eq!(totals.balance, 561.0);
    assert_eq!(forest[1].totals(&balances), AccountBalance::default());
    assert_eq!(activo.size(), 4);
}

#[test]
fn test_balances_by_account_sums_repeated_rows() {
    let rows: Vec<TrialBalanceRow> = serde_json::from_str(
        r#"[
            {"account": "Caja", "debit": 10, "credit": 0, "balance": 10},
            {"account": "Caja", "debit": 5, "credit": 2, "balance": 3},
            {"account": "Banco", "credit": 7}
        ]"#,
    )
    .unwrap();

    let map = balances_by_account(&rows);

    assert_eq!(map["Caja"].debit, 15.0);
    assert_eq!(map["Caja"].balance, 13.0);
    assert_eq!(map["Banco"].credit, 7.0);
    assert_eq!(map["Banco"].debit, 0.0);
}

#[test]
fn test_account_flags_accept_numbers() {
    let accounts: Vec<Account> = serde_json::from_str(
        r#"[
            {"name": "Activo - E", "account_name": "Activo", "is_group": 1, "parent_account": ""},
            {"name": "Caja - E", "is_group": 0, "parent_account": "Activo - E"},
            {"name": "Banco - E", "is_group": true, "parent_account": null}
        ]"#,
    )
    .unwrap();

    assert!(accounts[0].is_group);
    assert!(!accounts[1].is_group);
    assert!(accounts[2].is_group);
    assert_eq!(accounts[1].display_name(), "Caja - E");

    let forest = build_account_tree(&accounts);
    assert_eq!(forest.len(), 2);
    let activo = forest.iter().find(|n| n.account.name == "Activo - E").unwrap();
    assert_eq!(activo.children.len(), 1);
}
