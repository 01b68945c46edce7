use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use super::record::{Account, AccountBalance};

/// An account with its children attached
#[derive(Debug, Clone, PartialEq)]
pub struct AccountNode {
    pub account: Account,
    /// Depth from the root (roots are level 0)
    pub level: usize,
    pub children: Vec<AccountNode>,
}

impl AccountNode {
    /// Own balance plus the recursive sum of every descendant.
    ///
    /// `balances` is keyed by account `name`; accounts without an entry
    /// contribute zero.
    pub fn totals(&self, balances: &HashMap<String, AccountBalance>) -> AccountBalance {
        let mut total = balances
            .get(&self.account.name)
            .copied()
            .unwrap_or_default();
        for child in &self.children {
            total += child.totals(balances);
        }
        total
    }

    /// Number of nodes in this subtree, itself included
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(AccountNode::size).sum::<usize>()
    }
}

/// Build the chart-of-accounts forest from flat records.
///
/// Records link through `parent_account` → `name`. A record whose parent is
/// empty or unknown becomes a root. Roots are ordered by account number,
/// children alphabetically. Duplicate names keep the first record.
pub fn build_account_tree(accounts: &[Account]) -> Vec<AccountNode> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(accounts.len());
    let mut unique: Vec<&Account> = Vec::with_capacity(accounts.len());
    for account in accounts {
        if index.contains_key(account.name.as_str()) {
            debug!(account = %account.name, "duplicate account record ignored");
            continue;
        }
        index.insert(account.name.as_str(), unique.len());
        unique.push(account);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); unique.len()];
    let mut roots: Vec<usize> = Vec::new();
    for (i, account) in unique.iter().enumerate() {
        match account.parent().and_then(|p| index.get(p)) {
            Some(&parent) => children[parent].push(i),
            None => roots.push(i),
        }
    }

    let mut forest: Vec<AccountNode> = roots
        .into_iter()
        .map(|i| attach(i, 0, &unique, &children))
        .collect();

    forest.sort_by(|a, b| {
        compare_account_numbers(
            a.account.account_number.as_deref(),
            b.account.account_number.as_deref(),
        )
        .then_with(|| compare_names(a.account.display_name(), b.account.display_name()))
    });
    forest
}

fn attach(i: usize, level: usize, accounts: &[&Account], children: &[Vec<usize>]) -> AccountNode {
    let mut kids: Vec<AccountNode> = children[i]
        .iter()
        .map(|&c| attach(c, level + 1, accounts, children))
        .collect();
    kids.sort_by(|a, b| compare_names(a.account.display_name(), b.account.display_name()));

    AccountNode {
        account: accounts[i].clone(),
        level,
        children: kids,
    }
}

/// Pre-order walk of the forest, the order rows are rendered in
pub fn flatten_tree(forest: &[AccountNode]) -> Vec<&AccountNode> {
    let mut out = Vec::new();
    for node in forest {
        push_preorder(node, &mut out);
    }
    out
}

fn push_preorder<'a>(node: &'a AccountNode, out: &mut Vec<&'a AccountNode>) {
    out.push(node);
    for child in &node.children {
        push_preorder(child, out);
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Segment<'a> {
    Number(u64),
    Text(&'a str),
}

fn segments(number: &str) -> Vec<Segment<'_>> {
    number
        .split(['.', '-', '/'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<u64>() {
            Ok(n) => Segment::Number(n),
            Err(_) => Segment::Text(s),
        })
        .collect()
}

/// Compare account numbers segment by segment (`1.2` < `1.2.1` < `1.10`).
///
/// Segments are split on `.`, `-` and `/`. Numeric segments compare as
/// numbers and sort before textual ones. A shorter number that is a prefix
/// of a longer one comes first; accounts without a number sort last.
pub fn compare_account_numbers(a: Option<&str>, b: Option<&str>) -> Ordering {
    let a = a.map(str::trim).filter(|s| !s.is_empty());
    let b = b.map(str::trim).filter(|s| !s.is_empty());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => segments(a).cmp(&segments(b)),
    }
}

/// Case-insensitive name order with the raw string as tie-break
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
