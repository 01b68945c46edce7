mod record;
mod tree;

pub use record::{Account, AccountBalance, TrialBalanceRow};
pub use tree::{build_account_tree, compare_account_numbers, flatten_tree, AccountNode};

pub(crate) use record::flag;

use std::collections::HashMap;

/// Index trial balance rows by account name; repeated rows are summed
pub fn balances_by_account(rows: &[TrialBalanceRow]) -> HashMap<String, AccountBalance> {
    let mut map: HashMap<String, AccountBalance> = HashMap::with_capacity(rows.len());
    for row in rows {
        *map.entry(row.account.clone()).or_default() += row.amounts;
    }
    map
}
