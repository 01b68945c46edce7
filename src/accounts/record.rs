use serde::{Deserialize, Deserializer, Serialize};

/// A chart-of-accounts record as the server returns it
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Account {
    pub name: String,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub parent_account: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub is_group: bool,
    #[serde(default)]
    pub root_type: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub account_currency: Option<String>,
}

impl Account {
    /// Human label: `account_name`, falling back to the document name
    pub fn display_name(&self) -> &str {
        self.account_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.name)
    }

    pub(crate) fn parent(&self) -> Option<&str> {
        self.parent_account.as_deref().filter(|p| !p.is_empty())
    }
}

/// Debit/credit/balance of a single account, or of a subtree once aggregated
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq)]
pub struct AccountBalance {
    #[serde(default)]
    pub debit: f64,
    #[serde(default)]
    pub credit: f64,
    #[serde(default)]
    pub balance: f64,
}

impl std::ops::AddAssign for AccountBalance {
    fn add_assign(&mut self, other: Self) {
        self.debit += other.debit;
        self.credit += other.credit;
        self.balance += other.balance;
    }
}

/// A row of `/api/trial-balance`
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TrialBalanceRow {
    pub account: String,
    #[serde(flatten)]
    pub amounts: AccountBalance,
}

/// Accepts `true`/`false` as well as the `0`/`1` ERPNext uses for check fields.
pub(crate) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Null(()),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
        Flag::Null(()) => false,
    })
}
