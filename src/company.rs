//! Company-level settings the accounting screens read and edit: company
//! details, postal addresses, outgoing/incoming mail accounts and the
//! exchange-rate driven price automation.

use serde::{Deserialize, Serialize};

use crate::accounts::flag;
use crate::error::{LedgerError, Result};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CompanyDetails {
    pub name: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub abbr: Option<String>,
    #[serde(default)]
    pub default_currency: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Address {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address_title: Option<String>,
    /// Billing, Shipping, Office...
    #[serde(default)]
    pub address_type: Option<String>,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub is_primary_address: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmailAccount {
    #[serde(default)]
    pub name: Option<String>,
    pub email_id: String,
    #[serde(default)]
    pub email_account_name: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub enable_incoming: bool,
    #[serde(default, deserialize_with = "flag")]
    pub enable_outgoing: bool,
    #[serde(default, deserialize_with = "flag")]
    pub default_outgoing: bool,
    #[serde(default)]
    pub smtp_server: Option<String>,
    #[serde(default)]
    pub smtp_port: Option<u16>,
}

impl EmailAccount {
    pub fn validate(&self) -> Result<()> {
        let email = self.email_id.trim();
        let valid = email
            .split_once('@')
            .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
        if !valid {
            return Err(LedgerError::Validation(format!(
                "'{}' is not a valid email address",
                self.email_id
            )));
        }
        if self.enable_outgoing && self.smtp_server.as_deref().map_or(true, |s| s.trim().is_empty()) {
            return Err(LedgerError::Validation(
                "Outgoing mail needs an SMTP server".to_string(),
            ));
        }
        Ok(())
    }
}

/// Recompute item prices whenever an exchange rate is stored
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct PriceAutomation {
    #[serde(default, deserialize_with = "flag")]
    pub enabled: bool,
    /// Expression over the new rate, e.g. `rate * 1.21`
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub price_list: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

impl PriceAutomation {
    /// An enabled automation must carry a formula
    pub fn validate(&self) -> Result<()> {
        let has_formula = self
            .formula
            .as_deref()
            .is_some_and(|f| !f.trim().is_empty());
        if self.enabled && !has_formula {
            return Err(LedgerError::Validation(
                "Price automation cannot be enabled without a formula".to_string(),
            ));
        }
        Ok(())
    }
}
