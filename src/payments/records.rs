use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::vouchers::VoucherKind;

/// Which side of the ledger a payment settles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartyType {
    Customer,
    Supplier,
}

impl PartyType {
    pub fn as_str(self) -> &'static str {
        match self {
            PartyType::Customer => "Customer",
            PartyType::Supplier => "Supplier",
        }
    }

    /// Prefix used in client-generated conciliation ids
    pub fn conciliation_prefix(self) -> &'static str {
        match self {
            PartyType::Customer => "PAY",
            PartyType::Supplier => "SUP",
        }
    }

    pub fn invoice_kind(self) -> VoucherKind {
        match self {
            PartyType::Customer => VoucherKind::SalesInvoice,
            PartyType::Supplier => VoucherKind::PurchaseInvoice,
        }
    }
}

impl fmt::Display for PartyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartyType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" | "cliente" => Ok(PartyType::Customer),
            "supplier" | "proveedor" => Ok(PartyType::Supplier),
            _ => Err(LedgerError::InvalidArgument {
                field: "party type",
                value: s.to_string(),
                reason: "use customer or supplier".to_string(),
            }),
        }
    }
}

/// An invoice with an open balance that a payment can be applied to
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OpenInvoice {
    pub name: String,
    #[serde(default)]
    pub posting_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    pub outstanding_amount: f64,
    #[serde(default)]
    pub grand_total: Option<f64>,
    #[serde(default)]
    pub voucher_type: Option<String>,
    #[serde(default)]
    pub custom_conciliation_id: Option<String>,
}

impl OpenInvoice {
    pub(crate) fn conciliation_id(&self) -> Option<&str> {
        self.custom_conciliation_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Server summary of an existing conciliation batch
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ConciliationGroup {
    pub conciliation_id: String,
    /// Signed: invoices minus payments/credit notes already in the batch
    pub net_amount: f64,
    #[serde(default)]
    pub invoices: Vec<String>,
}
