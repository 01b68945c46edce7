//! Voucher kinds that can appear as the source of a ledger movement.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherKind {
    JournalEntry,
    SalesInvoice,
    PurchaseInvoice,
    PaymentEntry,
    DeliveryNote,
    PurchaseReceipt,
    StockReconciliation,
}

impl VoucherKind {
    pub const ALL: [VoucherKind; 7] = [
        VoucherKind::JournalEntry,
        VoucherKind::SalesInvoice,
        VoucherKind::PurchaseInvoice,
        VoucherKind::PaymentEntry,
        VoucherKind::DeliveryNote,
        VoucherKind::PurchaseReceipt,
        VoucherKind::StockReconciliation,
    ];

    /// Map an ERPNext doctype name (`"Sales Invoice"`) to its kind
    pub fn from_doctype(doctype: &str) -> Option<Self> {
        let normalized = doctype.trim().to_lowercase().replace(['_', '-'], " ");
        Self::ALL
            .into_iter()
            .find(|k| k.doctype().eq_ignore_ascii_case(&normalized))
    }

    pub fn doctype(self) -> &'static str {
        match self {
            VoucherKind::JournalEntry => "Journal Entry",
            VoucherKind::SalesInvoice => "Sales Invoice",
            VoucherKind::PurchaseInvoice => "Purchase Invoice",
            VoucherKind::PaymentEntry => "Payment Entry",
            VoucherKind::DeliveryNote => "Delivery Note",
            VoucherKind::PurchaseReceipt => "Purchase Receipt",
            VoucherKind::StockReconciliation => "Stock Reconciliation",
        }
    }

    fn resource(self) -> &'static str {
        match self {
            VoucherKind::JournalEntry => "journal-entries",
            VoucherKind::SalesInvoice => "invoices",
            VoucherKind::PurchaseInvoice => "purchase-invoices",
            VoucherKind::PaymentEntry => "pagos",
            VoucherKind::DeliveryNote => "remitos",
            VoucherKind::PurchaseReceipt => "purchase-receipts",
            VoucherKind::StockReconciliation => "stock-reconciliations",
        }
    }

    /// Detail endpoint for a document of this kind
    pub fn detail_path(self, name: &str) -> String {
        format!("/api/{}/{}", self.resource(), crate::api::encode_component(name))
    }
}

impl fmt::Display for VoucherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.doctype())
    }
}

impl FromStr for VoucherKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_doctype(s).ok_or_else(|| LedgerError::UnknownVoucherType(s.to_string()))
    }
}
