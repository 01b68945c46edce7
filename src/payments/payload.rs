use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::records::PartyType;

/// One way the amount was collected or paid (cash, bank transfer, cheque...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethodLine {
    pub id: u32,
    /// Payment account the money moves through
    pub medio_pago: String,
    pub fecha_pago: NaiveDate,
    pub importe: f64,
    /// References to attached files, uploaded elsewhere
    #[serde(default)]
    pub archivos: Vec<String>,
}

/// A tax withheld at payment time; counts toward the settled amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withholding {
    pub tax_type: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceAllocation {
    pub name: String,
    pub saldo_anterior: f64,
    pub saldo_aplicado: f64,
    pub saldo: f64,
}

/// Body of `POST /api/pagos`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentPayload {
    pub party_type: PartyType,
    pub party: String,
    pub posting_date: NaiveDate,
    pub total_amount: f64,
    pub total_withholdings: f64,
    /// Part of the budget not applied to any invoice (paid on account)
    pub unallocated_amount: f64,
    pub invoices: Vec<InvoiceAllocation>,
    pub payment_methods: Vec<PaymentMethodLine>,
    pub withholdings: Vec<Withholding>,
    pub selected_conciliation_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conciliation_id: Option<String>,
}
