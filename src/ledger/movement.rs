use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accounts::flag;
use crate::format::js_number;
use crate::vouchers::VoucherKind;

/// A general-ledger movement for one account
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Movement {
    pub name: String,
    #[serde(default)]
    pub posting_date: Option<String>,
    #[serde(default)]
    pub debit: f64,
    #[serde(default)]
    pub credit: f64,
    #[serde(default)]
    pub voucher_type: Option<String>,
    #[serde(default)]
    pub voucher_no: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    /// 0 draft, 1 submitted, 2 cancelled
    #[serde(default = "submitted")]
    pub docstatus: u8,
    #[serde(default, deserialize_with = "flag")]
    pub is_cancelled: bool,
    #[serde(default)]
    pub custom_conciliation_id: Option<String>,
}

fn submitted() -> u8 {
    1
}

impl Movement {
    pub fn date(&self) -> Option<NaiveDate> {
        self.posting_date.as_deref().and_then(parse_posting_date)
    }

    pub fn is_draft(&self) -> bool {
        self.docstatus == 0
    }

    pub fn is_cancelled(&self) -> bool {
        self.is_cancelled || self.docstatus == 2
    }

    /// Submitted and not cancelled
    pub fn is_confirmed(&self) -> bool {
        !self.is_draft() && !self.is_cancelled()
    }

    pub fn net(&self) -> f64 {
        self.debit - self.credit
    }

    pub fn kind(&self) -> Option<VoucherKind> {
        self.voucher_type.as_deref().and_then(VoucherKind::from_doctype)
    }

    /// Case-insensitive match against the searchable columns.
    /// `needle` must already be lowercase.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        let text_fields = [
            self.title.as_deref(),
            self.remarks.as_deref(),
            self.voucher_type.as_deref(),
            self.posting_date.as_deref(),
        ];
        if text_fields
            .iter()
            .flatten()
            .any(|f| f.to_lowercase().contains(needle))
        {
            return true;
        }
        js_number(self.debit).contains(needle) || js_number(self.credit).contains(needle)
    }
}

/// Parse a posting date as a calendar date.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS[.f]` and RFC 3339 timestamps;
/// timestamps with an offset are converted to their UTC date so a date never
/// drifts with the local timezone.
pub fn parse_posting_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts.date());
        }
    }
    None
}
