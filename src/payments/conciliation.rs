use chrono::NaiveDate;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use super::records::{OpenInvoice, PartyType};

const ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ID_SUFFIX_LEN: usize = 6;

/// The batch the current selection will be reconciled under
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum Conciliation {
    #[default]
    None,
    /// Pre-existing id shared by the selected invoices
    Group(String),
    /// Generated here because several invoices were selected together
    Auto(String),
}

impl Conciliation {
    pub fn id(&self) -> Option<&str> {
        match self {
            Conciliation::None => None,
            Conciliation::Group(id) | Conciliation::Auto(id) => Some(id),
        }
    }

    pub fn source(&self) -> Option<&'static str> {
        match self {
            Conciliation::None => None,
            Conciliation::Group(_) => Some("group"),
            Conciliation::Auto(_) => Some("auto"),
        }
    }
}

/// `CONC-{PAY|SUP}-{yyyyMMdd}-{6 uppercase alphanumerics}`
pub fn generate_conciliation_id<R: Rng + ?Sized>(
    party_type: PartyType,
    date: NaiveDate,
    rng: &mut R,
) -> String {
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_CHARSET[rng.gen_range(0..ID_CHARSET.len())] as char)
        .collect();
    format!(
        "CONC-{}-{}-{}",
        party_type.conciliation_prefix(),
        date.format("%Y%m%d"),
        suffix
    )
}

/// Decide the conciliation for the invoices that currently carry an
/// applied amount.
///
/// - none selected: no conciliation
/// - all selected share an existing id: adopt it
/// - two or more without a shared id: keep the current generated id, or generate one
/// - a single invoice without an id: no conciliation
pub fn detect_conciliation<R: Rng + ?Sized>(
    party_type: PartyType,
    selected: &[&OpenInvoice],
    current: &Conciliation,
    today: NaiveDate,
    rng: &mut R,
) -> Conciliation {
    let Some(first) = selected.first() else {
        return Conciliation::None;
    };

    if let Some(shared) = first.conciliation_id() {
        if selected.iter().all(|inv| inv.conciliation_id() == Some(shared)) {
            return Conciliation::Group(shared.to_string());
        }
    }

    if selected.len() >= 2 {
        if let Conciliation::Auto(id) = current {
            return Conciliation::Auto(id.clone());
        }
        let id = generate_conciliation_id(party_type, today, rng);
        debug!(%id, invoices = selected.len(), "generated conciliation id");
        return Conciliation::Auto(id);
    }

    Conciliation::None
}
