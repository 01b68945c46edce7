use chrono::{Local, NaiveDate};
use tracing::debug;

use super::conciliation::{detect_conciliation, Conciliation};
use super::payload::{InvoiceAllocation, PaymentMethodLine, PaymentPayload, Withholding};
use super::records::{ConciliationGroup, OpenInvoice, PartyType};
use super::selection::InvoiceSelection;
use crate::error::{LedgerError, Result};

/// Amounts below this are treated as zero
const EPSILON: f64 = 0.005;

/// Draft of a customer or supplier payment: which open invoices it settles,
/// how much goes to each, and how the money moved.
#[derive(Debug, Clone)]
pub struct AllocationSession {
    party_type: PartyType,
    party: String,
    invoices: Vec<OpenInvoice>,
    /// Insertion order is allocation order
    selections: Vec<(String, InvoiceSelection)>,
    payment_methods: Vec<PaymentMethodLine>,
    next_method_id: u32,
    withholdings: Vec<Withholding>,
    groups: Vec<ConciliationGroup>,
    conciliation: Conciliation,
    today: NaiveDate,
}

impl AllocationSession {
    pub fn new(party_type: PartyType, party: impl Into<String>, invoices: Vec<OpenInvoice>) -> Self {
        Self {
            party_type,
            party: party.into(),
            invoices,
            selections: Vec::new(),
            payment_methods: Vec::new(),
            next_method_id: 1,
            withholdings: Vec::new(),
            groups: Vec::new(),
            conciliation: Conciliation::None,
            today: Local::now().date_naive(),
        }
    }

    /// Date stamped into generated conciliation ids
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Server summaries of existing conciliation batches
    pub fn with_groups(mut self, groups: Vec<ConciliationGroup>) -> Self {
        self.groups = groups;
        self
    }

    pub fn party_type(&self) -> PartyType {
        self.party_type
    }

    pub fn party(&self) -> &str {
        &self.party
    }

    pub fn invoices(&self) -> &[OpenInvoice] {
        &self.invoices
    }

    pub fn conciliation(&self) -> &Conciliation {
        &self.conciliation
    }

    pub fn payment_methods(&self) -> &[PaymentMethodLine] {
        &self.payment_methods
    }

    pub fn withholdings(&self) -> &[Withholding] {
        &self.withholdings
    }

    pub fn selection(&self, name: &str) -> Option<&InvoiceSelection> {
        self.selections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    pub fn selections(&self) -> impl Iterator<Item = (&str, &InvoiceSelection)> {
        self.selections.iter().map(|(n, s)| (n.as_str(), s))
    }

    fn invoice(&self, name: &str) -> Result<&OpenInvoice> {
        self.invoices
            .iter()
            .find(|inv| inv.name == name)
            .ok_or_else(|| LedgerError::InvoiceNotFound(name.to_string()))
    }

    fn entry_mut(&mut self, name: &str) -> Option<&mut InvoiceSelection> {
        self.selections
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    fn put_selected(&mut self, name: &str, outstanding: f64) {
        let fresh = InvoiceSelection::selected(outstanding);
        match self.entry_mut(name) {
            Some(existing) => *existing = fresh,
            None => self.selections.push((name.to_string(), fresh)),
        }
    }

    /// Select an invoice with its whole outstanding amount applied
    pub fn select_invoice(&mut self, name: &str) -> Result<()> {
        let outstanding = self.invoice(name)?.outstanding_amount;
        self.put_selected(name, outstanding);
        self.refresh_conciliation();
        Ok(())
    }

    pub fn deselect_invoice(&mut self, name: &str) -> Result<()> {
        self.invoice(name)?;
        if let Some(entry) = self.entry_mut(name) {
            entry.deselect();
        }
        self.refresh_conciliation();
        Ok(())
    }

    /// Flip the selection of an invoice; returns whether it is now selected
    pub fn toggle_invoice(&mut self, name: &str) -> Result<bool> {
        let selected = self.selection(name).is_some_and(|s| s.selected);
        if selected {
            self.deselect_invoice(name)?;
        } else {
            self.select_invoice(name)?;
        }
        Ok(!selected)
    }

    /// Manually set the amount applied to an invoice, selecting it if needed.
    /// Returns the stored amount after clamping between zero and `saldo_anterior`.
    pub fn set_applied_amount(&mut self, name: &str, amount: f64) -> Result<f64> {
        let outstanding = self.invoice(name)?.outstanding_amount;
        if !self.selection(name).is_some_and(|s| s.selected) {
            self.put_selected(name, outstanding);
        }
        let stored = self
            .entry_mut(name)
            .map(|entry| entry.apply(amount))
            .unwrap_or(0.0);
        self.refresh_conciliation();
        Ok(stored)
    }

    /// Replace the whole selection with the invoices of one conciliation batch.
    /// Returns how many invoices were selected.
    pub fn select_group(&mut self, conciliation_id: &str) -> Result<usize> {
        let members: Vec<(String, f64)> = self
            .invoices
            .iter()
            .filter(|inv| inv.conciliation_id() == Some(conciliation_id))
            .map(|inv| (inv.name.clone(), inv.outstanding_amount))
            .collect();
        if members.is_empty() {
            return Err(LedgerError::ConciliationNotFound(conciliation_id.to_string()));
        }

        self.selections.clear();
        for (name, outstanding) in &members {
            self.put_selected(name, *outstanding);
        }
        self.conciliation = Conciliation::Group(conciliation_id.to_string());
        self.refresh_conciliation();
        Ok(members.len())
    }

    pub fn clear_selection(&mut self) {
        self.selections.clear();
        self.conciliation = Conciliation::None;
    }

    /// Drop selections, payment lines and withholdings
    pub fn reset(&mut self) {
        self.clear_selection();
        self.payment_methods.clear();
        self.withholdings.clear();
        self.next_method_id = 1;
    }

    /// Recompute the conciliation from the current selection
    pub fn refresh_conciliation(&mut self) {
        let selected: Vec<&OpenInvoice> = self
            .selections
            .iter()
            .filter(|(_, s)| s.has_applied_amount())
            .filter_map(|(name, _)| self.invoices.iter().find(|inv| &inv.name == name))
            .collect();

        let next = detect_conciliation(
            self.party_type,
            &selected,
            &self.conciliation,
            self.today,
            &mut rand::thread_rng(),
        );
        if next != self.conciliation {
            debug!(from = ?self.conciliation, to = ?next, "conciliation changed");
        }
        self.conciliation = next;
    }

    /// Add a payment line; returns its id
    pub fn add_payment_method(
        &mut self,
        medio_pago: impl Into<String>,
        fecha_pago: NaiveDate,
        importe: f64,
    ) -> u32 {
        let id = self.next_method_id;
        self.next_method_id += 1;
        self.payment_methods.push(PaymentMethodLine {
            id,
            medio_pago: medio_pago.into(),
            fecha_pago,
            importe,
            archivos: Vec::new(),
        });
        id
    }

    pub fn remove_payment_method(&mut self, id: u32) -> bool {
        let before = self.payment_methods.len();
        self.payment_methods.retain(|m| m.id != id);
        before != self.payment_methods.len()
    }

    pub fn add_withholding(&mut self, withholding: Withholding) {
        self.withholdings.push(withholding);
    }

    pub fn total_payment_methods(&self) -> f64 {
        self.payment_methods.iter().map(|m| m.importe).sum()
    }

    pub fn total_withholdings(&self) -> f64 {
        self.withholdings.iter().map(|w| w.amount).sum()
    }

    /// Everything this payment settles: money moved plus taxes withheld
    pub fn budget(&self) -> f64 {
        self.total_payment_methods() + self.total_withholdings()
    }

    /// Signed sum of the amounts applied to selected invoices
    pub fn total_applied(&self) -> f64 {
        self.selections
            .iter()
            .filter(|(_, s)| s.selected)
            .map(|(_, s)| s.saldo_aplicado)
            .sum()
    }

    /// Amount shown as "to reconcile": the server's signed net amount for an
    /// adopted batch, otherwise what is applied locally.
    pub fn net_conciliation_amount(&self) -> f64 {
        if let Conciliation::Group(id) = &self.conciliation {
            if let Some(group) = self.groups.iter().find(|g| &g.conciliation_id == id) {
                return group.net_amount;
            }
        }
        self.total_applied()
    }

    /// Spend the budget over the selected invoices in selection order.
    ///
    /// Credit notes (negative applied amounts) are kept whole and release
    /// their amount into the budget up front. Every other invoice takes
    /// `min(saldo_aplicado, remaining)`; once the budget runs out the rest get
    /// zero. The signed sum never exceeds [`budget`](Self::budget).
    pub fn final_allocations(&self) -> Vec<InvoiceAllocation> {
        let credits: f64 = self
            .selections
            .iter()
            .filter(|(_, s)| s.selected && s.is_credit())
            .map(|(_, s)| s.saldo_aplicado)
            .sum();
        let mut remaining = (self.budget() - credits).max(0.0);
        self.selections
            .iter()
            .filter(|(_, s)| s.selected)
            .map(|(name, s)| {
                let applied = if s.is_credit() {
                    s.saldo_aplicado
                } else {
                    let applied = s.saldo_aplicado.min(remaining).max(0.0);
                    remaining -= applied;
                    applied
                };
                InvoiceAllocation {
                    name: name.clone(),
                    saldo_anterior: s.saldo_anterior,
                    saldo_aplicado: applied,
                    saldo: s.saldo_anterior - applied,
                }
            })
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.payment_methods.is_empty() && self.withholdings.is_empty() {
            return Err(LedgerError::Validation(
                "Add at least one payment method or withholding before saving".to_string(),
            ));
        }
        if let Some(line) = self
            .payment_methods
            .iter()
            .find(|m| m.medio_pago.trim().is_empty())
        {
            return Err(LedgerError::Validation(format!(
                "Payment line {} has no payment account",
                line.id
            )));
        }
        if let Some(line) = self.payment_methods.iter().find(|m| !(m.importe > 0.0)) {
            return Err(LedgerError::Validation(format!(
                "Payment line {} must have an amount greater than zero",
                line.id
            )));
        }
        if let Some(w) = self.withholdings.iter().find(|w| !(w.amount > 0.0)) {
            return Err(LedgerError::Validation(format!(
                "Withholding '{}' must have an amount greater than zero",
                w.tax_type
            )));
        }
        if self.budget() < EPSILON {
            return Err(LedgerError::Validation(
                "The payment has no amount".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate and assemble the body for `POST /api/pagos`
    pub fn build_payload(&self, posting_date: NaiveDate) -> Result<PaymentPayload> {
        self.validate()?;

        let allocations = self.final_allocations();
        let allocated: f64 = allocations.iter().map(|a| a.saldo_aplicado).sum();
        let invoices: Vec<InvoiceAllocation> = allocations
            .into_iter()
            .filter(|a| a.saldo_aplicado.abs() >= EPSILON)
            .collect();

        let conciliation_id = self.conciliation.id().map(str::to_string);
        let unallocated = self.budget() - allocated;

        Ok(PaymentPayload {
            party_type: self.party_type,
            party: self.party.clone(),
            posting_date,
            total_amount: self.total_payment_methods(),
            total_withholdings: self.total_withholdings(),
            unallocated_amount: if unallocated < EPSILON { 0.0 } else { unallocated },
            invoices,
            payment_methods: self.payment_methods.clone(),
            withholdings: self.withholdings.clone(),
            selected_conciliation_ids: conciliation_id.iter().cloned().collect(),
            conciliation_id,
        })
    }
}
