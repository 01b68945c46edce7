use serde::Serialize;

/// Transient allocation state of one invoice while a payment is drafted
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InvoiceSelection {
    pub selected: bool,
    /// Outstanding amount before this payment; negative for credit notes
    pub saldo_anterior: f64,
    /// Amount of this payment applied to the invoice
    pub saldo_aplicado: f64,
    /// Outstanding amount after this payment
    pub saldo: f64,
}

impl InvoiceSelection {
    /// Freshly selected: the whole outstanding amount is applied
    pub fn selected(outstanding: f64) -> Self {
        Self {
            selected: true,
            saldo_anterior: outstanding,
            saldo_aplicado: outstanding,
            saldo: 0.0,
        }
    }

    pub fn deselect(&mut self) {
        self.selected = false;
        self.saldo_aplicado = 0.0;
        self.saldo = self.saldo_anterior;
    }

    /// Store a manual amount, clamped between zero and `saldo_anterior`
    pub fn apply(&mut self, amount: f64) -> f64 {
        self.saldo_aplicado = clamp_applied(amount, self.saldo_anterior);
        self.saldo = self.saldo_anterior - self.saldo_aplicado;
        self.saldo_aplicado
    }

    pub(crate) fn has_applied_amount(&self) -> bool {
        self.selected && self.saldo_aplicado != 0.0
    }

    pub(crate) fn is_credit(&self) -> bool {
        self.saldo_aplicado < 0.0
    }
}

/// Clamp a manually entered applied amount into the interval between zero
/// and `saldo_anterior`, so a credit note only takes amounts of its own sign.
/// NaN counts as zero.
pub fn clamp_applied(amount: f64, saldo_anterior: f64) -> f64 {
    if amount.is_nan() || saldo_anterior.is_nan() {
        return 0.0;
    }
    amount.clamp(saldo_anterior.min(0.0), saldo_anterior.max(0.0))
}
