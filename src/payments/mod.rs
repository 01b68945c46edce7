mod conciliation;
mod payload;
mod records;
mod selection;
mod session;

pub use conciliation::{detect_conciliation, generate_conciliation_id, Conciliation};
pub use payload::{InvoiceAllocation, PaymentMethodLine, PaymentPayload, Withholding};
pub use records::{ConciliationGroup, OpenInvoice, PartyType};
pub use selection::{clamp_applied, InvoiceSelection};
pub use session::AllocationSession;
