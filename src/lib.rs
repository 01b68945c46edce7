pub mod accounts;
pub mod api;
pub mod company;
pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod ledger;
pub mod payments;
pub mod vouchers;

pub use accounts::{build_account_tree, compare_account_numbers, Account, AccountBalance, AccountNode};
pub use api::{ApiClient, HttpTransport, Transport};
pub use config::Config;
pub use error::{LedgerError, Result};
pub use events::{EventBus, ExchangeRateUpdate, LedgerEvent};
pub use ledger::{BalanceMode, FiscalYear, LedgerPage, LedgerQuery, LedgerView, Movement};
pub use payments::{AllocationSession, Conciliation, OpenInvoice, PartyType};
pub use vouchers::VoucherKind;
