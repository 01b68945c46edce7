mod fiscal_year;
mod movement;
mod view;

pub use fiscal_year::FiscalYear;
pub use movement::{parse_posting_date, Movement};
pub use view::{
    running_balances, scope_to_fiscal_year, BalanceMode, LedgerPage, LedgerQuery, LedgerRow,
    LedgerView, SortDirection, SortField, DEFAULT_PAGE_SIZE,
};
