use std::cmp::Ordering;
use std::str::FromStr;

use serde::Serialize;

use super::fiscal_year::FiscalYear;
use super::movement::Movement;
use crate::error::LedgerError;

pub const DEFAULT_PAGE_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortField {
    #[default]
    PostingDate,
    MovementType,
    Debit,
    Credit,
}

impl FromStr for SortField {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "posting_date" | "date" => Ok(SortField::PostingDate),
            "movement_type" | "type" => Ok(SortField::MovementType),
            "debit" => Ok(SortField::Debit),
            "credit" => Ok(SortField::Credit),
            other => Err(LedgerError::InvalidArgument {
                field: "sort field",
                value: other.to_string(),
                reason: "use posting_date, movement_type, debit or credit".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Which movements feed the running balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BalanceMode {
    /// Drafts and cancelled movements are shown but not summed
    #[default]
    ConfirmedOnly,
    /// Every displayed movement is summed
    Audit,
}

impl BalanceMode {
    fn counts(self, movement: &Movement) -> bool {
        match self {
            BalanceMode::ConfirmedOnly => movement.is_confirmed(),
            BalanceMode::Audit => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LedgerQuery {
    /// `None` disables the date scope entirely
    pub fiscal_year: Option<FiscalYear>,
    pub search: Option<String>,
    pub sort: SortField,
    pub direction: SortDirection,
    /// 1-based, clamped into range when the view is built
    pub page: usize,
    pub page_size: usize,
    pub balance_mode: BalanceMode,
}

impl Default for LedgerQuery {
    fn default() -> Self {
        Self {
            fiscal_year: None,
            search: None,
            sort: SortField::default(),
            direction: SortDirection::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            balance_mode: BalanceMode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerRow {
    pub movement: Movement,
    /// Accumulated balance after this row
    pub running_balance: f64,
    /// Whether this row contributed to the running balance
    pub counted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerPage {
    pub rows: Vec<LedgerRow>,
    pub page: usize,
    pub total_pages: usize,
    /// Rows surviving scope and search, across every page
    pub total_rows: usize,
    /// Balance immediately before the first row of this page
    pub opening_balance: f64,
    pub closing_balance: f64,
    /// Balance over every filtered row, not just this page
    pub final_balance: f64,
}

/// Keep movements inside the fiscal year. Unparsable dates are kept.
pub fn scope_to_fiscal_year<'a>(movements: &'a [Movement], year: &FiscalYear) -> Vec<&'a Movement> {
    movements
        .iter()
        .filter(|m| m.date().map_or(true, |d| year.contains(d)))
        .collect()
}

/// Accumulated `debit - credit` after each movement, in slice order
pub fn running_balances<M: std::borrow::Borrow<Movement>>(movements: &[M], mode: BalanceMode) -> Vec<f64> {
    let mut acc = 0.0;
    movements
        .iter()
        .map(|m| {
            let m = m.borrow();
            if mode.counts(m) {
                acc += m.net();
            }
            acc
        })
        .collect()
}

fn compare(a: &Movement, b: &Movement, field: SortField) -> Ordering {
    match field {
        SortField::PostingDate => match (a.date(), b.date()) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        },
        SortField::MovementType => a
            .voucher_type
            .as_deref()
            .unwrap_or("")
            .to_lowercase()
            .cmp(&b.voucher_type.as_deref().unwrap_or("").to_lowercase()),
        SortField::Debit => a.debit.total_cmp(&b.debit),
        SortField::Credit => a.credit.total_cmp(&b.credit),
    }
}

pub struct LedgerView;

impl LedgerView {
    /// Scope, search, sort, compute running balances, then cut the page.
    pub fn build(movements: &[Movement], query: &LedgerQuery) -> LedgerPage {
        let mut rows: Vec<&Movement> = match &query.fiscal_year {
            Some(year) => scope_to_fiscal_year(movements, year),
            None => movements.iter().collect(),
        };

        if let Some(needle) = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let needle = needle.to_lowercase();
            rows.retain(|m| m.matches(&needle));
        }

        rows.sort_by(|a, b| {
            let ord = compare(a, b, query.sort);
            match query.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });

        let balances = running_balances(&rows, query.balance_mode);
        let final_balance = balances.last().copied().unwrap_or(0.0);

        let page_size = query.page_size.max(1);
        let total_rows = rows.len();
        let total_pages = total_rows.div_ceil(page_size).max(1);
        let page = query.page.clamp(1, total_pages);
        let start = (page - 1) * page_size;
        let end = (start + page_size).min(total_rows);

        let opening_balance = if start == 0 { 0.0 } else { balances[start - 1] };
        let page_rows: Vec<LedgerRow> = rows[start..end]
            .iter()
            .zip(&balances[start..end])
            .map(|(m, &running_balance)| LedgerRow {
                movement: (*m).clone(),
                running_balance,
                counted: query.balance_mode.counts(m),
            })
            .collect();
        let closing_balance = page_rows
            .last()
            .map_or(opening_balance, |r| r.running_balance);

        LedgerPage {
            rows: page_rows,
            page,
            total_pages,
            total_rows,
            opening_balance,
            closing_balance,
            final_balance,
        }
    }
}
