use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FiscalYear {
    pub name: String,
    pub year_start_date: NaiveDate,
    pub year_end_date: NaiveDate,
}

impl FiscalYear {
    /// Inclusive on both ends
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.year_start_date && date <= self.year_end_date
    }

    /// The fiscal year with the greatest end date
    pub fn latest(years: &[FiscalYear]) -> Option<&FiscalYear> {
        years.iter().max_by_key(|y| y.year_end_date)
    }

    pub fn find<'a>(years: &'a [FiscalYear], name: &str) -> Result<&'a FiscalYear> {
        years
            .iter()
            .find(|y| y.name == name)
            .ok_or_else(|| LedgerError::FiscalYearNotFound(name.to_string()))
    }

    /// The year immediately after `self`, one calendar year long.
    ///
    /// Named after its start year, or `"2024-2025"` when it straddles two.
    pub fn following(&self) -> Result<FiscalYear> {
        let start = self.year_end_date.succ_opt().ok_or_else(|| {
            LedgerError::Validation(format!("Fiscal year '{}' ends at the calendar limit", self.name))
        })?;
        let end = start
            .checked_add_months(Months::new(12))
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| {
                LedgerError::Validation(format!("Cannot derive a year after '{}'", self.name))
            })?;

        let name = if start.year() == end.year() {
            start.year().to_string()
        } else {
            format!("{}-{}", start.year(), end.year())
        };

        Ok(FiscalYear {
            name,
            year_start_date: start,
            year_end_date: end,
        })
    }
}
