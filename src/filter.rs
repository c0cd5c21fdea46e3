use chrono::NaiveDate;

use crate::error::InputError;
use crate::model::AdvisorySummary;

pub const INPUT_DATE_FORMAT: &str = "%Y-%m-%d";

pub trait Dated {
    fn publication_date(&self) -> NaiveDate;
}

impl Dated for AdvisorySummary {
    fn publication_date(&self) -> NaiveDate {
        self.publication_date
    }
}

/// Closed interval of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InputError> {
        if start > end {
            return Err(InputError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Keep the items dated inside the range, in their original order.
    pub fn filter<T: Dated>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .filter(|item| self.contains(item.publication_date()))
            .collect()
    }
}

/// Parse a user-supplied `YYYY-MM-DD` date.
pub fn parse_input_date(s: &str) -> Result<NaiveDate, InputError> {
    NaiveDate::parse_from_str(s.trim(), INPUT_DATE_FORMAT)
        .map_err(|_| InputError::InvalidDateInput(s.trim().to_string()))
}

// ── Tests ──
