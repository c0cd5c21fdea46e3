use chrono::NaiveDate;
use thiserror::Error;

/// Any failure to obtain a page body. Callers do not distinguish sub-kinds.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
}

/// A listing entry that lacks a required field.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("unparseable advisory date: {0:?}")]
    BadDate(String),
    #[error("bad link {href:?}: {reason}")]
    BadLink { href: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDateInput(String),
    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}
