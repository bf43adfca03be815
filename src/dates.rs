//! Agreement date computation.
//!
//! The agreement starts on the submission day and expires two calendar months later.
//! When the start day does not exist in the target month the expiration is clamped to
//! that month's last day (Jan 31 + 2 months = Mar 31, Dec 31 + 2 months = Feb 28/29).

use chrono::{Local, Months, NaiveDate};

/// Display format used by the hidden date controls and the PDF fields.
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// Agreement term length.
pub const TERM_MONTHS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgreementDates {
    pub start: NaiveDate,
    pub expiration: NaiveDate,
}

impl AgreementDates {
    pub fn from_start(start: NaiveDate) -> Self {
        Self {
            start,
            expiration: expiration_for(start),
        }
    }

    /// Dates for an agreement signed today, in the server's local timezone.
    pub fn today() -> Self {
        Self::from_start(Local::now().date_naive())
    }

    pub fn start_text(&self) -> String {
        format_us_date(self.start)
    }

    pub fn expiration_text(&self) -> String {
        format_us_date(self.expiration)
    }
}

/// Start date plus the agreement term, clamped to the end of the target month.
pub fn expiration_for(start: NaiveDate) -> NaiveDate {
    start
        .checked_add_months(Months::new(TERM_MONTHS))
        .unwrap_or(NaiveDate::MAX)
}

/// Format as zero-padded `MM/DD/YYYY`.
pub fn format_us_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
