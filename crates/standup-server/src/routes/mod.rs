pub mod calendar;
pub mod escalations;
pub mod events;
pub mod members;
pub mod reports;
pub mod runs;
pub mod status;

use chrono::NaiveDate;

use crate::error::AppError;

/// Parse a `YYYY-MM-DD` path segment.
pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::bad_request(format!("invalid date '{raw}': expected YYYY-MM-DD")))
}
