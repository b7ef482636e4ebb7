use axum::http::StatusCode;
use time::{Date, Month, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};

use crate::constants::*;

pub fn db_error() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ERR_DATABASE_OPERATION.to_string(),
    )
}

pub fn db_error_with_context(context: &str) -> (StatusCode, String) {
    tracing::error!(context, "database operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Database error: {}", context),
    )
}

pub fn bad_request(message: impl Into<String>) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, message.into())
}

pub fn not_found(what: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{} not found", what))
}

pub fn validate_string_length(
    value: &str,
    field_name: &str,
    max_length: usize,
) -> Result<(), (StatusCode, String)> {
    if value.trim().is_empty() {
        return Err(bad_request(format!("{} cannot be empty", field_name)));
    }
    if value.len() > max_length {
        return Err(bad_request(format!(
            "{} must be less than {} characters",
            field_name, max_length
        )));
    }
    Ok(())
}

/// Optional free-text fields may be empty but not oversized.
pub fn validate_optional_length(
    value: Option<&str>,
    field_name: &str,
    max_length: usize,
) -> Result<(), (StatusCode, String)> {
    match value {
        Some(v) if v.len() > max_length => Err(bad_request(format!(
            "{} must be less than {} characters",
            field_name, max_length
        ))),
        _ => Ok(()),
    }
}

/// Trims an optional text field, mapping blank input to `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn parse_date(value: &str) -> Option<Date> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(value.trim(), format).ok()
}

pub fn validate_date(value: &str) -> Result<(), (StatusCode, String)> {
    if value.trim().is_empty() {
        return Err(bad_request("Date cannot be empty"));
    }
    parse_date(value)
        .map(|_| ())
        .ok_or_else(|| bad_request("Invalid date format"))
}

pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

pub fn now_rfc3339() -> Result<String, (StatusCode, String)> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Inclusive first and last day of a calendar month, as `YYYY-MM-DD` strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthRange {
    pub start: String,
    pub end: String,
}

impl MonthRange {
    pub fn containing(date: Date) -> Self {
        Self::of(date.year(), date.month())
    }

    pub fn of(year: i32, month: Month) -> Self {
        let last_day = time::util::days_in_year_month(year, month);
        Self {
            start: format!("{:04}-{:02}-01", year, u8::from(month)),
            end: format!("{:04}-{:02}-{:02}", year, u8::from(month), last_day),
        }
    }

    /// The `YYYY-MM` label of this range.
    pub fn label(&self) -> &str {
        &self.start[..7]
    }
}

/// Parses a `YYYY-MM` month parameter.
pub fn parse_month(value: &str) -> Result<MonthRange, (StatusCode, String)> {
    let invalid = || bad_request("Invalid month format, expected YYYY-MM");
    let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u8 = month.parse().map_err(|_| invalid())?;
    let month = Month::try_from(month).map_err(|_| invalid())?;
    Ok(MonthRange::of(year, month))
}

pub fn validate_amount(amount: f64, field_name: &str) -> Result<(), (StatusCode, String)> {
    if !amount.is_finite() {
        return Err(bad_request(format!(
            "{} must be a valid finite number",
            field_name
        )));
    }
    if amount <= 0.0 {
        return Err(bad_request(format!("{} must be positive", field_name)));
    }
    Ok(())
}

/// Rounds a currency amount to cents.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

pub fn validate_color(color: &str) -> Result<(), (StatusCode, String)> {
    validate_string_length(color, "Color", MAX_COLOR_LENGTH)
}

pub fn validate_limit(limit: Option<u32>, default: u32) -> Result<u32, (StatusCode, String)> {
    match limit {
        Some(l) => {
            if l == 0 {
                Err(bad_request("Limit must be greater than 0"))
            } else if l > MAX_LIMIT {
                Err(bad_request(format!("Limit cannot exceed {}", MAX_LIMIT)))
            } else {
                Ok(l)
            }
        }
        None => Ok(default),
    }
}

pub fn validate_offset(offset: Option<u32>) -> Result<u32, (StatusCode, String)> {
    match offset {
        Some(o) => {
            if o > MAX_OFFSET {
                Err(bad_request(format!("Offset cannot exceed {}", MAX_OFFSET)))
            } else {
                Ok(o)
            }
        }
        None => Ok(0),
    }
}

/// Reads a single `COUNT(*)`-style integer from the first row of a result set.
pub async fn first_count(rows: &mut libsql::Rows) -> Result<u32, libsql::Error> {
    match rows.next().await? {
        Some(row) => row.get::<u32>(0),
        None => Ok(0),
    }
}
