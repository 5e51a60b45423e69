//! Argument checks run before any request leaves the client.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::ApiError;

const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

/// Render `id` and require it to be one or more ASCII digits.
pub fn numeric_id(label: &str, id: impl ToString) -> Result<String, ApiError> {
    let id = id.to_string();
    if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
        Ok(id)
    } else {
        Err(ApiError::invalid(format!("{label} must be numeric, got {id:?}")))
    }
}

pub fn numeric_ids<I>(label: &str, ids: &[I]) -> Result<Vec<String>, ApiError>
where
    I: ToString,
{
    ids.iter().map(|id| numeric_id(label, id.to_string())).collect()
}

/// Empty strings pass; anything else must read as a date or date/time.
/// Returns the trimmed value, which is what goes on the wire.
pub fn date_time(label: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(String::new());
    }
    let parses = DateTime::parse_from_rfc3339(value).is_ok()
        || DATE_TIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok();
    if parses {
        Ok(value.to_string())
    } else {
        Err(ApiError::invalid(format!(
            "{label} must be a valid date/time string, got {value:?}"
        )))
    }
}

/// Empty passes through; otherwise `ASC`/`DESC` in any casing, uppercased.
pub fn sort_direction(value: &str) -> Result<String, ApiError> {
    if value.is_empty() {
        return Ok(String::new());
    }
    let upper = value.to_ascii_uppercase();
    match upper.as_str() {
        "ASC" | "DESC" => Ok(upper),
        _ => Err(ApiError::invalid(format!(
            "sort must be either ASC or DESC, got {value:?}"
        ))),
    }
}

pub fn per_page(value: Option<u32>) -> Result<(), ApiError> {
    match value {
        Some(n) if !(1..=100).contains(&n) => Err(ApiError::invalid(format!(
            "per_page must be between 1 and 100, got {n}"
        ))),
        _ => Ok(()),
    }
}

pub fn one_to_one(ids_label: &str, values_label: &str, ids: usize, values: usize) -> Result<(), ApiError> {
    if ids == values {
        Ok(())
    } else {
        Err(ApiError::invalid(format!(
            "{ids_label} and {values_label} must have a one-to-one relationship \
             ({ids} {ids_label} given for {values} {values_label})"
        )))
    }
}
