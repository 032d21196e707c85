//! Request parameter validation.
//!
//! Everything here runs before any AWS call is made.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::sync::LazyLock;

use crate::error::AppError;

static CLUSTER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9-]+$").expect("valid cluster name regex"));

static COMMAND_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-f0-9-]{36}$").expect("valid command id regex"));

static INSTANCE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(i|mi)-[a-f0-9]{8,17}$").expect("valid instance id regex"));

/// Unix timestamps above this are taken to be in milliseconds
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

pub fn is_alphanumeric_with_hyphen(value: &str) -> bool {
    CLUSTER_NAME.is_match(value)
}

pub fn validate_cluster_name(cluster_name: &str) -> Result<(), AppError> {
    if is_alphanumeric_with_hyphen(cluster_name) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Invalid cluster name '{}': must start with a letter and contain only letters, digits and hyphens",
            cluster_name
        )))
    }
}

pub fn validate_ssm_ids(command_id: &str, instance_id: &str) -> Result<(), AppError> {
    if !COMMAND_ID.is_match(command_id) {
        return Err(AppError::BadRequest(format!("Invalid command id '{}'", command_id)));
    }
    if !INSTANCE_ID.is_match(instance_id) {
        return Err(AppError::BadRequest(format!("Invalid instance id '{}'", instance_id)));
    }
    Ok(())
}

/// Convert a user-supplied time to a UTC calendar date.
///
/// Accepts a plain date, an RFC 3339 timestamp, a naive date-time (assumed
/// UTC) or a unix timestamp in seconds or milliseconds.
pub fn to_utc_date(value: &str) -> Result<NaiveDate, AppError> {
    let value = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Ok(datetime.with_timezone(&Utc).date_naive());
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Utc.from_utc_datetime(&datetime).date_naive());
        }
    }
    if let Ok(timestamp) = value.parse::<i64>() {
        let seconds = if timestamp > MILLIS_THRESHOLD {
            timestamp / 1000
        } else {
            timestamp
        };
        if let Some(datetime) = DateTime::<Utc>::from_timestamp(seconds, 0) {
            return Ok(datetime.date_naive());
        }
    }

    Err(AppError::BadRequest(format!("Invalid date '{}'", value)))
}
