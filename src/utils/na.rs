//! Serde helpers for nullable CSV fields.
//!
//! Upstream stage outputs spell a missing value several ways (an empty field,
//! `NA`, `NaN`). All of them read back as `None`. Writing uses an empty field
//! unless a field opts into the literal `NA` via [`na_literal`].

use serde::{Deserialize, Deserializer, Serializer};

const MISSING_TOKENS: [&str; 5] = ["", "NA", "NaN", "nan", "N/A"];

/// Returns true if a raw CSV field denotes a missing value.
pub fn is_missing(raw: &str) -> bool {
    MISSING_TOKENS.contains(&raw.trim())
}

/// Parse a raw field into an optional float, treating missing tokens as `None`.
pub fn parse_f64(raw: &str) -> Option<f64> {
    if is_missing(raw) {
        return None;
    }
    raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

pub fn deserialize_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if is_missing(&raw) {
        return Ok(None);
    }
    raw.trim()
        .parse::<f64>()
        .map(|v| if v.is_nan() { None } else { Some(v) })
        .map_err(|_| serde::de::Error::custom(format!("invalid number: '{}'", raw)))
}

pub fn deserialize_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if is_missing(&raw) {
        Ok(None)
    } else {
        Ok(Some(raw.trim().to_string()))
    }
}

/// Reads station identifiers as strings regardless of how they were written.
///
/// Numeric-looking ids written by a float-typed column (`72201012839.0`) are
/// normalised back to their integer spelling so joins against other tables
/// still match.
pub fn deserialize_station_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(normalize_station_id(&raw))
}

pub fn normalize_station_id(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_suffix(".0") {
        Some(stem) if !stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit()) => {
            stem.to_string()
        }
        _ => trimmed.to_string(),
    }
}

/// Order station ids numerically when both parse, otherwise as text.
/// Missing ids sort last.
pub fn compare_ids(a: &str, b: &str) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (is_missing(a), is_missing(b)) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
            (Ok(x), Ok(y)) => x.total_cmp(&y),
            _ => a.cmp(b),
        },
    }
}

pub mod na_literal {
    //! Option fields written as the literal `NA` when missing.

    use super::*;
    use serde::Serialize;

    pub fn serialize<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(v) => v.serialize(serializer),
            None => serializer.serialize_str("NA"),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_f64(deserializer)
    }
}

pub mod na_literal_flag {
    use super::*;

    pub fn serialize<S>(value: &Option<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        super::na_literal::serialize(value, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match deserialize_f64(deserializer)? {
            None => Ok(None),
            Some(v) if v == 0.0 => Ok(Some(0)),
            Some(v) if v == 1.0 => Ok(Some(1)),
            Some(v) => Err(serde::de::Error::custom(format!(
                "weather flag must be 0 or 1, got {}",
                v
            ))),
        }
    }
}
