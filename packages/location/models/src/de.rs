//! Lenient field deserializers for loosely-typed backend payloads.
//!
//! The locations backend is not consistent about scalar types: ids arrive
//! as strings or integers, capacities as numbers or numeric strings, and
//! foot-traffic hours as `14` or `"14:00"`. These helpers accept every
//! observed shape at the boundary so the rest of the workspace works with
//! one concrete type.

use std::str::FromStr;

use serde::{Deserialize, Deserializer};

/// Any JSON scalar.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Text(s) => s.trim().parse().ok(),
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Bool(_) => None,
        }
    }
}

/// Deserializes a required string from a string or number.
///
/// # Errors
///
/// Returns an error if the value is not a JSON scalar.
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Scalar::deserialize(deserializer).map(Scalar::into_string)
}

/// Deserializes an optional string from `null`, a string, or a number.
///
/// Blank strings become `None`.
///
/// # Errors
///
/// Returns an error if the value is neither `null` nor a JSON scalar.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?
        .map(Scalar::into_string)
        .filter(|s| !s.trim().is_empty()))
}

/// Deserializes an optional non-negative integer from a number or a
/// numeric string. Unparseable values become `None`.
///
/// # Errors
///
/// Returns an error if the value is neither `null` nor a JSON scalar.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?
        .and_then(|s| s.as_f64())
        .filter(|v| v.is_finite() && *v >= 0.0 && *v <= f64::from(u32::MAX))
        .map(|v| v.round() as u32))
}

/// Deserializes an `f64` from a number or numeric string.
///
/// Unparseable values become `NaN` so that coordinate validation can
/// reject them downstream instead of failing the whole payload.
///
/// # Errors
///
/// Returns an error if the value is not a JSON scalar.
pub fn f64_or_nan<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Scalar::deserialize(deserializer)?
        .as_f64()
        .unwrap_or(f64::NAN))
}

/// Deserializes an optional enum from its string form, mapping unknown
/// values to `None`.
///
/// # Errors
///
/// Returns an error if the value is neither `null` nor a JSON scalar.
pub fn opt_enum<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?
        .map(Scalar::into_string)
        .and_then(|s| s.trim().to_lowercase().parse().ok()))
}

/// Deserializes a foot-traffic hour from `14`, `"14"` or `"14:00"`.
///
/// # Errors
///
/// Returns an error if the value cannot be read as an hour in `0..=23`.
pub fn hour<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Scalar::deserialize(deserializer)?.into_string();
    parse_hour(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid foot traffic hour: {raw}")))
}

fn parse_hour(raw: &str) -> Option<u8> {
    let head = raw.trim().split(':').next()?;
    let hour: u8 = head.parse().ok()?;
    (hour < 24).then_some(hour)
}
