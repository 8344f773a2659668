//! Row/column conversions shared by the repositories.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::StoreError;

pub(crate) fn parse_decimal(raw: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(raw)
        .map_err(|err| StoreError::Serialization(format!("invalid decimal {raw}: {err}")))
}

pub(crate) fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| StoreError::Serialization(format!("invalid timestamp {raw}: {err}")))
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw)
        .map_err(|err| StoreError::Serialization(format!("invalid id {raw}: {err}")))
}

pub(crate) fn parse_enum<T>(raw: &str) -> Result<T, StoreError>
where
    T: FromStr<Err = String>,
{
    raw.parse::<T>().map_err(StoreError::Serialization)
}

pub(crate) fn optional_text(value: Option<String>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}
