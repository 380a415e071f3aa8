//! Pluggable row converters: turn the tab-separated string fields of
//! one `COPY`-format row into application-level values.
//!
//! Converters are pure and stateless and never fail on their own — a
//! field that matches none of the `Smart` converter's rules simply
//! falls through as a string. The `Result` in the [`Converter`] trait
//! exists only so user-supplied converters have somewhere to signal
//! misbehavior (`ArchiveError::ConverterError`).

use crate::error::ArchiveError;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use ipnetwork::IpNetwork;
use rust_decimal::Decimal;
use std::net::IpAddr;
use std::str::FromStr;
use uuid::Uuid;

/// One converted field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Str(String),
    /// A `bytea` column, carried in `COPY` text as a `\x`-prefixed hex
    /// string.
    Bytes(Vec<u8>),
    /// A bare address (no CIDR prefix), e.g. an `inet` column holding
    /// a single host.
    Ip(IpAddr),
    /// An address with an explicit CIDR prefix, e.g. `cidr` or a
    /// network-valued `inet`.
    IpNetwork(IpNetwork),
    Uuid(Uuid),
    DateTime(DateTime<FixedOffset>),
    Decimal(Decimal),
}

/// Contract implemented by the three built-in converters and by any
/// caller-supplied converter passed to [`crate::archive::Archive::save`]/
/// [`crate::load`].
pub trait Converter {
    fn convert(&self, fields: &[Option<String>]) -> Result<Vec<Value>, ArchiveError>;
}

/// Maps the `\N` NULL token to `Value::Null`; every other field is
/// passed through unchanged as `Value::Str`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConverter;

impl Converter for DefaultConverter {
    fn convert(&self, fields: &[Option<String>]) -> Result<Vec<Value>, ArchiveError> {
        Ok(fields
            .iter()
            .map(|f| match f {
                None => Value::Null,
                Some(s) => Value::Str(s.clone()),
            })
            .collect())
    }
}

/// Returns every field as a raw string (or `Value::Null`), performing
/// no type inference at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpConverter;

impl Converter for NoOpConverter {
    fn convert(&self, fields: &[Option<String>]) -> Result<Vec<Value>, ArchiveError> {
        DefaultConverter.convert(fields)
    }
}

/// Best-effort typed parsing, trying rules in a fixed order and
/// keeping the first that parses successfully: null, integer, IP
/// address/network, UUID, ISO-8601 datetime, decimal, otherwise a raw
/// string.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmartConverter;

impl Converter for SmartConverter {
    fn convert(&self, fields: &[Option<String>]) -> Result<Vec<Value>, ArchiveError> {
        Ok(fields.iter().map(|f| parse_smart(f.as_deref())).collect())
    }
}

fn parse_smart(field: Option<&str>) -> Value {
    let Some(s) = field else {
        return Value::Null;
    };

    if let Some(bytes) = parse_hex_bytes(s) {
        return Value::Bytes(bytes);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(ip) = IpAddr::from_str(s) {
        return Value::Ip(ip);
    }
    if let Ok(net) = IpNetwork::from_str(s) {
        return Value::IpNetwork(net);
    }
    if let Ok(uuid) = Uuid::parse_str(s) {
        return Value::Uuid(uuid);
    }
    if let Some(dt) = parse_datetime(s) {
        return Value::DateTime(dt);
    }
    if let Ok(dec) = Decimal::from_str(s) {
        return Value::Decimal(dec);
    }
    Value::Str(s.to_string())
}

/// Decodes a `bytea` column's `COPY`-text hex representation: a literal
/// `\x` prefix followed by hex digit pairs, the convention `pg_dump`
/// uses for `bytea` since PostgreSQL 9.0's `hex` output format.
fn parse_hex_bytes(s: &str) -> Option<Vec<u8>> {
    let hex_part = s.strip_prefix("\\x")?;
    hex::decode(hex_part).ok()
}

/// Parses an ISO-8601 timestamp. A timezone offset is used verbatim if
/// present; a bare "naive" timestamp (as `pg_dump` emits for
/// `timestamp without time zone` columns) is assumed to be UTC.
fn parse_datetime(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive).fixed_offset());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive).fixed_offset());
    }
    None
}
