//! Row decoding into JSON.
//!
//! Rows coming back from table reads and raw queries have no static shape, so
//! each column is decoded by the logical category of its reported type:
//!
//! 1. [`categorize_type`] maps the engine's type name to a [`TypeCategory`]
//! 2. an engine-specific decoder extracts the value for that category
//!
//! Types with no dedicated decoder fall back to the raw value: text-protocol
//! values pass through as the server rendered them, binary-protocol values are
//! rendered from their wire form (or base64 when the form is opaque). Only SQL
//! `NULL` becomes `null`.

use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueFormat, PgValueRef};
use sqlx::{Column, Decode, Row, Type, TypeInfo};

use crate::models::JsonRow;

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Temporal,
    /// Postgres arrays
    Array,
    Unknown,
}

/// Classify a sqlx type name into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();

    if lower.ends_with("[]") {
        return TypeCategory::Array;
    }

    if lower.contains("decimal") || lower.contains("numeric") {
        return TypeCategory::Decimal;
    }

    match lower.as_str() {
        "timestamptz" | "timestamp" | "datetime" | "date" | "time" => {
            return TypeCategory::Temporal;
        }
        "bool" | "boolean" => return TypeCategory::Boolean,
        "json" | "jsonb" => return TypeCategory::Json,
        "uuid" => return TypeCategory::Uuid,
        "oid" => return TypeCategory::Integer,
        // would match the "int" check below
        "interval" | "point" => return TypeCategory::Unknown,
        _ => {}
    }

    if lower.contains("int") || lower.contains("serial") {
        return TypeCategory::Integer;
    }

    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    if lower.contains("char")
        || lower.contains("text")
        || lower == "name"
        || lower == "enum"
        || lower == "set"
    {
        return TypeCategory::Text;
    }

    TypeCategory::Unknown
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// DECIMAL/NUMERIC kept as its exact textual representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

// Simple-protocol results arrive as text; prepared statements (anything with
// bind parameters) return NUMERIC in its binary wire form.
impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        match value.format() {
            PgValueFormat::Text => Ok(RawDecimal(value.as_str()?.to_string())),
            PgValueFormat::Binary => numeric_to_string(value.as_bytes()?).map(RawDecimal),
        }
    }
}

/// Render a binary NUMERIC (base-10000 digit groups) as its decimal text.
fn numeric_to_string(bytes: &[u8]) -> Result<String, sqlx::error::BoxDynError> {
    use std::fmt::Write as _;

    if bytes.len() < 8 {
        return Err("NUMERIC value shorter than its header".into());
    }
    let word = |i: usize| u16::from_be_bytes([bytes[i], bytes[i + 1]]);
    let ndigits = word(0) as usize;
    let weight = word(2) as i16 as i32;
    let sign = word(4);
    let dscale = word(6) as usize;

    match sign {
        0x0000 | 0x4000 => {}
        0xC000 => return Ok("NaN".to_string()),
        0xD000 => return Ok("Infinity".to_string()),
        0xF000 => return Ok("-Infinity".to_string()),
        other => return Err(format!("invalid NUMERIC sign {:#06x}", other).into()),
    }
    if bytes.len() < 8 + ndigits * 2 {
        return Err("NUMERIC value shorter than its digit count".into());
    }
    let digit = |group: i32| -> u16 {
        if group < 0 || group as usize >= ndigits {
            0
        } else {
            word(8 + group as usize * 2)
        }
    };

    let mut out = String::new();
    if sign == 0x4000 {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        for group in 0..=weight {
            if group == 0 {
                write!(out, "{}", digit(group))?;
            } else {
                write!(out, "{:04}", digit(group))?;
            }
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut group = weight + 1;
        while fraction.len() < dscale {
            write!(fraction, "{:04}", digit(group))?;
            group += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }

    Ok(out)
}

// =============================================================================
// Shared Value Helpers
// =============================================================================

/// Binary data is always returned base64-encoded.
pub fn encode_binary(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    JsonValue::String(STANDARD.encode(bytes))
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

fn naive_datetime_value(v: NaiveDateTime) -> JsonValue {
    JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

fn utc_datetime_value(v: DateTime<Utc>) -> JsonValue {
    JsonValue::String(v.to_rfc3339())
}

// =============================================================================
// Postgres Wire Rendering
// =============================================================================

/// INTERVAL in the server's default `postgres` style, e.g. `1 year 2 mons 3 days 04:05:06.5`.
fn interval_text(months: i32, days: i32, microseconds: i64) -> String {
    let unit = |n: i64, name: &str| {
        if n.abs() == 1 {
            format!("{} {}", n, name)
        } else {
            format!("{} {}s", n, name)
        }
    };

    let mut parts = Vec::new();
    if months / 12 != 0 {
        parts.push(unit((months / 12) as i64, "year"));
    }
    if months % 12 != 0 {
        parts.push(unit((months % 12) as i64, "mon"));
    }
    if days != 0 {
        parts.push(unit(days as i64, "day"));
    }
    if microseconds != 0 || parts.is_empty() {
        let total = microseconds.unsigned_abs();
        let secs = total / 1_000_000;
        let mut clock = format!(
            "{}{:02}:{:02}:{:02}",
            if microseconds < 0 { "-" } else { "" },
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        let fraction = total % 1_000_000;
        if fraction != 0 {
            clock.push('.');
            clock.push_str(format!("{:06}", fraction).trim_end_matches('0'));
        }
        parts.push(clock);
    }
    parts.join(" ")
}

/// MONEY from its integer cents; the currency symbol is locale-dependent and omitted.
fn money_text(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// TIMETZ as `HH:MM:SS[.f]+HH[:MM]`.
fn timetz_text(time: NaiveTime, offset_seconds: i32) -> String {
    let sign = if offset_seconds < 0 { '-' } else { '+' };
    let abs = offset_seconds.unsigned_abs();
    let (hours, minutes) = (abs / 3600, abs / 60 % 60);
    if minutes == 0 {
        format!("{}{}{:02}", time, sign, hours)
    } else {
        format!("{}{}{:02}:{:02}", time, sign, hours, minutes)
    }
}

/// INET / CIDR: family, prefix bits, cidr flag, address length, address.
fn inet_text(bytes: &[u8]) -> Result<String, sqlx::error::BoxDynError> {
    let [family, bits, is_cidr, len, addr @ ..] = bytes else {
        return Err("INET value shorter than its header".into());
    };
    let (addr, max_bits) = match (*family, *len as usize, addr.len()) {
        (2, 4, 4) => (Ipv4Addr::new(addr[0], addr[1], addr[2], addr[3]).to_string(), 32),
        (3, 16, 16) => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(addr);
            (Ipv6Addr::from(octets).to_string(), 128)
        }
        _ => return Err(format!("unsupported INET family {}", family).into()),
    };
    if *is_cidr == 0 && *bits == max_bits {
        Ok(addr)
    } else {
        Ok(format!("{}/{}", addr, bits))
    }
}

/// BIT / VARBIT: bit length followed by the packed bits, most significant first.
fn bits_text(bytes: &[u8]) -> Result<String, sqlx::error::BoxDynError> {
    let Some((header, packed)) = bytes.split_first_chunk::<4>() else {
        return Err("BIT value shorter than its header".into());
    };
    let len = i32::from_be_bytes(*header).max(0) as usize;
    if packed.len() * 8 < len {
        return Err("BIT value shorter than its bit length".into());
    }
    Ok((0..len)
        .map(|i| if packed[i / 8] & (0x80 >> (i % 8)) != 0 { '1' } else { '0' })
        .collect())
}

/// POINT: two big-endian float8 coordinates.
fn point_text(bytes: &[u8]) -> Result<String, sqlx::error::BoxDynError> {
    let (Some(x), Some(y)) = (
        bytes.get(0..8).and_then(|b| b.try_into().ok()),
        bytes.get(8..16).and_then(|b| b.try_into().ok()),
    ) else {
        return Err("POINT value shorter than two coordinates".into());
    };
    Ok(format!("({},{})", f64::from_be_bytes(x), f64::from_be_bytes(y)))
}

/// MACADDR / MACADDR8 as colon-separated hex.
fn macaddr_text(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

// =============================================================================
// Row to JSON Trait
// =============================================================================

/// Convert a database row to a column-name keyed JSON map.
pub trait RowToJson {
    fn to_json_row(&self) -> JsonRow;
}

impl RowToJson for MySqlRow {
    fn to_json_row(&self) -> JsonRow {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name());
                (col.name().to_string(), mysql::decode_column(self, idx, category))
            })
            .collect()
    }
}

impl RowToJson for PgRow {
    fn to_json_row(&self) -> JsonRow {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name());
                (col.name().to_string(), postgres::decode_column(self, idx, category))
            })
            .collect()
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Decimal => decode_decimal(row, idx),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => decode_boolean(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => decode_binary(row, idx),
            TypeCategory::Json => decode_json(row, idx),
            TypeCategory::Temporal => decode_temporal(row, idx),
            _ => decode_text(row, idx),
        }
    }

    fn decode_decimal(row: &MySqlRow, idx: usize) -> JsonValue {
        match row.try_get::<Option<RawDecimal>, _>(idx) {
            Ok(Some(v)) => JsonValue::String(v.0),
            Ok(None) => JsonValue::Null,
            Err(e) => {
                tracing::warn!(column = idx, error = %e, "Failed to decode DECIMAL");
                JsonValue::Null
            }
        }
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(None) = row.try_get::<Option<i64>, _>(idx) {
            return JsonValue::Null;
        }
        if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i8>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        // UNSIGNED columns only decode into unsigned types
        if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u32>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u16>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u8>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        JsonValue::Null
    }

    fn decode_boolean(row: &MySqlRow, idx: usize) -> JsonValue {
        row.try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(JsonValue::Bool)
            .unwrap_or(JsonValue::Null)
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
            return float_value(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
            return float_value(v as f64);
        }
        JsonValue::Null
    }

    fn decode_binary(row: &MySqlRow, idx: usize) -> JsonValue {
        row.try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(|v| encode_binary(&v))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_json(row: &MySqlRow, idx: usize) -> JsonValue {
        row.try_get::<Option<JsonValue>, _>(idx)
            .ok()
            .flatten()
            .unwrap_or(JsonValue::Null)
    }

    fn decode_temporal(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
            return v.map(utc_datetime_value).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
            return v.map(naive_datetime_value).unwrap_or(JsonValue::Null);
        }
        if let Ok(Some(v)) = row.try_get::<Option<NaiveDate>, _>(idx) {
            return JsonValue::String(v.to_string());
        }
        if let Ok(Some(v)) = row.try_get::<Option<NaiveTime>, _>(idx) {
            return JsonValue::String(v.to_string());
        }
        JsonValue::Null
    }

    fn decode_text(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
            return v.map(JsonValue::String).unwrap_or(JsonValue::Null);
        }
        // BIT, YEAR, GEOMETRY and friends: take the raw bytes
        match row.try_get_unchecked::<Option<Vec<u8>>, _>(idx) {
            Ok(Some(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => JsonValue::String(text),
                Err(e) => encode_binary(e.as_bytes()),
            },
            Ok(None) => JsonValue::Null,
            Err(e) => {
                let type_name = row.column(idx).type_info().name();
                tracing::warn!(column = idx, type_name, error = %e, "Failed to decode value");
                JsonValue::Null
            }
        }
    }
}

mod postgres {
    use super::*;
    use chrono::FixedOffset;
    use sqlx::ValueRef;
    use sqlx::postgres::PgTypeKind;
    use sqlx::postgres::types::{Oid, PgInterval, PgMoney, PgTimeTz};

    pub fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Decimal => decode_decimal(row, idx),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => decode_boolean(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => decode_binary(row, idx),
            TypeCategory::Json => decode_json(row, idx),
            TypeCategory::Uuid => decode_uuid(row, idx),
            TypeCategory::Temporal => decode_temporal(row, idx),
            TypeCategory::Array => decode_array(row, idx),
            TypeCategory::Text => decode_text(row, idx),
            TypeCategory::Unknown => decode_raw(row, idx),
        }
    }

    fn decode_decimal(row: &PgRow, idx: usize) -> JsonValue {
        match row.try_get::<Option<RawDecimal>, _>(idx) {
            Ok(Some(v)) => JsonValue::String(v.0),
            Ok(None) => JsonValue::Null,
            Err(e) => {
                tracing::warn!(column = idx, error = %e, "Failed to decode NUMERIC");
                JsonValue::Null
            }
        }
    }

    fn decode_integer(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(None) = row.try_get::<Option<i64>, _>(idx) {
            return JsonValue::Null;
        }
        if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<Oid>, _>(idx) {
            return JsonValue::Number(v.0.into());
        }
        JsonValue::Null
    }

    fn decode_boolean(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(JsonValue::Bool)
            .unwrap_or(JsonValue::Null)
    }

    fn decode_float(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
            return float_value(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
            return float_value(v as f64);
        }
        JsonValue::Null
    }

    fn decode_binary(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(|v| encode_binary(&v))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_json(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<JsonValue>, _>(idx)
            .ok()
            .flatten()
            .unwrap_or(JsonValue::Null)
    }

    fn decode_uuid(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<uuid::Uuid>, _>(idx)
            .ok()
            .flatten()
            .map(|v| JsonValue::String(v.to_string()))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_temporal(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
            return v.map(utc_datetime_value).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
            return v.map(naive_datetime_value).unwrap_or(JsonValue::Null);
        }
        if let Ok(Some(v)) = row.try_get::<Option<NaiveDate>, _>(idx) {
            return JsonValue::String(v.to_string());
        }
        if let Ok(Some(v)) = row.try_get::<Option<NaiveTime>, _>(idx) {
            return JsonValue::String(v.to_string());
        }
        JsonValue::Null
    }

    fn decode_array(row: &PgRow, idx: usize) -> JsonValue {
        fn to_json<T>(items: Vec<Option<T>>, f: impl Fn(T) -> JsonValue) -> JsonValue {
            JsonValue::Array(
                items
                    .into_iter()
                    .map(|item| item.map(&f).unwrap_or(JsonValue::Null))
                    .collect(),
            )
        }

        if let Ok(None) = row.try_get::<Option<Vec<Option<String>>>, _>(idx) {
            return JsonValue::Null;
        }
        if let Ok(Some(v)) = row.try_get::<Option<Vec<Option<String>>>, _>(idx) {
            return to_json(v, JsonValue::String);
        }
        if let Ok(Some(v)) = row.try_get::<Option<Vec<Option<i64>>>, _>(idx) {
            return to_json(v, |n| JsonValue::Number(n.into()));
        }
        if let Ok(Some(v)) = row.try_get::<Option<Vec<Option<i32>>>, _>(idx) {
            return to_json(v, |n| JsonValue::Number(n.into()));
        }
        if let Ok(Some(v)) = row.try_get::<Option<Vec<Option<i16>>>, _>(idx) {
            return to_json(v, |n| JsonValue::Number(n.into()));
        }
        if let Ok(Some(v)) = row.try_get::<Option<Vec<Option<bool>>>, _>(idx) {
            return to_json(v, JsonValue::Bool);
        }
        if let Ok(Some(v)) = row.try_get::<Option<Vec<Option<f64>>>, _>(idx) {
            return to_json(v, float_value);
        }
        JsonValue::Null
    }

    fn decode_text(row: &PgRow, idx: usize) -> JsonValue {
        match row.try_get::<Option<String>, _>(idx) {
            Ok(v) => v.map(JsonValue::String).unwrap_or(JsonValue::Null),
            Err(_) => decode_raw(row, idx),
        }
    }

    /// Render a value of a type without a dedicated decoder.
    fn decode_raw(row: &PgRow, idx: usize) -> JsonValue {
        let value = match row.try_get_raw(idx) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(column = idx, error = %e, "Failed to read raw value");
                return JsonValue::Null;
            }
        };
        if value.is_null() {
            return JsonValue::Null;
        }
        let type_info = value.type_info().into_owned();

        match value.format() {
            PgValueFormat::Text => match value.as_str() {
                Ok(text) => JsonValue::String(text.to_string()),
                Err(e) => {
                    tracing::warn!(column = idx, type_name = type_info.name(), error = %e, "Value is not valid UTF-8");
                    value.as_bytes().map(encode_binary).unwrap_or(JsonValue::Null)
                }
            },
            PgValueFormat::Binary => {
                let bytes = match value.as_bytes() {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(column = idx, error = %e, "Failed to read raw value");
                        return JsonValue::Null;
                    }
                };
                match render_binary(&type_info, value, bytes) {
                    Ok(Some(text)) => JsonValue::String(text),
                    Ok(None) => encode_binary(bytes),
                    Err(e) => {
                        tracing::warn!(column = idx, type_name = type_info.name(), error = %e, "Failed to decode value");
                        encode_binary(bytes)
                    }
                }
            }
        }
    }

    /// Text rendering of known binary wire forms; `None` when the form is opaque.
    fn render_binary(
        type_info: &PgTypeInfo,
        value: PgValueRef<'_>,
        bytes: &[u8],
    ) -> Result<Option<String>, sqlx::error::BoxDynError> {
        let text = match type_info.name().to_lowercase().as_str() {
            "interval" => {
                let v = <PgInterval as Decode<sqlx::Postgres>>::decode(value)?;
                interval_text(v.months, v.days, v.microseconds)
            }
            "money" => money_text(<PgMoney as Decode<sqlx::Postgres>>::decode(value)?.0),
            "timetz" => {
                let v = <PgTimeTz<NaiveTime, FixedOffset> as Decode<sqlx::Postgres>>::decode(value)?;
                timetz_text(v.time, v.offset.local_minus_utc())
            }
            "inet" | "cidr" => inet_text(bytes)?,
            "bit" | "varbit" => bits_text(bytes)?,
            "point" => point_text(bytes)?,
            "macaddr" | "macaddr8" => macaddr_text(bytes),
            // sent in the client encoding, which sqlx pins to UTF-8
            "xml" | "citext" | "ltree" => std::str::from_utf8(bytes)?.to_string(),
            _ if matches!(type_info.kind(), PgTypeKind::Enum(_)) => {
                std::str::from_utf8(bytes)?.to_string()
            }
            _ => return Ok(None),
        };
        Ok(Some(text))
    }
}
