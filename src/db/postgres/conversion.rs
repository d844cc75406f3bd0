//! Type conversion between builder values and PostgreSQL types.
//!
//! Handles conversion between:
//! - bound `String` values → the parameter type the server inferred
//! - result columns → `serde_json::Value`

use std::error::Error;

use bytes::{BufMut, BytesMut};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use postgres::Row;
use postgres::types::{Format, IsNull, ToSql, Type, to_sql_checked};
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use crate::db::DbError;

/// A value sent in text format, parsed by the server as the parameter type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextParam(pub String);

impl ToSql for TextParam {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        out.put_slice(self.0.as_bytes());
        Ok(IsNull::No)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, _ty: &Type) -> Format {
        Format::Text
    }

    to_sql_checked!();
}

/// Convert a textual builder value into a parameter of type `ty`.
///
/// Types without a native conversion (NUMERIC, DATE, TIMESTAMP, UUID, ...)
/// are sent as text and coerced by the server.
///
/// # Errors
/// Returns [`DbError::UnsupportedParameter`] when the text does not parse as
/// a natively converted `ty`.
pub fn bind_param(ty: &Type, value: &str) -> Result<Box<dyn ToSql + Sync>, DbError> {
    let unsupported = || DbError::UnsupportedParameter {
        type_name: ty.name().to_string(),
        value: value.to_string(),
    };

    let param: Box<dyn ToSql + Sync> = match *ty {
        Type::BOOL => Box::new(parse_bool(value).ok_or_else(unsupported)?),
        Type::INT2 => Box::new(value.trim().parse::<i16>().map_err(|_| unsupported())?),
        Type::INT4 => Box::new(value.trim().parse::<i32>().map_err(|_| unsupported())?),
        Type::INT8 => Box::new(value.trim().parse::<i64>().map_err(|_| unsupported())?),
        Type::FLOAT4 => Box::new(value.trim().parse::<f32>().map_err(|_| unsupported())?),
        Type::FLOAT8 => Box::new(value.trim().parse::<f64>().map_err(|_| unsupported())?),
        Type::JSON | Type::JSONB => {
            Box::new(serde_json::from_str::<Value>(value).map_err(|_| unsupported())?)
        }
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            Box::new(value.to_string())
        }
        _ => Box::new(TextParam(value.to_string())),
    };
    Ok(param)
}

/// Read column `idx` of `row` as a JSON value. SQL NULL becomes `Value::Null`.
///
/// NUMERIC, date/time and UUID columns come back as their text form, so no
/// precision is lost.
///
/// # Errors
/// Returns [`DbError::Decode`] when the column type has no conversion.
pub fn column_value(row: &Row, idx: usize) -> Result<Value, DbError> {
    let column = &row.columns()[idx];
    let ty = column.type_().clone();
    let decode = |e: postgres::Error| DbError::Decode {
        message: format!("column {}: {}", column.name(), e),
    };

    let value = match ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx).map_err(decode)?.map(Value::from),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx).map_err(decode)?.map(Value::from),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx).map_err(decode)?.map(Value::from),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx).map_err(decode)?.map(Value::from),
        Type::OID => row.try_get::<_, Option<u32>>(idx).map_err(decode)?.map(Value::from),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx).map_err(decode)?.map(Value::from),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).map_err(decode)?.map(Value::from),
        Type::JSON | Type::JSONB => row.try_get::<_, Option<Value>>(idx).map_err(decode)?,
        Type::NUMERIC => text(row.try_get::<_, Option<Decimal>>(idx).map_err(decode)?),
        Type::DATE => text(row.try_get::<_, Option<NaiveDate>>(idx).map_err(decode)?),
        Type::TIME => text(row.try_get::<_, Option<NaiveTime>>(idx).map_err(decode)?),
        Type::TIMESTAMP => text(row.try_get::<_, Option<NaiveDateTime>>(idx).map_err(decode)?),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .map_err(decode)?
            .map(|at| Value::from(at.to_rfc3339())),
        Type::UUID => text(row.try_get::<_, Option<Uuid>>(idx).map_err(decode)?),
        Type::BYTEA => row
            .try_get::<_, Option<Vec<u8>>>(idx)
            .map_err(decode)?
            .map(|bytes| Value::from(bytea_hex(&bytes))),
        _ if <String as postgres::types::FromSql>::accepts(&ty) => {
            row.try_get::<_, Option<String>>(idx).map_err(decode)?.map(Value::from)
        }
        _ => {
            return Err(DbError::Decode {
                message: format!("column {}: unsupported type {}", column.name(), ty.name()),
            });
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

fn text<T: ToString>(value: Option<T>) -> Option<Value> {
    value.map(|v| Value::from(v.to_string()))
}

/// PostgreSQL's hex output format, e.g. `\x00ff`.
fn bytea_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "1" | "yes" | "on" => Some(true),
        "f" | "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
