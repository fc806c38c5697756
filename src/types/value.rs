//! Native and generic value representations.

use crate::error::ConversionError;
use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use std::net::IpAddr;
use uuid::Uuid;

/// Seconds in the average month used when flattening a [`CqlDuration`].
pub const SECONDS_PER_MONTH: i64 = 2_629_800;

/// Seconds in a day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// A CQL `duration`: months, days and nanoseconds are kept apart because
/// their lengths vary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CqlDuration {
    pub months: i32,
    pub days: i32,
    pub nanoseconds: i64,
}

impl CqlDuration {
    pub fn new(months: i32, days: i32, nanoseconds: i64) -> Self {
        Self {
            months,
            days,
            nanoseconds,
        }
    }

    /// Flatten to a fixed-length span, counting a month as 2 629 800 seconds
    /// and a day as 86 400 seconds. `None` on overflow.
    pub fn to_time_delta(&self) -> Option<TimeDelta> {
        let months = TimeDelta::try_seconds(i64::from(self.months) * SECONDS_PER_MONTH)?;
        let days = TimeDelta::try_seconds(i64::from(self.days) * SECONDS_PER_DAY)?;
        months
            .checked_add(&days)?
            .checked_add(&TimeDelta::nanoseconds(self.nanoseconds))
    }
}

/// A value as decoded by the native client.
#[derive(Debug, Clone, PartialEq)]
pub enum CqlValue {
    Ascii(String),
    Text(String),
    Boolean(bool),
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Counter(i64),
    Float(f32),
    Double(f64),
    Blob(Vec<u8>),
    /// Milliseconds since the Unix epoch
    Timestamp(i64),
    Date(NaiveDate),
    Duration(CqlDuration),
    Inet(IpAddr),
    Uuid(Uuid),
    Timeuuid(Uuid),
    List(Vec<CqlValue>),
    Set(Vec<CqlValue>),
    Map(Vec<(CqlValue, CqlValue)>),
}

impl CqlValue {
    /// The text payload of `ascii` and `text` values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CqlValue::Ascii(s) | CqlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A value in the generic driver representation.
///
/// This is what arguments are bound as and what rows are read into.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Duration(CqlDuration),
    Uuid(Uuid),
    Inet(IpAddr),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// The flattened span of a duration value; zero for anything else or on
    /// overflow.
    pub fn duration_or_zero(&self) -> TimeDelta {
        match self {
            Value::Duration(d) => d.to_time_delta().unwrap_or_else(TimeDelta::zero),
            _ => TimeDelta::zero(),
        }
    }

    /// Convert a decoded native value into the generic representation.
    pub fn from_cql(value: &CqlValue) -> Result<Self, ConversionError> {
        Ok(match value {
            CqlValue::Ascii(s) | CqlValue::Text(s) => Value::Text(s.clone()),
            CqlValue::Boolean(b) => Value::Bool(*b),
            CqlValue::TinyInt(v) => Value::Int64(i64::from(*v)),
            CqlValue::SmallInt(v) => Value::Int64(i64::from(*v)),
            CqlValue::Int(v) => Value::Int64(i64::from(*v)),
            CqlValue::BigInt(v) | CqlValue::Counter(v) => Value::Int64(*v),
            CqlValue::Float(v) => Value::Float64(f64::from(*v)),
            CqlValue::Double(v) => Value::Float64(*v),
            CqlValue::Blob(b) => Value::Bytes(b.clone()),
            CqlValue::Timestamp(millis) => Value::Timestamp(
                Utc.timestamp_millis_opt(*millis)
                    .single()
                    .ok_or_else(|| ConversionError::OutOfRange(format!("timestamp {}", millis)))?,
            ),
            CqlValue::Date(d) => Value::Date(*d),
            CqlValue::Duration(d) => Value::Duration(*d),
            CqlValue::Inet(addr) => Value::Inet(*addr),
            CqlValue::Uuid(u) | CqlValue::Timeuuid(u) => Value::Uuid(*u),
            CqlValue::List(items) | CqlValue::Set(items) => Value::List(
                items
                    .iter()
                    .map(Value::from_cql)
                    .collect::<Result<_, _>>()?,
            ),
            CqlValue::Map(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((Value::from_cql(k)?, Value::from_cql(v)?)))
                    .collect::<Result<_, ConversionError>>()?,
            ),
        })
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int64(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
