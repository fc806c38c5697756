//! Conversions between caller values, generic values and native cells.

use super::value::{CqlDuration, Value};
use crate::error::{ConversionError, DriverError};
use crate::native::Cell;
use chrono::{DateTime, NaiveDate, Utc};
use std::any::Any;
use std::net::IpAddr;
use uuid::Uuid;

/// Converts an arbitrary caller value into a generic [`Value`].
pub trait ValueConverter: Send + Sync {
    fn convert_value(&self, value: &dyn Any) -> Result<Value, ConversionError>;
}

/// Converter for the standard scalar Rust types.
///
/// `u64` and `usize` values above `i64::MAX` are rejected because the generic
/// integer kind is signed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultParameterConverter;

macro_rules! try_downcast {
    ($value:expr, $($ty:ty => $conv:expr),+ $(,)?) => {
        $(
            if let Some(v) = $value.downcast_ref::<$ty>() {
                return $conv(v);
            }
        )+
    };
}

impl ValueConverter for DefaultParameterConverter {
    fn convert_value(&self, value: &dyn Any) -> Result<Value, ConversionError> {
        try_downcast!(value,
            Value => |v: &Value| Ok(v.clone()),
            () => |_: &()| Ok(Value::Null),
            bool => |v: &bool| Ok(Value::Bool(*v)),
            i8 => |v: &i8| Ok(Value::Int64(i64::from(*v))),
            i16 => |v: &i16| Ok(Value::Int64(i64::from(*v))),
            i32 => |v: &i32| Ok(Value::Int64(i64::from(*v))),
            i64 => |v: &i64| Ok(Value::Int64(*v)),
            isize => |v: &isize| Ok(Value::Int64(*v as i64)),
            u8 => |v: &u8| Ok(Value::Int64(i64::from(*v))),
            u16 => |v: &u16| Ok(Value::Int64(i64::from(*v))),
            u32 => |v: &u32| Ok(Value::Int64(i64::from(*v))),
            u64 => |v: &u64| i64::try_from(*v)
                .map(Value::Int64)
                .map_err(|_| ConversionError::Uint64HighBit),
            usize => |v: &usize| i64::try_from(*v)
                .map(Value::Int64)
                .map_err(|_| ConversionError::Uint64HighBit),
            f32 => |v: &f32| Ok(Value::Float64(f64::from(*v))),
            f64 => |v: &f64| Ok(Value::Float64(*v)),
            String => |v: &String| Ok(Value::Text(v.clone())),
            &'static str => |v: &&'static str| Ok(Value::Text((*v).to_string())),
            Vec<u8> => |v: &Vec<u8>| Ok(Value::Bytes(v.clone())),
            DateTime<Utc> => |v: &DateTime<Utc>| Ok(Value::Timestamp(*v)),
            NaiveDate => |v: &NaiveDate| Ok(Value::Date(*v)),
            CqlDuration => |v: &CqlDuration| Ok(Value::Duration(*v)),
            Uuid => |v: &Uuid| Ok(Value::Uuid(*v)),
            IpAddr => |v: &IpAddr| Ok(Value::Inet(*v)),
        );

        Err(ConversionError::UnsupportedType {
            type_name: format!("{:?}", value.type_id()),
        })
    }
}

/// Converter handed out per result column.
///
/// Defers to [`DefaultParameterConverter`] and passes `u64` values through
/// unchanged when the default converter rejects them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnConverter;

impl ValueConverter for ColumnConverter {
    fn convert_value(&self, value: &dyn Any) -> Result<Value, ConversionError> {
        match DefaultParameterConverter.convert_value(value) {
            Ok(converted) => Ok(converted),
            Err(err) => match value.downcast_ref::<u64>() {
                Some(v) => Ok(Value::UInt64(*v)),
                None => Err(err),
            },
        }
    }
}

/// An argument with its 1-based position and optional parameter name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValue {
    /// Parameter name, empty for positional arguments
    pub name: String,
    /// 1-based position of the argument
    pub ordinal: usize,
    pub value: Value,
}

impl NamedValue {
    pub fn positional(ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: String::new(),
            ordinal,
            value: value.into(),
        }
    }

    pub fn named(name: &str, ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: name.to_string(),
            ordinal,
            value: value.into(),
        }
    }
}

/// Turn ordered values into ordinal arguments `1..=n`.
pub fn values_to_named_values(values: &[Value]) -> Vec<NamedValue> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| NamedValue::positional(i + 1, v.clone()))
        .collect()
}

/// Place each argument at its 0-based slot.
///
/// Fails if any argument carries a name or if an ordinal lies outside
/// `1..=args.len()`. Slots no argument claimed stay [`Value::Null`]; a repeated
/// ordinal keeps the last value.
pub fn named_values_to_values(args: &[NamedValue]) -> Result<Vec<Value>, DriverError> {
    let mut values = vec![Value::Null; args.len()];
    for arg in args {
        if !arg.name.is_empty() {
            return Err(DriverError::NamedValuesNotSupported);
        }
        if arg.ordinal < 1 || arg.ordinal > args.len() {
            return Err(DriverError::OrdinalOutOfRange);
        }
        values[arg.ordinal - 1] = arg.value.clone();
    }
    Ok(values)
}

/// Read a decoded row cell into a generic value.
///
/// Only decode slots can be read; an empty slot is a null column.
pub fn cell_to_value(cell: &Cell) -> Result<Value, ConversionError> {
    match cell {
        Cell::Slot(Some(value)) => Value::from_cql(value),
        Cell::Slot(None) => Ok(Value::Null),
        Cell::Direct(_) => Err(ConversionError::NotAPointer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CqlValue;

    #[test]
    fn test_default_converter_scalars() {
        let conv = DefaultParameterConverter;
        assert_eq!(conv.convert_value(&7i32).unwrap(), Value::Int64(7));
        assert_eq!(conv.convert_value(&7u8).unwrap(), Value::Int64(7));
        assert_eq!(conv.convert_value(&true).unwrap(), Value::Bool(true));
        assert_eq!(conv.convert_value(&2.5f32).unwrap(), Value::Float64(2.5));
        assert_eq!(
            conv.convert_value(&"abc").unwrap(),
            Value::Text("abc".to_string())
        );
        assert_eq!(conv.convert_value(&()).unwrap(), Value::Null);
        assert_eq!(
            conv.convert_value(&Value::Int64(1)).unwrap(),
            Value::Int64(1)
        );
    }

    #[test]
    fn test_default_converter_rejects_high_bit_u64() {
        let conv = DefaultParameterConverter;
        assert_eq!(conv.convert_value(&42u64).unwrap(), Value::Int64(42));
        assert_eq!(
            conv.convert_value(&u64::MAX),
            Err(ConversionError::Uint64HighBit)
        );
    }

    #[test]
    fn test_default_converter_rejects_unknown_type() {
        struct Opaque;
        let err = DefaultParameterConverter.convert_value(&Opaque).unwrap_err();
        assert!(matches!(err, ConversionError::UnsupportedType { .. }));
    }

    #[test]
    fn test_column_converter_passes_u64_through() {
        let conv = ColumnConverter;
        assert_eq!(conv.convert_value(&u64::MAX).unwrap(), Value::UInt64(u64::MAX));
        assert_eq!(conv.convert_value(&5u64).unwrap(), Value::Int64(5));
        assert!(conv.convert_value(&vec!['x']).is_err());
    }

    #[test]
    fn test_named_values_reordered_by_ordinal() {
        let args = vec![
            NamedValue::positional(2, "b"),
            NamedValue::positional(1, "a"),
        ];
        assert_eq!(
            named_values_to_values(&args).unwrap(),
            vec![Value::Text("a".to_string()), Value::Text("b".to_string())]
        );
    }

    #[test]
    fn test_named_values_rejects_names() {
        let args = vec![
            NamedValue::positional(1, 1i64),
            NamedValue::named("a", 2, 2i64),
        ];
        assert!(matches!(
            named_values_to_values(&args),
            Err(DriverError::NamedValuesNotSupported)
        ));
    }

    #[test]
    fn test_named_values_rejects_out_of_range_ordinal() {
        let zero = vec![NamedValue::positional(0, 1i64)];
        assert!(matches!(
            named_values_to_values(&zero),
            Err(DriverError::OrdinalOutOfRange)
        ));

        let past_end = vec![NamedValue::positional(1, 1i64), NamedValue::positional(3, 2i64)];
        assert!(matches!(
            named_values_to_values(&past_end),
            Err(DriverError::OrdinalOutOfRange)
        ));
    }

    #[test]
    fn test_named_values_duplicate_ordinal_leaves_null() {
        let args = vec![NamedValue::positional(1, 1i64), NamedValue::positional(1, 2i64)];
        assert_eq!(
            named_values_to_values(&args).unwrap(),
            vec![Value::Int64(2), Value::Null]
        );
    }

    #[test]
    fn test_values_to_named_values() {
        let named = values_to_named_values(&[Value::Bool(true), Value::Null]);
        assert_eq!(named[0], NamedValue::positional(1, true));
        assert_eq!(named[1].ordinal, 2);
    }

    #[test]
    fn test_cell_to_value() {
        let cell = Cell::Slot(Some(CqlValue::Text("one".to_string())));
        assert_eq!(cell_to_value(&cell).unwrap(), Value::Text("one".to_string()));
        assert_eq!(cell_to_value(&Cell::Slot(None)).unwrap(), Value::Null);
        assert_eq!(
            cell_to_value(&Cell::Direct(CqlValue::Int(1))),
            Err(ConversionError::NotAPointer)
        );
    }
}
