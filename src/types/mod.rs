//! Value representations and conversions.
//!
//! [`CqlValue`] is what the native client decodes, [`Value`] is what callers
//! bind and read. The converters in this module move values between the two
//! and validate ordinal arguments.

mod convert;
mod value;

pub use convert::{
    cell_to_value, named_values_to_values, values_to_named_values, ColumnConverter,
    DefaultParameterConverter, NamedValue, ValueConverter,
};
pub use value::{CqlDuration, CqlValue, Value, SECONDS_PER_DAY, SECONDS_PER_MONTH};
