use core::any::Any;

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime, Time};
use typebind_value::{Value, ValueKind};

use crate::{
    AnyValue, Def, Deserializer, ErrorNode, RawType, Registries, Serializer, TypeDescriptor, Typed,
    downcast_ref, expected,
};

const DATE: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");
const TIME_PARSE: &[BorrowedFormatItem<'_>] =
    format_description!("[hour]:[minute][optional [:[second][optional [.[subsecond]]]]]");
const TIME_WHOLE_SECONDS: &[BorrowedFormatItem<'_>] = format_description!("[hour]:[minute]:[second]");
const TIME_SUBSECONDS: &[BorrowedFormatItem<'_>] =
    format_description!("[hour]:[minute]:[second].[subsecond]");
const DATE_TIME_PARSE: &[BorrowedFormatItem<'_>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute][optional [:[second][optional [.[subsecond]]]]]"
);
const DATE_TIME_WHOLE_SECONDS: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const DATE_TIME_SUBSECONDS: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");

impl Typed for Date {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::raw(RawType::of::<Date>("Date")).with_def(Def::Scalar)
    }
}

impl Typed for Time {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::raw(RawType::of::<Time>("Time")).with_def(Def::Scalar)
    }
}

impl Typed for PrimitiveDateTime {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::raw(RawType::of::<PrimitiveDateTime>("DateTime")).with_def(Def::Scalar)
    }
}

/// Parses an ISO-8601 calendar date, `2024-02-29`.
pub fn parse_date(text: &str) -> Result<Date, String> {
    Date::parse(text, DATE).map_err(|e| e.to_string())
}

/// Parses an ISO-8601 local time, `10:15`, `10:15:30` or `10:15:30.25`.
pub fn parse_time(text: &str) -> Result<Time, String> {
    Time::parse(text, TIME_PARSE).map_err(|e| e.to_string())
}

/// Parses an ISO-8601 local date-time, `2024-02-29T10:15:30`.
pub fn parse_date_time(text: &str) -> Result<PrimitiveDateTime, String> {
    PrimitiveDateTime::parse(text, DATE_TIME_PARSE).map_err(|e| e.to_string())
}

fn format_time(time: Time) -> Result<String, time::error::Format> {
    if time.nanosecond() == 0 {
        time.format(TIME_WHOLE_SECONDS)
    } else {
        time.format(TIME_SUBSECONDS)
    }
}

fn format_date_time(value: PrimitiveDateTime) -> Result<String, time::error::Format> {
    if value.nanosecond() == 0 {
        value.format(DATE_TIME_WHOLE_SECONDS)
    } else {
        value.format(DATE_TIME_SUBSECONDS)
    }
}

macro_rules! temporal_converter {
    ($(#[$meta:meta])* $name:ident, $t:ty, $parse:path, $format:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Deserializer for $name {
            fn supports_for_deserialization(&self, ty: &TypeDescriptor) -> bool {
                ty.is::<$t>()
            }

            fn deserialize(
                &self,
                value: &Value,
                _: &TypeDescriptor,
                _: &Registries,
            ) -> Result<AnyValue, ErrorNode> {
                let Value::String(text) = value else {
                    return Err(expected(ValueKind::String, value));
                };
                match $parse(text) {
                    Ok(parsed) => Ok(Box::new(parsed)),
                    Err(message) => Err(ErrorNode::message(message)),
                }
            }
        }

        impl Serializer for $name {
            fn supports_for_serialization(&self, raw: &RawType) -> bool {
                raw.is::<$t>()
            }

            fn serialize(
                &self,
                value: &dyn Any,
                _: &TypeDescriptor,
                _: &Registries,
            ) -> Result<Value, ErrorNode> {
                let value = *downcast_ref::<$t>(value)?;
                let format: fn($t) -> Result<String, time::error::Format> = $format;
                format(value).map(Value::String).map_err(ErrorNode::internal)
            }
        }
    };
}

temporal_converter!(
    /// Converts [`time::Date`] from and to `YYYY-MM-DD` strings.
    DateConverter,
    Date,
    parse_date,
    |date| date.format(DATE)
);

temporal_converter!(
    /// Converts [`time::Time`] from and to `HH:MM:SS[.fraction]` strings.
    TimeConverter,
    Time,
    parse_time,
    format_time
);

temporal_converter!(
    /// Converts [`time::PrimitiveDateTime`] from and to
    /// `YYYY-MM-DDTHH:MM:SS[.fraction]` strings.
    DateTimeConverter,
    PrimitiveDateTime,
    parse_date_time,
    format_date_time
);
