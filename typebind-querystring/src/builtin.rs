//! Parsers for the parameter types every application needs.

use core::marker::PhantomData;
use core::num::{IntErrorKind, ParseIntError};
use core::str::FromStr;

use time::Date;
use typebind_core::builtin::{optional_raw, parse_date};
use typebind_core::{AnyValue, Def, TypeDescriptor, TypeMismatch, Typed};

use crate::{FromStringParser, FromStringParserRegistry, ParseError};

pub(crate) fn register_builtins(registry: &mut FromStringParserRegistry) {
    registry.register(StringParser);
    registry.register(IntegerParser::<i8>::new());
    registry.register(IntegerParser::<i16>::new());
    registry.register(IntegerParser::<i32>::new());
    registry.register(IntegerParser::<i64>::new());
    registry.register(IntegerParser::<isize>::new());
    registry.register(IntegerParser::<u8>::new());
    registry.register(IntegerParser::<u16>::new());
    registry.register(IntegerParser::<u32>::new());
    registry.register(IntegerParser::<u64>::new());
    registry.register(IntegerParser::<usize>::new());
    registry.register(BooleanParser);
    registry.register(DateParser);
    registry.register(OptionalFieldParser);
}

/// Takes the text as it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringParser;

impl FromStringParser for StringParser {
    fn supports_type(&self, ty: &TypeDescriptor) -> bool {
        ty.is::<String>()
    }

    fn parse_from_string(
        &self,
        text: &str,
        _ty: &TypeDescriptor,
        _parsers: &FromStringParserRegistry,
    ) -> Result<AnyValue, ParseError> {
        Ok(Box::new(text.to_owned()))
    }
}

/// Parses decimal integers of one width.
///
/// A leading `+` or `-` is accepted; surrounding whitespace is not.
pub struct IntegerParser<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> IntegerParser<T> {
    /// Creates the parser.
    pub const fn new() -> Self {
        IntegerParser {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for IntegerParser<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromStringParser for IntegerParser<T>
where
    T: Typed + FromStr<Err = ParseIntError>,
{
    fn supports_type(&self, ty: &TypeDescriptor) -> bool {
        ty.is::<T>()
    }

    fn parse_from_string(
        &self,
        text: &str,
        ty: &TypeDescriptor,
        _parsers: &FromStringParserRegistry,
    ) -> Result<AnyValue, ParseError> {
        match text.parse::<T>() {
            Ok(value) => Ok(Box::new(value)),
            Err(e) => Err(ParseError::Invalid(match e.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                    format!("value out of range for {ty}: {text}")
                }
                _ => format!("expected integer, found: {text:?}"),
            })),
        }
    }
}

/// Parses `true` and `false`, nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanParser;

impl FromStringParser for BooleanParser {
    fn supports_type(&self, ty: &TypeDescriptor) -> bool {
        ty.is::<bool>()
    }

    fn parse_from_string(
        &self,
        text: &str,
        _ty: &TypeDescriptor,
        _parsers: &FromStringParserRegistry,
    ) -> Result<AnyValue, ParseError> {
        match text {
            "true" => Ok(Box::new(true)),
            "false" => Ok(Box::new(false)),
            _ => Err(ParseError::Invalid(format!("expected true or false, found: {text:?}"))),
        }
    }
}

/// Parses ISO-8601 calendar dates, `2024-02-29`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateParser;

impl FromStringParser for DateParser {
    fn supports_type(&self, ty: &TypeDescriptor) -> bool {
        ty.is::<Date>()
    }

    fn parse_from_string(
        &self,
        text: &str,
        _ty: &TypeDescriptor,
        _parsers: &FromStringParserRegistry,
    ) -> Result<AnyValue, ParseError> {
        let date = parse_date(text).map_err(ParseError::Invalid)?;
        Ok(Box::new(date))
    }
}

/// Parses [`OptionalField<T>`](typebind_core::OptionalField) with the
/// parser of `T`; a parameter that is not given becomes the absent state.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalFieldParser;

impl OptionalFieldParser {
    fn wrap(ty: &TypeDescriptor, inner: Option<AnyValue>) -> Result<AnyValue, ParseError> {
        let Some(Def::Optional(def)) = ty.def() else {
            return Err(ParseError::internal(TypeMismatch {
                expected: ty.to_string(),
            }));
        };
        (def.wrap)(inner).map_err(ParseError::internal)
    }
}

impl FromStringParser for OptionalFieldParser {
    fn supports_type(&self, ty: &TypeDescriptor) -> bool {
        ty.is_applied(&optional_raw(), 1)
    }

    fn parse_from_string(
        &self,
        text: &str,
        ty: &TypeDescriptor,
        parsers: &FromStringParserRegistry,
    ) -> Result<AnyValue, ParseError> {
        let inner_ty = ty.args().first().ok_or_else(|| {
            ParseError::internal(TypeMismatch {
                expected: ty.to_string(),
            })
        })?;
        let inner = parsers
            .get(inner_ty)
            .map_err(ParseError::internal)?
            .parse_from_string(text, inner_ty, parsers)?;
        Self::wrap(ty, Some(inner))
    }

    fn parse_from_absent_string(
        &self,
        ty: &TypeDescriptor,
        _parsers: &FromStringParserRegistry,
    ) -> Result<AnyValue, ParseError> {
        Self::wrap(ty, None)
    }
}
