//! JSON text to [`Value`] trees and back, on top of `serde_json`.

use core::fmt;
use std::io;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::error::Category;
use typebind_value::{Number, NumberType, Object, Value};

use crate::{SyntaxError, SyntaxErrorKind};

/// Parses JSON text into a value tree.
///
/// Objects with a repeated key are rejected rather than keeping either value.
pub fn parse_str(text: &str) -> Result<Value, SyntaxError> {
    parse_slice(text.as_bytes())
}

/// Parses UTF-8 encoded JSON into a value tree.
pub fn parse_slice(input: &[u8]) -> Result<Value, SyntaxError> {
    // JSON whitespace only; form feed is not part of it
    if input.iter().all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r')) {
        return Err(SyntaxError::new(SyntaxErrorKind::NoInput, 0, 0));
    }
    serde_json::from_slice::<Parsed>(input)
        .map(|parsed| parsed.0)
        .map_err(normalize)
}

/// Reads the whole stream, then parses it as UTF-8 encoded JSON.
pub fn parse_reader(mut reader: impl io::Read) -> Result<Value, crate::Error> {
    let mut input = Vec::new();
    reader.read_to_end(&mut input)?;
    Ok(parse_slice(&input)?)
}

/// Renders a value tree as JSON text.
pub fn to_string(value: &Value, pretty: bool) -> io::Result<String> {
    let mut out = Vec::new();
    write(value, pretty, &mut out)?;
    String::from_utf8(out).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Writes a value tree as JSON text. The writer is flushed but not closed.
pub fn write(value: &Value, pretty: bool, mut writer: impl io::Write) -> io::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, &Writer(value))?;
    } else {
        serde_json::to_writer(&mut writer, &Writer(value))?;
    }
    writer.flush()
}

/// Maps a `serde_json` error onto the backend-independent syntax error.
fn normalize(error: serde_json::Error) -> SyntaxError {
    let (line, column) = (error.line(), error.column());
    let kind = match error.classify() {
        Category::Syntax | Category::Eof | Category::Io => SyntaxErrorKind::Malformed,
        Category::Data => {
            // our own custom errors; serde_json appends the position to them
            let message = error.to_string();
            let suffix = format!(" at line {line} column {column}");
            let message = message.strip_suffix(&suffix).unwrap_or(&message);
            SyntaxErrorKind::Invalid(message.to_owned())
        }
    };
    tracing::debug!(%error, "rejected JSON input");
    SyntaxError::new(kind, line, column)
}

struct Parsed(Value);

impl<'de> Deserialize<'de> for Parsed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor).map(Parsed)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(Number::from_i64(v)))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(Number::from_u64(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Number::from_f64(v)
            .map(Value::Number)
            .ok_or_else(|| E::custom("number out of range"))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_owned()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(Parsed(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut object = Object::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(key) = map.next_key::<String>()? {
            if object.contains_key(&key) {
                return Err(de::Error::custom(format_args!("duplicate JSON field '{key}'")));
            }
            let Parsed(value) = map.next_value()?;
            object.insert(key, value);
        }
        Ok(Value::Object(object))
    }
}

struct Writer<'a>(&'a Value);

impl Serialize for Writer<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => match (n.number_type(), n.as_i64(), n.as_u64()) {
                (NumberType::I64, Some(i), _) => serializer.serialize_i64(i),
                (NumberType::U64, _, Some(u)) => serializer.serialize_u64(u),
                _ => serializer.serialize_f64(n.as_f64()),
            },
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&Writer(item))?;
                }
                seq.end()
            }
            Value::Object(object) => {
                let mut map = serializer.serialize_map(Some(object.len()))?;
                for (key, value) in object {
                    map.serialize_entry(key, &Writer(value))?;
                }
                map.end()
            }
        }
    }
}
