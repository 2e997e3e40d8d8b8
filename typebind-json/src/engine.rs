use core::any::Any;
use std::io;
use std::sync::Arc;

use tracing::{error, trace};
use typebind_core::{
    AnyValue, DeserializeError, Deserializer, ErrorNode, Record, RecordOptions, Registries, SerializeError,
    Serializer, TypeDescriptor, Typed, downcast_owned,
};
use typebind_value::Value;

use crate::{Error, text};

/// Settings for a [`JsonEngine`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonConfig {
    /// Indent written JSON
    pub pretty: bool,
    /// Skip object properties that match no record component instead of
    /// failing with "unexpected property"
    pub ignore_unknown_properties: bool,
}

/// Converts between JSON text and typed values.
///
/// An engine owns its [`Registries`]: create it, register custom converters,
/// [`seal`](JsonEngine::seal) it, and share it by reference from then on.
///
/// ```
/// use typebind_core::record;
/// use typebind_json::JsonEngine;
///
/// record! {
///     #[derive(Debug, PartialEq)]
///     pub struct Point {
///         pub x: i32,
///         pub y: i32,
///     }
/// }
///
/// let mut engine = JsonEngine::new();
/// engine.seal();
///
/// let point: Point = engine.deserialize_str(r#"{"x": 1, "y": 2}"#).unwrap();
/// assert_eq!(point, Point { x: 1, y: 2 });
/// assert_eq!(engine.serialize_to_string(&point).unwrap(), r#"{"x":1,"y":2}"#);
/// ```
#[derive(Debug)]
pub struct JsonEngine {
    registries: Registries,
    config: JsonConfig,
}

impl Default for JsonEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonEngine {
    /// Creates an engine with the builtin converters and default settings.
    pub fn new() -> Self {
        Self::with_config(JsonConfig::default())
    }

    /// Creates an engine with the builtin converters.
    pub fn with_config(config: JsonConfig) -> Self {
        let mut registries = Registries::with_builtins();
        registries.set_record_options(RecordOptions {
            ignore_unknown_properties: config.ignore_unknown_properties,
        });
        JsonEngine { registries, config }
    }

    /// The settings this engine was created with.
    pub fn config(&self) -> &JsonConfig {
        &self.config
    }

    /// The underlying registries.
    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// Registers a converter in both directions.
    ///
    /// # Panics
    ///
    /// If the engine is sealed.
    pub fn register<C>(&mut self, converter: C)
    where
        C: Deserializer + Serializer + 'static,
    {
        self.registries.register(converter);
    }

    /// Registers a deserializer.
    ///
    /// # Panics
    ///
    /// If the engine is sealed.
    pub fn register_deserializer(&mut self, deserializer: Arc<dyn Deserializer>) {
        self.registries.register_deserializer(deserializer);
    }

    /// Registers a serializer.
    ///
    /// # Panics
    ///
    /// If the engine is sealed.
    pub fn register_serializer(&mut self, serializer: Arc<dyn Serializer>) {
        self.registries.register_serializer(serializer);
    }

    /// Overrides the record options for one record type.
    ///
    /// # Panics
    ///
    /// If the engine is sealed.
    pub fn set_record_options_for<R: Record>(&mut self, options: RecordOptions) {
        self.registries.set_record_options_for::<R>(options);
    }

    /// Ends configuration. Conversions are only allowed after this.
    pub fn seal(&mut self) {
        self.registries.seal();
    }

    /// Returns true if JSON can be deserialized into `ty`, as far as can be
    /// told without converting anything.
    pub fn supports_type(&self, ty: &TypeDescriptor) -> bool {
        self.registries.supports_type(ty)
    }

    /// Parses and converts JSON text.
    pub fn deserialize_str<T: Typed>(&self, text: &str) -> Result<T, Error> {
        let value = text::parse_str(text)?;
        self.deserialize_value(&value)
    }

    /// Parses and converts UTF-8 encoded JSON.
    pub fn deserialize_slice<T: Typed>(&self, input: &[u8]) -> Result<T, Error> {
        let value = text::parse_slice(input)?;
        self.deserialize_value(&value)
    }

    /// Reads the whole stream, then parses and converts it as UTF-8 encoded
    /// JSON.
    pub fn deserialize_reader<T: Typed>(&self, reader: impl io::Read) -> Result<T, Error> {
        let value = text::parse_reader(reader)?;
        self.deserialize_value(&value)
    }

    /// Converts an already parsed value tree.
    pub fn deserialize_value<T: Typed>(&self, value: &Value) -> Result<T, Error> {
        let any = self.deserialize_value_dyn(value, &T::descriptor())?;
        downcast_owned::<T>(any).map_err(|e| Error::Deserialize(ErrorNode::internal(e).into()))
    }

    /// Parses JSON text and converts it into an instance of `ty`.
    ///
    /// # Panics
    ///
    /// If `ty` is not concrete.
    pub fn deserialize_str_dyn(&self, text: &str, ty: &TypeDescriptor) -> Result<AnyValue, Error> {
        let value = text::parse_str(text)?;
        self.deserialize_value_dyn(&value, ty)
    }

    /// Converts an already parsed value tree into an instance of `ty`.
    ///
    /// # Panics
    ///
    /// If `ty` is not concrete.
    pub fn deserialize_value_dyn(&self, value: &Value, ty: &TypeDescriptor) -> Result<AnyValue, Error> {
        assert!(ty.is_concrete(), "cannot deserialize into non-concrete type {ty}");
        let deserializer = self.registries.deserializer(ty)?;
        trace!(%ty, "deserializing JSON");
        deserializer
            .deserialize(value, ty, &self.registries)
            .map_err(|node| {
                let error = DeserializeError(node);
                if error.has_internal() {
                    for source in error.node().internal_errors() {
                        error!(%ty, error = %source, "internal error while deserializing");
                    }
                }
                Error::Deserialize(error)
            })
    }

    /// Converts a value into a JSON value tree.
    pub fn serialize_to_value<T: Typed>(&self, value: &T) -> Result<Value, Error> {
        self.serialize_to_value_dyn(value, &T::descriptor())
    }

    /// Converts an instance of `ty` into a JSON value tree.
    ///
    /// # Panics
    ///
    /// If `ty` is not concrete.
    pub fn serialize_to_value_dyn(&self, value: &dyn Any, ty: &TypeDescriptor) -> Result<Value, Error> {
        assert!(ty.is_concrete(), "cannot serialize non-concrete type {ty}");
        let serializer = self.registries.serializer(ty)?;
        serializer.serialize(value, ty, &self.registries).map_err(|node| {
            let error = SerializeError(node);
            // serialization failures are always application bugs
            error!(%ty, %error, "cannot serialize value");
            Error::Serialize(error)
        })
    }

    /// Converts a value into JSON text.
    pub fn serialize_to_string<T: Typed>(&self, value: &T) -> Result<String, Error> {
        let json = self.serialize_to_value(value)?;
        Ok(text::to_string(&json, self.config.pretty)?)
    }

    /// Converts a value and writes it as JSON text. The writer is flushed
    /// but stays open.
    pub fn write_to<T: Typed>(&self, value: &T, writer: &mut impl io::Write) -> Result<(), Error> {
        let json = self.serialize_to_value(value)?;
        Ok(text::write(&json, self.config.pretty, writer)?)
    }
}
