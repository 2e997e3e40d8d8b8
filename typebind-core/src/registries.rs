use core::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use typebind_value::Value;

use crate::record::RecordConverter;
use crate::{
    DeserializeError, Deserializer, ErrorNode, NotRegistered, RawType, Record, RecordDef, Registry,
    SerializeError, Serializer, TypeDescriptor, Typed, builtin, downcast_owned,
};

/// Options for generated record converters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordOptions {
    /// Silently skip properties that match no record component, instead of
    /// reporting them as "unexpected property".
    pub ignore_unknown_properties: bool,
}

/// The deserializer and serializer registries, plus the converters generated
/// for record types.
///
/// `Registries` has a two-phase lifecycle. While configuring, converters are
/// registered and options set; [`Registries::seal`] then freezes the
/// registered converters, and from that point on types can be resolved from
/// any number of threads. Record converters are still generated lazily after
/// sealing, but never replace an existing entry.
///
/// There is no global instance: create one at startup and pass it by
/// reference to whatever needs to convert.
pub struct Registries {
    deserializers: Registry<dyn Deserializer>,
    serializers: Registry<dyn Serializer>,
    records: RwLock<HashMap<RawType, Arc<RecordConverter>>>,
    record_options: RecordOptions,
    record_overrides: HashMap<RawType, RecordOptions>,
}

impl Default for Registries {
    fn default() -> Self {
        Self::new()
    }
}

impl Registries {
    /// Creates registries with no converters at all.
    pub fn new() -> Self {
        Registries {
            deserializers: Registry::new("deserializer"),
            serializers: Registry::new("serializer"),
            records: RwLock::new(HashMap::new()),
            record_options: RecordOptions::default(),
            record_overrides: HashMap::new(),
        }
    }

    /// Creates registries holding the builtin converters: primitives,
    /// date/time types, raw values, lists, maps and the field wrappers.
    pub fn with_builtins() -> Self {
        let mut registries = Self::new();
        builtin::register_builtins(&mut registries);
        registries
    }

    /// Registers a deserializer. Later registrations take precedence.
    ///
    /// # Panics
    ///
    /// If the registries are sealed.
    pub fn register_deserializer(&mut self, deserializer: Arc<dyn Deserializer>) {
        self.deserializers.register(deserializer);
    }

    /// Registers a serializer. Later registrations take precedence.
    ///
    /// # Panics
    ///
    /// If the registries are sealed.
    pub fn register_serializer(&mut self, serializer: Arc<dyn Serializer>) {
        self.serializers.register(serializer);
    }

    /// Registers a converter in both directions.
    ///
    /// # Panics
    ///
    /// If the registries are sealed.
    pub fn register<C>(&mut self, converter: C)
    where
        C: Deserializer + Serializer + 'static,
    {
        let converter = Arc::new(converter);
        self.deserializers.register(Arc::clone(&converter) as Arc<dyn Deserializer>);
        self.serializers.register(converter);
    }

    /// Removes every registered converter, builtins included.
    ///
    /// # Panics
    ///
    /// If the registries are sealed.
    pub fn clear(&mut self) {
        self.deserializers.clear();
        self.serializers.clear();
    }

    /// Sets the options for every generated record converter.
    ///
    /// # Panics
    ///
    /// If the registries are sealed.
    pub fn set_record_options(&mut self, options: RecordOptions) {
        self.ensure_configuring();
        self.record_options = options;
    }

    /// Sets the options for the generated converter of one record type,
    /// overriding [`Registries::set_record_options`].
    ///
    /// # Panics
    ///
    /// If the registries are sealed, or if `R` has no raw type.
    pub fn set_record_options_for<R: Record>(&mut self, options: RecordOptions) {
        self.ensure_configuring();
        let descriptor = R::descriptor();
        let raw = descriptor
            .raw_type()
            .copied()
            .unwrap_or_else(|| panic!("record type {descriptor} has no raw type"));
        self.record_overrides.insert(raw, options);
    }

    /// Ends configuration.
    pub fn seal(&mut self) {
        self.deserializers.seal();
        self.serializers.seal();
    }

    /// Returns true once [`Registries::seal`] has been called.
    pub fn is_sealed(&self) -> bool {
        self.deserializers.is_sealed()
    }

    /// Resolves the deserializer for a concrete type: the cached one, else
    /// the last registered one that supports it, else a generated record
    /// converter.
    ///
    /// # Panics
    ///
    /// If the registries are not sealed yet.
    pub fn deserializer(&self, ty: &TypeDescriptor) -> Result<Arc<dyn Deserializer>, NotRegistered> {
        if let Some(found) = self.deserializers.find(ty) {
            return Ok(found);
        }
        let (raw, def) = record_parts(ty).ok_or_else(|| NotRegistered::new(ty))?;
        let (converter, fresh) = self.record_converter(raw, &def);
        let resolved = self
            .deserializers
            .insert_generated(ty.clone(), Arc::clone(&converter) as Arc<dyn Deserializer>);
        if fresh {
            converter.initialize(self);
        }
        Ok(resolved)
    }

    /// Resolves the serializer for values of a concrete type, by its raw type.
    ///
    /// # Panics
    ///
    /// If the registries are not sealed yet.
    pub fn serializer(&self, ty: &TypeDescriptor) -> Result<Arc<dyn Serializer>, NotRegistered> {
        let raw = ty.raw_type().ok_or_else(|| NotRegistered::new(ty))?;
        if let Some(found) = self.serializers.find(raw) {
            return Ok(found);
        }
        let (raw, def) = record_parts(ty).ok_or_else(|| NotRegistered::new(ty))?;
        let (converter, fresh) = self.record_converter(raw, &def);
        let resolved = self
            .serializers
            .insert_generated(raw, Arc::clone(&converter) as Arc<dyn Serializer>);
        if fresh {
            converter.initialize(self);
        }
        Ok(resolved)
    }

    /// Returns true if a deserializer would be found for `ty`.
    ///
    /// Generic types must be given arguments, but the arguments themselves are
    /// not checked: `Vec<?>` is supported, and so is a list of a type nothing
    /// can convert. Failures of that kind surface when a value is converted.
    ///
    /// # Panics
    ///
    /// If the registries are not sealed yet.
    pub fn supports_type(&self, ty: &TypeDescriptor) -> bool {
        self.deserializers.supports(ty) || record_parts(ty).is_some()
    }

    /// Returns the one generated converter of a raw record type, creating it
    /// if needed. The flag is true if this call created it, in which case the
    /// caller must initialize it once the caches point at it.
    fn record_converter(&self, raw: RawType, def: &RecordDef) -> (Arc<RecordConverter>, bool) {
        if let Some(existing) = self.records.read().get(&raw) {
            return (Arc::clone(existing), false);
        }
        let mut records = self.records.write();
        if let Some(existing) = records.get(&raw) {
            return (Arc::clone(existing), false);
        }
        let options = self
            .record_overrides
            .get(&raw)
            .copied()
            .unwrap_or(self.record_options);
        debug!(record = %raw, ?options, "generating record converter");
        let converter = Arc::new(RecordConverter::new(raw, def.shape, options));
        records.insert(raw, Arc::clone(&converter));
        (converter, true)
    }

    /// Converts a JSON value into a `T`.
    ///
    /// A missing converter is reported as an internal error inside the
    /// returned [`DeserializeError`].
    pub fn deserialize<T: Typed>(&self, value: &Value) -> Result<T, DeserializeError> {
        let any = self.deserialize_dyn(value, &T::descriptor())?;
        downcast_owned::<T>(any).map_err(|e| ErrorNode::internal(e).into())
    }

    /// Converts a JSON value into an instance of the concrete type `ty`.
    pub fn deserialize_dyn(
        &self,
        value: &Value,
        ty: &TypeDescriptor,
    ) -> Result<Box<dyn Any>, DeserializeError> {
        let deserializer = self.deserializer(ty).map_err(ErrorNode::internal)?;
        Ok(deserializer.deserialize(value, ty, self)?)
    }

    /// Converts a `T` into a JSON value.
    pub fn serialize<T: Typed>(&self, value: &T) -> Result<Value, SerializeError> {
        self.serialize_dyn(value, &T::descriptor())
    }

    /// Converts an instance of the concrete type `ty` into a JSON value.
    pub fn serialize_dyn(&self, value: &dyn Any, ty: &TypeDescriptor) -> Result<Value, SerializeError> {
        let serializer = self.serializer(ty).map_err(ErrorNode::internal)?;
        Ok(serializer.serialize(value, ty, self)?)
    }

    fn ensure_configuring(&self) {
        assert!(
            !self.is_sealed(),
            "registries are already sealed; options can only be changed during configuration"
        );
    }
}

fn record_parts(ty: &TypeDescriptor) -> Option<(RawType, RecordDef)> {
    match (ty.raw_type(), ty.def()) {
        (Some(raw), Some(crate::Def::Record(def))) => Some((*raw, *def)),
        _ => None,
    }
}

impl core::fmt::Debug for Registries {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registries")
            .field("deserializers", &self.deserializers)
            .field("serializers", &self.serializers)
            .field("records", &self.records.read().len())
            .finish()
    }
}

