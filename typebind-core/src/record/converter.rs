use core::any::Any;
use std::sync::OnceLock;

use tracing::{debug, trace};
use typebind_value::{Object, Value, ValueKind};

use crate::{
    AnyValue, Components, Deserializer, ErrorNode, FIELD_IS_NULL, RawType, RecordOptions,
    RecordShape, Registries, Serializer, TypeDescriptor, TypeError, UNEXPECTED_PROPERTY, expected,
    record_def,
};

/// The generated converter for one raw record type.
///
/// It goes into the registry caches before its structure is built, so that
/// building can resolve component types that lead back to this record. The
/// structure is filled in exactly once; a thread that uses the converter
/// while another thread is still building it waits for the build to finish.
pub(crate) struct RecordConverter {
    raw: RawType,
    shape: fn() -> RecordShape,
    options: RecordOptions,
    target: OnceLock<StructConverter>,
}

impl RecordConverter {
    pub(crate) fn new(raw: RawType, shape: fn() -> RecordShape, options: RecordOptions) -> Self {
        RecordConverter {
            raw,
            shape,
            options,
            target: OnceLock::new(),
        }
    }

    /// Builds the structure now rather than on first use.
    pub(crate) fn initialize(&self, registries: &Registries) {
        self.target(registries);
    }

    fn target(&self, registries: &Registries) -> &StructConverter {
        self.target
            .get_or_init(|| StructConverter::build(self.raw, (self.shape)(), self.options, registries))
    }
}

impl Deserializer for RecordConverter {
    fn supports_for_deserialization(&self, ty: &TypeDescriptor) -> bool {
        ty.raw_type() == Some(&self.raw)
    }

    fn deserialize(
        &self,
        value: &Value,
        ty: &TypeDescriptor,
        registries: &Registries,
    ) -> Result<AnyValue, ErrorNode> {
        self.target(registries).deserialize(value, ty, registries)
    }
}

impl Serializer for RecordConverter {
    fn supports_for_serialization(&self, raw: &RawType) -> bool {
        *raw == self.raw
    }

    fn serialize(
        &self,
        value: &dyn Any,
        ty: &TypeDescriptor,
        registries: &Registries,
    ) -> Result<Value, ErrorNode> {
        self.target(registries).serialize(value, ty, registries)
    }
}

struct StructConverter {
    raw: RawType,
    shape: RecordShape,
    options: RecordOptions,
}

impl StructConverter {
    fn build(
        raw: RawType,
        shape: RecordShape,
        options: RecordOptions,
        registries: &Registries,
    ) -> Self {
        debug!(record = %raw, components = shape.components.len(), "building record converter");
        for component in &shape.components {
            if component.declared.is_concrete() {
                warm(registries, &component.declared);
            }
        }
        StructConverter {
            raw,
            shape,
            options,
        }
    }

    fn component_type(
        &self,
        index: usize,
        ty: &TypeDescriptor,
        monomorphized: &[TypeDescriptor],
    ) -> Result<TypeDescriptor, ErrorNode> {
        self.shape
            .component_type(index, ty, monomorphized)
            .map_err(ErrorNode::internal)
    }

    fn deserialize(
        &self,
        value: &Value,
        ty: &TypeDescriptor,
        registries: &Registries,
    ) -> Result<AnyValue, ErrorNode> {
        let def = record_def(ty)?;
        let Value::Object(object) = value else {
            return Err(expected(ValueKind::Object, value));
        };
        trace!(record = %ty, "deserializing record");

        let monomorphized = (def.component_types)();
        let mut values = Vec::with_capacity(self.shape.components.len());
        let mut errors: Option<ErrorNode> = None;
        let mut present = 0;

        for (index, component) in self.shape.components.iter().enumerate() {
            let property = object.get(component.name);
            if property.is_some() {
                present += 1;
            }
            let result = self
                .component_type(index, ty, &monomorphized)
                .and_then(|component_ty| {
                    let deserializer = registries
                        .deserializer(&component_ty)
                        .map_err(ErrorNode::internal)?;
                    match property {
                        Some(property) => deserializer.deserialize(property, &component_ty, registries),
                        None => deserializer.deserialize_absent(&component_ty, registries),
                    }
                });
            match result {
                Ok(value) => values.push(value),
                Err(error) => errors = ErrorNode::merge(errors, Some(error.under(component.name))),
            }
        }

        // only worth the key scan when some property matched no component
        if present != object.len() && !self.options.ignore_unknown_properties {
            errors = ErrorNode::merge(errors, self.unexpected_properties(object));
        }

        if let Some(errors) = errors {
            return Err(errors);
        }
        (def.construct)(Components::new(values)).map_err(ErrorNode::from)
    }

    fn unexpected_properties(&self, object: &Object) -> Option<ErrorNode> {
        let mut errors = None;
        for key in object.keys().filter(|key| !self.shape.has_component(key)) {
            if let Some(closest) = self.closest_component(key) {
                debug!(record = %self.raw, property = key, suggestion = closest, "unexpected property");
            }
            errors = ErrorNode::merge(errors, Some(ErrorNode::message(UNEXPECTED_PROPERTY).under(key)));
        }
        errors
    }

    fn closest_component(&self, key: &str) -> Option<&'static str> {
        self.shape
            .components
            .iter()
            .map(|c| (c.name, strsim::jaro_winkler(key, c.name)))
            .filter(|(_, score)| *score > 0.8)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, _)| name)
    }

    fn serialize(
        &self,
        value: &dyn Any,
        ty: &TypeDescriptor,
        registries: &Registries,
    ) -> Result<Value, ErrorNode> {
        let def = record_def(ty)?;
        let parts = (def.components)(value)
            .ok_or_else(|| ErrorNode::internal(crate::TypeMismatch { expected: ty.to_string() }))?;
        if parts.len() != self.shape.components.len() {
            return Err(ErrorNode::internal(TypeError::ArityMismatch {
                expected: self.shape.components.len(),
                found: parts.len(),
            }));
        }
        trace!(record = %ty, "serializing record");

        let monomorphized = (def.component_types)();
        let mut object = Object::with_capacity(parts.len());
        let mut errors: Option<ErrorNode> = None;

        for (index, (component, part)) in self.shape.components.iter().zip(parts).enumerate() {
            let result = match part {
                None => Err(ErrorNode::message(FIELD_IS_NULL)),
                Some(part) => self
                    .component_type(index, ty, &monomorphized)
                    .and_then(|component_ty| {
                        let serializer = registries
                            .serializer(&component_ty)
                            .map_err(ErrorNode::internal)?;
                        serializer.serialize_optional(part, &component_ty, registries)
                    }),
            };
            match result {
                Ok(Some(json)) => {
                    object.insert(component.name, json);
                }
                Ok(None) => {}
                Err(error) => errors = ErrorNode::merge(errors, Some(error.under(component.name))),
            }
        }

        match errors {
            Some(errors) => Err(errors),
            None => Ok(Value::Object(object)),
        }
    }
}

/// Resolves converters for every node of a concrete type tree, so that the
/// first conversion finds them cached. Failures are left for that conversion
/// to report.
fn warm(registries: &Registries, ty: &TypeDescriptor) {
    if let Err(error) = registries.deserializer(ty) {
        trace!(%ty, %error, "no converter while warming");
    }
    for arg in ty.args() {
        if !arg.is_wildcard() {
            warm(registries, arg);
        }
    }
}
