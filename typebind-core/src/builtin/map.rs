use core::any::Any;
use std::collections::BTreeMap;

use typebind_value::{Object, Value, ValueKind};

use crate::{
    AnyValue, Def, Deserializer, ErrorNode, MapDef, RawType, Registries, Serializer,
    TypeDescriptor, TypeError, TypeMismatch, Typed, expected, map_def,
};

/// Path segment for map entries whose key cannot become a property name.
const ENTRY: &str = "entry";

/// The raw type of `BTreeMap<K, V>`.
pub fn map_raw() -> RawType {
    RawType::of::<BTreeMap<(), ()>>("BTreeMap")
}

impl<K: Typed + Ord, V: Typed> Typed for BTreeMap<K, V> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::applied(map_raw(), vec![K::descriptor(), V::descriptor()])
            .with_def(Def::Map(MapDef::of::<K, V>()))
    }
}

fn key_and_value_types(ty: &TypeDescriptor) -> Result<(&TypeDescriptor, &TypeDescriptor), ErrorNode> {
    match ty.args() {
        [key, value] => Ok((key, value)),
        args => Err(ErrorNode::internal(TypeError::ArityMismatch {
            expected: 2,
            found: args.len(),
        })),
    }
}

/// Converts `BTreeMap<K, V>` from and to JSON objects.
///
/// JSON property names are always strings, so each key is converted by the
/// converter of `K` from a JSON string. A `BTreeMap<i32, _>` therefore
/// rejects `{"1": ...}`: keys are typed by their declared type, not by what
/// their text looks like.
///
/// Key and value of an entry are both checked, so one entry can report two
/// errors under its name. When serializing, keys that fail are reported at
/// `entry[i]` (the entry's position in iteration order), and two keys that
/// serialize to the same string are rejected instead of overwriting.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapConverter;

impl Deserializer for MapConverter {
    fn supports_for_deserialization(&self, ty: &TypeDescriptor) -> bool {
        ty.is_applied(&map_raw(), 2)
    }

    fn deserialize(
        &self,
        value: &Value,
        ty: &TypeDescriptor,
        registries: &Registries,
    ) -> Result<AnyValue, ErrorNode> {
        let Value::Object(object) = value else {
            return Err(expected(ValueKind::Object, value));
        };
        let (key_ty, value_ty) = key_and_value_types(ty)?;
        let key_converter = registries.deserializer(key_ty).map_err(ErrorNode::internal)?;
        let value_converter = registries.deserializer(value_ty).map_err(ErrorNode::internal)?;

        let mut entries = Vec::with_capacity(object.len());
        let mut errors: Option<ErrorNode> = None;
        for (key, item) in object.iter() {
            let key_json = Value::String(key.to_owned());
            match (
                key_converter.deserialize(&key_json, key_ty, registries),
                value_converter.deserialize(item, value_ty, registries),
            ) {
                (Ok(k), Ok(v)) => entries.push((k, v)),
                (k, v) => {
                    let entry = ErrorNode::merge(k.err(), v.err()).map(|error| error.under(key));
                    errors = ErrorNode::merge(errors, entry);
                }
            }
        }
        if let Some(errors) = errors {
            return Err(errors);
        }
        let def = map_def(ty)?;
        (def.build)(entries).map_err(ErrorNode::internal)
    }
}

impl Serializer for MapConverter {
    fn supports_for_serialization(&self, raw: &RawType) -> bool {
        *raw == map_raw()
    }

    fn serialize(
        &self,
        value: &dyn Any,
        ty: &TypeDescriptor,
        registries: &Registries,
    ) -> Result<Value, ErrorNode> {
        let def = map_def(ty)?;
        let entries = (def.entries)(value).ok_or_else(|| ErrorNode::internal(TypeMismatch { expected: ty.to_string() }))?;
        let (key_ty, value_ty) = key_and_value_types(ty)?;
        let key_converter = registries.serializer(key_ty).map_err(ErrorNode::internal)?;
        let value_converter = registries.serializer(value_ty).map_err(ErrorNode::internal)?;

        let mut object = Object::with_capacity(entries.len());
        let mut errors: Option<ErrorNode> = None;
        for (index, (key, item)) in entries.into_iter().enumerate() {
            let key = match key_converter.serialize(key, key_ty, registries) {
                Ok(Value::String(key)) => key,
                Ok(other) => {
                    let error = ErrorNode::message(format!("map key must serialize to a string, found: {other}"));
                    errors = ErrorNode::merge(errors, Some(error.at_index(index).under(ENTRY)));
                    continue;
                }
                Err(error) => {
                    errors = ErrorNode::merge(errors, Some(error.at_index(index).under(ENTRY)));
                    continue;
                }
            };
            if object.contains_key(&key) {
                let error = ErrorNode::message("duplicate map key after serialization");
                errors = ErrorNode::merge(errors, Some(error.under(key)));
                continue;
            }
            match value_converter.serialize(item, value_ty, registries) {
                Ok(json) => {
                    object.insert(key, json);
                }
                Err(error) => errors = ErrorNode::merge(errors, Some(error.under(key))),
            }
        }
        match errors {
            Some(errors) => Err(errors),
            None => Ok(Value::Object(object)),
        }
    }
}
