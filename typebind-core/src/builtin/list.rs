use core::any::Any;

use tracing::trace;
use typebind_value::{Value, ValueKind};

use crate::{
    AnyValue, Def, Deserializer, ErrorNode, ListDef, RawType, Registries, Serializer,
    TypeDescriptor, TypeMismatch, Typed, expected, list_def, single_arg,
};

/// The raw type of `Vec<T>`.
pub fn list_raw() -> RawType {
    RawType::of::<Vec<()>>("Vec")
}

impl<T: Typed> Typed for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::applied(list_raw(), vec![T::descriptor()]).with_def(Def::List(ListDef::of::<T>()))
    }
}

/// Converts `Vec<T>` from and to JSON arrays, using the converter of `T` for
/// each element.
///
/// Only `Vec` applied to exactly one argument is supported; the bare generic
/// type is not.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListConverter;

impl Deserializer for ListConverter {
    fn supports_for_deserialization(&self, ty: &TypeDescriptor) -> bool {
        ty.is_applied(&list_raw(), 1)
    }

    fn deserialize(
        &self,
        value: &Value,
        ty: &TypeDescriptor,
        registries: &Registries,
    ) -> Result<AnyValue, ErrorNode> {
        let Value::Array(items) = value else {
            return Err(expected(ValueKind::Array, value));
        };
        let element_ty = single_arg(ty)?;
        let element = registries.deserializer(element_ty).map_err(ErrorNode::internal)?;
        trace!(%ty, len = items.len(), "deserializing list");

        let mut elements = Vec::with_capacity(items.len());
        let mut errors: Option<ErrorNode> = None;
        for (index, item) in items.iter().enumerate() {
            match element.deserialize(item, element_ty, registries) {
                Ok(converted) => elements.push(converted),
                Err(error) => errors = ErrorNode::merge(errors, Some(error.at_index(index))),
            }
        }
        if let Some(errors) = errors {
            return Err(errors);
        }
        let def = list_def(ty)?;
        (def.build)(elements).map_err(ErrorNode::internal)
    }
}

impl Serializer for ListConverter {
    fn supports_for_serialization(&self, raw: &RawType) -> bool {
        *raw == list_raw()
    }

    fn serialize(
        &self,
        value: &dyn Any,
        ty: &TypeDescriptor,
        registries: &Registries,
    ) -> Result<Value, ErrorNode> {
        let def = list_def(ty)?;
        let items = (def.items)(value).ok_or_else(|| ErrorNode::internal(TypeMismatch { expected: ty.to_string() }))?;
        let element_ty = single_arg(ty)?;
        let element = registries.serializer(element_ty).map_err(ErrorNode::internal)?;

        let mut out = Vec::with_capacity(items.len());
        let mut errors: Option<ErrorNode> = None;
        for (index, item) in items.into_iter().enumerate() {
            match element.serialize(item, element_ty, registries) {
                Ok(json) => out.push(json),
                Err(error) => errors = ErrorNode::merge(errors, Some(error.at_index(index))),
            }
        }
        match errors {
            Some(errors) => Err(errors),
            None => Ok(Value::Array(out)),
        }
    }
}
