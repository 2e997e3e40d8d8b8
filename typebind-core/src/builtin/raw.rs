use core::any::Any;

use typebind_value::Value;

use crate::{
    AnyValue, Def, Deserializer, ErrorNode, RawType, Registries, Serializer, TypeDescriptor, Typed,
    downcast_ref,
};

impl Typed for Value {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::raw(RawType::of::<Value>("Value")).with_def(Def::Scalar)
    }
}

/// Passes a JSON subtree through unchanged, for fields whose structure the
/// application handles itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawValueConverter;

impl Deserializer for RawValueConverter {
    fn supports_for_deserialization(&self, ty: &TypeDescriptor) -> bool {
        ty.is::<Value>()
    }

    fn deserialize(&self, value: &Value, _: &TypeDescriptor, _: &Registries) -> Result<AnyValue, ErrorNode> {
        Ok(Box::new(value.clone()))
    }
}

impl Serializer for RawValueConverter {
    fn supports_for_serialization(&self, raw: &RawType) -> bool {
        raw.is::<Value>()
    }

    fn serialize(&self, value: &dyn Any, _: &TypeDescriptor, _: &Registries) -> Result<Value, ErrorNode> {
        downcast_ref::<Value>(value).cloned()
    }
}
