use core::any::Any;

use typebind_value::{Value, ValueKind};

use crate::{
    AnyValue, Def, ErrorNode, MISSING_PROPERTY, RawType, Registries, TypeDescriptor, TypeError,
    TypeMismatch,
};

/// Turns JSON values into Rust values of the types it supports.
///
/// Converters are shared between threads once the registries are sealed, and
/// receive the registries on every call so they can resolve converters for
/// nested types.
pub trait Deserializer: Send + Sync {
    /// Returns true if this converter handles `ty`.
    ///
    /// This is a routing decision: a converter may accept a type whose
    /// arguments later turn out to have no converter of their own.
    fn supports_for_deserialization(&self, ty: &TypeDescriptor) -> bool;

    /// Converts `value` into an instance of the concrete type `ty`.
    fn deserialize(
        &self,
        value: &Value,
        ty: &TypeDescriptor,
        registries: &Registries,
    ) -> Result<AnyValue, ErrorNode>;

    /// Produces a value for a record component whose property is absent.
    fn deserialize_absent(
        &self,
        ty: &TypeDescriptor,
        registries: &Registries,
    ) -> Result<AnyValue, ErrorNode> {
        let _ = (ty, registries);
        Err(ErrorNode::message(MISSING_PROPERTY))
    }
}

/// Turns Rust values of the types it supports into JSON values.
pub trait Serializer: Send + Sync {
    /// Returns true if this converter handles values of the raw type `raw`.
    fn supports_for_serialization(&self, raw: &RawType) -> bool;

    /// Converts `value`, an instance of the concrete type `ty`.
    fn serialize(
        &self,
        value: &dyn Any,
        ty: &TypeDescriptor,
        registries: &Registries,
    ) -> Result<Value, ErrorNode>;

    /// Like [`Serializer::serialize`], but may return `None` to leave the
    /// enclosing record property out entirely.
    fn serialize_optional(
        &self,
        value: &dyn Any,
        ty: &TypeDescriptor,
        registries: &Registries,
    ) -> Result<Option<Value>, ErrorNode> {
        self.serialize(value, ty, registries).map(Some)
    }
}

/// Error for a value of the wrong JSON kind: `expected string, found: 12`.
pub fn expected(kind: ValueKind, found: &Value) -> ErrorNode {
    expected_named(kind.name(), found)
}

/// Like [`expected`], with a free-form description of what was expected.
pub fn expected_named(what: &str, found: &Value) -> ErrorNode {
    ErrorNode::message(format!("expected {what}, found: {found}"))
}

/// Borrows a type-erased value as `T`, or reports an internal error.
pub fn downcast_ref<T: 'static>(value: &dyn Any) -> Result<&T, ErrorNode> {
    value
        .downcast_ref::<T>()
        .ok_or_else(|| ErrorNode::internal(TypeMismatch::of::<T>()))
}

/// The single type argument of a one-parameter generic type.
pub fn single_arg(ty: &TypeDescriptor) -> Result<&TypeDescriptor, ErrorNode> {
    match ty.args() {
        [arg] => Ok(arg),
        args => Err(ErrorNode::internal(TypeError::ArityMismatch {
            expected: 1,
            found: args.len(),
        })),
    }
}

pub(crate) fn missing_def(ty: &TypeDescriptor, expected: &'static str) -> ErrorNode {
    ErrorNode::internal(TypeError::MissingDef {
        ty: ty.to_string(),
        expected,
    })
}

macro_rules! def_accessor {
    ($(#[$meta:meta])* $fn_name:ident, $variant:ident, $def:ty, $label:literal) => {
        $(#[$meta])*
        pub fn $fn_name(ty: &TypeDescriptor) -> Result<$def, ErrorNode> {
            match ty.def() {
                Some(Def::$variant(def)) => Ok(*def),
                _ => Err(missing_def(ty, $label)),
            }
        }
    };
}

def_accessor!(
    /// The list hooks of `ty`.
    list_def, List, crate::ListDef, "list"
);
def_accessor!(
    /// The map hooks of `ty`.
    map_def, Map, crate::MapDef, "map"
);
def_accessor!(
    /// The absent-capable wrapper hooks of `ty`.
    optional_def, Optional, crate::WrapperDef, "optional"
);
def_accessor!(
    /// The null-capable wrapper hooks of `ty`.
    nullable_def, Nullable, crate::WrapperDef, "nullable"
);
def_accessor!(
    /// The pointer hooks of `ty`.
    pointer_def, Pointer, crate::WrapperDef, "pointer"
);
def_accessor!(
    /// The record hooks of `ty`.
    record_def, Record, crate::RecordDef, "record"
);
