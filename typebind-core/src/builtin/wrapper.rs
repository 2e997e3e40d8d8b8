use core::any::Any;

use typebind_value::Value;

use crate::{
    AnyValue, Def, Deserializer, ErrorNode, RawType, Registries, Serializer, TypeDescriptor,
    TypeMismatch, Typed, WrapperDef, downcast_owned, nullable_def, optional_def, pointer_def,
    single_arg,
};

/// A record component that may be left out of the JSON object entirely.
///
/// Absence becomes [`OptionalField::Absent`], and an absent value is left out
/// again when serializing. An explicit JSON `null` is not absence: it goes to
/// the converter of `T`, which normally rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OptionalField<T> {
    /// The property was not present
    #[default]
    Absent,
    /// The property was present
    Present(T),
}

impl<T> OptionalField<T> {
    /// Returns true for [`OptionalField::Present`].
    pub fn is_present(&self) -> bool {
        matches!(self, OptionalField::Present(_))
    }

    /// Borrows the value, if present.
    pub fn as_ref(&self) -> Option<&T> {
        match self {
            OptionalField::Present(value) => Some(value),
            OptionalField::Absent => None,
        }
    }

    /// Converts into an `Option`.
    pub fn into_option(self) -> Option<T> {
        match self {
            OptionalField::Present(value) => Some(value),
            OptionalField::Absent => None,
        }
    }
}

impl<T> From<Option<T>> for OptionalField<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(OptionalField::Absent, OptionalField::Present)
    }
}

/// A record component whose property must be present, but may be `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NullableField<T> {
    /// The property was `null`
    #[default]
    Null,
    /// The property had a value
    Present(T),
}

impl<T> NullableField<T> {
    /// Returns true for [`NullableField::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, NullableField::Null)
    }

    /// Borrows the value, if not null.
    pub fn as_ref(&self) -> Option<&T> {
        match self {
            NullableField::Present(value) => Some(value),
            NullableField::Null => None,
        }
    }

    /// Converts into an `Option`.
    pub fn into_option(self) -> Option<T> {
        match self {
            NullableField::Present(value) => Some(value),
            NullableField::Null => None,
        }
    }
}

impl<T> From<Option<T>> for NullableField<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(NullableField::Null, NullableField::Present)
    }
}

/// The raw type of `OptionalField<T>`.
pub fn optional_raw() -> RawType {
    RawType::of::<OptionalField<()>>("OptionalField")
}

/// The raw type of `NullableField<T>`.
pub fn nullable_raw() -> RawType {
    RawType::of::<NullableField<()>>("NullableField")
}

/// The raw type of `Box<T>`.
pub fn box_raw() -> RawType {
    RawType::of::<Box<()>>("Box")
}

fn wrap_optional<T: 'static>(inner: Option<AnyValue>) -> Result<AnyValue, TypeMismatch> {
    Ok(match inner {
        Some(inner) => Box::new(OptionalField::Present(downcast_owned::<T>(inner)?)),
        None => Box::new(OptionalField::<T>::Absent),
    })
}

fn optional_inner<T: 'static>(value: &dyn Any) -> Option<Option<&dyn Any>> {
    value
        .downcast_ref::<OptionalField<T>>()
        .map(|field| field.as_ref().map(|inner| inner as &dyn Any))
}

fn wrap_nullable<T: 'static>(inner: Option<AnyValue>) -> Result<AnyValue, TypeMismatch> {
    Ok(match inner {
        Some(inner) => Box::new(NullableField::Present(downcast_owned::<T>(inner)?)),
        None => Box::new(NullableField::<T>::Null),
    })
}

fn nullable_inner<T: 'static>(value: &dyn Any) -> Option<Option<&dyn Any>> {
    value
        .downcast_ref::<NullableField<T>>()
        .map(|field| field.as_ref().map(|inner| inner as &dyn Any))
}

fn wrap_box<T: 'static>(inner: Option<AnyValue>) -> Result<AnyValue, TypeMismatch> {
    let inner = inner.ok_or_else(TypeMismatch::of::<T>)?;
    Ok(Box::new(Box::new(downcast_owned::<T>(inner)?)))
}

fn box_inner<T: 'static>(value: &dyn Any) -> Option<Option<&dyn Any>> {
    value
        .downcast_ref::<Box<T>>()
        .map(|boxed| Some(&**boxed as &dyn Any))
}

impl<T: Typed> Typed for OptionalField<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::applied(optional_raw(), vec![T::descriptor()]).with_def(Def::Optional(WrapperDef {
            wrap: wrap_optional::<T>,
            inner: optional_inner::<T>,
        }))
    }
}

impl<T: Typed> Typed for NullableField<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::applied(nullable_raw(), vec![T::descriptor()]).with_def(Def::Nullable(WrapperDef {
            wrap: wrap_nullable::<T>,
            inner: nullable_inner::<T>,
        }))
    }
}

impl<T: Typed> Typed for Box<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::applied(box_raw(), vec![T::descriptor()]).with_def(Def::Pointer(WrapperDef {
            wrap: wrap_box::<T>,
            inner: box_inner::<T>,
        }))
    }
}

fn not_a(ty: &TypeDescriptor) -> ErrorNode {
    ErrorNode::internal(TypeMismatch {
        expected: ty.to_string(),
    })
}

/// Converts [`OptionalField<T>`] using the converter of `T` for the value.
///
/// Only usable as a record component: serializing an optional field on its
/// own, or as a list element, fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalFieldConverter;

impl Deserializer for OptionalFieldConverter {
    fn supports_for_deserialization(&self, ty: &TypeDescriptor) -> bool {
        ty.is_applied(&optional_raw(), 1)
    }

    fn deserialize(
        &self,
        value: &Value,
        ty: &TypeDescriptor,
        registries: &Registries,
    ) -> Result<AnyValue, ErrorNode> {
        let inner_ty = single_arg(ty)?;
        let inner = registries
            .deserializer(inner_ty)
            .map_err(ErrorNode::internal)?
            .deserialize(value, inner_ty, registries)?;
        (optional_def(ty)?.wrap)(Some(inner)).map_err(ErrorNode::internal)
    }

    fn deserialize_absent(&self, ty: &TypeDescriptor, _: &Registries) -> Result<AnyValue, ErrorNode> {
        (optional_def(ty)?.wrap)(None).map_err(ErrorNode::internal)
    }
}

impl Serializer for OptionalFieldConverter {
    fn supports_for_serialization(&self, raw: &RawType) -> bool {
        *raw == optional_raw()
    }

    fn serialize(&self, _: &dyn Any, _: &TypeDescriptor, _: &Registries) -> Result<Value, ErrorNode> {
        Err(ErrorNode::message(
            "OptionalField cannot be serialized directly; it must be a record field",
        ))
    }

    fn serialize_optional(
        &self,
        value: &dyn Any,
        ty: &TypeDescriptor,
        registries: &Registries,
    ) -> Result<Option<Value>, ErrorNode> {
        let Some(inner) = (optional_def(ty)?.inner)(value).ok_or_else(|| not_a(ty))? else {
            return Ok(None);
        };
        let inner_ty = single_arg(ty)?;
        registries
            .serializer(inner_ty)
            .map_err(ErrorNode::internal)?
            .serialize(inner, inner_ty, registries)
            .map(Some)
    }
}

/// Converts [`NullableField<T>`]: JSON `null` is the null state, anything
/// else goes to the converter of `T`. An absent property is still missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullableFieldConverter;

impl Deserializer for NullableFieldConverter {
    fn supports_for_deserialization(&self, ty: &TypeDescriptor) -> bool {
        ty.is_applied(&nullable_raw(), 1)
    }

    fn deserialize(
        &self,
        value: &Value,
        ty: &TypeDescriptor,
        registries: &Registries,
    ) -> Result<AnyValue, ErrorNode> {
        let def = nullable_def(ty)?;
        if value.is_null() {
            return (def.wrap)(None).map_err(ErrorNode::internal);
        }
        let inner_ty = single_arg(ty)?;
        let inner = registries
            .deserializer(inner_ty)
            .map_err(ErrorNode::internal)?
            .deserialize(value, inner_ty, registries)?;
        (def.wrap)(Some(inner)).map_err(ErrorNode::internal)
    }
}

impl Serializer for NullableFieldConverter {
    fn supports_for_serialization(&self, raw: &RawType) -> bool {
        *raw == nullable_raw()
    }

    fn serialize(
        &self,
        value: &dyn Any,
        ty: &TypeDescriptor,
        registries: &Registries,
    ) -> Result<Value, ErrorNode> {
        let Some(inner) = (nullable_def(ty)?.inner)(value).ok_or_else(|| not_a(ty))? else {
            return Ok(Value::Null);
        };
        let inner_ty = single_arg(ty)?;
        registries
            .serializer(inner_ty)
            .map_err(ErrorNode::internal)?
            .serialize(inner, inner_ty, registries)
    }
}

/// Converts `Box<T>` exactly like `T`, including absent properties. This is
/// what makes recursive records expressible.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxConverter;

impl Deserializer for BoxConverter {
    fn supports_for_deserialization(&self, ty: &TypeDescriptor) -> bool {
        ty.is_applied(&box_raw(), 1)
    }

    fn deserialize(
        &self,
        value: &Value,
        ty: &TypeDescriptor,
        registries: &Registries,
    ) -> Result<AnyValue, ErrorNode> {
        let inner_ty = single_arg(ty)?;
        let inner = registries
            .deserializer(inner_ty)
            .map_err(ErrorNode::internal)?
            .deserialize(value, inner_ty, registries)?;
        (pointer_def(ty)?.wrap)(Some(inner)).map_err(ErrorNode::internal)
    }

    fn deserialize_absent(&self, ty: &TypeDescriptor, registries: &Registries) -> Result<AnyValue, ErrorNode> {
        let inner_ty = single_arg(ty)?;
        let inner = registries
            .deserializer(inner_ty)
            .map_err(ErrorNode::internal)?
            .deserialize_absent(inner_ty, registries)?;
        (pointer_def(ty)?.wrap)(Some(inner)).map_err(ErrorNode::internal)
    }
}

impl Serializer for BoxConverter {
    fn supports_for_serialization(&self, raw: &RawType) -> bool {
        *raw == box_raw()
    }

    fn serialize(
        &self,
        value: &dyn Any,
        ty: &TypeDescriptor,
        registries: &Registries,
    ) -> Result<Value, ErrorNode> {
        self.serialize_optional(value, ty, registries)?
            .ok_or_else(|| ErrorNode::message(crate::FIELD_IS_NULL))
    }

    fn serialize_optional(
        &self,
        value: &dyn Any,
        ty: &TypeDescriptor,
        registries: &Registries,
    ) -> Result<Option<Value>, ErrorNode> {
        let inner = (pointer_def(ty)?.inner)(value)
            .flatten()
            .ok_or_else(|| not_a(ty))?;
        let inner_ty = single_arg(ty)?;
        registries
            .serializer(inner_ty)
            .map_err(ErrorNode::internal)?
            .serialize_optional(inner, inner_ty, registries)
    }
}
