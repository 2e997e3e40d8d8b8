use core::any::Any;
use core::marker::PhantomData;

use typebind_value::{Number, Value, ValueKind};

use crate::{
    AnyValue, Def, Deserializer, ErrorNode, RawType, Registries, Serializer, TypeDescriptor, Typed,
    downcast_ref, expected, expected_named,
};

macro_rules! impl_scalar_typed {
    ($($t:ty => $name:literal),* $(,)?) => {
        $(
            impl Typed for $t {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::raw(RawType::of::<$t>($name)).with_def(Def::Scalar)
                }
            }
        )*
    };
}

impl_scalar_typed! {
    bool => "bool",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    isize => "isize",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    usize => "usize",
    f32 => "f32",
    f64 => "f64",
    String => "String",
}

/// Converts `bool` from and to JSON booleans.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanConverter;

impl Deserializer for BooleanConverter {
    fn supports_for_deserialization(&self, ty: &TypeDescriptor) -> bool {
        ty.is::<bool>()
    }

    fn deserialize(&self, value: &Value, _: &TypeDescriptor, _: &Registries) -> Result<AnyValue, ErrorNode> {
        match value {
            Value::Bool(b) => Ok(Box::new(*b)),
            other => Err(expected(ValueKind::Boolean, other)),
        }
    }
}

impl Serializer for BooleanConverter {
    fn supports_for_serialization(&self, raw: &RawType) -> bool {
        raw.is::<bool>()
    }

    fn serialize(&self, value: &dyn Any, _: &TypeDescriptor, _: &Registries) -> Result<Value, ErrorNode> {
        downcast_ref::<bool>(value).map(|b| Value::Bool(*b))
    }
}

/// A fixed-width integer type.
pub trait Integer: Typed + Copy + TryFrom<i64> + TryFrom<u64> + Into<Number> {}

impl Integer for i8 {}
impl Integer for i16 {}
impl Integer for i32 {}
impl Integer for i64 {}
impl Integer for isize {}
impl Integer for u8 {}
impl Integer for u16 {}
impl Integer for u32 {}
impl Integer for u64 {}
impl Integer for usize {}

/// Converts one integer type from and to JSON numbers.
///
/// Floats are rejected even when they have no fractional part, and values
/// outside the target range fail rather than wrap.
pub struct IntegerConverter<T>(PhantomData<fn() -> T>);

impl<T: Integer> IntegerConverter<T> {
    /// Creates the converter.
    pub fn new() -> Self {
        IntegerConverter(PhantomData)
    }
}

impl<T: Integer> Default for IntegerConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Integer> Deserializer for IntegerConverter<T> {
    fn supports_for_deserialization(&self, ty: &TypeDescriptor) -> bool {
        ty.is::<T>()
    }

    fn deserialize(&self, value: &Value, _: &TypeDescriptor, _: &Registries) -> Result<AnyValue, ErrorNode> {
        let Value::Number(number) = value else {
            return Err(expected(ValueKind::Number, value));
        };
        if number.is_float() {
            return Err(expected_named("integer", value));
        }
        let converted = match number.as_i64() {
            Some(i) => <T as TryFrom<i64>>::try_from(i).ok(),
            None => number
                .as_u64()
                .and_then(|u| <T as TryFrom<u64>>::try_from(u).ok()),
        };
        match converted {
            Some(v) => Ok(Box::new(v)),
            None => Err(ErrorNode::message(format!(
                "value out of range for {}: {number}",
                core::any::type_name::<T>()
            ))),
        }
    }
}

impl<T: Integer> Serializer for IntegerConverter<T> {
    fn supports_for_serialization(&self, raw: &RawType) -> bool {
        raw.is::<T>()
    }

    fn serialize(&self, value: &dyn Any, _: &TypeDescriptor, _: &Registries) -> Result<Value, ErrorNode> {
        downcast_ref::<T>(value).map(|v| Value::Number((*v).into()))
    }
}

/// A floating-point type.
pub trait Float: Typed + Copy {
    /// Narrows from `f64`.
    fn from_f64(v: f64) -> Self;
    /// Widens to `f64`.
    fn to_f64(self) -> f64;
}

impl Float for f32 {
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Float for f64 {
    fn from_f64(v: f64) -> Self {
        v
    }

    fn to_f64(self) -> f64 {
        self
    }
}

/// Converts one float type from and to JSON numbers. Integers are accepted.
pub struct FloatConverter<T>(PhantomData<fn() -> T>);

impl<T: Float> FloatConverter<T> {
    /// Creates the converter.
    pub fn new() -> Self {
        FloatConverter(PhantomData)
    }
}

impl<T: Float> Default for FloatConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> Deserializer for FloatConverter<T> {
    fn supports_for_deserialization(&self, ty: &TypeDescriptor) -> bool {
        ty.is::<T>()
    }

    fn deserialize(&self, value: &Value, _: &TypeDescriptor, _: &Registries) -> Result<AnyValue, ErrorNode> {
        let Value::Number(number) = value else {
            return Err(expected(ValueKind::Number, value));
        };
        let narrowed = T::from_f64(number.as_f64());
        if !narrowed.to_f64().is_finite() {
            return Err(ErrorNode::message(format!(
                "value out of range for {}: {number}",
                core::any::type_name::<T>()
            )));
        }
        Ok(Box::new(narrowed))
    }
}

impl<T: Float> Serializer for FloatConverter<T> {
    fn supports_for_serialization(&self, raw: &RawType) -> bool {
        raw.is::<T>()
    }

    fn serialize(&self, value: &dyn Any, _: &TypeDescriptor, _: &Registries) -> Result<Value, ErrorNode> {
        let v = downcast_ref::<T>(value)?;
        Number::try_from(v.to_f64())
            .map(Value::Number)
            .map_err(|e| ErrorNode::message(e.to_string()))
    }
}

/// Converts `String` from and to JSON strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

impl Deserializer for StringConverter {
    fn supports_for_deserialization(&self, ty: &TypeDescriptor) -> bool {
        ty.is::<String>()
    }

    fn deserialize(&self, value: &Value, _: &TypeDescriptor, _: &Registries) -> Result<AnyValue, ErrorNode> {
        match value {
            Value::String(s) => Ok(Box::new(s.clone())),
            other => Err(expected(ValueKind::String, other)),
        }
    }
}

impl Serializer for StringConverter {
    fn supports_for_serialization(&self, raw: &RawType) -> bool {
        raw.is::<String>()
    }

    fn serialize(&self, value: &dyn Any, _: &TypeDescriptor, _: &Registries) -> Result<Value, ErrorNode> {
        downcast_ref::<String>(value).map(|s| Value::String(s.clone()))
    }
}
