//! Converters for the types every application needs: primitives, date/time
//! types, raw JSON values, lists, maps and the field wrappers.
//!
//! [`Registries::with_builtins`] registers all of them.

use crate::Registries;

mod primitive;
pub use primitive::*;

mod temporal;
pub use temporal::*;

mod raw;
pub use raw::*;

mod list;
pub use list::*;

mod map;
pub use map::*;

mod wrapper;
pub use wrapper::*;

pub(crate) fn register_builtins(registries: &mut Registries) {
    registries.register(BooleanConverter);
    registries.register(IntegerConverter::<i8>::new());
    registries.register(IntegerConverter::<i16>::new());
    registries.register(IntegerConverter::<i32>::new());
    registries.register(IntegerConverter::<i64>::new());
    registries.register(IntegerConverter::<isize>::new());
    registries.register(IntegerConverter::<u8>::new());
    registries.register(IntegerConverter::<u16>::new());
    registries.register(IntegerConverter::<u32>::new());
    registries.register(IntegerConverter::<u64>::new());
    registries.register(IntegerConverter::<usize>::new());
    registries.register(FloatConverter::<f32>::new());
    registries.register(FloatConverter::<f64>::new());
    registries.register(StringConverter);
    registries.register(DateConverter);
    registries.register(TimeConverter);
    registries.register(DateTimeConverter);
    registries.register(RawValueConverter);
    registries.register(ListConverter);
    registries.register(MapConverter);
    registries.register(OptionalFieldConverter);
    registries.register(NullableFieldConverter);
    registries.register(BoxConverter);
}
