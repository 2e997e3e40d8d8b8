use core::any::Any;

use crate::{AnyValue, ConstructError, TypeDescriptor, TypeError, Typed};

mod converter;
pub(crate) use converter::RecordConverter;

/// One named component of a record.
#[derive(Clone, Debug)]
pub struct Component {
    /// Property name in JSON
    pub name: &'static str,
    /// Declared type, which may mention the record's type variables
    pub declared: TypeDescriptor,
}

/// The raw-level description of a record type: its type parameters and its
/// components in declaration order.
///
/// A generic record has a single shape shared by all its instantiations;
/// component types refer to the record's parameters through
/// [`TypeDescriptor::variable`].
#[derive(Clone, Debug, Default)]
pub struct RecordShape {
    /// Names of the record's own type parameters
    pub type_params: Vec<&'static str>,
    /// Components in declaration order
    pub components: Vec<Component>,
}

impl RecordShape {
    /// A shape with the given type parameters and no components yet.
    pub fn new(type_params: &[&'static str]) -> Self {
        RecordShape {
            type_params: type_params.to_vec(),
            components: Vec::new(),
        }
    }

    /// Appends a component.
    pub fn component(mut self, name: &'static str, declared: TypeDescriptor) -> Self {
        self.components.push(Component { name, declared });
        self
    }

    /// Returns true if some component is called `name`.
    pub fn has_component(&self, name: &str) -> bool {
        self.components.iter().any(|c| c.name == name)
    }

    /// The concrete type of component `index` in the instantiation `ty`.
    ///
    /// Substitutes the arguments of `ty` into the declared type, and checks
    /// the result against `monomorphized`, the instantiation's own component
    /// types as reported by [`Record::component_types`]. Those carry the
    /// construction hooks, so they are what is returned.
    pub fn component_type(
        &self,
        index: usize,
        ty: &TypeDescriptor,
        monomorphized: &[TypeDescriptor],
    ) -> Result<TypeDescriptor, TypeError> {
        let component = self.components.get(index).ok_or(TypeError::ArityMismatch {
            expected: self.components.len(),
            found: index + 1,
        })?;
        let substituted = component.declared.concretize(&self.type_params, ty.args())?;
        match monomorphized.get(index) {
            Some(concrete) if *concrete == substituted => Ok(concrete.clone()),
            other => Err(TypeError::BindingMismatch {
                component: component.name,
                substituted: substituted.to_string(),
                declared: other.map_or_else(|| "nothing".to_owned(), ToString::to_string),
            }),
        }
    }
}

/// Converted component values, handed to [`Record::construct`] in
/// declaration order.
pub struct Components {
    values: std::vec::IntoIter<AnyValue>,
}

impl Components {
    /// Wraps converted values.
    pub fn new(values: Vec<AnyValue>) -> Self {
        Components {
            values: values.into_iter(),
        }
    }

    /// Takes the next component.
    pub fn take<T: 'static>(&mut self) -> Result<T, ConstructError> {
        let next = self
            .values
            .next()
            .ok_or_else(|| ConstructError::Internal("fewer components than declared".to_owned()))?;
        next.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
            ConstructError::Internal(format!(
                "component is not of type {}",
                core::any::type_name::<T>()
            ))
        })
    }
}

/// A fixed-shape type with named components, converted to and from a JSON
/// object by a generated record converter.
///
/// Non-generic records are most easily declared with [`record!`](crate::record).
/// A generic record implements the trait by hand: its [`Record::shape`]
/// declares components in terms of type variables, while
/// [`Record::component_types`] lists the concrete types for one
/// instantiation.
pub trait Record: Typed + Sized {
    /// Type parameters and declared components.
    fn shape() -> RecordShape;

    /// Concrete component types of this instantiation, in declaration order.
    fn component_types() -> Vec<TypeDescriptor> {
        Self::shape()
            .components
            .into_iter()
            .map(|component| component.declared)
            .collect()
    }

    /// Builds the record from its converted components.
    ///
    /// Return [`ConstructError::Invalid`] to reject a combination of values;
    /// its message is reported against the record as a whole.
    fn construct(components: &mut Components) -> Result<Self, ConstructError>;

    /// Borrows the components in declaration order. `None` marks a component
    /// with no value, which cannot be serialized.
    fn components(&self) -> Vec<Option<&dyn Any>>;
}

/// Declares a struct and implements [`Typed`] and [`Record`] for it.
///
/// ```
/// use typebind_core::{NullableField, record};
///
/// record! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct User {
///         pub name: String,
///         pub age: u32,
///         pub nickname: NullableField<String>,
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $fty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[$fmeta])* $fvis $field: $fty ),*
        }

        impl $crate::Typed for $name {
            fn descriptor() -> $crate::TypeDescriptor {
                $crate::TypeDescriptor::record::<Self>(
                    $crate::RawType::of::<Self>(stringify!($name)),
                    ::std::vec::Vec::new(),
                )
            }
        }

        impl $crate::Record for $name {
            fn shape() -> $crate::RecordShape {
                $crate::RecordShape::new(&[])
                    $( .component(stringify!($field), <$fty as $crate::Typed>::descriptor()) )*
            }

            #[allow(unused_variables)]
            fn construct(
                components: &mut $crate::Components,
            ) -> ::core::result::Result<Self, $crate::ConstructError> {
                ::core::result::Result::Ok($name {
                    $( $field: components.take::<$fty>()? ),*
                })
            }

            fn components(&self) -> ::std::vec::Vec<::core::option::Option<&dyn ::core::any::Any>> {
                ::std::vec![ $( ::core::option::Option::Some(&self.$field as &dyn ::core::any::Any) ),* ]
            }
        }
    };
}
