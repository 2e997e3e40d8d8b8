use core::any::Any;
use core::fmt;
use std::collections::BTreeMap;

use crate::{Components, ConstructError, Record, RecordShape, TypeDescriptor, TypeMismatch};

/// A converted value whose concrete type is known only through its
/// [`TypeDescriptor`].
pub type AnyValue = Box<dyn Any>;

/// Per-type construction hooks carried by a [`TypeDescriptor`].
///
/// Generic converters (lists, maps, wrappers, records) work on type-erased
/// values; the def is how they build and take apart the one concrete Rust type
/// a descriptor stands for.
#[derive(Clone, Copy)]
pub enum Def {
    /// A type handled entirely by its converter
    Scalar,
    /// `Vec<T>`
    List(ListDef),
    /// `BTreeMap<K, V>`
    Map(MapDef),
    /// A wrapper whose empty state means "property absent"
    Optional(WrapperDef),
    /// A wrapper whose empty state means "JSON null"
    Nullable(WrapperDef),
    /// A transparent smart pointer such as `Box<T>`
    Pointer(WrapperDef),
    /// A record with named components
    Record(RecordDef),
}

impl Def {
    fn kind(&self) -> &'static str {
        match self {
            Def::Scalar => "Scalar",
            Def::List(_) => "List",
            Def::Map(_) => "Map",
            Def::Optional(_) => "Optional",
            Def::Nullable(_) => "Nullable",
            Def::Pointer(_) => "Pointer",
            Def::Record(_) => "Record",
        }
    }
}

impl fmt::Debug for Def {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Hooks for a homogeneous list type.
#[derive(Clone, Copy)]
pub struct ListDef {
    /// Builds the list from converted elements
    pub build: fn(Vec<AnyValue>) -> Result<AnyValue, TypeMismatch>,
    /// Borrows the elements of a list; `None` if the value is not this list type
    pub items: for<'a> fn(&'a dyn Any) -> Option<Vec<&'a dyn Any>>,
}

impl ListDef {
    /// Hooks for `Vec<T>`.
    pub fn of<T: 'static>() -> Self {
        ListDef {
            build: build_vec::<T>,
            items: vec_items::<T>,
        }
    }
}

fn build_vec<T: 'static>(items: Vec<AnyValue>) -> Result<AnyValue, TypeMismatch> {
    let list = items
        .into_iter()
        .map(downcast_owned::<T>)
        .collect::<Result<Vec<T>, _>>()?;
    Ok(Box::new(list))
}

fn vec_items<T: 'static>(value: &dyn Any) -> Option<Vec<&dyn Any>> {
    let list = value.downcast_ref::<Vec<T>>()?;
    Some(list.iter().map(|item| item as &dyn Any).collect())
}

/// Hooks for a string-keyed-in-JSON map type.
#[derive(Clone, Copy)]
pub struct MapDef {
    /// Builds the map from converted keys and values
    pub build: fn(Vec<(AnyValue, AnyValue)>) -> Result<AnyValue, TypeMismatch>,
    /// Borrows the entries of a map; `None` if the value is not this map type
    pub entries: for<'a> fn(&'a dyn Any) -> Option<Vec<(&'a dyn Any, &'a dyn Any)>>,
}

impl MapDef {
    /// Hooks for `BTreeMap<K, V>`.
    pub fn of<K: Ord + 'static, V: 'static>() -> Self {
        MapDef {
            build: build_btree_map::<K, V>,
            entries: btree_map_entries::<K, V>,
        }
    }
}

fn build_btree_map<K: Ord + 'static, V: 'static>(
    entries: Vec<(AnyValue, AnyValue)>,
) -> Result<AnyValue, TypeMismatch> {
    let map = entries
        .into_iter()
        .map(|(k, v)| Ok((downcast_owned::<K>(k)?, downcast_owned::<V>(v)?)))
        .collect::<Result<BTreeMap<K, V>, TypeMismatch>>()?;
    Ok(Box::new(map))
}

fn btree_map_entries<K: 'static, V: 'static>(value: &dyn Any) -> Option<Vec<(&dyn Any, &dyn Any)>> {
    let map = value.downcast_ref::<BTreeMap<K, V>>()?;
    Some(
        map.iter()
            .map(|(k, v)| (k as &dyn Any, v as &dyn Any))
            .collect(),
    )
}

/// Hooks for a single-value wrapper.
#[derive(Clone, Copy)]
pub struct WrapperDef {
    /// Wraps a converted inner value, or builds the empty state from `None`
    pub wrap: fn(Option<AnyValue>) -> Result<AnyValue, TypeMismatch>,
    /// Borrows the inner value: `None` if the value is not this wrapper type,
    /// `Some(None)` for the empty state
    pub inner: for<'a> fn(&'a dyn Any) -> Option<Option<&'a dyn Any>>,
}

/// Hooks for a record type.
#[derive(Clone, Copy)]
pub struct RecordDef {
    /// The raw-level shape, shared by every instantiation
    pub shape: fn() -> RecordShape,
    /// Concrete component types of this instantiation
    pub component_types: fn() -> Vec<TypeDescriptor>,
    /// Builds the record from its converted components
    pub construct: fn(Components) -> Result<AnyValue, ConstructError>,
    /// Borrows the components; `None` if the value is not this record type
    pub components: for<'a> fn(&'a dyn Any) -> Option<Vec<Option<&'a dyn Any>>>,
}

impl RecordDef {
    /// Hooks for record type `R`.
    pub fn of<R: Record>() -> Self {
        RecordDef {
            shape: R::shape,
            component_types: R::component_types,
            construct: construct_record::<R>,
            components: record_components::<R>,
        }
    }
}

fn construct_record<R: Record>(mut components: Components) -> Result<AnyValue, ConstructError> {
    let record = R::construct(&mut components)?;
    Ok(Box::new(record))
}

fn record_components<R: Record>(value: &dyn Any) -> Option<Vec<Option<&dyn Any>>> {
    value.downcast_ref::<R>().map(R::components)
}

/// Unboxes a type-erased value.
pub fn downcast_owned<T: 'static>(value: AnyValue) -> Result<T, TypeMismatch> {
    value
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| TypeMismatch::of::<T>())
}
