#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod error;
pub use error::*;

mod descriptor;
pub use descriptor::*;

mod def;
pub use def::*;

mod convert;
pub use convert::*;

mod registry;
pub use registry::*;

mod registries;
pub use registries::*;

mod record;
pub use record::*;

pub mod builtin;
pub use builtin::{NullableField, OptionalField};

pub use typebind_value::Value;
