#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod error;
pub use error::*;

mod parser;
pub use parser::*;

mod record;
pub use record::*;

mod registry;
pub use registry::*;

pub mod builtin;
