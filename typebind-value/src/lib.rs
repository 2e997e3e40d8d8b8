#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod macros;
#[doc(hidden)]
pub use macros::__private;

mod value;
pub use value::*;

mod number;
pub use number::*;

mod object;
pub use object::*;
