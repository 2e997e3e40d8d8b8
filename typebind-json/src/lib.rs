#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod error;
pub use error::*;

mod engine;
pub use engine::*;

pub mod text;
