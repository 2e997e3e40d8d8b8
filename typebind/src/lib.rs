#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use typebind_core::*;

pub use typebind_value::{Number, NumberType, Object, Value, ValueKind, value};

/// JSON text and the [`JsonEngine`](json::JsonEngine).
#[cfg(feature = "json")]
#[cfg_attr(docsrs, doc(cfg(feature = "json")))]
pub use typebind_json as json;

/// Query-string parameters to records.
#[cfg(feature = "querystring")]
#[cfg_attr(docsrs, doc(cfg(feature = "querystring")))]
pub use typebind_querystring as querystring;
