// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `NetKit` JSON
//!
//! Typed extraction and validation of attributes from untyped JSON payloads.
//!
//! ## Key Types
//!
//! - [`JsonDictionary`] / [`JsonArray`] - Untyped documents
//! - [`FromJson`] - Strict narrowing of an untyped value to a concrete type
//! - [`RawRepresentable`] - Enum-like types backed by a raw value
//! - [`JsonParser`] - Required/optional/raw/date attribute extraction with
//!   validation predicates and API error substitution
//! - [`JsonError`] - Structural parsing errors
//!
//! ## Example
//!
//! ```ignore
//! use netkit_json::{parse_dictionary, JsonParser};
//!
//! let document = parse_dictionary(br#"{"age": 30}"#)?;
//! let parser = JsonParser::new(&document);
//! let age: i64 = parser.attribute_where("age", |age: &i64| *age >= 0)?;
//! let nick: Option<String> = parser.optional_attribute("nick")?;
//! ```

pub mod document;
pub mod error;
pub mod formatters;
pub mod parser;
pub mod value;

pub use document::{parse_array, parse_dictionary, parse_raw_value, parse_value};
pub use error::JsonError;
pub use parser::{JsonParser, parse_attribute, parse_optional_attribute};
pub use value::{FromJson, JsonArray, JsonDictionary, JsonKind, RawRepresentable};
