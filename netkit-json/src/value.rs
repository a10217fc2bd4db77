//! JSON document types and value narrowing.

use std::fmt;

use serde_json::{Map, Value};

/// An untyped JSON object (insertion ordered).
pub type JsonDictionary = Map<String, Value>;

/// An untyped JSON array.
pub type JsonArray = Vec<Value>;

// ============================================================================
// JSON Kind
// ============================================================================

/// The shape of an untyped JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonKind {
    /// `null`
    Null,
    /// `true` / `false`
    Bool,
    /// Any number.
    Number,
    /// A string.
    String,
    /// An array.
    Array,
    /// An object.
    Object,
}

impl JsonKind {
    /// Returns the kind of the given value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    /// Returns the lowercase name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Narrowing
// ============================================================================

/// A type an untyped JSON value can be narrowed to.
///
/// Narrowing is strict: it never converts between shapes. A string `"30"`
/// does not narrow to an integer, and `30.5` does not narrow to an integer.
/// Integers do narrow to floating point types.
pub trait FromJson: Sized {
    /// Name used in error messages.
    const TYPE_NAME: &'static str;

    /// Narrows the value, or returns `None` if it has another shape.
    fn from_json(value: &Value) -> Option<Self>;
}

macro_rules! impl_from_json_int {
    ($($ty:ty => $name:literal, $getter:ident;)*) => {
        $(
            impl FromJson for $ty {
                const TYPE_NAME: &'static str = $name;

                fn from_json(value: &Value) -> Option<Self> {
                    value.$getter().and_then(|n| <$ty>::try_from(n).ok())
                }
            }
        )*
    };
}

impl_from_json_int! {
    i64 => "i64", as_i64;
    i32 => "i32", as_i64;
    i16 => "i16", as_i64;
    i8 => "i8", as_i64;
    u64 => "u64", as_u64;
    u32 => "u32", as_u64;
    u16 => "u16", as_u64;
    u8 => "u8", as_u64;
    usize => "usize", as_u64;
}

impl FromJson for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromJson for f32 {
    const TYPE_NAME: &'static str = "f32";

    #[allow(clippy::cast_possible_truncation)]
    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64().map(|n| n as f32)
    }
}

impl FromJson for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromJson for String {
    const TYPE_NAME: &'static str = "string";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl FromJson for Value {
    const TYPE_NAME: &'static str = "value";

    fn from_json(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromJson for JsonDictionary {
    const TYPE_NAME: &'static str = "object";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_object().cloned()
    }
}

impl<T: FromJson> FromJson for Vec<T> {
    const TYPE_NAME: &'static str = "array";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_array()?.iter().map(T::from_json).collect()
    }
}

// ============================================================================
// Raw Representable
// ============================================================================

/// An enum-like type backed by a raw JSON value.
///
/// ```ignore
/// enum Plan { Free, Pro }
///
/// impl RawRepresentable for Plan {
///     type Raw = String;
///     fn from_raw(raw: String) -> Option<Self> {
///         match raw.as_str() {
///             "free" => Some(Self::Free),
///             "pro" => Some(Self::Pro),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait RawRepresentable: Sized {
    /// The underlying raw type.
    type Raw: FromJson;

    /// Name used in error messages.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Builds a value from its raw representation.
    fn from_raw(raw: Self::Raw) -> Option<Self>;
}
