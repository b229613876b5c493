//! State inspection for diagnostics.
//!
//! Queries never affect emulation state.

use std::fmt;

/// A dynamically-typed value returned by a state query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    String(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v:#04X}"),
            Value::U16(v) => write!(f, "{v:#06X}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from!(bool => Bool, u8 => U8, u16 => U16, u32 => U32, u64 => U64, String => String);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

/// A component whose state can be inspected by path.
pub trait Observable {
    /// Query a property by dotted path, e.g. `pc` or `flags.z`.
    ///
    /// Returns `None` if the path is not recognised.
    fn query(&self, path: &str) -> Option<Value>;

    /// Paths accepted by [`Observable::query`].
    fn query_paths(&self) -> &'static [&'static str];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_hex_for_narrow_values() {
        assert_eq!(Value::U8(0x0A).to_string(), "0x0A");
        assert_eq!(Value::U16(0x4000).to_string(), "0x4000");
        assert_eq!(Value::U64(69_888).to_string(), "69888");
        assert_eq!(Value::from("48").to_string(), "48");
    }
}
