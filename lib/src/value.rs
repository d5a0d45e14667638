use std::sync::Arc;
use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::error::Result;

pub type Dict = BTreeMap<Arc<str>, Value>;

/// Represents any valid data value parsed from a content source.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Num(Num),
    String(Arc<str>),
    Array(Vec<Value>),
    Dict(Dict),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&**s),
            _ => None
        }
    }

    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v.as_slice()),
            _ => None
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(v) => Some(v),
            _ => None
        }
    }

    pub fn into_dict(self) -> Result<Dict, Value> {
        match self {
            Value::Dict(v) => Ok(v),
            _ => Err(self)
        }
    }

    /// Follows a `.`-separated key path through nested dicts.
    ///
    /// ```rust
    /// use swatch::value::{Value, Toml, Format};
    ///
    /// let value: Value = Toml::from_str("[a.b]\nc = 1").unwrap();
    /// assert!(value.pointer("a.b.c").is_some());
    /// assert!(value.pointer("a.x").is_none());
    /// ```
    pub fn pointer(&self, dotted: &str) -> Option<&Value> {
        let mut value = self;
        for key in dotted.split('.') {
            value = value.as_dict()?.get(key)?;
        }

        Some(value)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Num(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Dict(_) => "dict",
        }
    }
}

macro_rules! impl_from_primitive {
    ($($T:ty),+ => $E:ident::$kind:ident) => {
        $(
            impl From<$T> for $E {
                fn from(value: $T) -> Self {
                    $E::$kind(value.into())
                }
            }
        )+
    };
}

impl_from_primitive!(bool => Value::Bool);
impl_from_primitive!(&str => Value::String);
impl_from_primitive!(std::borrow::Cow<'_, str> => Value::String);
impl_from_primitive!(String => Value::String);
impl_from_primitive!(Arc<str> => Value::String);
impl_from_primitive!(Vec<Value> => Value::Array);
impl_from_primitive!(Dict => Value::Dict);
impl_from_primitive!(u8, u16, u32, u64, usize => Value::Num);
impl_from_primitive!(i8, i16, i32, i64, isize => Value::Num);
impl_from_primitive!(f32, f64 => Value::Num);

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T> From<Option<T>> for Value where Value: From<T> {
    fn from(value: Option<T>) -> Self {
        value.map(Value::from).unwrap_or(Value::Null)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Value::Array(iter.into_iter().collect())
    }
}

macro_rules! impl_try_from_value {
    ($($T:ty),+ => | $v:ident | $e:expr) => {
        $(
            impl TryFrom<$crate::value::Value> for $T {
                type Error = Value;

                fn try_from($v: $crate::value::Value) -> Result<Self, Self::Error> {
                    (|| $e)()
                }
            }
        )+
    };
}

impl_try_from_value!(bool => |v| v.as_bool().ok_or(v));
impl_try_from_value!(Arc<str> => |v| match v {
    Value::String(s) => Ok(s),
    _ => Err(v),
});
impl_try_from_value!(String => |v| match v {
    Value::String(s) => Ok(s.to_string()),
    _ => Err(v),
});
impl_try_from_value!(Dict => |v| v.into_dict());
impl_try_from_value!(Vec<Value> => |v| match v {
    Value::Array(a) => Ok(a),
    _ => Err(v),
});

/// A signed, unsigned, or floating numeric value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Num {
    I64(i64),
    U64(u64),
    F64(f64),
}

impl Num {
    pub fn as_f64(self) -> f64 {
        match self {
            Num::I64(v) => v as f64,
            Num::U64(v) => v as f64,
            Num::F64(v) => v,
        }
    }
}

impl PartialEq for Num {
    /// ```rust
    /// use swatch::value::Num;
    ///
    /// assert!(Num::from(10i32) == Num::from(10u64));
    /// assert!(Num::from(-1i8) != Num::from(1u8));
    /// ```
    fn eq(&self, other: &Self) -> bool {
        self.as_f64() == other.as_f64()
    }
}

macro_rules! impl_from_for_num {
    ($($T:ty => $V:ident),* $(,)?) => ($(
        impl From<$T> for Num {
            fn from(value: $T) -> Num {
                Num::$V(value.into())
            }
        }
    )*)
}

impl_from_for_num! {
    u8 => U64, u16 => U64, u32 => U64, u64 => U64,
    i8 => I64, i16 => I64, i32 => I64, i64 => I64,
    f32 => F64, f64 => F64,
}

impl From<usize> for Num {
    fn from(value: usize) -> Num {
        Num::U64(value as u64)
    }
}

impl From<isize> for Num {
    fn from(value: isize) -> Num {
        Num::I64(value as i64)
    }
}

/// A self-describing text data format, parseable into any deserializable
/// type; `Value`/`Dict` in the common case.
pub trait Format {
    fn from_str<T: serde::de::DeserializeOwned>(string: &str) -> Result<T>;

    /// Parses `string` as a top-level table.
    fn parse_dict(string: &str) -> Result<Dict> {
        Self::from_str(string)
    }
}

macro_rules! impl_format {
    ($name:ident : $func:expr) => (
        pub struct $name;

        impl Format for $name {
            fn from_str<T: serde::de::DeserializeOwned>(s: &str) -> Result<T> {
                Ok($func(s)?)
            }
        }
    );
}

impl_format!(Toml: toml::from_str);
impl_format!(Json: serde_json::from_str);

#[cfg(test)]
mod value_tests {
    use super::*;

    #[test]
    fn test_toml_dict() {
        let dict = Toml::parse_dict("name = \"Orange\"\nhidden = true\norder = 2").unwrap();
        assert_eq!(dict.get("name").and_then(|v| v.as_str()), Some("Orange"));
        assert_eq!(dict.get("hidden").and_then(|v| v.as_bool()), Some(true));
        assert_eq!(dict.get("order"), Some(&Value::from(2)));
    }

    #[test]
    fn test_json_nested_pointer() {
        let value: Value = Json::from_str(r#"{"a": {"b": [1, 2]}, "c": null}"#).unwrap();
        assert_eq!(value.pointer("a.b").and_then(|v| v.as_slice()).map(<[_]>::len), Some(2));
        assert_eq!(value.pointer("c"), Some(&Value::Null));
        assert_eq!(value.pointer("a.b.c"), None);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Value::Null.kind(), "null");
        assert_eq!(Value::from("s").kind(), "string");
        assert_eq!(Value::from(Dict::new()).kind(), "dict");
    }
}
