//! Dynamic value model shared by namespace, resolution and task functions.
//!
//! # Responsibility
//! - Represent every value a task can receive or return.
//! - Implement the scalar cast cascade used for raw user input.
//!
//! # Invariants
//! - Cast order is integer, float, boolean, then string.
//! - `Opaque` values compare by identity, never by content.

use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::any::Any;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

const TRUE_LITERALS: &[&str] = &["true", "True", "TRUE"];
const FALSE_LITERALS: &[&str] = &["false", "False", "FALSE"];

/// Shared handle to a live host object that has no scalar representation.
#[derive(Clone)]
pub struct OpaqueValue {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl OpaqueValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    /// Rust type name captured at construction, used for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Whether both handles point at the same live object.
    pub fn same_object(&self, other: &OpaqueValue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Debug for OpaqueValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "OpaqueValue<{}>", self.type_name)
    }
}

impl PartialEq for OpaqueValue {
    fn eq(&self, other: &Self) -> bool {
        self.same_object(other)
    }
}

/// One value flowing through the task runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Result of a task that produces nothing.
    None,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    List(Vec<Value>),
    Opaque(OpaqueValue),
}

impl Value {
    /// Stable kind name used in logs and type errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Opaque(_) => "object",
        }
    }

    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Self::Opaque(OpaqueValue::new(value))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Floats, and integers widened to float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Identity comparison used to find which variable a value came from.
    ///
    /// Opaque handles match only the same object; other kinds match by value.
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Opaque(left), Self::Opaque(right)) => left.same_object(right),
            (Self::Float(left), Self::Float(right)) => left.to_bits() == right.to_bits(),
            _ => self == other,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value:?}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value:?}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Opaque(value) => write!(f, "<{}>", value.type_name()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_none(),
            Self::Int(value) => serializer.serialize_i64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Str(value) => serializer.serialize_str(value),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Opaque(value) => serializer.serialize_str(&format!("<{}>", value.type_name())),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

/// Casts one raw fragment: integer, then float, then boolean, else string.
pub fn cast_scalar(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Value::Int(value);
    }
    if let Ok(value) = trimmed.parse::<f64>() {
        return Value::Float(value);
    }
    if TRUE_LITERALS.contains(&trimmed) {
        return Value::Bool(true);
    }
    if FALSE_LITERALS.contains(&trimmed) {
        return Value::Bool(false);
    }
    Value::Str(raw.to_string())
}

/// Splits raw input on `,`, drops empty fragments and casts the rest.
///
/// One surviving fragment yields the scalar itself, anything else a list.
pub fn cast_raw_input(raw: &str) -> Value {
    let mut fragments: Vec<Value> = raw
        .split(',')
        .filter(|fragment| !fragment.is_empty())
        .map(cast_scalar)
        .collect();
    if fragments.len() == 1 {
        return fragments.remove(0);
    }
    Value::List(fragments)
}

#[cfg(test)]
mod tests {
    use super::{cast_raw_input, cast_scalar, OpaqueValue, Value};

    #[test]
    fn cast_scalar_follows_int_float_bool_string_order() {
        assert_eq!(cast_scalar("3"), Value::Int(3));
        assert_eq!(cast_scalar("-12"), Value::Int(-12));
        assert_eq!(cast_scalar("3.5"), Value::Float(3.5));
        assert_eq!(cast_scalar("1e3"), Value::Float(1000.0));
        assert_eq!(cast_scalar("true"), Value::Bool(true));
        assert_eq!(cast_scalar("False"), Value::Bool(false));
        assert_eq!(cast_scalar("yes"), Value::Str("yes".to_string()));
    }

    #[test]
    fn numeric_casts_ignore_surrounding_whitespace_but_strings_stay_verbatim() {
        assert_eq!(cast_scalar(" 7 "), Value::Int(7));
        assert_eq!(cast_scalar(" b"), Value::Str(" b".to_string()));
    }

    #[test]
    fn cast_raw_input_returns_scalar_for_single_fragment() {
        assert_eq!(cast_raw_input("a"), Value::Str("a".to_string()));
        assert_eq!(cast_raw_input("4,"), Value::Int(4));
    }

    #[test]
    fn cast_raw_input_returns_list_for_many_fragments() {
        assert_eq!(
            cast_raw_input("a,b"),
            Value::List(vec![Value::from("a"), Value::from("b")])
        );
        assert_eq!(
            cast_raw_input("1,,2.5,true"),
            Value::List(vec![Value::Int(1), Value::Float(2.5), Value::Bool(true)])
        );
    }

    #[test]
    fn cast_raw_input_of_empty_text_is_empty_list() {
        assert_eq!(cast_raw_input(""), Value::List(vec![]));
        assert_eq!(cast_raw_input(",,"), Value::List(vec![]));
    }

    #[test]
    fn opaque_values_compare_by_identity() {
        let first = OpaqueValue::new(vec![1u8, 2, 3]);
        let clone = first.clone();
        let other = OpaqueValue::new(vec![1u8, 2, 3]);
        assert_eq!(first, clone);
        assert_ne!(first, other);
        assert_eq!(first.downcast_ref::<Vec<u8>>(), Some(&vec![1u8, 2, 3]));
    }

    #[test]
    fn int_widens_to_float_accessor() {
        assert_eq!(Value::Int(2).as_float(), Some(2.0));
        assert_eq!(Value::from("2").as_float(), None);
    }
}
