//! Argument merging and resolution.
//!
//! # Responsibility
//! - Merge required/default/optional raw arguments into one keyword map.
//! - Resolve each raw string against the namespace or the cast cascade.
//!
//! # Invariants
//! - A name may appear in at most one category.
//! - Merged order is required, then default, then optional.
//! - Resolution never mutates the namespace.

use crate::model::namespace::Namespace;
use crate::model::task::ArgCategory;
use crate::model::value::{cast_raw_input, Value};
use indexmap::map::{self, IndexMap};
use log::debug;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Raw `name -> user text` arguments of one category, in declaration order.
pub type RawArgs = IndexMap<String, String>;

pub type ResolveResult<T> = Result<T, ResolveError>;

/// Argument resolution errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Names declared in more than one category, sorted.
    ArgumentConflict(Vec<String>),
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArgumentConflict(names) => write!(
                f,
                "argument(s) declared in more than one category: {}",
                names.join(", ")
            ),
        }
    }
}

impl Error for ResolveError {}

/// Error raised by task functions, including argument access failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskError {
    message: String,
}

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn missing_argument(name: &str) -> Self {
        Self::new(format!("missing argument `{name}`"))
    }

    pub fn wrong_type(name: &str, expected: &str, actual: &Value) -> Self {
        Self::new(format!(
            "argument `{name}` must be {expected}, got {} ({actual})",
            actual.kind()
        ))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for TaskError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for TaskError {}

/// Resolved keyword arguments handed to a task function.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedArgs {
    values: IndexMap<String, Value>,
}

impl ResolvedArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> map::Iter<'_, String, Value> {
        self.values.iter()
    }

    /// Looks up one argument, failing the task when it is absent.
    pub fn get(&self, name: &str) -> Result<&Value, TaskError> {
        self.values
            .get(name)
            .ok_or_else(|| TaskError::missing_argument(name))
    }

    pub fn int(&self, name: &str) -> Result<i64, TaskError> {
        let value = self.get(name)?;
        value
            .as_int()
            .ok_or_else(|| TaskError::wrong_type(name, "an int", value))
    }

    /// Float argument; integers are widened.
    pub fn float(&self, name: &str) -> Result<f64, TaskError> {
        let value = self.get(name)?;
        value
            .as_float()
            .ok_or_else(|| TaskError::wrong_type(name, "a number", value))
    }

    pub fn bool(&self, name: &str) -> Result<bool, TaskError> {
        let value = self.get(name)?;
        value
            .as_bool()
            .ok_or_else(|| TaskError::wrong_type(name, "a bool", value))
    }

    pub fn str(&self, name: &str) -> Result<&str, TaskError> {
        let value = self.get(name)?;
        value
            .as_str()
            .ok_or_else(|| TaskError::wrong_type(name, "a string", value))
    }

    /// List argument; a scalar is treated as a one-item list.
    pub fn list(&self, name: &str) -> Result<Vec<Value>, TaskError> {
        let value = self.get(name)?;
        match value.as_list() {
            Some(items) => Ok(items.to_vec()),
            None => Ok(vec![value.clone()]),
        }
    }
}

impl<'a> IntoIterator for &'a ResolvedArgs {
    type Item = (&'a String, &'a Value);
    type IntoIter = map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Rejects names present in more than one category.
pub fn check_categories(
    required: &RawArgs,
    default: &RawArgs,
    optional: &RawArgs,
) -> ResolveResult<()> {
    let categories = [required, default, optional];
    let mut conflicts = BTreeSet::new();
    for (index, left) in categories.iter().enumerate() {
        for right in &categories[index + 1..] {
            conflicts.extend(left.keys().filter(|name| right.contains_key(*name)).cloned());
        }
    }

    if conflicts.is_empty() {
        return Ok(());
    }
    Err(ResolveError::ArgumentConflict(conflicts.into_iter().collect()))
}

/// Merges the three categories and resolves every value.
///
/// # Resolution order
/// 1. A raw string equal to a namespace key yields the stored value.
/// 2. Otherwise the text goes through [`cast_raw_input`].
///
/// # Errors
/// - `ArgumentConflict` when any name appears in two or more categories.
pub fn resolve_args(
    required: &RawArgs,
    default: &RawArgs,
    optional: &RawArgs,
    namespace: &Namespace,
) -> ResolveResult<ResolvedArgs> {
    check_categories(required, default, optional)?;

    let categories = [
        (ArgCategory::Required, required),
        (ArgCategory::Default, default),
        (ArgCategory::Optional, optional),
    ];
    let mut resolved = ResolvedArgs::new();
    for (category, raw_args) in categories {
        for (name, raw) in raw_args {
            let (value, source) = match namespace.get(raw) {
                Some(stored) => (stored.clone(), "namespace"),
                None => (cast_raw_input(raw), "literal"),
            };
            debug!(
                "event=args_resolve module=runtime status=ok category={} arg={name} source={source} kind={}",
                category.field_name(),
                value.kind()
            );
            resolved.insert(name.clone(), value);
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::{resolve_args, RawArgs, ResolveError, ResolvedArgs, TaskError};
    use crate::model::namespace::Namespace;
    use crate::model::value::Value;

    fn raw(pairs: &[(&str, &str)]) -> RawArgs {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn merges_categories_in_required_default_optional_order() {
        let resolved = resolve_args(
            &raw(&[("b", "1")]),
            &raw(&[("a", "2")]),
            &raw(&[("c", "x")]),
            &Namespace::new(),
        )
        .expect("disjoint categories resolve");
        let names: Vec<&str> = resolved.names().collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn rejects_overlap_between_any_two_categories() {
        let empty = raw(&[]);
        let err = resolve_args(
            &raw(&[("a", "1")]),
            &empty,
            &raw(&[("a", "2")]),
            &Namespace::new(),
        )
        .expect_err("required/optional overlap must fail");
        assert_eq!(err, ResolveError::ArgumentConflict(vec!["a".to_string()]));

        let err = resolve_args(
            &empty,
            &raw(&[("z", "1"), ("k", "1")]),
            &raw(&[("k", "2"), ("z", "2")]),
            &Namespace::new(),
        )
        .expect_err("default/optional overlap must fail");
        assert_eq!(
            err,
            ResolveError::ArgumentConflict(vec!["k".to_string(), "z".to_string()])
        );
    }

    #[test]
    fn namespace_key_wins_over_cast_cascade() {
        let mut namespace = Namespace::new();
        namespace.set("3", Value::from("stored"));
        let resolved = resolve_args(&raw(&[("a", "3")]), &raw(&[]), &raw(&[]), &namespace)
            .expect("resolve");
        assert_eq!(resolved.get("a"), Ok(&Value::from("stored")));
    }

    #[test]
    fn accessors_report_missing_and_mistyped_arguments() {
        let mut args = ResolvedArgs::new();
        args.insert("n", Value::from("ten"));
        assert_eq!(args.int("m"), Err(TaskError::missing_argument("m")));
        let err = args.int("n").expect_err("string is not an int");
        assert!(err.message().contains("must be an int"));
        assert_eq!(args.list("n"), Ok(vec![Value::from("ten")]));
    }

    #[test]
    fn bool_accessor_reads_cast_flags_only() {
        let resolved = resolve_args(
            &raw(&[("verbose", "True")]),
            &raw(&[("count", "1")]),
            &raw(&[]),
            &Namespace::new(),
        )
        .expect("resolve");
        assert_eq!(resolved.bool("verbose"), Ok(true));
        let err = resolved.bool("count").expect_err("int is not a bool");
        assert!(err.message().contains("must be a bool"));
    }
}
