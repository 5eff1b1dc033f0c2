//! Session namespace store.
//!
//! # Responsibility
//! - Hold the live variables of one interactive session.
//! - Provide read-by-name and overwrite-by-name access.
//!
//! # Invariants
//! - Entries are never removed implicitly; writes overwrite.
//! - Lookups are exact string matches.

use crate::model::value::Value;
use std::collections::BTreeMap;

/// Name -> value mapping shared between submissions of one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
    entries: BTreeMap<String, Value>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Binds `name`, returning the previous value when one was overwritten.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(name.into(), value)
    }

    /// Updates this store from a host snapshot; incoming entries win.
    pub fn merge(&mut self, snapshot: Namespace) {
        self.entries.extend(snapshot.entries);
    }

    /// First variable (in name order) bound to an identical value.
    pub fn name_of(&self, value: &Value) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, candidate)| candidate.is_same(value))
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Value)> for Namespace {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Namespace;
    use crate::model::value::Value;

    #[test]
    fn set_overwrites_and_returns_previous_value() {
        let mut namespace = Namespace::new();
        assert_eq!(namespace.set("x", Value::Int(1)), None);
        assert_eq!(namespace.set("x", Value::Int(2)), Some(Value::Int(1)));
        assert_eq!(namespace.get("x"), Some(&Value::Int(2)));
        assert_eq!(namespace.len(), 1);
    }

    #[test]
    fn merge_lets_snapshot_entries_win() {
        let mut namespace = Namespace::new();
        namespace.set("kept", Value::from("old"));
        namespace.set("shared", Value::Int(1));

        let snapshot: Namespace = [
            ("shared".to_string(), Value::Int(9)),
            ("new".to_string(), Value::Bool(true)),
        ]
        .into_iter()
        .collect();
        namespace.merge(snapshot);

        assert_eq!(namespace.get("kept"), Some(&Value::from("old")));
        assert_eq!(namespace.get("shared"), Some(&Value::Int(9)));
        assert_eq!(namespace.get("new"), Some(&Value::Bool(true)));
    }

    #[test]
    fn name_of_finds_identical_opaque_object_only() {
        let object = Value::opaque(String::from("frame"));
        let lookalike = Value::opaque(String::from("frame"));
        let mut namespace = Namespace::new();
        namespace.set("df", object.clone());

        assert_eq!(namespace.name_of(&object), Some("df"));
        assert_eq!(namespace.name_of(&lookalike), None);
    }
}
