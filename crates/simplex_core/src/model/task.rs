//! Canonical task descriptor model.
//!
//! # Responsibility
//! - Define the registry-resident shape of one invokable function.
//! - Serialize registries in the persisted record format.
//!
//! # Invariants
//! - Labels are unique keys within one registry.
//! - Descriptors are immutable once built; registries are rebuilt, not patched.
//! - Struct fields are declared in alphabetical order so serialized records
//!   have sorted keys at every level.

use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};

/// Description used whenever a manifest omits one.
pub const DEFAULT_DESCRIPTION: &str = "No info.";

/// Declarative description of one function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSpec {
    /// Keyword name passed to the function.
    pub arg_name: String,
    pub description: String,
    /// Display name shown by task forms.
    pub label: String,
    /// Default raw literal; empty when unset.
    pub value: String,
}

/// Declarative description of one output slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnSpec {
    pub description: String,
    pub label: String,
}

/// Argument category as declared in manifests and submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArgCategory {
    Required,
    Default,
    Optional,
}

impl ArgCategory {
    /// Manifest/payload field name for this category.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Required => "required_args",
            Self::Default => "default_args",
            Self::Optional => "optional_args",
        }
    }
}

/// Canonical registry entry for one invokable function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub default_args: Vec<ArgSpec>,
    pub description: String,
    pub function_name: String,
    /// Dotted module path the function lives in.
    pub library_name: String,
    /// Library root directory, always ending with `/`.
    pub library_path: String,
    pub optional_args: Vec<ArgSpec>,
    pub required_args: Vec<ArgSpec>,
    pub returns: Vec<ReturnSpec>,
}

impl TaskDescriptor {
    /// Argument specs of one category.
    pub fn args(&self, category: ArgCategory) -> &[ArgSpec] {
        match category {
            ArgCategory::Required => &self.required_args,
            ArgCategory::Default => &self.default_args,
            ArgCategory::Optional => &self.optional_args,
        }
    }

    /// `library_name.function_name`, as written in manifests.
    pub fn function_path(&self) -> String {
        format!("{}.{}", self.library_name, self.function_name)
    }
}

/// Label-keyed task registry, iterated in label order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, TaskDescriptor>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.tasks.contains_key(label)
    }

    pub fn get(&self, label: &str) -> Option<&TaskDescriptor> {
        self.tasks.get(label)
    }

    /// Inserts one descriptor, returning the one it replaced.
    pub fn insert(
        &mut self,
        label: impl Into<String>,
        descriptor: TaskDescriptor,
    ) -> Option<TaskDescriptor> {
        self.tasks.insert(label.into(), descriptor)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, TaskDescriptor> {
        self.tasks.iter()
    }

    /// Serializes in the persisted record format (sorted keys, 2-space indent).
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Compact single-line serialization handed to task forms.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Reads a previously persisted record.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

impl IntoIterator for TaskRegistry {
    type Item = (String, TaskDescriptor);
    type IntoIter = btree_map::IntoIter<String, TaskDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.into_iter()
    }
}

impl<'a> IntoIterator for &'a TaskRegistry {
    type Item = (&'a String, &'a TaskDescriptor);
    type IntoIter = btree_map::Iter<'a, String, TaskDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{ArgCategory, ArgSpec, ReturnSpec, TaskDescriptor, TaskRegistry};

    fn descriptor() -> TaskDescriptor {
        TaskDescriptor {
            default_args: vec![],
            description: "Adds two numbers.".to_string(),
            function_name: "add".to_string(),
            library_name: "simplex.builtins".to_string(),
            library_path: "/opt/simplex/".to_string(),
            optional_args: vec![],
            required_args: vec![ArgSpec {
                arg_name: "a".to_string(),
                description: "No info.".to_string(),
                label: "A".to_string(),
                value: String::new(),
            }],
            returns: vec![ReturnSpec {
                description: "No info.".to_string(),
                label: "Sum".to_string(),
            }],
        }
    }

    #[test]
    fn persisted_record_has_sorted_keys_and_two_space_indent() {
        let mut registry = TaskRegistry::new();
        registry.insert("Add", descriptor());
        let text = registry.to_json_pretty().expect("serialize registry");

        assert!(text.starts_with("{\n  \"Add\": {\n    \"default_args\": []"));
        let positions: Vec<usize> = [
            "\"default_args\"",
            "\"description\"",
            "\"function_name\"",
            "\"library_name\"",
            "\"library_path\"",
            "\"optional_args\"",
            "\"required_args\"",
            "\"returns\"",
        ]
        .iter()
        .map(|key| text.find(key).expect("key present"))
        .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn record_reads_back_into_equal_registry() {
        let mut registry = TaskRegistry::new();
        registry.insert("Add", descriptor());
        let text = registry.to_json_pretty().expect("serialize registry");
        let parsed = TaskRegistry::from_json(&text).expect("parse registry");
        assert_eq!(parsed, registry);
    }

    #[test]
    fn descriptor_exposes_categories_and_function_path() {
        let task = descriptor();
        assert_eq!(task.args(ArgCategory::Required).len(), 1);
        assert!(task.args(ArgCategory::Optional).is_empty());
        assert_eq!(task.function_path(), "simplex.builtins.add");
        assert_eq!(ArgCategory::Default.field_name(), "default_args");
    }
}
