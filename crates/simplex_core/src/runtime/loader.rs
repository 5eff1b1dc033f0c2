//! Function loader contracts and the in-process static loader.
//!
//! # Responsibility
//! - Define the seam that turns library coordinates into a callable.
//! - Provide a scoped library search path for one invocation.
//! - Ship a static registration-based loader.
//!
//! # Invariants
//! - Search path entries pushed for an invocation are removed when the
//!   invocation ends, on success and on error.
//! - Loaders never execute the function they resolve.

use crate::model::value::Value;
use crate::runtime::args::{ResolvedArgs, TaskError};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;
use std::sync::Arc;

pub type LoaderResult<T> = Result<T, LoaderError>;

type TaskFn = dyn Fn(&ResolvedArgs) -> Result<Value, TaskError> + Send + Sync;

/// Callable handle produced by a [`FunctionLoader`].
#[derive(Clone)]
pub struct TaskFunction {
    inner: Arc<TaskFn>,
}

impl TaskFunction {
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(&ResolvedArgs) -> Result<Value, TaskError> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(function),
        }
    }

    pub fn call(&self, args: &ResolvedArgs) -> Result<Value, TaskError> {
        (self.inner)(args)
    }
}

impl Debug for TaskFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "TaskFunction")
    }
}

/// Coordinates of the function to resolve.
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest<'a> {
    pub library_path: &'a str,
    pub library_name: &'a str,
    pub function_name: &'a str,
    /// Active search path, most recent entry first.
    pub search_path: &'a [String],
}

/// Platform-specific strategy for locating task functions.
pub trait FunctionLoader {
    fn resolve(&self, request: &LoadRequest<'_>) -> LoaderResult<TaskFunction>;
}

/// Function lookup failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    LibraryNotFound(String),
    /// The library is registered under a root that is not on the search path.
    LibraryNotOnSearchPath { library_name: String, root: String },
    FunctionNotFound {
        library_name: String,
        function_name: String,
    },
}

impl Display for LoaderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LibraryNotFound(name) => write!(f, "no library named `{name}`"),
            Self::LibraryNotOnSearchPath { library_name, root } => write!(
                f,
                "library `{library_name}` lives under `{root}`, which is not on the search path"
            ),
            Self::FunctionNotFound {
                library_name,
                function_name,
            } => write!(f, "cannot import `{function_name}` from `{library_name}`"),
        }
    }
}

impl Error for LoaderError {}

/// Ordered library search path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    entries: Vec<String>,
}

impl SearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pushes `entry` to the front until the returned guard is dropped.
    pub fn scoped(&mut self, entry: impl Into<String>) -> SearchPathGuard<'_> {
        self.entries.insert(0, entry.into());
        SearchPathGuard { path: self }
    }
}

/// Restores the search path on drop.
#[derive(Debug)]
pub struct SearchPathGuard<'a> {
    path: &'a mut SearchPath,
}

impl Deref for SearchPathGuard<'_> {
    type Target = SearchPath;

    fn deref(&self) -> &Self::Target {
        self.path
    }
}

impl Drop for SearchPathGuard<'_> {
    fn drop(&mut self) {
        if !self.path.entries.is_empty() {
            self.path.entries.remove(0);
        }
    }
}

/// Functions of one statically registered library.
#[derive(Debug, Clone, Default)]
pub struct StaticLibrary {
    root: Option<String>,
    functions: BTreeMap<String, TaskFunction>,
}

impl StaticLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts resolution to invocations whose search path holds `root`.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(ensure_trailing_slash(root.into()));
        self
    }

    pub fn with_function<F>(mut self, function_name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&ResolvedArgs) -> Result<Value, TaskError> + Send + Sync + 'static,
    {
        self.functions
            .insert(function_name.into(), TaskFunction::new(function));
        self
    }
}

/// Loader backed by libraries registered in-process.
#[derive(Debug, Clone, Default)]
pub struct StaticLoader {
    libraries: BTreeMap<String, StaticLibrary>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the library reachable as `library_name`.
    pub fn register_library(&mut self, library_name: impl Into<String>, library: StaticLibrary) {
        self.libraries.insert(library_name.into(), library);
    }
}

impl FunctionLoader for StaticLoader {
    fn resolve(&self, request: &LoadRequest<'_>) -> LoaderResult<TaskFunction> {
        let library = self
            .libraries
            .get(request.library_name)
            .ok_or_else(|| LoaderError::LibraryNotFound(request.library_name.to_string()))?;

        if let Some(root) = &library.root {
            let reachable = request
                .search_path
                .iter()
                .any(|entry| ensure_trailing_slash(entry.clone()) == *root);
            if !reachable {
                return Err(LoaderError::LibraryNotOnSearchPath {
                    library_name: request.library_name.to_string(),
                    root: root.clone(),
                });
            }
        }

        library
            .functions
            .get(request.function_name)
            .cloned()
            .ok_or_else(|| LoaderError::FunctionNotFound {
                library_name: request.library_name.to_string(),
                function_name: request.function_name.to_string(),
            })
    }
}

fn ensure_trailing_slash(mut value: String) -> String {
    if !value.ends_with('/') {
        value.push('/');
    }
    value
}
