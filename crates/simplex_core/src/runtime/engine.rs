//! Task execution engine.
//!
//! # Responsibility
//! - Locate the target function through a [`FunctionLoader`].
//! - Resolve arguments and call the function with them.
//!
//! # Invariants
//! - The library path is on the search path only while one invocation runs.
//! - Function results are returned unmodified; function errors propagate.

use crate::model::namespace::Namespace;
use crate::model::value::Value;
use crate::runtime::args::{resolve_args, RawArgs, ResolveError, TaskError};
use crate::runtime::loader::{FunctionLoader, LoadRequest, LoaderError, SearchPath};
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Failures while locating, preparing or running one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    Load(LoaderError),
    Resolve(ResolveError),
    /// The target function itself failed.
    Task {
        function_path: String,
        source: TaskError,
    },
}

impl Display for ExecutionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load(err) => write!(f, "{err}"),
            Self::Resolve(err) => write!(f, "{err}"),
            Self::Task {
                function_path,
                source,
            } => write!(f, "`{function_path}` failed: {source}"),
        }
    }
}

impl Error for ExecutionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load(err) => Some(err),
            Self::Resolve(err) => Some(err),
            Self::Task { source, .. } => Some(source),
        }
    }
}

impl From<LoaderError> for ExecutionError {
    fn from(value: LoaderError) -> Self {
        Self::Load(value)
    }
}

impl From<ResolveError> for ExecutionError {
    fn from(value: ResolveError) -> Self {
        Self::Resolve(value)
    }
}

/// One fully specified call: function coordinates plus raw arguments.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub library_path: &'a str,
    pub library_name: &'a str,
    pub function_name: &'a str,
    pub required: &'a RawArgs,
    pub default: &'a RawArgs,
    pub optional: &'a RawArgs,
}

impl Invocation<'_> {
    pub fn function_path(&self) -> String {
        format!("{}.{}", self.library_name, self.function_name)
    }
}

/// Runs tasks through a pluggable loader.
pub struct ExecutionEngine<L: FunctionLoader> {
    loader: L,
    search_path: SearchPath,
}

impl<L: FunctionLoader> ExecutionEngine<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            search_path: SearchPath::new(),
        }
    }

    /// Search path outside of any invocation.
    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    /// Locates, prepares and calls one task function.
    ///
    /// # Errors
    /// - `Load` when the loader cannot resolve the function.
    /// - `Resolve` when an argument name is declared in two categories.
    /// - `Task` when the function reports a failure.
    pub fn invoke(
        &mut self,
        invocation: &Invocation<'_>,
        namespace: &Namespace,
    ) -> ExecutionResult<Value> {
        let started_at = Instant::now();
        let function_path = invocation.function_path();
        info!(
            "event=task_invoke module=runtime status=start function={function_path} library_path={}",
            invocation.library_path
        );

        let search_path = self.search_path.scoped(invocation.library_path);
        let request = LoadRequest {
            library_path: invocation.library_path,
            library_name: invocation.library_name,
            function_name: invocation.function_name,
            search_path: search_path.entries(),
        };
        let function = self.loader.resolve(&request).map_err(|err| {
            error!(
                "event=task_invoke module=runtime status=error function={function_path} error_code=load_failed error={err}"
            );
            ExecutionError::from(err)
        })?;

        let args = resolve_args(
            invocation.required,
            invocation.default,
            invocation.optional,
            namespace,
        )?;
        let mut sorted: Vec<_> = args.iter().collect();
        sorted.sort_by(|left, right| left.0.cmp(right.0));
        for (name, value) in sorted {
            let shown = match namespace.name_of(value) {
                Some(variable) => variable.to_string(),
                None => value.to_string(),
            };
            debug!(
                "event=task_invoke module=runtime status=arg function={function_path} arg={name} value={shown} kind={}",
                value.kind()
            );
        }

        let result = function
            .call(&args)
            .map_err(|source| ExecutionError::Task {
                function_path: function_path.clone(),
                source,
            });
        drop(search_path);

        match &result {
            Ok(value) => info!(
                "event=task_invoke module=runtime status=ok function={function_path} result_kind={} duration_ms={}",
                value.kind(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=task_invoke module=runtime status=error function={function_path} error_code=task_failed duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            ),
        }
        result
    }
}
