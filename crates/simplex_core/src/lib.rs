//! Core logic for SimpleX tasks.
//! This crate compiles library manifests into a task registry and runs task
//! submissions against a session namespace.

pub mod config;
pub mod logging;
pub mod manifest;
pub mod model;
pub mod runtime;
pub mod service;

pub use config::{ConfigError, SimplexConfig};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingConfig};
pub use manifest::compiler::{
    compile_tasks, compile_tasks_as, write_record, CompileError, CompileOptions, CompileResult,
    CompiledRegistry, RegistryFormat, COMPILED_PREFIX,
};
pub use manifest::loader::{load_task, title_case, ManifestError, ManifestResult};
pub use model::namespace::Namespace;
pub use model::task::{
    ArgCategory, ArgSpec, ReturnSpec, TaskDescriptor, TaskRegistry, DEFAULT_DESCRIPTION,
};
pub use model::value::{cast_raw_input, cast_scalar, OpaqueValue, Value};
pub use runtime::args::{
    check_categories, resolve_args, RawArgs, ResolveError, ResolveResult, ResolvedArgs, TaskError,
};
pub use runtime::builtins::{builtin_library, builtin_loader, BUILTINS_LIBRARY};
pub use runtime::engine::{ExecutionEngine, ExecutionError, ExecutionResult, Invocation};
pub use runtime::loader::{
    FunctionLoader, LoadRequest, LoaderError, LoaderResult, SearchPath, SearchPathGuard,
    StaticLibrary, StaticLoader, TaskFunction,
};
pub use service::submission_service::{
    ArgBinding, HostDisplay, LogHostDisplay, ReturnBinding, SubmissionError, SubmissionOutcome,
    SubmissionPayload, SubmissionReport, SubmissionService, ValidationIssue,
};
pub use service::task_manager::TaskManager;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
