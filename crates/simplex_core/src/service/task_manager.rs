//! Session-level task manager.
//!
//! # Responsibility
//! - Own the compiled registry and the session namespace.
//! - Build prefilled payloads for task forms and route submissions.
//!
//! # Invariants
//! - The registry is replaced wholesale on recompilation, never patched.
//! - The namespace lives as long as the manager.

use crate::manifest::compiler::{compile_tasks, CompileOptions, CompileResult};
use crate::model::namespace::Namespace;
use crate::model::task::{ArgSpec, TaskDescriptor, TaskRegistry};
use crate::runtime::engine::ExecutionEngine;
use crate::runtime::loader::FunctionLoader;
use crate::service::submission_service::{
    ArgBinding, HostDisplay, ReturnBinding, SubmissionError, SubmissionOutcome,
    SubmissionPayload, SubmissionService,
};

/// One interactive session: registry, namespace and submission pipeline.
pub struct TaskManager<L: FunctionLoader, H: HostDisplay> {
    registry: TaskRegistry,
    namespace: Namespace,
    submissions: SubmissionService<L, H>,
}

impl<L: FunctionLoader, H: HostDisplay> TaskManager<L, H> {
    pub fn new(registry: TaskRegistry, loader: L, host: H) -> Self {
        Self {
            registry,
            namespace: Namespace::new(),
            submissions: SubmissionService::new(ExecutionEngine::new(loader), host),
        }
    }

    /// Compiles the manifest directory and starts a session over it.
    pub fn compile(options: &CompileOptions, loader: L, host: H) -> CompileResult<Self> {
        let registry = compile_tasks(options)?;
        Ok(Self::new(registry, loader, host))
    }

    /// Replaces the registry with a fresh compilation; the namespace is kept.
    pub fn recompile(&mut self, options: &CompileOptions) -> CompileResult<()> {
        self.registry = compile_tasks(options)?;
        Ok(())
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn task(&self, label: &str) -> Option<&TaskDescriptor> {
        self.registry.get(label)
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn host(&self) -> &H {
        self.submissions.host()
    }

    /// Merges a host namespace snapshot into the session namespace.
    pub fn update_namespace(&mut self, snapshot: Namespace) {
        self.namespace.merge(snapshot);
    }

    /// Payload a task form would submit untouched: every argument carries its
    /// manifest default and every return slot is still empty.
    pub fn payload_for(&self, label: &str) -> Option<SubmissionPayload> {
        let task = self.registry.get(label)?;
        Some(SubmissionPayload {
            library_path: task.library_path.clone(),
            library_name: task.library_name.clone(),
            function_name: task.function_name.clone(),
            required_args: prefill(&task.required_args),
            default_args: prefill(&task.default_args),
            optional_args: prefill(&task.optional_args),
            returns: task
                .returns
                .iter()
                .map(|_| ReturnBinding { value: None })
                .collect(),
        })
    }

    /// Runs one submission against the session namespace.
    pub fn submit(
        &mut self,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        self.submissions.submit(payload, &mut self.namespace)
    }

    /// Parses and runs a raw JSON payload.
    pub fn submit_json(&mut self, text: &str) -> Result<SubmissionOutcome, SubmissionError> {
        let payload = SubmissionPayload::from_json(text)
            .map_err(|err| SubmissionError::InvalidPayload(err.to_string()))?;
        self.submit(&payload)
    }
}

fn prefill(specs: &[ArgSpec]) -> Vec<ArgBinding> {
    specs
        .iter()
        .map(|spec| ArgBinding {
            arg_name: spec.arg_name.clone(),
            value: Some(spec.value.clone()),
        })
        .collect()
}
