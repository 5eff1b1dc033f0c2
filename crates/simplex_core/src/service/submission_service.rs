//! Task submission use-case service.
//!
//! # Responsibility
//! - Validate raw submission payloads coming from task forms.
//! - Run the task through the execution engine.
//! - Bind results into the session namespace.
//!
//! # Invariants
//! - A rejected submission performs no invocation and leaves the namespace
//!   unchanged.
//! - Host output is cleared only once validation has passed.
//! - A failed invocation binds nothing.

use crate::model::namespace::Namespace;
use crate::model::value::Value;
use crate::runtime::args::RawArgs;
use crate::runtime::engine::{ExecutionEngine, ExecutionError, Invocation};
use crate::runtime::loader::FunctionLoader;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// One `{arg_name, value}` pair of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgBinding {
    pub arg_name: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// One return slot of a submission; `value` is the variable name to bind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBinding {
    #[serde(default)]
    pub value: Option<String>,
}

/// User-filled task instance ready for execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub library_path: String,
    pub library_name: String,
    pub function_name: String,
    #[serde(default)]
    pub required_args: Vec<ArgBinding>,
    #[serde(default)]
    pub default_args: Vec<ArgBinding>,
    #[serde(default)]
    pub optional_args: Vec<ArgBinding>,
    #[serde(default)]
    pub returns: Vec<ReturnBinding>,
}

impl SubmissionPayload {
    /// Parses the raw JSON payload posted by a task form.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Sets the value of argument `arg_name` in whichever category declares it.
    ///
    /// Returns `false` when no category declares the argument.
    pub fn set_arg(&mut self, arg_name: &str, value: impl Into<String>) -> bool {
        let binding = self
            .required_args
            .iter_mut()
            .chain(self.default_args.iter_mut())
            .chain(self.optional_args.iter_mut())
            .find(|binding| binding.arg_name == arg_name);
        match binding {
            Some(binding) => {
                binding.value = Some(value.into());
                true
            }
            None => false,
        }
    }

    /// Replaces the return slots with `names`, in order.
    pub fn set_returns<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.returns = names
            .into_iter()
            .map(|name| ReturnBinding {
                value: Some(name.into()),
            })
            .collect();
    }
}

/// Host display collaboration used by submissions.
pub trait HostDisplay {
    /// Clears whatever output the host currently shows for this task.
    fn clear_output(&mut self);
    /// Shows a user-facing message.
    fn notify(&mut self, message: &str);
}

/// Host display that only writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogHostDisplay;

impl HostDisplay for LogHostDisplay {
    fn clear_output(&mut self) {
        debug!("event=host_clear_output module=service status=ok");
    }

    fn notify(&mut self, message: &str) {
        info!("event=host_notify module=service status=ok message={message:?}");
    }
}

/// Reason a submission was refused before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingRequiredArgument,
    MissingReturnName,
}

impl ValidationIssue {
    /// Message shown to the user.
    pub fn message(self) -> &'static str {
        match self {
            Self::MissingRequiredArgument => "Please provide all required arguments.",
            Self::MissingReturnName => "Please provide all return names.",
        }
    }
}

/// Summary of an executed submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReport {
    pub submission_id: Uuid,
    /// Namespace names written, in binding order.
    pub bound: Vec<String>,
    pub result: Value,
}

/// Outcome of one submission that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Rejected(ValidationIssue),
    Completed(SubmissionReport),
}

/// Submission failures after validation passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// Raw payload text is not a valid submission.
    InvalidPayload(String),
    Execution(ExecutionError),
    /// Several return names were declared but the result is not a list.
    ResultNotSequence {
        returns: Vec<String>,
        result_kind: &'static str,
    },
}

impl Display for SubmissionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPayload(details) => write!(f, "invalid submission payload: {details}"),
            Self::Execution(err) => write!(f, "{err}"),
            Self::ResultNotSequence {
                returns,
                result_kind,
            } => write!(
                f,
                "cannot bind {} return names ({}) from a single {result_kind} result",
                returns.len(),
                returns.join(", ")
            ),
        }
    }
}

impl Error for SubmissionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Execution(err) => Some(err),
            Self::InvalidPayload(_) | Self::ResultNotSequence { .. } => None,
        }
    }
}

impl From<ExecutionError> for SubmissionError {
    fn from(value: ExecutionError) -> Self {
        Self::Execution(value)
    }
}

/// Validates, executes and binds task submissions.
pub struct SubmissionService<L: FunctionLoader, H: HostDisplay> {
    engine: ExecutionEngine<L>,
    host: H,
}

impl<L: FunctionLoader, H: HostDisplay> SubmissionService<L, H> {
    pub fn new(engine: ExecutionEngine<L>, host: H) -> Self {
        Self { engine, host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Runs one submission against `namespace`.
    ///
    /// # Contract
    /// - Empty/missing required values or return names: the host is notified
    ///   and `Rejected` is returned without invoking anything.
    /// - One return name binds the whole result; several names are zipped
    ///   with the result list; no names bind nothing.
    ///
    /// # Errors
    /// - `Execution` when the task cannot be located, prepared or run.
    /// - `ResultNotSequence` when several names meet a non-list result.
    pub fn submit(
        &mut self,
        payload: &SubmissionPayload,
        namespace: &mut Namespace,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let submission_id = Uuid::new_v4();
        let required = flatten_args(&payload.required_args);
        let default = flatten_args(&payload.default_args);
        let optional = flatten_args(&payload.optional_args);

        let issue = if payload
            .required_args
            .iter()
            .any(|arg| is_blank(arg.value.as_deref()))
        {
            Some(ValidationIssue::MissingRequiredArgument)
        } else if payload
            .returns
            .iter()
            .any(|ret| is_blank(ret.value.as_deref()))
        {
            Some(ValidationIssue::MissingReturnName)
        } else {
            None
        };
        if let Some(issue) = issue {
            info!(
                "event=task_submit module=service status=rejected submission_id={submission_id} function={}.{} reason={issue:?}",
                payload.library_name, payload.function_name
            );
            self.host.notify(issue.message());
            return Ok(SubmissionOutcome::Rejected(issue));
        }

        let returns: Vec<String> = payload
            .returns
            .iter()
            .filter_map(|ret| ret.value.clone())
            .collect();

        info!(
            "event=task_submit module=service status=start submission_id={submission_id} function={}.{} returns={}",
            payload.library_name,
            payload.function_name,
            returns.len()
        );
        self.host.clear_output();

        let invocation = Invocation {
            library_path: &payload.library_path,
            library_name: &payload.library_name,
            function_name: &payload.function_name,
            required: &required,
            default: &default,
            optional: &optional,
        };
        let result = self.engine.invoke(&invocation, namespace)?;
        let bound = bind_result(&returns, &result, namespace)?;

        info!(
            "event=task_submit module=service status=ok submission_id={submission_id} bound={}",
            bound.join(",")
        );
        Ok(SubmissionOutcome::Completed(SubmissionReport {
            submission_id,
            bound,
            result,
        }))
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, str::is_empty)
}

fn flatten_args(bindings: &[ArgBinding]) -> RawArgs {
    bindings
        .iter()
        .map(|binding| {
            (
                binding.arg_name.clone(),
                binding.value.clone().unwrap_or_default(),
            )
        })
        .collect()
}

/// Writes `result` under `returns`, returning the names written.
fn bind_result(
    returns: &[String],
    result: &Value,
    namespace: &mut Namespace,
) -> Result<Vec<String>, SubmissionError> {
    match returns {
        [] => {
            debug!("event=namespace_bind module=service status=skip reason=no_returns");
            Ok(vec![])
        }
        [name] => {
            namespace.set(name.clone(), result.clone());
            debug!(
                "event=namespace_bind module=service status=ok name={name} kind={}",
                result.kind()
            );
            Ok(vec![name.clone()])
        }
        names => {
            let Value::List(items) = result else {
                return Err(SubmissionError::ResultNotSequence {
                    returns: names.to_vec(),
                    result_kind: result.kind(),
                });
            };
            if items.len() != names.len() {
                warn!(
                    "event=namespace_bind module=service status=truncated returns={} results={}",
                    names.len(),
                    items.len()
                );
            }

            let mut bound = Vec::with_capacity(names.len().min(items.len()));
            for (name, value) in names.iter().zip(items) {
                namespace.set(name.clone(), value.clone());
                debug!(
                    "event=namespace_bind module=service status=ok name={name} kind={}",
                    value.kind()
                );
                bound.push(name.clone());
            }
            Ok(bound)
        }
    }
}
