use serde_json::json;
use simplex_core::{
    builtin_loader, CompileOptions, ExecutionError, HostDisplay, LoaderError, Namespace,
    StaticLoader, SubmissionError, SubmissionOutcome, TaskManager, ValidationIssue, Value,
    BUILTINS_LIBRARY,
};
use std::path::Path;
use tempfile::TempDir;

#[derive(Debug, Default)]
struct RecordingHost {
    cleared: usize,
    messages: Vec<String>,
}

impl HostDisplay for RecordingHost {
    fn clear_output(&mut self) {
        self.cleared += 1;
    }

    fn notify(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

fn builtins_manifest(json_dir: &Path, library_path: &Path) {
    let body = json!({
        "library_path": library_path.to_string_lossy(),
        "tasks": [
            {
                "function_path": format!("{BUILTINS_LIBRARY}.add"),
                "label": "Add",
                "required_args": [{"arg_name": "a"}, {"arg_name": "b"}],
                "returns": [{"label": "sum"}]
            },
            {
                "function_path": format!("{BUILTINS_LIBRARY}.divmod"),
                "label": "Divmod",
                "required_args": [{"arg_name": "a"}, {"arg_name": "b", "value": "2"}],
                "returns": [{"label": "quotient"}, {"label": "remainder"}]
            },
            {
                "function_path": format!("{BUILTINS_LIBRARY}.concat"),
                "label": "Join",
                "required_args": [{"arg_name": "values"}],
                "default_args": [{"arg_name": "separator", "value": "+"}]
            },
            {
                "function_path": format!("{BUILTINS_LIBRARY}.missing"),
                "label": "Missing"
            }
        ]
    });
    std::fs::write(
        json_dir.join("builtins.json"),
        serde_json::to_string_pretty(&body).unwrap(),
    )
    .unwrap();
}

fn session() -> (TempDir, TaskManager<StaticLoader, RecordingHost>) {
    let (root, options) = workspace();
    let manager = TaskManager::compile(&options, builtin_loader(), RecordingHost::default())
        .unwrap();
    (root, manager)
}

fn workspace() -> (TempDir, CompileOptions) {
    let root = TempDir::new().unwrap();
    let json_dir = root.path().join("json");
    let library_path = root.path().join("lib");
    std::fs::create_dir_all(&json_dir).unwrap();
    std::fs::create_dir_all(&library_path).unwrap();
    builtins_manifest(&json_dir, &library_path);
    (root, CompileOptions::new(json_dir))
}

#[test]
fn add_task_binds_sum_into_namespace() {
    let (_root, mut manager) = session();
    let mut payload = manager.payload_for("Add").expect("Add is registered");
    assert!(payload.set_arg("a", "2"));
    assert!(payload.set_arg("b", "3"));
    payload.set_returns(["sum"]);

    let outcome = manager.submit(&payload).unwrap();
    let SubmissionOutcome::Completed(report) = outcome else {
        panic!("submission should complete");
    };
    assert_eq!(report.bound, vec!["sum".to_string()]);
    assert_eq!(report.result, Value::Int(5));
    assert_eq!(manager.namespace().get("sum"), Some(&Value::Int(5)));
    assert_eq!(manager.host().cleared, 1);
    assert!(manager.host().messages.is_empty());
}

#[test]
fn namespace_values_feed_later_submissions() {
    let (_root, mut manager) = session();
    manager.update_namespace(Namespace::from_iter([("x".to_string(), Value::Int(40))]));

    let mut payload = manager.payload_for("Add").unwrap();
    payload.set_arg("a", "x");
    payload.set_arg("b", "2,");
    payload.set_returns(["total"]);
    manager.submit(&payload).unwrap();

    assert_eq!(manager.namespace().get("total"), Some(&Value::Int(42)));
    assert_eq!(manager.namespace().get("x"), Some(&Value::Int(40)));
}

#[test]
fn empty_required_value_rejects_without_invoking() {
    let (_root, mut manager) = session();
    manager.update_namespace(Namespace::from_iter([("keep".to_string(), Value::Bool(true))]));
    let before = manager.namespace().clone();

    let mut payload = manager.payload_for("Add").unwrap();
    payload.set_arg("a", "2");
    payload.set_returns(["sum"]);

    let outcome = manager.submit(&payload).unwrap();
    assert_eq!(
        outcome,
        SubmissionOutcome::Rejected(ValidationIssue::MissingRequiredArgument)
    );
    assert_eq!(manager.namespace(), &before);
    assert_eq!(manager.host().cleared, 0);
    assert_eq!(
        manager.host().messages,
        vec!["Please provide all required arguments.".to_string()]
    );
}

#[test]
fn empty_return_name_rejects_without_invoking() {
    let (_root, mut manager) = session();
    let mut payload = manager.payload_for("Add").unwrap();
    payload.set_arg("a", "2");
    payload.set_arg("b", "3");

    let outcome = manager.submit(&payload).unwrap();
    assert_eq!(
        outcome,
        SubmissionOutcome::Rejected(ValidationIssue::MissingReturnName)
    );
    assert!(manager.namespace().is_empty());
    assert_eq!(
        manager.host().messages,
        vec!["Please provide all return names.".to_string()]
    );
}

#[test]
fn multiple_returns_bind_positionally() {
    let (_root, mut manager) = session();
    let mut payload = manager.payload_for("Divmod").unwrap();
    payload.set_arg("a", "17");
    payload.set_returns(["q", "r"]);

    let SubmissionOutcome::Completed(report) = manager.submit(&payload).unwrap() else {
        panic!("submission should complete");
    };
    assert_eq!(report.bound, vec!["q".to_string(), "r".to_string()]);
    assert_eq!(manager.namespace().get("q"), Some(&Value::Int(8)));
    assert_eq!(manager.namespace().get("r"), Some(&Value::Int(1)));
}

#[test]
fn several_return_names_need_a_list_result() {
    let (_root, mut manager) = session();
    let mut payload = manager.payload_for("Add").unwrap();
    payload.set_arg("a", "1");
    payload.set_arg("b", "1");
    payload.set_returns(["left", "right"]);

    let err = manager.submit(&payload).unwrap_err();
    assert!(matches!(
        err,
        SubmissionError::ResultNotSequence { ref returns, result_kind: "int" } if returns.len() == 2
    ));
    assert!(manager.namespace().is_empty());
}

#[test]
fn unknown_function_and_failing_task_bind_nothing() {
    let (_root, mut manager) = session();

    let missing = manager.payload_for("Missing").unwrap();
    let err = manager.submit(&missing).unwrap_err();
    assert!(matches!(
        err,
        SubmissionError::Execution(ExecutionError::Load(LoaderError::FunctionNotFound { .. }))
    ));

    let mut divide = manager.payload_for("Divmod").unwrap();
    divide.set_arg("a", "1");
    divide.set_arg("b", "0");
    divide.set_returns(["q", "r"]);
    let err = manager.submit(&divide).unwrap_err();
    assert!(matches!(
        err,
        SubmissionError::Execution(ExecutionError::Task { .. })
    ));
    assert!(manager.namespace().is_empty());
}

#[test]
fn raw_json_payloads_are_accepted_and_validated() {
    let (root, mut manager) = session();
    let payload = json!({
        "library_path": root.path().join("lib").to_string_lossy(),
        "library_name": BUILTINS_LIBRARY,
        "function_name": "multiply",
        "required_args": [{"arg_name": "a", "value": "6"}, {"arg_name": "b", "value": "7"}],
        "returns": [{"value": "product"}]
    });
    manager.submit_json(&payload.to_string()).unwrap();
    assert_eq!(manager.namespace().get("product"), Some(&Value::Int(42)));

    let err = manager.submit_json("{\"library_name\": 3}").unwrap_err();
    assert!(matches!(err, SubmissionError::InvalidPayload(_)));
}

#[test]
fn task_without_return_slots_runs_and_binds_nothing() {
    let (_root, mut manager) = session();
    manager.update_namespace(Namespace::from_iter([("keep".to_string(), Value::Int(1))]));
    let before = manager.namespace().clone();

    let mut payload = manager.payload_for("Join").unwrap();
    assert!(payload.returns.is_empty());
    payload.set_arg("values", "a,b,c");

    let SubmissionOutcome::Completed(report) = manager.submit(&payload).unwrap() else {
        panic!("submission should complete");
    };
    assert!(report.bound.is_empty());
    assert_eq!(report.result, Value::from("a+b+c"));
    assert_eq!(manager.namespace(), &before);
    assert_eq!(manager.host().cleared, 1);
}

#[test]
fn recompile_replaces_registry_and_keeps_namespace() {
    let (root, options) = workspace();
    let mut manager =
        TaskManager::compile(&options, builtin_loader(), RecordingHost::default()).unwrap();
    let mut payload = manager.payload_for("Add").unwrap();
    payload.set_arg("a", "1");
    payload.set_arg("b", "2");
    payload.set_returns(["sum"]);
    manager.submit(&payload).unwrap();

    let extra = json!({
        "library_path": root.path().join("lib").to_string_lossy(),
        "tasks": [{"function_path": format!("{BUILTINS_LIBRARY}.multiply"), "label": "Times"}]
    });
    std::fs::write(options.json_dir.join("extra.json"), extra.to_string()).unwrap();
    std::fs::remove_file(options.json_dir.join("builtins.json")).unwrap();

    manager.recompile(&options).unwrap();
    assert!(manager.task("Times").is_some());
    assert!(manager.task("Add").is_none());
    assert_eq!(manager.namespace().get("sum"), Some(&Value::Int(3)));
}
