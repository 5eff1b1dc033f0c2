//! Single manifest loading and normalization.
//!
//! # Responsibility
//! - Parse one library manifest into canonical task descriptors.
//! - Apply manifest defaults (labels, descriptions, values).
//!
//! # Invariants
//! - `library_path` is mandatory and always ends with `/` after loading.
//! - Labels are unique within one load; collisions get ` (vN)` suffixes with
//!   the smallest free `N >= 2`.
//! - Loading reads the file and logs; it has no other side effects.

use crate::model::task::{ArgSpec, ReturnSpec, TaskDescriptor, TaskRegistry, DEFAULT_DESCRIPTION};
use log::{info, warn};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Instant;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const NO_LABEL_SUFFIX: &str = " (no label)";

pub type ManifestResult<T> = Result<T, ManifestError>;

/// Errors raised while loading one manifest.
#[derive(Debug)]
pub enum ManifestError {
    /// Path does not reference an existing file.
    NotFound(PathBuf),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Content is not valid manifest JSON.
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    MissingLibraryPath(PathBuf),
    MissingTasks(PathBuf),
    /// `function_path` has no `.` separating module and function.
    InvalidFunctionPath(String),
}

impl Display for ManifestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(
                f,
                "manifest `{}` is not found or is not a file",
                path.display()
            ),
            Self::Io { path, source } => {
                write!(f, "failed to read manifest `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid manifest JSON in `{}`: {source}", path.display())
            }
            Self::MissingLibraryPath(path) => {
                write!(f, "`library_path` is not specified in `{}`", path.display())
            }
            Self::MissingTasks(path) => {
                write!(f, "`tasks` is not specified in `{}`", path.display())
            }
            Self::InvalidFunctionPath(value) => write!(
                f,
                "function path `{value}` must look like `path.to.module.function_name`"
            ),
        }
    }
}

impl Error for ManifestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ManifestDocument {
    library_path: Option<String>,
    tasks: Option<Vec<ManifestTask>>,
}

#[derive(Debug, Deserialize)]
struct ManifestTask {
    function_path: String,
    label: Option<String>,
    description: Option<String>,
    #[serde(default)]
    required_args: Vec<ManifestArg>,
    #[serde(default)]
    optional_args: Vec<ManifestArg>,
    #[serde(default)]
    default_args: Vec<ManifestArg>,
    #[serde(default)]
    returns: Vec<ManifestReturn>,
}

#[derive(Debug, Deserialize)]
struct ManifestArg {
    arg_name: String,
    #[serde(default, deserialize_with = "deserialize_literal")]
    value: Option<String>,
    label: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ManifestReturn {
    label: String,
    description: Option<String>,
}

/// Loads one manifest file into a label-keyed registry.
///
/// # Errors
/// - `NotFound` when `path` is not an existing file.
/// - `Parse` when the content is not manifest-shaped JSON.
/// - `MissingLibraryPath` / `MissingTasks` for absent mandatory fields.
/// - `InvalidFunctionPath` when a `function_path` has no `.`.
pub fn load_task(path: impl AsRef<Path>) -> ManifestResult<TaskRegistry> {
    let path = path.as_ref();
    let started_at = Instant::now();

    if !path.is_file() {
        return Err(ManifestError::NotFound(path.to_path_buf()));
    }

    let bytes = std::fs::read(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = normalize_encoding(&bytes);
    let document: ManifestDocument =
        serde_json::from_str(&text).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let raw_library_path = document
        .library_path
        .ok_or_else(|| ManifestError::MissingLibraryPath(path.to_path_buf()))?;
    let library_path = normalize_library_path(&raw_library_path);
    let entries = document
        .tasks
        .ok_or_else(|| ManifestError::MissingTasks(path.to_path_buf()))?;

    let mut registry = TaskRegistry::new();
    for entry in entries {
        let (library_name, function_name) = split_function_path(&entry.function_path)?;
        let base_label = entry
            .label
            .unwrap_or_else(|| format!("{function_name}{NO_LABEL_SUFFIX}"));
        let label = unique_label(&registry, base_label);

        let descriptor = TaskDescriptor {
            library_path: library_path.clone(),
            library_name,
            function_name,
            description: entry
                .description
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            required_args: entry.required_args.into_iter().map(to_arg_spec).collect(),
            optional_args: entry.optional_args.into_iter().map(to_arg_spec).collect(),
            default_args: entry.default_args.into_iter().map(to_arg_spec).collect(),
            returns: entry.returns.into_iter().map(to_return_spec).collect(),
        };
        registry.insert(label, descriptor);
    }

    info!(
        "event=manifest_load module=manifest status=ok path={} tasks={} duration_ms={}",
        path.display(),
        registry.len(),
        started_at.elapsed().as_millis()
    );
    Ok(registry)
}

/// Turns `snake_case` names into display titles, e.g. `n_clusters` -> `N Clusters`.
///
/// A letter is upper-cased when it does not follow another letter and
/// lower-cased otherwise.
pub fn title_case(value: &str) -> String {
    let mut titled = String::with_capacity(value.len());
    let mut previous_is_letter = false;
    for c in value.chars() {
        let c = if c == '_' { ' ' } else { c };
        if c.is_alphabetic() {
            if previous_is_letter {
                titled.extend(c.to_lowercase());
            } else {
                titled.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            titled.push(c);
            previous_is_letter = false;
        }
    }
    titled
}

/// Splits `a.b.func` into (`a.b`, `func`) on the last `.`.
fn split_function_path(function_path: &str) -> ManifestResult<(String, String)> {
    match function_path.rsplit_once('.') {
        Some((library_name, function_name)) => {
            Ok((library_name.to_string(), function_name.to_string()))
        }
        None => Err(ManifestError::InvalidFunctionPath(
            function_path.to_string(),
        )),
    }
}

fn unique_label(registry: &TaskRegistry, label: String) -> String {
    if !registry.contains(&label) {
        return label;
    }

    let mut version = 2;
    let mut candidate = format!("{label} (v{version})");
    while registry.contains(&candidate) {
        version += 1;
        candidate = format!("{label} (v{version})");
    }
    warn!(
        "event=manifest_load module=manifest status=relabel label={label:?} new_label={candidate:?}"
    );
    candidate
}

/// Ensures a trailing `/`; falls back to `$HOME/<path>` when it is not a directory.
fn normalize_library_path(raw: &str) -> String {
    let mut library_path = raw.to_string();
    if !library_path.ends_with('/') {
        library_path.push('/');
    }
    if Path::new(&library_path).is_dir() {
        return library_path;
    }

    let Some(home) = dirs::home_dir() else {
        return library_path;
    };
    let mut resolved = home.join(&library_path).to_string_lossy().into_owned();
    if !resolved.ends_with('/') {
        resolved.push('/');
    }
    resolved
}

fn normalize_encoding(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

fn to_arg_spec(arg: ManifestArg) -> ArgSpec {
    let label = arg.label.unwrap_or_else(|| title_case(&arg.arg_name));
    ArgSpec {
        arg_name: arg.arg_name,
        value: arg.value.unwrap_or_default(),
        label,
        description: arg
            .description
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
    }
}

fn to_return_spec(ret: ManifestReturn) -> ReturnSpec {
    ReturnSpec {
        label: ret.label,
        description: ret
            .description
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
    }
}

/// Accepts string defaults plus scalar JSON literals in their text form.
fn deserialize_literal<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(text) => Ok(Some(text)),
        serde_json::Value::Number(number) => Ok(Some(number.to_string())),
        serde_json::Value::Bool(flag) => Ok(Some(flag.to_string())),
        other => Err(de::Error::custom(format!(
            "argument value must be a string or scalar literal, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_encoding, split_function_path, title_case, ManifestError};

    #[test]
    fn title_case_matches_display_convention() {
        assert_eq!(title_case("n_clusters"), "N Clusters");
        assert_eq!(title_case("maxIter"), "Maxiter");
        assert_eq!(title_case("x2y"), "X2Y");
        assert_eq!(title_case("a"), "A");
    }

    #[test]
    fn split_function_path_uses_last_separator() {
        let (library, function) =
            split_function_path("ccal.clustering.hierarchical.cluster").expect("valid path");
        assert_eq!(library, "ccal.clustering.hierarchical");
        assert_eq!(function, "cluster");
    }

    #[test]
    fn split_function_path_rejects_missing_separator() {
        let err = split_function_path("cluster").expect_err("no separator must fail");
        assert!(matches!(err, ManifestError::InvalidFunctionPath(value) if value == "cluster"));
    }

    #[test]
    fn normalize_encoding_strips_bom() {
        assert_eq!(normalize_encoding(b"\xEF\xBB\xBF{}"), "{}");
        assert_eq!(normalize_encoding(b"{}"), "{}");
    }
}
