//! Directory-wide manifest compilation.
//!
//! # Responsibility
//! - Aggregate every manifest in one directory into a single registry.
//! - Optionally persist the aggregate record.
//!
//! # Invariants
//! - One bad manifest never fails the whole compilation; it is logged and
//!   dropped.
//! - Entries are visited in file-name order; on cross-manifest label
//!   collisions the later manifest wins.
//! - Files whose name starts with `COMPILED` are previous aggregate output and
//!   are never loaded.

use crate::manifest::loader::load_task;
use crate::model::task::TaskRegistry;
use log::{debug, info, warn};
use std::error::Error;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// File-name prefix marking compiled aggregate records.
pub const COMPILED_PREFIX: &str = "COMPILED";

const RECORD_EXTENSION: &str = ".json";

pub type CompileResult<T> = Result<T, CompileError>;

/// Errors that abort a compilation as a whole.
#[derive(Debug)]
pub enum CompileError {
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    Serialize(serde_json::Error),
    WriteRecord {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for CompileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadDir { path, source } => write!(
                f,
                "failed to list manifest directory `{}`: {source}",
                path.display()
            ),
            Self::Serialize(err) => write!(f, "failed to serialize task registry: {err}"),
            Self::WriteRecord { path, source } => write!(
                f,
                "failed to write task record `{}`: {source}",
                path.display()
            ),
        }
    }
}

impl Error for CompileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ReadDir { source, .. } => Some(source),
            Self::Serialize(err) => Some(err),
            Self::WriteRecord { source, .. } => Some(source),
        }
    }
}

impl From<serde_json::Error> for CompileError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Inputs for one compilation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Directory holding one manifest per library.
    pub json_dir: PathBuf,
    /// Where to persist the aggregate; `.json` is appended when missing.
    pub record_path: Option<PathBuf>,
}

impl CompileOptions {
    pub fn new(json_dir: impl Into<PathBuf>) -> Self {
        Self {
            json_dir: json_dir.into(),
            record_path: None,
        }
    }

    pub fn with_record(mut self, record_path: impl Into<PathBuf>) -> Self {
        self.record_path = Some(record_path.into());
        self
    }
}

/// Shape the caller wants the compiled registry in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryFormat {
    /// Compact JSON text.
    Text,
    Structured,
}

/// Compiled registry in the requested shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledRegistry {
    Text(String),
    Structured(TaskRegistry),
}

/// Compiles every manifest under `options.json_dir` into one registry.
///
/// # Errors
/// - `ReadDir` when the directory cannot be listed.
/// - `Serialize` / `WriteRecord` when persisting the record fails.
pub fn compile_tasks(options: &CompileOptions) -> CompileResult<TaskRegistry> {
    let started_at = Instant::now();
    info!(
        "event=manifest_compile module=manifest status=start dir={}",
        options.json_dir.display()
    );

    let mut manifests = list_manifest_paths(&options.json_dir)?;
    manifests.sort();

    let mut registry = TaskRegistry::new();
    let mut loaded = 0usize;
    let mut dropped = 0usize;
    for path in manifests {
        match load_task(&path) {
            Ok(tasks) => {
                loaded += 1;
                for (label, descriptor) in tasks {
                    let library_name = descriptor.library_name.clone();
                    if let Some(shadowed) = registry.insert(label.clone(), descriptor) {
                        warn!(
                            "event=manifest_compile module=manifest status=shadow label={label:?} shadowed={} by={} path={}",
                            shadowed.function_path(),
                            library_name,
                            path.display()
                        );
                    }
                }
            }
            Err(err) => {
                dropped += 1;
                warn!(
                    "event=manifest_compile module=manifest status=skip path={} error={err}",
                    path.display()
                );
            }
        }
    }

    if let Some(record_path) = &options.record_path {
        write_record(&registry, record_path)?;
    }

    info!(
        "event=manifest_compile module=manifest status=ok manifests={loaded} dropped={dropped} tasks={} duration_ms={}",
        registry.len(),
        started_at.elapsed().as_millis()
    );
    Ok(registry)
}

/// Compiles and returns the registry in the requested shape.
pub fn compile_tasks_as(
    options: &CompileOptions,
    format: RegistryFormat,
) -> CompileResult<CompiledRegistry> {
    let registry = compile_tasks(options)?;
    match format {
        RegistryFormat::Text => Ok(CompiledRegistry::Text(registry.to_json()?)),
        RegistryFormat::Structured => Ok(CompiledRegistry::Structured(registry)),
    }
}

/// Writes `registry` as the persisted record, returning the final path.
pub fn write_record(registry: &TaskRegistry, record_path: &Path) -> CompileResult<PathBuf> {
    let path = with_record_extension(record_path);
    let text = registry.to_json_pretty()?;
    std::fs::write(&path, text).map_err(|source| CompileError::WriteRecord {
        path: path.clone(),
        source,
    })?;
    info!(
        "event=registry_write module=manifest status=ok path={} tasks={}",
        path.display(),
        registry.len()
    );
    Ok(path)
}

fn list_manifest_paths(json_dir: &Path) -> CompileResult<Vec<PathBuf>> {
    let read_dir_error = |source| CompileError::ReadDir {
        path: json_dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(json_dir).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        let file_name = entry.file_name();
        if file_name.to_string_lossy().starts_with(COMPILED_PREFIX) {
            debug!(
                "event=manifest_compile module=manifest status=skip reason=compiled_record path={}",
                entry.path().display()
            );
            continue;
        }
        paths.push(entry.path());
    }
    Ok(paths)
}

fn with_record_extension(path: &Path) -> PathBuf {
    if path.to_string_lossy().ends_with(RECORD_EXTENSION) {
        return path.to_path_buf();
    }
    let mut raw = OsString::from(path.as_os_str());
    raw.push(RECORD_EXTENSION);
    PathBuf::from(raw)
}
