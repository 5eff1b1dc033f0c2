//! Task manifest loading and compilation.
//!
//! This module turns per-library JSON manifests into the canonical task
//! registry consumed by task forms and the submission service.

pub mod compiler;
pub mod loader;
