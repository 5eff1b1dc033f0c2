//! Invocation-time runtime.
//!
//! # Responsibility
//! - Resolve raw user arguments into typed values.
//! - Locate task functions through the loader seam and call them.
//!
//! # Invariants
//! - Runtime code reads the namespace but never writes it; binding results is
//!   the submission service's job.

pub mod args;
pub mod builtins;
pub mod engine;
pub mod loader;
