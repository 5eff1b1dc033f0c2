//! Core domain models.
//!
//! # Responsibility
//! - Define canonical data structures shared by manifest, runtime and
//!   service layers.
//!
//! # Invariants
//! - Models stay free of file-system and loader concerns.

pub mod namespace;
pub mod task;
pub mod value;
