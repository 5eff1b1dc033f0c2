//! Use-case services.
//!
//! # Responsibility
//! - Provide stable entry points for hosts (task forms, CLI).
//! - Keep the namespace-write contract in one place.

pub mod submission_service;
pub mod task_manager;
