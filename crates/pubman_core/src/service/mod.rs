//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate sidecar, filesystem and repository calls into use-case
//!   level APIs.
//! - Keep the CLI decoupled from storage details.

pub mod attribute_service;
pub mod conflict_service;
pub mod delivery_service;
pub mod manifest_service;
pub mod project_service;
pub mod user_service;
