//! Domain model for attribute tracking.
//!
//! # Responsibility
//! - Define the attribute kinds and the history entries persisted in sidecars.
//! - Provide the read projections derived from a history.
//!
//! # Invariants
//! - History is append-only; the last entry is the current status.

pub mod attribute;
