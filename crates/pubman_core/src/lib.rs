//! Core domain logic for pubman.
//! Publish and client-delivery tracking for production folder trees.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod scaffold;
pub mod service;
pub mod sidecar;

pub use config::{AppConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::attribute::{AttributeHistory, AttributeKind, CurrentStatus, HistoryEntry};
pub use repo::{RepoError, RepoResult};
pub use service::attribute_service::{
    attribute_service_for, relative_to_master, AttributeError, AttributeService, FileDetails,
};
pub use service::conflict_service::{
    AlwaysClear, Conflict, ConflictChecker, ConflictResolver, NeverClear, SetOutcome,
};
pub use service::delivery_service::{DeliveryError, DeliveryReport, DeliveryService};
pub use service::manifest_service::{ManifestError, ManifestExporter, ManifestReport};
pub use service::project_service::{
    CreateProjectRequest, HierarchySource, ProjectService, ProjectServiceError,
};
pub use service::user_service::{UserService, UserServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
