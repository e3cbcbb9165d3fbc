//! Attribute store use-case service.
//!
//! # Responsibility
//! - Read current status and history of `publish` / `to_client` per path.
//! - Append status changes to the sidecar, then refresh the relational cache.
//! - Derive badge labels and detail projections.
//!
//! # Invariants
//! - Each `update_attribute` appends exactly one history entry.
//! - The cache row for a path always mirrors its last appended entry.
//! - A corrupt sidecar is never overwritten.

use crate::model::attribute::{
    AttributeHistory, AttributeKind, CurrentStatus, HistoryEntry, DETAILS_HISTORY_LIMIT,
};
use crate::repo::attribute_repo::{
    AttributeCacheRepository, FileAttributeRow, SqliteAttributeCacheRepository,
};
use crate::repo::project_repo::{Project, ProjectId, ProjectRepository, SqliteProjectRepository};
use crate::repo::RepoError;
use crate::sidecar::{self, SidecarError};
use log::{debug, error, info};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

pub type AttributeResult<T> = Result<T, AttributeError>;

/// Errors from attribute store operations.
#[derive(Debug)]
pub enum AttributeError {
    Sidecar(SidecarError),
    Repo(RepoError),
    Io { path: PathBuf, source: io::Error },
}

impl Display for AttributeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sidecar(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "cannot read `{}`: {source}", path.display()),
        }
    }
}

impl Error for AttributeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sidecar(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<SidecarError> for AttributeError {
    fn from(value: SidecarError) -> Self {
        Self::Sidecar(value)
    }
}

impl From<RepoError> for AttributeError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Detail projection for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDetails {
    pub path: PathBuf,
    pub publish: CurrentStatus,
    pub to_client: CurrentStatus,
    /// Last entries of the publish history, oldest first.
    pub publish_history: Vec<HistoryEntry>,
    /// Last entries of the to_client history, oldest first.
    pub to_client_history: Vec<HistoryEntry>,
}

impl FileDetails {
    pub fn status(&self, kind: AttributeKind) -> &CurrentStatus {
        match kind {
            AttributeKind::Publish => &self.publish,
            AttributeKind::ToClient => &self.to_client,
        }
    }

    pub fn recent_history(&self, kind: AttributeKind) -> &[HistoryEntry] {
        match kind {
            AttributeKind::Publish => &self.publish_history,
            AttributeKind::ToClient => &self.to_client_history,
        }
    }
}

/// Attribute store bound to one project master path.
pub struct AttributeService<R: AttributeCacheRepository> {
    cache: R,
    master_path: PathBuf,
    project_id: Option<ProjectId>,
}

impl<R: AttributeCacheRepository> AttributeService<R> {
    /// Creates a store; without `project_id` only sidecars are written.
    pub fn new(cache: R, master_path: impl Into<PathBuf>, project_id: Option<ProjectId>) -> Self {
        Self {
            cache,
            master_path: master_path.into(),
            project_id,
        }
    }

    /// Creates a store for a registered project.
    pub fn for_project(cache: R, project: &Project) -> Self {
        Self::new(cache, project.master_path.clone(), Some(project.id))
    }

    pub fn master_path(&self) -> &Path {
        &self.master_path
    }

    pub fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    /// Path relative to the master path, `/`-separated; `.` for the master
    /// itself and `None` outside of it or when it climbs out through `..`.
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        relative_key(&self.master_path, path)
    }

    /// Full sidecar history for `path`, unreadable sidecars read as empty.
    pub fn load_history(&self, path: &Path) -> AttributeHistory {
        sidecar::load_history_lenient(path)
    }

    pub fn current_status(&self, path: &Path, kind: AttributeKind) -> CurrentStatus {
        self.load_history(path).current(kind)
    }

    pub fn is_marked(&self, path: &Path, kind: AttributeKind) -> bool {
        self.current_status(path, kind).status
    }

    pub fn history(&self, path: &Path, kind: AttributeKind) -> Vec<HistoryEntry> {
        self.load_history(path).entries(kind).to_vec()
    }

    /// Appends one status entry and refreshes the cache row.
    ///
    /// Returns the timestamp of the appended entry.
    ///
    /// # Errors
    /// - `Sidecar` when the existing sidecar cannot be read or written.
    /// - `Repo` when the cache upsert fails; the sidecar entry is kept.
    pub fn update_attribute(
        &self,
        path: &Path,
        kind: AttributeKind,
        value: bool,
        user: &str,
    ) -> AttributeResult<String> {
        let mut history = sidecar::read_history(path)?;
        let entry = HistoryEntry::now(value, user);
        let timestamp = entry.timestamp.clone();
        history.append(kind, entry);
        sidecar::write_history(path, &history)?;

        match (self.project_id, self.relative_path(path)) {
            (Some(project_id), Some(rel_path)) => {
                if let Err(err) =
                    self.cache
                        .upsert_status(project_id, &rel_path, kind, value, &timestamp)
                {
                    error!(
                        "event=attribute_update module=attribute status=error stage=cache project_id={project_id} kind={kind} error={err}"
                    );
                    return Err(err.into());
                }
            }
            (project_id, rel_path) => {
                debug!(
                    "event=attribute_update module=attribute status=skip stage=cache project_id={project_id:?} in_master={}",
                    rel_path.is_some()
                );
            }
        }

        info!(
            "event=attribute_update module=attribute status=ok kind={kind} value={value} user={user} path={}",
            path.display()
        );
        Ok(timestamp)
    }

    /// Badge text for tree listings.
    pub fn status_label(&self, path: &Path) -> String {
        let history = self.load_history(path);
        status_label_for(&history)
    }

    pub fn details(&self, path: &Path) -> FileDetails {
        let history = self.load_history(path);
        FileDetails {
            path: path.to_path_buf(),
            publish: history.current(AttributeKind::Publish),
            to_client: history.current(AttributeKind::ToClient),
            publish_history: history
                .tail(AttributeKind::Publish, DETAILS_HISTORY_LIMIT)
                .to_vec(),
            to_client_history: history
                .tail(AttributeKind::ToClient, DETAILS_HISTORY_LIMIT)
                .to_vec(),
        }
    }

    /// Cached row for `path`, if the store is bound to a project.
    pub fn cached_row(&self, path: &Path) -> AttributeResult<Option<FileAttributeRow>> {
        match (self.project_id, self.relative_path(path)) {
            (Some(project_id), Some(rel_path)) => Ok(self.cache.get_row(project_id, &rel_path)?),
            _ => Ok(None),
        }
    }

    /// Relative paths currently carrying `kind`, according to the cache.
    pub fn cached_marked(&self, kind: AttributeKind) -> AttributeResult<Vec<String>> {
        let Some(project_id) = self.project_id else {
            return Ok(Vec::new());
        };
        Ok(self
            .cache
            .list_marked(project_id, kind)?
            .into_iter()
            .map(|row| row.file_path)
            .collect())
    }
}

/// Builds a store for `master_path`, binding it to the project registered
/// with that master path when one exists.
///
/// A path spelled differently from the stored one (relative, `./x`, trailing
/// slash) is matched through its canonical form, which then becomes the
/// store's master path.
pub fn attribute_service_for<'conn>(
    conn: &'conn Connection,
    master_path: &Path,
) -> AttributeResult<AttributeService<SqliteAttributeCacheRepository<'conn>>> {
    let projects = SqliteProjectRepository::new(conn);
    let mut bound_master = master_path.to_path_buf();
    let mut project = projects.find_by_master_path(master_path)?;
    if project.is_none() {
        if let Ok(canonical) = fs::canonicalize(master_path) {
            project = projects.find_by_master_path(&canonical)?;
            if project.is_some() {
                bound_master = canonical;
            }
        }
    }
    Ok(AttributeService::new(
        SqliteAttributeCacheRepository::new(conn),
        bound_master,
        project.map(|project| project.id),
    ))
}

/// Badge text derived from a history: `Published | To Client`, a single
/// badge, or `No Status`.
pub fn status_label_for(history: &AttributeHistory) -> String {
    let badges = AttributeKind::ALL
        .iter()
        .filter(|kind| history.current(**kind).status)
        .map(|kind| kind.badge())
        .collect::<Vec<_>>();
    if badges.is_empty() {
        "No Status".to_string()
    } else {
        badges.join(" | ")
    }
}

/// `path` below `master`, or `None` when it is not.
///
/// Only `Normal` and `.` components may follow the master prefix, so
/// `master/../other` is rejected instead of being resolved.
pub fn relative_to_master(master: &Path, path: &Path) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in path.strip_prefix(master).ok()?.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(relative)
}

fn relative_key(master: &Path, path: &Path) -> Option<String> {
    let relative = relative_to_master(master, path)?;
    let parts = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>();
    if parts.is_empty() {
        Some(".".to_string())
    } else {
        Some(parts.join("/"))
    }
}
