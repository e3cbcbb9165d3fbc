//! Project use-case service.
//!
//! # Responsibility
//! - Register productions with their master and delivery directories.
//! - Optionally lay out a folder hierarchy for new productions.
//! - Edit project name, comment and delivery date.
//!
//! # Invariants
//! - Master paths are stored absolute and canonical.
//! - The delivery path is always `<master>/Deliveries`.
//! - Delivery dates are empty or `YYYY-MM-DD`.

use crate::repo::project_repo::{NewProject, Project, ProjectId, ProjectRepository};
use crate::repo::user_repo::UserId;
use crate::repo::RepoError;
use crate::scaffold::{self, ScaffoldError};
use chrono::NaiveDate;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the delivery directory created inside every master path.
pub const DELIVERIES_DIR: &str = "Deliveries";

const DELIVERY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Service error for project use-cases.
#[derive(Debug)]
pub enum ProjectServiceError {
    /// A required field is blank.
    MissingField(&'static str),
    /// Delivery date is not `YYYY-MM-DD`.
    InvalidDeliveryDate(String),
    ProjectNotFound(ProjectId),
    Scaffold(ScaffoldError),
    Io { path: PathBuf, source: io::Error },
    Repo(RepoError),
}

impl Display for ProjectServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "`{field}` is required"),
            Self::InvalidDeliveryDate(value) => {
                write!(f, "invalid delivery date `{value}`, expected YYYY-MM-DD")
            }
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::Scaffold(err) => write!(f, "{err}"),
            Self::Io { path, source } => {
                write!(f, "cannot prepare `{}`: {source}", path.display())
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProjectServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Scaffold(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ProjectServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ScaffoldError> for ProjectServiceError {
    fn from(value: ScaffoldError) -> Self {
        Self::Scaffold(value)
    }
}

/// Folder hierarchy laid out under `master/name` at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchySource {
    /// The built-in production hierarchy.
    Builtin,
    /// Contents of a template directory.
    Template(PathBuf),
}

/// Input of `create_project`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateProjectRequest {
    pub name: String,
    pub master_path: PathBuf,
    pub client_name: String,
    pub comment: String,
    pub delivery_date: String,
    pub hierarchy: Option<HierarchySource>,
}

/// Project service facade over repository implementations.
pub struct ProjectService<R: ProjectRepository> {
    repo: R,
}

impl<R: ProjectRepository> ProjectService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a production and creates its directories.
    pub fn create_project(
        &self,
        request: CreateProjectRequest,
        created_by: UserId,
    ) -> Result<Project, ProjectServiceError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(ProjectServiceError::MissingField("name"));
        }
        if request.master_path.as_os_str().is_empty() {
            return Err(ProjectServiceError::MissingField("master_path"));
        }
        let delivery_date = normalize_delivery_date(&request.delivery_date)?;

        let master_path = match &request.hierarchy {
            None => request.master_path.clone(),
            Some(HierarchySource::Builtin) => {
                scaffold::create_production_structure(&request.master_path, &name)?;
                request.master_path.join(&name)
            }
            Some(HierarchySource::Template(template)) => {
                let target = request.master_path.join(&name);
                scaffold::copy_template(template, &target)?;
                target
            }
        };
        ensure_dir(&master_path)?;
        let master_path =
            fs::canonicalize(&master_path).map_err(|source| ProjectServiceError::Io {
                path: master_path.clone(),
                source,
            })?;
        let delivery_path = master_path.join(DELIVERIES_DIR);
        ensure_dir(&delivery_path)?;

        let project = self.repo.create_project(&NewProject {
            name,
            master_path,
            client_name: request.client_name.trim().to_string(),
            delivery_path,
            comment: request.comment,
            delivery_date,
            created_by,
        })?;
        info!(
            "event=project_create module=project status=ok project_id={} master={}",
            project.id,
            project.master_path.display()
        );
        Ok(project)
    }

    /// Projects visible to `user_id`; recreates missing directories.
    pub fn list_projects(&self, user_id: UserId) -> Result<Vec<Project>, ProjectServiceError> {
        let projects = self.repo.list_visible_projects(user_id)?;
        for project in &projects {
            ensure_dir(&project.master_path)?;
            ensure_dir(&project.delivery_path)?;
        }
        Ok(projects)
    }

    pub fn get_project(&self, id: ProjectId) -> Result<Project, ProjectServiceError> {
        self.repo
            .get_project(id)?
            .ok_or(ProjectServiceError::ProjectNotFound(id))
    }

    /// Looks a project up by id or by exact name among visible projects.
    pub fn resolve_project(
        &self,
        user_id: UserId,
        key: &str,
    ) -> Result<Option<Project>, ProjectServiceError> {
        let projects = self.repo.list_visible_projects(user_id)?;
        let by_id = key.parse::<ProjectId>().ok();
        Ok(projects
            .into_iter()
            .find(|project| Some(project.id) == by_id || project.name == key))
    }

    pub fn rename_project(
        &self,
        id: ProjectId,
        name: &str,
    ) -> Result<Project, ProjectServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProjectServiceError::MissingField("name"));
        }
        self.repo.update_name(id, name).map_err(map_not_found(id))?;
        self.get_project(id)
    }

    pub fn update_comment(
        &self,
        id: ProjectId,
        comment: &str,
    ) -> Result<Project, ProjectServiceError> {
        self.repo
            .update_comment(id, comment)
            .map_err(map_not_found(id))?;
        self.get_project(id)
    }

    pub fn update_delivery_date(
        &self,
        id: ProjectId,
        delivery_date: &str,
    ) -> Result<Project, ProjectServiceError> {
        let delivery_date = normalize_delivery_date(delivery_date)?;
        self.repo
            .update_delivery_date(id, &delivery_date)
            .map_err(map_not_found(id))?;
        self.get_project(id)
    }
}

/// Trims `value`; empty stays empty, anything else must parse as a date.
pub fn normalize_delivery_date(value: &str) -> Result<String, ProjectServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(String::new());
    }
    NaiveDate::parse_from_str(value, DELIVERY_DATE_FORMAT)
        .map(|date| date.format(DELIVERY_DATE_FORMAT).to_string())
        .map_err(|_| ProjectServiceError::InvalidDeliveryDate(value.to_string()))
}

fn map_not_found(id: ProjectId) -> impl Fn(RepoError) -> ProjectServiceError {
    move |err| match err {
        RepoError::NotFound { .. } => ProjectServiceError::ProjectNotFound(id),
        other => ProjectServiceError::Repo(other),
    }
}

fn ensure_dir(path: &Path) -> Result<(), ProjectServiceError> {
    fs::create_dir_all(path).map_err(|source| {
        warn!(
            "event=project_dirs module=project status=error path={} error={source}",
            path.display()
        );
        ProjectServiceError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{normalize_delivery_date, ProjectServiceError};

    #[test]
    fn delivery_date_accepts_empty_and_iso_dates() {
        assert_eq!(normalize_delivery_date("").unwrap(), "");
        assert_eq!(normalize_delivery_date(" 2025-03-09 ").unwrap(), "2025-03-09");
    }

    #[test]
    fn delivery_date_rejects_other_formats() {
        for value in ["09/03/2025", "2025-13-01", "tomorrow"] {
            assert!(matches!(
                normalize_delivery_date(value),
                Err(ProjectServiceError::InvalidDeliveryDate(_))
            ));
        }
    }
}
