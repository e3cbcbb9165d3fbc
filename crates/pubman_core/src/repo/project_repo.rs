//! Project repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Paths are stored verbatim; `ProjectService` canonicalizes master paths
//!   before insert and lookups compare the stored text exactly.
//! - Listing is deterministic: `id ASC`.

use super::user_repo::UserId;
use super::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

pub type ProjectId = i64;

/// User id of the bootstrap admin; its projects are visible to everyone.
pub const SHARED_PROJECT_OWNER: UserId = 1;

/// One production registered in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub master_path: PathBuf,
    pub client_name: String,
    pub delivery_path: PathBuf,
    pub comment: String,
    /// Empty or `YYYY-MM-DD`.
    pub delivery_date: String,
    pub created_by: UserId,
    pub created_at: String,
}

/// Insert payload for a new project row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub master_path: PathBuf,
    pub client_name: String,
    pub delivery_path: PathBuf,
    pub comment: String,
    pub delivery_date: String,
    pub created_by: UserId,
}

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    name,
    master_path,
    client_name,
    delivery_path,
    project_comment,
    delivery_date,
    created_by,
    created_at
FROM projects";

/// Repository interface for project rows.
pub trait ProjectRepository {
    fn create_project(&self, project: &NewProject) -> RepoResult<Project>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    /// Projects created by `user_id` or by the shared owner.
    fn list_visible_projects(&self, user_id: UserId) -> RepoResult<Vec<Project>>;
    fn find_by_master_path(&self, master_path: &Path) -> RepoResult<Option<Project>>;
    fn update_name(&self, id: ProjectId, name: &str) -> RepoResult<()>;
    fn update_comment(&self, id: ProjectId, comment: &str) -> RepoResult<()>;
    fn update_delivery_date(&self, id: ProjectId, delivery_date: &str) -> RepoResult<()>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn update_column(&self, id: ProjectId, column: &str, value: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("UPDATE projects SET {column} = ?1 WHERE id = ?2;"),
            params![value, id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("project", id));
        }
        Ok(())
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &NewProject) -> RepoResult<Project> {
        self.conn.execute(
            "INSERT INTO projects (
                name,
                master_path,
                client_name,
                delivery_path,
                project_comment,
                delivery_date,
                created_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                project.name.as_str(),
                path_to_db(&project.master_path),
                project.client_name.as_str(),
                path_to_db(&project.delivery_path),
                project.comment.as_str(),
                project.delivery_date.as_str(),
                project.created_by,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_project(id)?
            .ok_or_else(|| RepoError::not_found("project", id))
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let project = self
            .conn
            .query_row(
                &format!("{PROJECT_SELECT_SQL} WHERE id = ?1;"),
                params![id],
                parse_project_row,
            )
            .optional()?;
        Ok(project)
    }

    fn list_visible_projects(&self, user_id: UserId) -> RepoResult<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE created_by = ?1 OR created_by = ?2
             ORDER BY id ASC;"
        ))?;
        let rows = stmt.query_map(params![user_id, SHARED_PROJECT_OWNER], parse_project_row)?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(row?);
        }
        Ok(projects)
    }

    fn find_by_master_path(&self, master_path: &Path) -> RepoResult<Option<Project>> {
        let project = self
            .conn
            .query_row(
                &format!("{PROJECT_SELECT_SQL} WHERE master_path = ?1 ORDER BY id ASC LIMIT 1;"),
                params![path_to_db(master_path)],
                parse_project_row,
            )
            .optional()?;
        Ok(project)
    }

    fn update_name(&self, id: ProjectId, name: &str) -> RepoResult<()> {
        self.update_column(id, "name", name)
    }

    fn update_comment(&self, id: ProjectId, comment: &str) -> RepoResult<()> {
        self.update_column(id, "project_comment", comment)
    }

    fn update_delivery_date(&self, id: ProjectId, delivery_date: &str) -> RepoResult<()> {
        self.update_column(id, "delivery_date", delivery_date)
    }
}

fn path_to_db(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn parse_project_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        master_path: PathBuf::from(row.get::<_, String>(2)?),
        client_name: row.get(3)?,
        delivery_path: PathBuf::from(row.get::<_, String>(4)?),
        comment: row.get(5)?,
        delivery_date: row.get(6)?,
        created_by: row.get(7)?,
        created_at: row.get(8)?,
    })
}
