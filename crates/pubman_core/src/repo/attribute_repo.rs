//! Relational cache of the latest attribute values per project file.
//!
//! # Responsibility
//! - Mirror the last sidecar entry of each attribute for fast badge queries.
//!
//! # Invariants
//! - One row per `(project_id, file_path)`.
//! - `file_path` is relative to the project master path, `/`-separated.
//! - `last_updated` is the timestamp of the sidecar entry that wrote it.

use super::project_repo::ProjectId;
use super::{bool_to_int, int_to_bool, RepoResult};
use crate::model::attribute::AttributeKind;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Cached attribute row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttributeRow {
    pub project_id: ProjectId,
    pub file_path: String,
    pub publish_status: bool,
    pub to_client_status: bool,
    pub last_updated: String,
}

impl FileAttributeRow {
    pub fn status(&self, kind: AttributeKind) -> bool {
        match kind {
            AttributeKind::Publish => self.publish_status,
            AttributeKind::ToClient => self.to_client_status,
        }
    }
}

const ROW_SELECT_SQL: &str = "SELECT
    project_id,
    file_path,
    publish_status,
    to_client_status,
    last_updated
FROM file_attributes";

/// Repository interface for the attribute cache.
pub trait AttributeCacheRepository {
    /// Writes one attribute value, creating the row when missing.
    fn upsert_status(
        &self,
        project_id: ProjectId,
        file_path: &str,
        kind: AttributeKind,
        value: bool,
        timestamp: &str,
    ) -> RepoResult<()>;
    fn get_row(&self, project_id: ProjectId, file_path: &str)
        -> RepoResult<Option<FileAttributeRow>>;
    /// Rows whose `kind` flag is set, ordered by `file_path`.
    fn list_marked(
        &self,
        project_id: ProjectId,
        kind: AttributeKind,
    ) -> RepoResult<Vec<FileAttributeRow>>;
}

/// SQLite-backed attribute cache.
pub struct SqliteAttributeCacheRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAttributeCacheRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AttributeCacheRepository for SqliteAttributeCacheRepository<'_> {
    fn upsert_status(
        &self,
        project_id: ProjectId,
        file_path: &str,
        kind: AttributeKind,
        value: bool,
        timestamp: &str,
    ) -> RepoResult<()> {
        let column = status_column(kind);
        let (publish, to_client) = match kind {
            AttributeKind::Publish => (value, false),
            AttributeKind::ToClient => (false, value),
        };
        self.conn.execute(
            &format!(
                "INSERT INTO file_attributes (
                    project_id,
                    file_path,
                    publish_status,
                    to_client_status,
                    last_updated
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT (project_id, file_path) DO UPDATE SET
                    {column} = excluded.{column},
                    last_updated = excluded.last_updated;"
            ),
            params![
                project_id,
                file_path,
                bool_to_int(publish),
                bool_to_int(to_client),
                timestamp,
            ],
        )?;
        Ok(())
    }

    fn get_row(
        &self,
        project_id: ProjectId,
        file_path: &str,
    ) -> RepoResult<Option<FileAttributeRow>> {
        let raw = self
            .conn
            .query_row(
                &format!("{ROW_SELECT_SQL} WHERE project_id = ?1 AND file_path = ?2;"),
                params![project_id, file_path],
                read_raw_row,
            )
            .optional()?;
        raw.map(RawRow::into_row).transpose()
    }

    fn list_marked(
        &self,
        project_id: ProjectId,
        kind: AttributeKind,
    ) -> RepoResult<Vec<FileAttributeRow>> {
        let column = status_column(kind);
        let mut stmt = self.conn.prepare(&format!(
            "{ROW_SELECT_SQL}
             WHERE project_id = ?1 AND {column} = 1
             ORDER BY file_path ASC;"
        ))?;
        let rows = stmt.query_map(params![project_id], read_raw_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_row()?);
        }
        Ok(out)
    }
}

fn status_column(kind: AttributeKind) -> &'static str {
    match kind {
        AttributeKind::Publish => "publish_status",
        AttributeKind::ToClient => "to_client_status",
    }
}

struct RawRow {
    project_id: ProjectId,
    file_path: String,
    publish_status: i64,
    to_client_status: i64,
    last_updated: String,
}

impl RawRow {
    fn into_row(self) -> RepoResult<FileAttributeRow> {
        Ok(FileAttributeRow {
            project_id: self.project_id,
            file_path: self.file_path,
            publish_status: int_to_bool(self.publish_status, "publish_status")?,
            to_client_status: int_to_bool(self.to_client_status, "to_client_status")?,
            last_updated: self.last_updated,
        })
    }
}

fn read_raw_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        project_id: row.get(0)?,
        file_path: row.get(1)?,
        publish_status: row.get(2)?,
        to_client_status: row.get(3)?,
        last_updated: row.get(4)?,
    })
}
