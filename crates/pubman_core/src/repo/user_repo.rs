//! User repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Usernames are unique; duplicates surface as `RepoError::Conflict`.
//! - Only password hashes are stored, never plaintext.

use super::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub type UserId = i64;

/// Stored user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub created_at: String,
}

const USER_SELECT_SQL: &str = "SELECT id, username, password_hash, created_at FROM users";

/// Repository interface for user accounts.
pub trait UserRepository {
    fn create_user(&self, username: &str, password_hash: &str) -> RepoResult<User>;
    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    /// Lists users sorted by username.
    fn list_users(&self) -> RepoResult<Vec<User>>;
    fn count_users(&self) -> RepoResult<u64>;
    /// Renames `old_username` and, when given, replaces its password hash in
    /// one statement.
    fn update_account(
        &self,
        old_username: &str,
        new_username: &str,
        password_hash: Option<&str>,
    ) -> RepoResult<()>;
    fn delete_user(&self, username: &str) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, username: &str, password_hash: &str) -> RepoResult<User> {
        self.conn.execute(
            "INSERT INTO users (username, password_hash) VALUES (?1, ?2);",
            params![username, password_hash],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_user(id)?
            .ok_or_else(|| RepoError::not_found("user", id))
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE username = ?1;"),
                params![username],
                parse_user_row,
            )
            .optional()?;
        Ok(user)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE id = ?1;"),
                params![id],
                parse_user_row,
            )
            .optional()?;
        Ok(user)
    }

    fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} ORDER BY username ASC;"))?;
        let rows = stmt.query_map([], parse_user_row)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    fn count_users(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))?;
        u64::try_from(count).map_err(|_| RepoError::InvalidData(format!("user count {count}")))
    }

    fn update_account(
        &self,
        old_username: &str,
        new_username: &str,
        password_hash: Option<&str>,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET username = ?1, password_hash = COALESCE(?2, password_hash)
             WHERE username = ?3;",
            params![new_username, password_hash, old_username],
        )?;
        ensure_changed(changed, old_username)
    }

    fn delete_user(&self, username: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE username = ?1;", params![username])?;
        ensure_changed(changed, username)
    }
}

fn ensure_changed(changed: usize, username: &str) -> RepoResult<()> {
    if changed == 0 {
        return Err(RepoError::not_found("user", username));
    }
    Ok(())
}

fn parse_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: row.get(3)?,
    })
}
