//! User account use-case service.
//!
//! # Responsibility
//! - Bootstrap the `admin` account on an empty database.
//! - Authenticate users and manage accounts.
//!
//! # Invariants
//! - Passwords are stored as lowercase hex SHA-256 digests.
//! - The `admin` account cannot be removed or renamed.
//! - Account updates are applied in a single statement.

use crate::repo::user_repo::{User, UserRepository};
use crate::repo::RepoError;
use log::{info, warn};
use sha2::{Digest, Sha256};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Username of the bootstrap administrator.
pub const ADMIN_USERNAME: &str = "admin";

/// Service error for user use-cases.
#[derive(Debug)]
pub enum UserServiceError {
    /// Unknown username or wrong password.
    InvalidCredentials,
    /// A required field is blank.
    MissingField(&'static str),
    UsernameTaken(String),
    UserNotFound(String),
    /// The admin account is protected from removal and renaming.
    AdminProtected,
    Repo(RepoError),
}

impl Display for UserServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid username or password"),
            Self::MissingField(field) => write!(f, "`{field}` is required"),
            Self::UsernameTaken(name) => write!(f, "username already exists: `{name}`"),
            Self::UserNotFound(name) => write!(f, "user not found: `{name}`"),
            Self::AdminProtected => write!(f, "the admin user cannot be removed or renamed"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for UserServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for UserServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Lowercase hex SHA-256 of `password`.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// User service facade over repository implementations.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates `admin` with `password` when no user exists yet.
    ///
    /// Returns `true` when the account was created.
    pub fn bootstrap_admin(&self, password: &str) -> Result<bool, UserServiceError> {
        if self.repo.count_users()? > 0 {
            return Ok(false);
        }
        self.repo
            .create_user(ADMIN_USERNAME, &hash_password(password))?;
        info!("event=user_bootstrap module=user status=ok username={ADMIN_USERNAME}");
        Ok(true)
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Result<User, UserServiceError> {
        let user = self
            .repo
            .find_by_username(username.trim())?
            .filter(|user| user.password_hash == hash_password(password));
        match user {
            Some(user) => {
                info!("event=user_login module=user status=ok username={}", user.username);
                Ok(user)
            }
            None => {
                warn!("event=user_login module=user status=error reason=invalid_credentials");
                Err(UserServiceError::InvalidCredentials)
            }
        }
    }

    pub fn create_user(&self, username: &str, password: &str) -> Result<User, UserServiceError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(UserServiceError::MissingField("username"));
        }
        if password.is_empty() {
            return Err(UserServiceError::MissingField("password"));
        }
        self.repo
            .create_user(username, &hash_password(password))
            .map_err(|err| match err {
                RepoError::Conflict(_) => UserServiceError::UsernameTaken(username.to_string()),
                other => other.into(),
            })
    }

    /// Renames `old_username` and optionally resets its password.
    pub fn update_account(
        &self,
        old_username: &str,
        new_username: &str,
        new_password: Option<&str>,
    ) -> Result<User, UserServiceError> {
        let new_username = new_username.trim();
        if new_username.is_empty() {
            return Err(UserServiceError::MissingField("username"));
        }
        if self.repo.find_by_username(old_username)?.is_none() {
            return Err(UserServiceError::UserNotFound(old_username.to_string()));
        }
        if old_username == ADMIN_USERNAME && new_username != ADMIN_USERNAME {
            return Err(UserServiceError::AdminProtected);
        }

        let password_hash = new_password
            .filter(|password| !password.is_empty())
            .map(hash_password);
        self.repo
            .update_account(old_username, new_username, password_hash.as_deref())
            .map_err(|err| match err {
                RepoError::Conflict(_) => UserServiceError::UsernameTaken(new_username.to_string()),
                RepoError::NotFound { .. } => {
                    UserServiceError::UserNotFound(old_username.to_string())
                }
                other => other.into(),
            })?;
        info!("event=user_update module=user status=ok username={new_username}");

        self.repo
            .find_by_username(new_username)?
            .ok_or_else(|| UserServiceError::UserNotFound(new_username.to_string()))
    }

    /// Deletes a non-admin account.
    ///
    /// A user still owning projects is rejected with `Repo(Conflict)`.
    pub fn remove_user(&self, username: &str) -> Result<(), UserServiceError> {
        if username == ADMIN_USERNAME {
            return Err(UserServiceError::AdminProtected);
        }
        self.repo.delete_user(username).map_err(|err| match err {
            RepoError::NotFound { .. } => UserServiceError::UserNotFound(username.to_string()),
            other => other.into(),
        })?;
        info!("event=user_remove module=user status=ok username={username}");
        Ok(())
    }

    /// Usernames sorted ascending.
    pub fn list_usernames(&self) -> Result<Vec<String>, UserServiceError> {
        Ok(self
            .repo
            .list_users()?
            .into_iter()
            .map(|user| user.username)
            .collect())
    }

    pub fn is_admin(&self, username: &str) -> bool {
        username == ADMIN_USERNAME
    }
}
