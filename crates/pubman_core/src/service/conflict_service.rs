//! Sibling conflict checks for attribute writes.
//!
//! # Responsibility
//! - Find siblings that already carry an attribute before it is set on a path.
//! - Ask a `ConflictResolver` whether to clear them, then apply the write.
//!
//! # Invariants
//! - A path never conflicts with itself; sidecar files are never siblings.
//! - Conflicts are ordered by their earliest history timestamp.
//! - "At most one marked sibling per attribute" is enforced only through the
//!   resolver step, not atomically.

use super::attribute_service::{AttributeError, AttributeResult, AttributeService};
use crate::model::attribute::AttributeKind;
use crate::repo::attribute_repo::AttributeCacheRepository;
use crate::sidecar;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Sibling that already carries the attribute being set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub path: PathBuf,
    pub name: String,
    /// Timestamp of the first history entry of the sibling's attribute.
    pub first_marked: String,
}

/// Decision seam replacing the interactive confirmation.
pub trait ConflictResolver {
    /// Returns `true` to clear the attribute from every conflicting sibling.
    fn confirm_clear(&mut self, kind: AttributeKind, conflicts: &[Conflict]) -> bool;
}

/// Resolver that always clears conflicting siblings.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysClear;

impl ConflictResolver for AlwaysClear {
    fn confirm_clear(&mut self, _kind: AttributeKind, _conflicts: &[Conflict]) -> bool {
        true
    }
}

/// Resolver that always declines, leaving siblings untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverClear;

impl ConflictResolver for NeverClear {
    fn confirm_clear(&mut self, _kind: AttributeKind, _conflicts: &[Conflict]) -> bool {
        false
    }
}

/// Result of a checked attribute write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    /// The entry was appended; `cleared` lists siblings reset beforehand.
    Applied {
        timestamp: String,
        cleared: Vec<Conflict>,
    },
    /// The resolver declined; nothing was written.
    Declined { conflicts: Vec<Conflict> },
}

/// Conflict-aware writer over an attribute store.
pub struct ConflictChecker<'a, R: AttributeCacheRepository> {
    store: &'a AttributeService<R>,
}

impl<'a, R: AttributeCacheRepository> ConflictChecker<'a, R> {
    pub fn new(store: &'a AttributeService<R>) -> Self {
        Self { store }
    }

    /// Lists siblings of `path` whose `kind` is currently set.
    pub fn find_conflicts(&self, path: &Path, kind: AttributeKind) -> AttributeResult<Vec<Conflict>> {
        let (Some(parent), Some(own_name)) = (path.parent(), path.file_name()) else {
            return Ok(Vec::new());
        };
        if !parent.is_dir() {
            return Ok(Vec::new());
        }

        let read_dir = fs::read_dir(parent).map_err(|source| AttributeError::Io {
            path: parent.to_path_buf(),
            source,
        })?;

        let mut conflicts = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|source| AttributeError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
            let sibling = entry.path();
            if entry.file_name().as_os_str() == own_name || sidecar::is_sidecar(&sibling) {
                continue;
            }
            let history = self.store.load_history(&sibling);
            if !history.current(kind).status {
                continue;
            }
            let first_marked = history.first_timestamp(kind).unwrap_or_default().to_string();
            conflicts.push(Conflict {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: sibling,
                first_marked,
            });
        }

        conflicts.sort_by(|a, b| {
            a.first_marked
                .cmp(&b.first_marked)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(conflicts)
    }

    /// Appends a `false` entry for every conflict.
    pub fn clear_conflicts(
        &self,
        conflicts: &[Conflict],
        kind: AttributeKind,
        user: &str,
    ) -> AttributeResult<()> {
        for conflict in conflicts {
            self.store
                .update_attribute(&conflict.path, kind, false, user)?;
        }
        Ok(())
    }

    /// Writes `value` for `kind` on `path`, consulting `resolver` when
    /// setting the attribute would duplicate it among siblings.
    pub fn set_attribute(
        &self,
        path: &Path,
        kind: AttributeKind,
        value: bool,
        user: &str,
        resolver: &mut dyn ConflictResolver,
    ) -> AttributeResult<SetOutcome> {
        let mut cleared = Vec::new();
        if value {
            let conflicts = self.find_conflicts(path, kind)?;
            if !conflicts.is_empty() {
                if !resolver.confirm_clear(kind, &conflicts) {
                    info!(
                        "event=attribute_conflict module=conflict status=declined kind={kind} conflicts={}",
                        conflicts.len()
                    );
                    return Ok(SetOutcome::Declined { conflicts });
                }
                self.clear_conflicts(&conflicts, kind, user)?;
                info!(
                    "event=attribute_conflict module=conflict status=cleared kind={kind} conflicts={}",
                    conflicts.len()
                );
                cleared = conflicts;
            }
        }

        let timestamp = self.store.update_attribute(path, kind, value, user)?;
        Ok(SetOutcome::Applied { timestamp, cleared })
    }
}
