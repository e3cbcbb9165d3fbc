//! Attribute kinds, history entries and current-status projections.
//!
//! # Invariants
//! - Entries are appended in write order; `current()` is always the last one.
//! - Timestamps are local ISO-8601 strings, so lexical order is write order.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// User name recorded when a history entry carries none.
pub const UNKNOWN_USER: &str = "Unknown";

/// Number of trailing history entries shown per attribute in details views.
pub const DETAILS_HISTORY_LIMIT: usize = 5;

/// Tracked per-path status flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// File or folder is published for downstream tools.
    Publish,
    /// File or folder is part of the next client delivery.
    ToClient,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 2] = [AttributeKind::Publish, AttributeKind::ToClient];

    /// Stable storage key used in sidecar JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::ToClient => "to_client",
        }
    }

    /// Badge text shown when the attribute is set.
    pub fn badge(self) -> &'static str {
        match self {
            Self::Publish => "Published",
            Self::ToClient => "To Client",
        }
    }

    /// History verb for a given status value.
    pub fn describe(self, status: bool) -> &'static str {
        match (self, status) {
            (Self::Publish, true) => "Published",
            (Self::Publish, false) => "Unpublished",
            (Self::ToClient, true) => "Sent to client",
            (Self::ToClient, false) => "Removed from client",
        }
    }
}

impl Display for AttributeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognised attribute names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAttributeKindError(pub String);

impl Display for ParseAttributeKindError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown attribute `{}`; expected publish|to_client",
            self.0
        )
    }
}

impl Error for ParseAttributeKindError {}

impl FromStr for AttributeKind {
    type Err = ParseAttributeKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "publish" => Ok(Self::Publish),
            "to_client" | "to-client" | "client" => Ok(Self::ToClient),
            other => Err(ParseAttributeKindError(other.to_string())),
        }
    }
}

fn unknown_user() -> String {
    UNKNOWN_USER.to_string()
}

/// One appended status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub status: bool,
    pub timestamp: String,
    #[serde(default = "unknown_user")]
    pub user: String,
}

impl HistoryEntry {
    /// Creates an entry stamped with the current local time.
    pub fn now(status: bool, user: impl Into<String>) -> Self {
        Self {
            status,
            timestamp: now_timestamp(),
            user: user.into(),
        }
    }
}

/// Full history of both attributes for one path, as stored in its sidecar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeHistory {
    #[serde(default)]
    pub publish: Vec<HistoryEntry>,
    #[serde(default)]
    pub to_client: Vec<HistoryEntry>,
}

impl AttributeHistory {
    pub fn entries(&self, kind: AttributeKind) -> &[HistoryEntry] {
        match kind {
            AttributeKind::Publish => &self.publish,
            AttributeKind::ToClient => &self.to_client,
        }
    }

    /// Appends one entry; existing entries are never touched.
    pub fn append(&mut self, kind: AttributeKind, entry: HistoryEntry) {
        match kind {
            AttributeKind::Publish => self.publish.push(entry),
            AttributeKind::ToClient => self.to_client.push(entry),
        }
    }

    pub fn current(&self, kind: AttributeKind) -> CurrentStatus {
        self.entries(kind)
            .last()
            .map(CurrentStatus::from)
            .unwrap_or_default()
    }

    /// Timestamp of the first entry ever recorded for `kind`.
    pub fn first_timestamp(&self, kind: AttributeKind) -> Option<&str> {
        self.entries(kind)
            .first()
            .map(|entry| entry.timestamp.as_str())
    }

    /// Last `limit` entries of `kind`, oldest first.
    pub fn tail(&self, kind: AttributeKind, limit: usize) -> &[HistoryEntry] {
        let entries = self.entries(kind);
        &entries[entries.len().saturating_sub(limit)..]
    }

    pub fn is_empty(&self) -> bool {
        self.publish.is_empty() && self.to_client.is_empty()
    }
}

/// Latest known value of one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentStatus {
    pub status: bool,
    /// Empty when the attribute was never written.
    pub timestamp: String,
    pub user: String,
}

impl Default for CurrentStatus {
    fn default() -> Self {
        Self {
            status: false,
            timestamp: String::new(),
            user: unknown_user(),
        }
    }
}

impl From<&HistoryEntry> for CurrentStatus {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            status: entry.status,
            timestamp: entry.timestamp.clone(),
            user: entry.user.clone(),
        }
    }
}

/// Returns the local time as an ISO-8601 string with microseconds.
pub fn now_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}
