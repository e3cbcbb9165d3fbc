//! Client delivery copier.
//!
//! # Responsibility
//! - Collect files marked `to_client` under a directory.
//! - Mirror them, relative to the master path, into the delivery root.
//!
//! # Invariants
//! - A directory marked `to_client` includes every descendant file.
//! - Otherwise only individually marked files are included, and
//!   subdirectories are visited with the same rule.
//! - Sidecars and the delivery root itself are never collected; bytes are
//!   copied unchanged.
//! - Sources must sit below the master path without `..` components, so
//!   every destination stays under the delivery root.

use super::attribute_service::{relative_to_master, AttributeService};
use crate::model::attribute::AttributeKind;
use crate::repo::attribute_repo::AttributeCacheRepository;
use crate::sidecar;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

pub type DeliveryResult<T> = Result<T, DeliveryError>;

#[derive(Debug)]
pub enum DeliveryError {
    /// Source directory is not inside the project master path.
    OutsideMaster { path: PathBuf, master: PathBuf },
    /// Source is missing or not a directory.
    NotADirectory(PathBuf),
    Io { path: PathBuf, source: io::Error },
    Walk(walkdir::Error),
}

impl Display for DeliveryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutsideMaster { path, master } => write!(
                f,
                "`{}` is outside the master path `{}`",
                path.display(),
                master.display()
            ),
            Self::NotADirectory(path) => write!(f, "not a directory: `{}`", path.display()),
            Self::Io { path, source } => write!(f, "copy failed at `{}`: {source}", path.display()),
            Self::Walk(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DeliveryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Walk(err) => Some(err),
            _ => None,
        }
    }
}

impl From<walkdir::Error> for DeliveryError {
    fn from(value: walkdir::Error) -> Self {
        Self::Walk(value)
    }
}

/// One copied file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub copied: Vec<DeliveredFile>,
}

impl DeliveryReport {
    pub fn file_count(&self) -> usize {
        self.copied.len()
    }

    pub fn total_bytes(&self) -> u64 {
        self.copied.iter().map(|file| file.bytes).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.copied.is_empty()
    }
}

/// Copies client-marked files into a delivery root.
pub struct DeliveryService<'a, R: AttributeCacheRepository> {
    store: &'a AttributeService<R>,
    delivery_root: PathBuf,
}

impl<'a, R: AttributeCacheRepository> DeliveryService<'a, R> {
    pub fn new(store: &'a AttributeService<R>, delivery_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            delivery_root: delivery_root.into(),
        }
    }

    pub fn delivery_root(&self) -> &Path {
        &self.delivery_root
    }

    /// Files under `dir` selected for delivery, in walk order.
    pub fn collect_client_files(&self, dir: &Path) -> DeliveryResult<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(DeliveryError::NotADirectory(dir.to_path_buf()));
        }
        let mut files = Vec::new();
        self.collect_into(dir, &mut files)?;
        Ok(files)
    }

    fn collect_into(&self, dir: &Path, files: &mut Vec<PathBuf>) -> DeliveryResult<()> {
        if self.store.is_marked(dir, AttributeKind::ToClient) {
            let walker = WalkDir::new(dir)
                .min_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| entry.path() != self.delivery_root);
            for entry in walker {
                let entry = entry?;
                if entry.file_type().is_file() && !sidecar::is_sidecar(entry.path()) {
                    files.push(entry.into_path());
                }
            }
            return Ok(());
        }

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type().is_dir() {
                if path != self.delivery_root {
                    self.collect_into(path, files)?;
                }
            } else if entry.file_type().is_file()
                && !sidecar::is_sidecar(path)
                && self.store.is_marked(path, AttributeKind::ToClient)
            {
                files.push(entry.into_path());
            }
        }
        Ok(())
    }

    /// Copies every selected file under `dir` to
    /// `<delivery_root>/<path relative to master>`.
    pub fn send_to_client(&self, dir: &Path) -> DeliveryResult<DeliveryReport> {
        let started_at = Instant::now();
        let master = self.store.master_path();
        if relative_to_master(master, dir).is_none() {
            return Err(DeliveryError::OutsideMaster {
                path: dir.to_path_buf(),
                master: master.to_path_buf(),
            });
        }

        let files = self.collect_client_files(dir)?;
        let mut report = DeliveryReport::default();
        for source in files {
            match self.copy_one(master, &source) {
                Ok(delivered) => report.copied.push(delivered),
                Err(err) => {
                    error!(
                        "event=send_to_client module=delivery status=error copied={} error={err}",
                        report.file_count()
                    );
                    return Err(err);
                }
            }
        }

        info!(
            "event=send_to_client module=delivery status=ok files={} bytes={} duration_ms={}",
            report.file_count(),
            report.total_bytes(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    fn copy_one(&self, master: &Path, source: &Path) -> DeliveryResult<DeliveredFile> {
        let relative =
            relative_to_master(master, source).ok_or_else(|| DeliveryError::OutsideMaster {
                path: source.to_path_buf(),
                master: master.to_path_buf(),
            })?;
        let destination = self.delivery_root.join(relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|source| DeliveryError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let bytes = fs::copy(source, &destination).map_err(|err| DeliveryError::Io {
            path: source.to_path_buf(),
            source: err,
        })?;
        Ok(DeliveredFile {
            source: source.to_path_buf(),
            destination,
            bytes,
        })
    }
}
