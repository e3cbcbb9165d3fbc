//! Published-file manifest exporter.
//!
//! # Responsibility
//! - Collect published files under a directory.
//! - Group file names into numbered sequences.
//! - Serialize the groups to `published_sequence.xml`.
//!
//! # Invariants
//! - A published directory publishes every descendant file.
//! - Files within a sequence are ordered by numeric frame, then name.
//! - Sidecars and previous manifests are never listed.

use super::attribute_service::AttributeService;
use crate::model::attribute::AttributeKind;
use crate::repo::attribute_repo::AttributeCacheRepository;
use crate::sidecar;
use chrono::{DateTime, Local};
use log::{error, info};
use once_cell::sync::Lazy;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File name of the exported manifest, written into the exported directory.
pub const MANIFEST_FILE_NAME: &str = "published_sequence.xml";

const MANIFEST_VERSION: &str = "1.0";

static FRAME_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\.\w+$").expect("valid frame suffix regex"));

pub type ManifestResult<T> = Result<T, ManifestError>;

#[derive(Debug)]
pub enum ManifestError {
    NotADirectory(PathBuf),
    Io { path: PathBuf, source: io::Error },
    Walk(walkdir::Error),
    Xml(String),
}

impl Display for ManifestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotADirectory(path) => write!(f, "not a directory: `{}`", path.display()),
            Self::Io { path, source } => write!(f, "manifest io failure at `{}`: {source}", path.display()),
            Self::Walk(err) => write!(f, "{err}"),
            Self::Xml(message) => write!(f, "xml serialization failed: {message}"),
        }
    }
}

impl Error for ManifestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Walk(err) => Some(err),
            _ => None,
        }
    }
}

impl From<walkdir::Error> for ManifestError {
    fn from(value: walkdir::Error) -> Self {
        Self::Walk(value)
    }
}

/// Splits `name` into a sequence base and frame digits.
///
/// `shot_0012.exr` -> (`shot_`, Some(`0012`)); names without a trailing
/// number keep their full name as base.
pub fn split_frame(name: &str) -> (String, Option<String>) {
    match FRAME_SUFFIX_RE.captures(name) {
        Some(caps) => {
            let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
                return (name.to_string(), None);
            };
            (
                name[..whole.start()].to_string(),
                Some(digits.as_str().to_string()),
            )
        }
        None => (name.to_string(), None),
    }
}

/// One published file with the metadata written to the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    pub path: PathBuf,
    pub name: String,
    pub frame: Option<String>,
    pub size: u64,
    /// Local ISO-8601 modification time.
    pub modified: String,
}

impl ManifestFile {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: impl Into<String>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (_, frame) = split_frame(&name);
        Self {
            path,
            name,
            frame,
            size,
            modified: modified.into(),
        }
    }

    /// Reads size and modification time from disk.
    pub fn from_disk(path: &Path) -> ManifestResult<Self> {
        let metadata = fs::metadata(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let modified = metadata
            .modified()
            .map(|time| {
                DateTime::<Local>::from(time)
                    .format("%Y-%m-%dT%H:%M:%S%.6f")
                    .to_string()
            })
            .map_err(|source| ManifestError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(path, metadata.len(), modified))
    }

    fn base_name(&self) -> String {
        split_frame(&self.name).0
    }
}

/// Files sharing one base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub name: String,
    /// Directory of the first file seen for this base name.
    pub directory: PathBuf,
    pub files: Vec<ManifestFile>,
}

/// Groups files by base name, ordered by base name; files inside a group are
/// ordered by numeric frame, then name, frameless files last.
pub fn group_sequences(files: impl IntoIterator<Item = ManifestFile>) -> Vec<Sequence> {
    let mut groups: BTreeMap<String, Sequence> = BTreeMap::new();
    for file in files {
        let base = file.base_name();
        let sequence = groups.entry(base.clone()).or_insert_with(|| Sequence {
            name: base,
            directory: file
                .path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            files: Vec::new(),
        });
        sequence.files.push(file);
    }

    groups
        .into_values()
        .map(|mut sequence| {
            sequence.files.sort_by(compare_frames);
            sequence
        })
        .collect()
}

fn compare_frames(a: &ManifestFile, b: &ManifestFile) -> Ordering {
    match (&a.frame, &b.frame) {
        (Some(left), Some(right)) => compare_digits(left, right).then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    }
}

/// Numeric comparison of digit strings of any length.
fn compare_digits(left: &str, right: &str) -> Ordering {
    let left = left.trim_start_matches('0');
    let right = right.trim_start_matches('0');
    left.len().cmp(&right.len()).then_with(|| left.cmp(right))
}

/// Serializes sequences into the manifest XML document.
pub fn render_manifest(
    project_name: &str,
    export_date: &str,
    sequences: &[Sequence],
) -> ManifestResult<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_event(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    let mut root = BytesStart::new("FileSequence");
    root.push_attribute(("version", MANIFEST_VERSION));
    root.push_attribute(("exportDate", export_date));
    root.push_attribute(("project", project_name));
    write_event(&mut writer, Event::Start(root))?;

    for sequence in sequences {
        let directory = sequence.directory.to_string_lossy();
        let mut element = BytesStart::new("Sequence");
        element.push_attribute(("name", sequence.name.as_str()));
        element.push_attribute(("directory", &*directory));
        write_event(&mut writer, Event::Start(element))?;

        for file in &sequence.files {
            let path = file.path.to_string_lossy();
            let size = file.size.to_string();
            let mut element = BytesStart::new("File");
            element.push_attribute(("name", file.name.as_str()));
            if let Some(frame) = &file.frame {
                element.push_attribute(("frame", frame.as_str()));
            }
            element.push_attribute(("path", &*path));
            element.push_attribute(("size", size.as_str()));
            element.push_attribute(("modified", file.modified.as_str()));
            write_event(&mut writer, Event::Empty(element))?;
        }

        write_event(&mut writer, Event::End(BytesEnd::new("Sequence")))?;
    }

    write_event(&mut writer, Event::End(BytesEnd::new("FileSequence")))?;
    Ok(writer.into_inner())
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> ManifestResult<()> {
    writer
        .write_event(event)
        .map_err(|err| ManifestError::Xml(err.to_string()))
}

/// Outcome of one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestReport {
    /// Written manifest, `None` when nothing was published.
    pub path: Option<PathBuf>,
    pub file_count: usize,
    pub sequence_count: usize,
}

/// Manifest exporter over an attribute store.
pub struct ManifestExporter<'a, R: AttributeCacheRepository> {
    store: &'a AttributeService<R>,
    project_name: String,
}

impl<'a, R: AttributeCacheRepository> ManifestExporter<'a, R> {
    pub fn new(store: &'a AttributeService<R>, project_name: impl Into<String>) -> Self {
        Self {
            store,
            project_name: project_name.into(),
        }
    }

    /// Published files under `dir`, in walk order.
    pub fn collect_published_files(&self, dir: &Path) -> ManifestResult<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(ManifestError::NotADirectory(dir.to_path_buf()));
        }
        let mut files = Vec::new();
        self.collect_into(dir, false, &mut files)?;
        Ok(files)
    }

    fn collect_into(
        &self,
        dir: &Path,
        inherited: bool,
        files: &mut Vec<PathBuf>,
    ) -> ManifestResult<()> {
        let published = inherited || self.store.is_marked(dir, AttributeKind::Publish);
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type().is_dir() {
                self.collect_into(path, published, files)?;
                continue;
            }
            if !entry.file_type().is_file() || sidecar::is_sidecar(path) || is_manifest(path) {
                continue;
            }
            if published || self.store.is_marked(path, AttributeKind::Publish) {
                files.push(entry.into_path());
            }
        }
        Ok(())
    }

    /// Writes `dir/published_sequence.xml` describing published files.
    pub fn export_published_xml(&self, dir: &Path) -> ManifestResult<ManifestReport> {
        let files = self.collect_published_files(dir)?;
        if files.is_empty() {
            info!(
                "event=manifest_export module=manifest status=empty dir={}",
                dir.display()
            );
            return Ok(ManifestReport {
                path: None,
                file_count: 0,
                sequence_count: 0,
            });
        }

        let file_count = files.len();
        let entries = files
            .iter()
            .map(|path| ManifestFile::from_disk(path))
            .collect::<ManifestResult<Vec<_>>>()?;
        let sequences = group_sequences(entries);
        let export_date = crate::model::attribute::now_timestamp();
        let document = render_manifest(&self.project_name, &export_date, &sequences)?;

        let target = dir.join(MANIFEST_FILE_NAME);
        if let Err(source) = fs::write(&target, document) {
            error!(
                "event=manifest_export module=manifest status=error path={} error={source}",
                target.display()
            );
            return Err(ManifestError::Io {
                path: target,
                source,
            });
        }

        info!(
            "event=manifest_export module=manifest status=ok files={file_count} sequences={} path={}",
            sequences.len(),
            target.display()
        );
        Ok(ManifestReport {
            path: Some(target),
            file_count,
            sequence_count: sequences.len(),
        })
    }
}

fn is_manifest(path: &Path) -> bool {
    path.file_name()
        .map(|name| name == MANIFEST_FILE_NAME)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> ManifestFile {
        ManifestFile::new(path, 10, "2025-01-01T00:00:00.000000")
    }

    #[test]
    fn split_frame_strips_trailing_number_and_extension() {
        assert_eq!(
            split_frame("a001.png"),
            ("a".to_string(), Some("001".to_string()))
        );
        assert_eq!(
            split_frame("shot_v2_0100.exr"),
            ("shot_v2_".to_string(), Some("0100".to_string()))
        );
        assert_eq!(split_frame("notes.txt"), ("notes.txt".to_string(), None));
        assert_eq!(split_frame("readme"), ("readme".to_string(), None));
    }

    #[test]
    fn numbered_files_share_a_sequence_in_frame_order() {
        let sequences = group_sequences(vec![
            file("/show/renders/a002.png"),
            file("/show/renders/b.mov"),
            file("/show/renders/a001.png"),
        ]);

        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].name, "a");
        assert_eq!(sequences[0].directory, PathBuf::from("/show/renders"));
        let names = sequences[0]
            .files
            .iter()
            .map(|file| file.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a001.png", "a002.png"]);
        assert_eq!(sequences[1].name, "b.mov");
        assert_eq!(sequences[1].files[0].frame, None);
    }

    #[test]
    fn frames_compare_numerically_not_lexically() {
        let sequences = group_sequences(vec![file("/s/f10.exr"), file("/s/f9.exr")]);
        assert_eq!(sequences[0].files[0].name, "f9.exr");
        assert_eq!(sequences[0].files[1].name, "f10.exr");
    }

    #[test]
    fn render_escapes_attributes_and_omits_missing_frame() {
        let sequences = group_sequences(vec![file("/s/a001.png"), file("/s/R&D.txt")]);
        let xml = String::from_utf8(
            render_manifest("Show \"One\"", "2025-02-01T12:00:00", &sequences).unwrap(),
        )
        .unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("project=\"Show &quot;One&quot;\""));
        assert!(xml.contains("<File name=\"a001.png\" frame=\"001\" path=\"/s/a001.png\""));
        assert!(xml.contains("<File name=\"R&amp;D.txt\" path="));
        assert!(xml.trim_end().ends_with("</FileSequence>"));
    }
}
