use super::io::{TableIoError, list_directory};
use super::reader::{SdfFileKind, SdfFilePatterns};
use crate::domain::MatDpResult;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Producer of SDF files.
///
/// Given an output directory, a source writes zero or more SDF files at their
/// tree positions below it. Sources may also suggest the labels recorded in
/// the root `metadata.json`.
pub trait DataSource {
    fn kind(&self) -> SdfFileKind;

    fn write_sdf(&self, output_dir: &Path) -> MatDpResult<()>;

    fn main_label(&self) -> Option<&str> {
        None
    }

    fn tail_labels(&self) -> Option<&[String]> {
        None
    }
}

/// Source backed by an existing SDF-shaped directory: copies every file of
/// one kind, keeping its path relative to `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSource {
    kind: SdfFileKind,
    root: PathBuf,
    main_label: Option<String>,
    tail_labels: Option<Vec<String>>,
}

impl StoredSource {
    pub fn new(kind: SdfFileKind, root: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            root: root.into(),
            main_label: None,
            tail_labels: None,
        }
    }

    pub fn intensities(root: impl Into<PathBuf>) -> Self {
        Self::new(SdfFileKind::Intensities, root)
    }

    pub fn indicators(root: impl Into<PathBuf>) -> Self {
        Self::new(SdfFileKind::Indicators, root)
    }

    pub fn targets(root: impl Into<PathBuf>) -> Self {
        Self::new(SdfFileKind::Targets, root)
    }

    pub fn with_main_label(mut self, label: impl Into<String>) -> Self {
        self.main_label = Some(label.into());
        self
    }

    pub fn with_tail_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tail_labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DataSource for StoredSource {
    fn kind(&self) -> SdfFileKind {
        self.kind
    }

    fn write_sdf(&self, output_dir: &Path) -> MatDpResult<()> {
        let patterns = SdfFilePatterns::for_kinds(&[self.kind])?;
        let copied = copy_matching_files(&self.root, &self.root, output_dir, &patterns)?;
        debug!(
            kind = %self.kind,
            source = %self.root.display(),
            copied,
            "copied stored SDF files"
        );
        Ok(())
    }

    fn main_label(&self) -> Option<&str> {
        self.main_label.as_deref()
    }

    fn tail_labels(&self) -> Option<&[String]> {
        self.tail_labels.as_deref()
    }
}

fn copy_matching_files(
    root: &Path,
    current_dir: &Path,
    output_dir: &Path,
    patterns: &SdfFilePatterns,
) -> Result<usize, TableIoError> {
    let (files, directories) = list_directory(current_dir)?;
    let mut copied = 0;

    for file in files.iter().filter(|file| patterns.matches(file)) {
        let relative = file.strip_prefix(root).unwrap_or(file);
        let destination = output_dir.join(relative);
        if destination.exists() {
            return Err(TableIoError::AlreadyExists { path: destination });
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|source| TableIoError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::copy(file, &destination).map_err(|source| TableIoError::Io {
            path: destination.clone(),
            source,
        })?;
        copied += 1;
    }

    for directory in &directories {
        copied += copy_matching_files(root, directory, output_dir, patterns)?;
    }
    Ok(copied)
}
