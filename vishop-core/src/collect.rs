//! File collection for bundles: walk roots, drop dot-files, normalise, dedupe, exclude.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Result, VishopError};
use crate::pattern::{ExcludeFilter, SEPARATOR};

/// Normalised file paths destined for one bundle. Iterates in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    paths: BTreeSet<String>,
}

impl FileSet {
    pub fn insert(&mut self, path: &Path) -> bool {
        self.paths.insert(normalize(path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Drop every path matched by `filter`.
    pub fn retain_unexcluded(&mut self, filter: &ExcludeFilter) {
        self.paths.retain(|path| match filter.first_match(path) {
            Some(pattern) => {
                debug!(path = %path, pattern = pattern.as_str(), "Excluded file");
                false
            }
            None => true,
        });
    }
}

/// Lexically normalise a path into a `/`-separated string.
///
/// `.` segments vanish, `a/..` collapses, and a path that normalises to
/// nothing becomes `.`. Symlinks are not resolved.
pub fn normalize(path: &Path) -> String {
    let mut absolute = false;
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => {
                parts.push(prefix.as_os_str().to_string_lossy().into_owned());
            }
            Component::RootDir => absolute = true,
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push("..".to_string()),
            },
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
        }
    }
    let joined = parts.join(&SEPARATOR.to_string());
    match (absolute, joined.is_empty()) {
        (true, _) => format!("{SEPARATOR}{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Collects bundle contents from root directories and explicit files.
#[derive(Debug, Default)]
pub struct FileCollector {
    roots: Vec<PathBuf>,
    files: Vec<PathBuf>,
}

impl FileCollector {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            files: Vec::new(),
        }
    }

    /// Add individual files on top of the directory roots.
    pub fn with_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files.extend(files.into_iter().map(Into::into));
        self
    }

    /// Walk all roots and return the files no exclude pattern matches.
    pub fn collect(&self, filter: &ExcludeFilter) -> Result<FileSet> {
        let mut set = FileSet::default();

        for root in &self.roots {
            if !root.is_dir() {
                return Err(VishopError::NotADirectory(root.clone()));
            }
            info!(root = %root.display(), "Collecting files");
            for entry in WalkDir::new(root).follow_links(false) {
                let entry = entry.map_err(|e| {
                    VishopError::Io(std::io::Error::other(format!(
                        "failed to walk {}: {e}",
                        root.display()
                    )))
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                if is_hidden(entry.file_name()) {
                    debug!(path = %entry.path().display(), "Skipping hidden file");
                    continue;
                }
                set.insert(entry.path());
            }
        }

        for file in &self.files {
            if !file.is_file() {
                return Err(VishopError::NotAFile(file.clone()));
            }
            set.insert(file);
        }

        let collected = set.len();
        set.retain_unexcluded(filter);
        info!(
            collected,
            kept = set.len(),
            patterns = filter.len(),
            "Applied exclude patterns"
        );

        if set.is_empty() {
            return Err(VishopError::EmptyBundle);
        }
        Ok(set)
    }
}

/// Convenience wrapper over [`FileCollector`] for plain directory roots.
pub fn collect<I, P>(roots: I, filter: &ExcludeFilter) -> Result<FileSet>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    FileCollector::new(roots).collect(filter)
}
