//! Recursive module file discovery.

use std::path::{Path, PathBuf};

use {
    accord_config::{CONFIG_FILENAMES, ModulesConfig},
    regex::Regex,
    tracing::{debug, warn},
    walkdir::{DirEntry, WalkDir},
};

use crate::error::{Error, Result};

/// Walks a directory tree and returns the files that look like modules.
///
/// A directory is entered only when its bare name matches the directory
/// pattern; a file is kept only when its bare name matches the file pattern.
/// Config files (`accord.toml`, ...) are never modules.
#[derive(Debug, Clone)]
pub struct FileDiscoverer {
    file_pattern: Regex,
    dir_pattern: Regex,
    max_depth: usize,
}

impl FileDiscoverer {
    pub fn new(file_pattern: &str, dir_pattern: &str) -> Result<Self> {
        Ok(Self {
            file_pattern: compile(file_pattern)?,
            dir_pattern: compile(dir_pattern)?,
            max_depth: accord_config::schema::DEFAULT_MAX_DEPTH,
        })
    }

    pub fn from_config(config: &ModulesConfig) -> Result<Self> {
        Ok(Self::new(&config.file_pattern, &config.dir_pattern)?.with_max_depth(config.max_depth))
    }

    /// Deepest level descended into; the root's children are at depth 1.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn matches_file(&self, name: &str) -> bool {
        !CONFIG_FILENAMES.contains(&name) && self.file_pattern.is_match(name)
    }

    pub fn matches_dir(&self, name: &str) -> bool {
        self.dir_pattern.is_match(name)
    }

    /// Absolute paths of every module file under `root`, in traversal order.
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let root = root
            .canonicalize()
            .ok()
            .filter(|p| p.is_dir())
            .ok_or_else(|| Error::DiscoveryRoot {
                path: root.to_path_buf(),
            })?;

        let walker = WalkDir::new(&root)
            .follow_links(true)
            .max_depth(self.max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || self.keep(entry));

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "skipping unreadable module path");
                    continue;
                },
            };

            if entry.file_type().is_dir() {
                if entry.depth() == self.max_depth && entry.depth() > 0 {
                    warn!(
                        path = %entry.path().display(),
                        max_depth = self.max_depth,
                        "module tree truncated at maximum depth"
                    );
                }
                continue;
            }
            files.push(entry.into_path());
        }

        debug!(root = %root.display(), count = files.len(), "discovered module files");
        Ok(files)
    }

    fn keep(&self, entry: &DirEntry) -> bool {
        let Some(name) = entry.file_name().to_str() else {
            return false;
        };
        if entry.file_type().is_dir() {
            self.matches_dir(name)
        } else {
            self.matches_file(name)
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| Error::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}
