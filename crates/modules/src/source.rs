//! Where raw module exports come from.
//!
//! Development reads the source tree from disk, production reads a tree
//! compiled into the binary. Everything after [`ModuleSource::list_entries`]
//! is the same for both.

use std::path::{Path, PathBuf};

use {
    async_trait::async_trait,
    include_dir::Dir,
    tracing::{debug, warn},
};

use crate::{
    discover::FileDiscoverer, error::Result, loader::ModuleLoader, value::ModuleValue,
};

/// One loaded file: its label and whatever it exported.
#[derive(Debug, Clone)]
pub struct RawModuleEntry {
    pub path: String,
    pub exported: ModuleValue,
}

impl RawModuleEntry {
    pub fn new(path: impl Into<String>, exported: impl Into<ModuleValue>) -> Self {
        Self {
            path: path.into(),
            exported: exported.into(),
        }
    }
}

#[async_trait]
pub trait ModuleSource: Send + Sync {
    /// Short name for logs.
    fn describe(&self) -> String;

    /// Every module that loaded. Files that fail to load are logged and
    /// skipped; only an unusable root is an error.
    async fn list_entries(&self) -> Result<Vec<RawModuleEntry>>;
}

/// Modules read from a directory on disk.
#[derive(Debug, Clone)]
pub struct FsModuleSource {
    root: PathBuf,
    discoverer: FileDiscoverer,
    loader: ModuleLoader,
}

impl FsModuleSource {
    pub fn new(root: impl Into<PathBuf>, discoverer: FileDiscoverer, loader: ModuleLoader) -> Self {
        Self {
            root: root.into(),
            discoverer,
            loader,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ModuleSource for FsModuleSource {
    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }

    async fn list_entries(&self) -> Result<Vec<RawModuleEntry>> {
        let files = self.discoverer.discover(&self.root)?;
        let mut entries = Vec::with_capacity(files.len());
        for path in files {
            match self.loader.load(&path) {
                Ok(exported) => entries.push(RawModuleEntry {
                    path: path.display().to_string(),
                    exported,
                }),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping module"),
            }
        }
        Ok(entries)
    }
}

/// Modules compiled into the binary with `include_dir!`.
#[derive(Debug, Clone)]
pub struct EmbeddedModuleSource {
    dir: &'static Dir<'static>,
    discoverer: FileDiscoverer,
    loader: ModuleLoader,
}

impl EmbeddedModuleSource {
    pub fn new(dir: &'static Dir<'static>, discoverer: FileDiscoverer, loader: ModuleLoader) -> Self {
        Self {
            dir,
            discoverer,
            loader,
        }
    }

    /// Paths of embedded files that pass the name and depth filters.
    fn matching_files(&self) -> Vec<&'static include_dir::File<'static>> {
        let mut out = Vec::new();
        let mut stack: Vec<(&'static Dir<'static>, usize)> = vec![(self.dir, 1)];
        while let Some((dir, depth)) = stack.pop() {
            let mut files: Vec<_> = dir
                .files()
                .filter(|f| file_name(f.path()).is_some_and(|n| self.discoverer.matches_file(n)))
                .collect();
            files.sort_by(|a, b| a.path().cmp(b.path()));
            out.extend(files);

            let mut subdirs: Vec<_> = dir
                .dirs()
                .filter(|d| file_name(d.path()).is_some_and(|n| self.discoverer.matches_dir(n)))
                .collect();
            if depth >= self.discoverer.max_depth() {
                if !subdirs.is_empty() {
                    warn!(
                        path = %dir.path().display(),
                        max_depth = self.discoverer.max_depth(),
                        "embedded module tree truncated at maximum depth"
                    );
                }
                continue;
            }
            // Reversed so the stack pops them in name order.
            subdirs.sort_by(|a, b| b.path().cmp(a.path()));
            stack.extend(subdirs.into_iter().map(|d| (d, depth + 1)));
        }
        out
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

#[async_trait]
impl ModuleSource for EmbeddedModuleSource {
    fn describe(&self) -> String {
        "embedded modules".into()
    }

    async fn list_entries(&self) -> Result<Vec<RawModuleEntry>> {
        let mut entries = Vec::new();
        for file in self.matching_files() {
            let label = format!("./{}", file.path().display());
            let ext = file
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default();
            let Some(raw) = file.contents_utf8() else {
                warn!(path = %label, "skipping module: not valid UTF-8");
                continue;
            };
            match self.loader.load_str(&label, ext, raw) {
                Ok(exported) => entries.push(RawModuleEntry {
                    path: label,
                    exported,
                }),
                Err(e) => warn!(path = %label, error = %e, "skipping module"),
            }
        }
        debug!(count = entries.len(), "loaded embedded modules");
        Ok(entries)
    }
}

/// Modules handed over in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticModuleSource {
    entries: Vec<RawModuleEntry>,
}

impl StaticModuleSource {
    pub fn new(entries: Vec<RawModuleEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn with(mut self, path: impl Into<String>, exported: impl Into<ModuleValue>) -> Self {
        self.entries.push(RawModuleEntry::new(path, exported));
        self
    }
}

#[async_trait]
impl ModuleSource for StaticModuleSource {
    fn describe(&self) -> String {
        format!("{} in-memory modules", self.entries.len())
    }

    async fn list_entries(&self) -> Result<Vec<RawModuleEntry>> {
        Ok(self.entries.clone())
    }
}
