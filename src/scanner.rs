use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::ScanConfig;
use crate::error::{PartMatchError, Result};

/// Collects model files from list files, directories and explicit paths
pub struct ModelScanner {
    include: GlobSet,
    follow_symlinks: bool,
    max_depth: Option<usize>,
}

impl ModelScanner {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.include_patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| PartMatchError::Other(format!("Invalid include pattern '{}': {}", pattern, e)))?;
            builder.add(glob);
        }
        let include = builder
            .build()
            .map_err(|e| PartMatchError::Other(format!("Failed to build include patterns: {}", e)))?;

        Ok(Self {
            include,
            follow_symlinks: config.follow_symlinks,
            max_depth: config.max_depth,
        })
    }

    /// Paths listed one per line; relative entries resolve against the list's directory
    pub async fn read_list(&self, list: &Path) -> Result<Vec<PathBuf>> {
        let content = tokio::fs::read_to_string(list).await?;
        let base = list.parent().unwrap_or_else(|| Path::new(""));

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| {
                let path = PathBuf::from(line);
                if path.is_absolute() {
                    path
                } else {
                    base.join(path)
                }
            })
            .collect())
    }

    /// Model files under `root` whose file name matches the include patterns, sorted
    pub fn scan_dir(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut walker = WalkDir::new(root).follow_links(self.follow_symlinks);
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if entry.file_type().is_file() && self.matches(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        debug!("Found {} model files under {}", files.len(), root.display());
        Ok(files)
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.include.is_match(Path::new(name)))
            .unwrap_or(false)
    }

    /// Combine all sources, keeping first-seen order and dropping duplicates
    pub async fn collect(
        &self,
        files: &[PathBuf],
        list: Option<&Path>,
        dirs: &[PathBuf],
    ) -> Result<Vec<PathBuf>> {
        let mut all = Vec::new();
        if let Some(list) = list {
            all.extend(self.read_list(list).await?);
        }
        all.extend(files.iter().cloned());
        for dir in dirs {
            all.extend(self.scan_dir(dir)?);
        }

        let mut seen = HashSet::new();
        all.retain(|path| seen.insert(path.clone()));
        Ok(all)
    }
}
