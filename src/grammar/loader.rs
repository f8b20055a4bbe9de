//! Grammar resources read from a packages directory on disk.

use std::io;
use std::path::{Path, PathBuf};

use super::ResourceLoader;
use crate::primitives::glob_match::resource_glob_matches;

const RESOURCE_ROOT: &str = "Packages/";

/// Resources under a local packages directory.
///
/// `<packages>/Python/Python.tmLanguage` is exposed as the resource
/// `Packages/Python/Python.tmLanguage`.
pub struct FsResources {
    packages_dir: PathBuf,
}

impl FsResources {
    pub fn new(packages_dir: impl Into<PathBuf>) -> Self {
        Self {
            packages_dir: packages_dir.into(),
        }
    }

    /// Filesystem location of a `Packages/...` resource path.
    pub fn resolve(&self, resource: &str) -> Option<PathBuf> {
        let relative = resource.strip_prefix(RESOURCE_ROOT)?;
        if relative.split('/').any(|segment| segment == "..") {
            return None;
        }
        Some(
            relative
                .split('/')
                .fold(self.packages_dir.clone(), |path, segment| path.join(segment)),
        )
    }

    fn walk(&self, dir: &Path, pattern: &str, found: &mut Vec<String>) -> io::Result<()> {
        let mut entries = std::fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            if path.is_dir() {
                if let Err(e) = self.walk(&path, pattern, found) {
                    tracing::warn!("Failed to read package directory {:?}: {}", path, e);
                }
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !resource_glob_matches(pattern, name) {
                continue;
            }
            if let Ok(relative) = path.strip_prefix(&self.packages_dir) {
                let segments: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                found.push(format!("{}{}", RESOURCE_ROOT, segments.join("/")));
            }
        }
        Ok(())
    }
}

impl ResourceLoader for FsResources {
    fn find_resources(&self, pattern: &str) -> Vec<String> {
        let mut found = Vec::new();
        if let Err(e) = self.walk(&self.packages_dir, pattern, &mut found) {
            tracing::warn!(
                "Failed to enumerate resources in {:?}: {}",
                self.packages_dir,
                e
            );
        }
        found
    }

    fn load_resource(&self, path: &str) -> io::Result<String> {
        let file = self.resolve(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("not a package resource: {}", path),
            )
        })?;
        std::fs::read_to_string(file)
    }

    fn resource_exists(&self, path: &str) -> bool {
        self.resolve(path).is_some_and(|file| file.is_file())
    }
}
