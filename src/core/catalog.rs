/*
 * This module lists candidate archive files in a source directory. It defines
 * a trait `FileCatalogOperations` for abstracting the discovery step and a
 * concrete implementation `CoreFileCatalog`. Discovery is deliberately
 * shallow: only regular files directly inside the directory are considered,
 * matched on the archive extension case-insensitively.
 */
use std::fs;
use std::path::{Path, PathBuf};

pub const ARCHIVE_EXTENSION: &str = "epub";

/*
 * Defines the contract for discovering candidate archives. The returned
 * order is filesystem enumeration order; callers must not rely on it for
 * correctness, only for reproducible progress reporting within one run.
 */
pub trait FileCatalogOperations: Send + Sync {
    fn list_candidates(&self, dir: &Path) -> Vec<PathBuf>;
}

pub struct CoreFileCatalog {}

impl CoreFileCatalog {
    pub fn new() -> Self {
        CoreFileCatalog {}
    }
}

impl Default for CoreFileCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl FileCatalogOperations for CoreFileCatalog {
    /*
     * Lists `.epub` files directly inside `dir`, without recursing. A failed
     * directory scan is logged and treated as "no files found" rather than a
     * fatal error; individual unreadable entries are skipped the same way.
     */
    fn list_candidates(&self, dir: &Path) -> Vec<PathBuf> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::error!("CoreFileCatalog: Error scanning directory {dir:?}: {e}");
                return Vec::new();
            }
        };

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("CoreFileCatalog: Skipping unreadable entry in {dir:?}: {e}");
                    continue;
                }
            };
            let is_file = entry.file_type().is_ok_and(|t| t.is_file());
            if !is_file {
                continue;
            }
            let path = entry.path();
            let matches_extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION));
            if matches_extension {
                candidates.push(path);
            }
        }
        log::debug!(
            "CoreFileCatalog: Found {} candidate archive(s) in {dir:?}.",
            candidates.len()
        );
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn test_lists_only_epub_files_case_insensitively() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("a.epub")).unwrap();
        File::create(dir.path().join("B.EPUB")).unwrap();
        File::create(dir.path().join("c.Epub")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();
        File::create(dir.path().join("epub")).unwrap(); // no extension

        let catalog = CoreFileCatalog::new();
        let mut names: Vec<String> = catalog
            .list_candidates(dir.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();

        assert_eq!(names, vec!["B.EPUB", "a.epub", "c.Epub"]);
    }

    #[test]
    fn test_does_not_recurse_into_subdirectories() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("nested");
        fs::create_dir(&sub).unwrap();
        File::create(sub.join("deep.epub")).unwrap();
        File::create(dir.path().join("top.epub")).unwrap();

        let catalog = CoreFileCatalog::new();
        let candidates = catalog.list_candidates(dir.path());

        assert_eq!(candidates.len(), 1);
        assert_eq!(
            candidates[0].file_name().unwrap().to_string_lossy(),
            "top.epub"
        );
    }

    #[test]
    fn test_directory_named_like_an_archive_is_ignored() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("folder.epub")).unwrap();

        let catalog = CoreFileCatalog::new();
        assert!(catalog.list_candidates(dir.path()).is_empty());
    }

    #[test]
    fn test_missing_directory_yields_empty_list() {
        let catalog = CoreFileCatalog::new();
        let candidates = catalog.list_candidates(Path::new("/this/does/not/exist"));
        assert!(candidates.is_empty());
    }
}
