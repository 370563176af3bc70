//! Scan dump discovery
//!
//! Walks the capture data directory for marker files and returns the dumps in
//! the order the remote plugin replays its own "previous scans": sorted by raw
//! path string, then reversed. Callers must preserve that order so externally
//! observed progress logs line up.

use crate::core::error::RepublishError;
use crate::scans::dump::ScanDump;
use std::path::Path;
use walkdir::WalkDir;

/// Marker file written at the bottom of every dump directory
pub const SCAN_MARKER_FILE: &str = "scan.scan";

/// Discovers captured scan dumps on disk
#[derive(Debug, Default)]
pub struct ScanDumpRepository {
    _private: (),
}

impl ScanDumpRepository {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Discover all scan dumps under `root`
    ///
    /// Returns an empty list when no marker files exist; "nothing to publish"
    /// is a normal terminal state. A marker file whose path does not match the
    /// dump grammar fails the whole call.
    pub fn discover(&self, root: &Path) -> Result<Vec<ScanDump>, RepublishError> {
        let mut marker_paths: Vec<_> = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.file_type().is_file() && entry.file_name() == SCAN_MARKER_FILE
            })
            .map(|entry| entry.into_path())
            .collect();

        // Reverse path order matches the plugin's own replay numbering
        marker_paths.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));
        marker_paths.reverse();

        marker_paths
            .iter()
            .map(|path| ScanDump::parse(path))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_dump(root: &Path, version: &str, build_id: &str) {
        let dir = root
            .join("build-scan-data")
            .join(version)
            .join("previous")
            .join(build_id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(SCAN_MARKER_FILE), b"dump").unwrap();
    }

    #[test]
    fn test_discover_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let repository = ScanDumpRepository::new();

        let dumps = repository.discover(temp_dir.path()).unwrap();
        assert!(dumps.is_empty());
    }

    #[test]
    fn test_discover_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let repository = ScanDumpRepository::new();

        let dumps = repository
            .discover(&temp_dir.path().join("does-not-exist"))
            .unwrap();
        assert!(dumps.is_empty());
    }

    #[test]
    fn test_discover_returns_reverse_path_order() {
        let temp_dir = TempDir::new().unwrap();
        create_dump(temp_dir.path(), "1.0", "a");
        create_dump(temp_dir.path(), "2.0", "b");

        let repository = ScanDumpRepository::new();
        let dumps = repository.discover(temp_dir.path()).unwrap();

        assert_eq!(dumps.len(), 2);
        assert_eq!(dumps[0].version, "2.0");
        assert_eq!(dumps[0].build_id, "b");
        assert_eq!(dumps[1].version, "1.0");
        assert_eq!(dumps[1].build_id, "a");
    }

    #[test]
    fn test_discover_order_is_stable_across_runs() {
        let temp_dir = TempDir::new().unwrap();
        create_dump(temp_dir.path(), "1.0", "x");
        create_dump(temp_dir.path(), "1.0", "y");
        create_dump(temp_dir.path(), "1.1", "z");

        let repository = ScanDumpRepository::new();
        let first = repository.discover(temp_dir.path()).unwrap();
        let second = repository.discover(temp_dir.path()).unwrap();

        assert_eq!(first, second);
        let ids: Vec<_> = first.iter().map(|d| d.build_id.as_str()).collect();
        assert_eq!(ids, vec!["z", "y", "x"]);
    }

    #[test]
    fn test_discover_ignores_other_files() {
        let temp_dir = TempDir::new().unwrap();
        create_dump(temp_dir.path(), "1.0", "a");
        fs::write(temp_dir.path().join("README.md"), b"not a dump").unwrap();

        let repository = ScanDumpRepository::new();
        let dumps = repository.discover(temp_dir.path()).unwrap();
        assert_eq!(dumps.len(), 1);
    }

    #[test]
    fn test_discover_fails_on_broken_layout() {
        let temp_dir = TempDir::new().unwrap();
        create_dump(temp_dir.path(), "1.0", "a");

        // A marker outside the grammar breaks the whole discovery call
        let rogue = temp_dir.path().join("rogue");
        fs::create_dir_all(&rogue).unwrap();
        fs::write(rogue.join(SCAN_MARKER_FILE), b"dump").unwrap();

        let repository = ScanDumpRepository::new();
        let result = repository.discover(temp_dir.path());
        assert!(matches!(
            result,
            Err(RepublishError::DumpPathUnparseable { .. })
        ));
    }
}
