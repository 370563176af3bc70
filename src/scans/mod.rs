//! Scan dump discovery and metadata loading

pub mod dump;
pub mod metadata;
pub mod repository;

pub use dump::ScanDump;
pub use metadata::{BuildMetadata, BUILD_METADATA_EXTENSION};
pub use repository::{ScanDumpRepository, SCAN_MARKER_FILE};
