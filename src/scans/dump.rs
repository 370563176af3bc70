//! Scan dump identity parsing
//!
//! A capture run leaves each dump under a fixed layout,
//! `<anything>/build-scan-data/<version>/previous/<buildId>/<marker>`, and the
//! plugin version plus build id are only recoverable from that path. A path
//! that does not match the grammar means the on-disk layout is structurally
//! broken, so parsing it is a hard error rather than a skip.

use crate::core::error::RepublishError;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref SCAN_DUMP_PATH: Regex =
        Regex::new(r"^.*/build-scan-data/([^/]+)/previous/([^/]+)/[^/]+$")
            .expect("scan dump path pattern is valid");
}

/// A single previously captured build scan, identified by its on-disk path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanDump {
    /// Absolute path of the marker file
    pub path: PathBuf,
    /// Capture plugin/extension version the dump was produced with
    pub version: String,
    /// Build id assigned by the capture run
    pub build_id: String,
}

impl ScanDump {
    /// Parse a marker-file path against the fixed dump path grammar
    pub fn parse(path: &Path) -> Result<Self, RepublishError> {
        let normalized = path.to_string_lossy().replace('\\', "/");

        let captures =
            SCAN_DUMP_PATH
                .captures(&normalized)
                .ok_or_else(|| RepublishError::DumpPathUnparseable {
                    path: path.to_path_buf(),
                })?;

        Ok(Self {
            path: path.to_path_buf(),
            version: captures[1].to_string(),
            build_id: captures[2].to_string(),
        })
    }
}
