pub mod build_tool;

pub use build_tool::{BuildTool, PUBLISHER_PROJECT_DIR, VERSION_PLACEHOLDER};
