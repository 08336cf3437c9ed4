//! Project detection from the mapfile name.
use std::path::Path;

pub const CMIP6: &str = "CMIP6";

/// Project a mapfile run publishes under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    /// Enables PrePARE validation and PID citation.
    pub cmip6: bool,
}

impl Project {
    /// Resolve the project for `mapfile`, honoring a `--project` override.
    pub fn detect(mapfile: &Path, project_override: Option<&str>) -> Self {
        match project_override {
            Some(id) => Self {
                id: id.to_string(),
                cmip6: id.eq_ignore_ascii_case(CMIP6),
            },
            None => {
                let id = project_from_mapfile(mapfile);
                let cmip6 = id == CMIP6;
                Self { id, cmip6 }
            }
        }
    }
}

/// Text before the first `.` of the final path segment.
pub fn project_from_mapfile(mapfile: &Path) -> String {
    let text = mapfile.to_string_lossy();
    let name = text.rsplit('/').next().unwrap_or_default();
    name.split('.').next().unwrap_or_default().to_string()
}
