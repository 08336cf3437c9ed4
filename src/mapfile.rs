//! Mapfile records and mapfile lists.
//!
//! Record contents belong to the converter; the pipeline only needs the file
//! name out of each record.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const MAPFILE_EXTENSION: &str = ".map";
pub const MAPFILE_FIELD_DELIMITER: &str = " | ";

/// One per-file entry produced by the mapfile converter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapfileRecord(pub serde_json::Value);

impl MapfileRecord {
    /// File path carried by the record.
    ///
    /// Array records keep the dataset id at index 0 and the file at index 1.
    pub fn filename(&self) -> Option<&str> {
        match &self.0 {
            serde_json::Value::Array(fields) => fields.get(1).and_then(|value| value.as_str()),
            serde_json::Value::Object(map) => map
                .get("file")
                .or_else(|| map.get("filename"))
                .and_then(|value| value.as_str()),
            _ => None,
        }
    }

    pub fn require_filename(&self) -> Result<&str> {
        self.filename()
            .ok_or_else(|| anyhow!("mapfile record has no filename: {}", self.0))
    }
}

/// Filename field of a raw mapfile line.
pub fn line_filename(line: &str) -> Option<&str> {
    line.split(MAPFILE_FIELD_DELIMITER).nth(1).map(str::trim)
}

pub fn is_single_mapfile(path: &Path) -> bool {
    path.to_string_lossy().ends_with(MAPFILE_EXTENSION)
}

/// Mapfile paths to publish for a `--map` argument.
///
/// Anything not ending in `.map` is read as a list of mapfiles.
pub fn expand_targets(map: &Path) -> Result<Vec<PathBuf>> {
    if is_single_mapfile(map) {
        return Ok(vec![map.to_path_buf()]);
    }
    let text = fs::read_to_string(map)
        .with_context(|| format!("read mapfile list {}", map.display()))?;
    Ok(list_entries(&text).into_iter().map(PathBuf::from).collect())
}

/// Entries of a mapfile list.
///
/// Each raw line, terminator included, loses its last two characters; entries
/// left blank are skipped.
pub fn list_entries(text: &str) -> Vec<String> {
    text.split_inclusive('\n')
        .map(strip_entry_terminator)
        .filter(|entry| !entry.trim().is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_entry_terminator(line: &str) -> &str {
    let cut = line
        .char_indices()
        .rev()
        .nth(1)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    &line[..cut]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_filename_reads_array_and_object_forms() {
        let row = MapfileRecord(json!([
            "CMIP6.CMIP.E3SM#v20190101",
            "/data/tas_Amon_E3SM_historical_r1i1p1f1_gr_185001-201412.nc",
            "1024"
        ]));
        assert_eq!(
            row.filename(),
            Some("/data/tas_Amon_E3SM_historical_r1i1p1f1_gr_185001-201412.nc")
        );

        let entry = MapfileRecord(json!({"file": "/data/a.nc", "size": 3}));
        assert_eq!(entry.filename(), Some("/data/a.nc"));

        let bad = MapfileRecord(json!(["only-dataset-id"]));
        assert!(bad.filename().is_none());
        assert!(bad.require_filename().is_err());
    }

    #[test]
    fn line_filename_takes_second_pipe_field() {
        let line = "CMIP6.CMIP.x#20190101 | /data/a.nc | 1024 | mod_time=1.0 | checksum=ab";
        assert_eq!(line_filename(line), Some("/data/a.nc"));
        assert_eq!(line_filename("no delimiter here"), None);
    }

    #[test]
    fn list_entries_strip_two_trailing_characters() {
        let text = "/maps/CMIP6.a.map\r\n\r\n/maps/obs4mips.b.map\r\n";
        assert_eq!(
            list_entries(text),
            vec!["/maps/CMIP6.a.map", "/maps/obs4mips.b.map"]
        );
        assert_eq!(list_entries("/maps/a.mapXY"), vec!["/maps/a.map"]);
        assert!(list_entries("\n\n").is_empty());
    }

    #[test]
    fn single_mapfile_is_decided_by_extension() {
        assert!(is_single_mapfile(Path::new("/data/CMIP6.test.map")));
        assert!(!is_single_mapfile(Path::new("/data/mapfiles.txt")));

        let dir = tempfile::tempdir().expect("tempdir");
        let list = dir.path().join("mapfiles.txt");
        fs::write(&list, "/m/CMIP6.a.map\r\n/m/b.map\r\n").expect("write list");
        assert_eq!(
            expand_targets(&list).expect("expand"),
            vec![PathBuf::from("/m/CMIP6.a.map"), PathBuf::from("/m/b.map")]
        );
        assert_eq!(
            expand_targets(Path::new("/m/one.map")).expect("expand"),
            vec![PathBuf::from("/m/one.map")]
        );
    }
}
