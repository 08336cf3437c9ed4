//! CMIP6 format validation (PrePARE).
//!
//! Two variants share the `FormatValidator` seam:
//!
//! - **Internal**: a control-vocabulary check of each record's filename against
//!   the CMOR tables. The first violation aborts the run.
//! - **External**: one `PrePARE --table-path <tables> <file>` process per raw
//!   mapfile line. Exit statuses go through the tool failure policy.
//!
//! ## Filename grammar
//! ```text
//! <variable>_<table>_<source>_<experiment>_<member>_<grid>[_<time range>].nc
//! tas_Amon_E3SM-1-0_historical_r1i1p1f1_gr_185001-201412.nc
//! ```
//! The variable must appear in `CMIP6_<table>.json`. Source, experiment and
//! grid are checked against `CMIP6_CV.json` when the tables ship one. Fixed
//! fields (`fx` frequencies) carry no time range; everything else needs one.
use crate::collaborators::FormatValidator;
use crate::config::ToolFailurePolicy;
use crate::mapfile::{line_filename, MapfileRecord};
use crate::tool::{enforce, launch_status, run_inherited, split_command};
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const CV_FILE: &str = "CMIP6_CV.json";
const CV_CHECKED_KEYS: [&str; 3] = ["source_id", "experiment_id", "grid_label"];

#[derive(Deserialize)]
struct CmorTable {
    #[serde(default)]
    variable_entry: BTreeMap<String, VariableEntry>,
}

#[derive(Deserialize)]
struct VariableEntry {
    #[serde(default)]
    frequency: Option<String>,
}

#[derive(Deserialize)]
struct ControlledVocabulary {
    #[serde(rename = "CV")]
    cv: BTreeMap<String, serde_json::Value>,
}

/// Filename components of a CMIP6 data file.
#[derive(Debug, PartialEq, Eq)]
pub struct Cmip6Filename<'a> {
    pub variable_id: &'a str,
    pub table_id: &'a str,
    pub source_id: &'a str,
    pub experiment_id: &'a str,
    pub member_id: &'a str,
    pub grid_label: &'a str,
    pub time_range: Option<&'a str>,
}

/// Control-vocabulary checker bound to one CMOR table directory.
pub struct Cmip6Checker {
    tables: PathBuf,
    cv: Option<BTreeMap<String, serde_json::Value>>,
    loaded_tables: BTreeMap<String, CmorTable>,
    member_re: Regex,
    grid_re: Regex,
    time_range_re: Regex,
}

impl Cmip6Checker {
    pub fn new(tables: &Path) -> Result<Self> {
        if tables.as_os_str().is_empty() {
            return Err(anyhow!(
                "CMOR table path is required for CMIP6 validation (use --cmor-tables)"
            ));
        }
        if !tables.is_dir() {
            return Err(anyhow!("CMOR table path {} is not a directory", tables.display()));
        }
        let cv_path = tables.join(CV_FILE);
        let cv = if cv_path.is_file() {
            let bytes =
                fs::read(&cv_path).with_context(|| format!("read {}", cv_path.display()))?;
            let parsed: ControlledVocabulary = serde_json::from_slice(&bytes)
                .with_context(|| format!("parse {}", cv_path.display()))?;
            Some(parsed.cv)
        } else {
            None
        };
        Ok(Self {
            tables: tables.to_path_buf(),
            cv,
            loaded_tables: BTreeMap::new(),
            member_re: Regex::new(r"^(?:s\d{4}-)?r\d+i\d+p\d+f\d+$").expect("regex for member_id"),
            grid_re: Regex::new(r"^g[a-z0-9]+$").expect("regex for grid_label"),
            time_range_re: Regex::new(r"^\d+-\d+(?:-clim)?$").expect("regex for time range"),
        })
    }

    /// Check one data file name against the tables.
    pub fn control_vocab(&mut self, filename: &str) -> Result<()> {
        let name = Path::new(filename)
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow!("invalid data file path {filename}"))?;
        let parsed = parse_cmip6_filename(name)?;

        if !self.member_re.is_match(parsed.member_id) {
            return Err(anyhow!("{name}: invalid member_id {}", parsed.member_id));
        }
        if !self.grid_re.is_match(parsed.grid_label) {
            return Err(anyhow!("{name}: invalid grid_label {}", parsed.grid_label));
        }
        if let Some(range) = parsed.time_range {
            if !self.time_range_re.is_match(range) {
                return Err(anyhow!("{name}: invalid time range {range}"));
            }
        }

        if let Some(cv) = &self.cv {
            let values = [parsed.source_id, parsed.experiment_id, parsed.grid_label];
            for (key, value) in CV_CHECKED_KEYS.iter().zip(values) {
                if let Some(allowed) = cv.get(*key) {
                    if !cv_contains(allowed, value) {
                        return Err(anyhow!("{name}: {key} {value} is not in {CV_FILE}"));
                    }
                }
            }
        }

        let table = self.table(parsed.table_id)?;
        let entry = table.variable_entry.get(parsed.variable_id).ok_or_else(|| {
            anyhow!(
                "{name}: variable {} is not defined in table {}",
                parsed.variable_id,
                parsed.table_id
            )
        })?;
        let fixed = entry
            .frequency
            .as_deref()
            .is_some_and(|frequency| frequency.ends_with("fx"));
        match (fixed, parsed.time_range) {
            (true, Some(range)) => Err(anyhow!("{name}: fixed field must not carry time range {range}")),
            (false, None) if entry.frequency.is_some() => {
                Err(anyhow!("{name}: time range missing for non-fixed field"))
            }
            _ => Ok(()),
        }
    }

    fn table(&mut self, table_id: &str) -> Result<&CmorTable> {
        if !self.loaded_tables.contains_key(table_id) {
            let path = self.tables.join(format!("CMIP6_{table_id}.json"));
            if !path.is_file() {
                return Err(anyhow!(
                    "table {table_id} not found under {}",
                    self.tables.display()
                ));
            }
            let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
            let table: CmorTable = serde_json::from_slice(&bytes)
                .with_context(|| format!("parse {}", path.display()))?;
            self.loaded_tables.insert(table_id.to_string(), table);
        }
        self.loaded_tables
            .get(table_id)
            .ok_or_else(|| anyhow!("table {table_id} not loaded"))
    }
}

fn cv_contains(allowed: &serde_json::Value, value: &str) -> bool {
    match allowed {
        serde_json::Value::Object(map) => map.contains_key(value),
        serde_json::Value::Array(items) => items.iter().any(|item| item.as_str() == Some(value)),
        serde_json::Value::String(single) => single == value,
        _ => true,
    }
}

pub fn parse_cmip6_filename(name: &str) -> Result<Cmip6Filename<'_>> {
    let stem = name
        .strip_suffix(".nc")
        .ok_or_else(|| anyhow!("{name}: data files must end in .nc"))?;
    let parts: Vec<&str> = stem.split('_').collect();
    if !(6..=7).contains(&parts.len()) || parts.iter().any(|part| part.is_empty()) {
        return Err(anyhow!(
            "{name}: expected <variable>_<table>_<source>_<experiment>_<member>_<grid>[_<time range>].nc"
        ));
    }
    Ok(Cmip6Filename {
        variable_id: parts[0],
        table_id: parts[1],
        source_id: parts[2],
        experiment_id: parts[3],
        member_id: parts[4],
        grid_label: parts[5],
        time_range: parts.get(6).copied(),
    })
}

/// Internal PrePARE variant.
pub struct CmorTableValidator {
    tables: PathBuf,
}

impl CmorTableValidator {
    pub fn new(tables: PathBuf) -> Self {
        Self { tables }
    }
}

impl FormatValidator for CmorTableValidator {
    fn validate(&self, _mapfile: &Path, records: &[MapfileRecord]) -> Result<()> {
        println!("iterating through filenames for PrePARE (internal version)...");
        let mut checker = Cmip6Checker::new(&self.tables)?;
        for record in records {
            checker.control_vocab(record.require_filename()?)?;
        }
        tracing::info!(files = records.len(), "control vocabulary check complete");
        Ok(())
    }
}

/// External PrePARE variant, one process per mapfile line.
pub struct ExternalPrepare {
    command: String,
    tables: PathBuf,
    policy: ToolFailurePolicy,
}

impl ExternalPrepare {
    pub fn new(command: String, tables: PathBuf, policy: ToolFailurePolicy) -> Self {
        Self {
            command,
            tables,
            policy,
        }
    }
}

impl FormatValidator for ExternalPrepare {
    fn validate(&self, mapfile: &Path, _records: &[MapfileRecord]) -> Result<()> {
        println!("Iterating through filenames for PrePARE...");
        let text = fs::read_to_string(mapfile)
            .with_context(|| format!("read mapfile {}", mapfile.display()))?;
        for line in text.lines().filter(|line| !line.trim().is_empty()) {
            let filename = line_filename(line)
                .ok_or_else(|| anyhow!("mapfile line has no filename field: {line}"))?;
            let status = launch_status("PrePARE", || {
                let (program, mut args) = split_command(&self.command)?;
                args.push("--table-path".to_string());
                args.push(self.tables.to_string_lossy().into_owned());
                args.push(filename.to_string());
                run_inherited(program.as_os_str(), &args)
            });
            enforce(self.policy, "PrePARE", status)
                .with_context(|| format!("PrePARE on {filename}"))?;
        }
        println!("Done.");
        Ok(())
    }
}
