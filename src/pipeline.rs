//! Single-mapfile publication pipeline.
//!
//! Stages run strictly in order and the first failure aborts the run:
//!
//! ```text
//! convert -> [PrePARE] -> autocurator -> assemble -> [pid cite] -> update -> pub test
//! ```
//!
//! Bracketed stages only run for CMIP6. The scan file handed to the
//! autocurator and assembler is a `NamedTempFile` owned by the run, so it is
//! removed on every exit path.
use crate::collaborators::Collaborators;
use crate::config::RunConfig;
use crate::dataset::DatasetVersions;
use crate::preflight::check_files;
use crate::project::Project;
use crate::tool::enforce;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ConvertMapfile,
    Prepare,
    Curate,
    Assemble,
    PidCite,
    Update,
    PubTest,
}

impl Stage {
    /// Prefix printed in front of the underlying error.
    pub fn failure_message(self) -> &'static str {
        match self {
            Stage::ConvertMapfile => "Error with converting mapfile",
            Stage::Prepare => "Error with PrePARE",
            Stage::Curate => "Error running autocurator",
            Stage::Assemble => "Error making dataset",
            Stage::PidCite => "Error running pid cite",
            Stage::Update => "Error updating",
            Stage::PubTest => "Error running pub test",
        }
    }
}

/// Publish one mapfile.
pub fn run_pipeline(mapfile: &Path, config: &RunConfig, collaborators: &Collaborators) -> Result<()> {
    let start = Instant::now();
    let project = Project::detect(mapfile, config.project_override.as_deref());
    check_files(&config.input_files(mapfile))?;
    tracing::debug!(
        mapfile = %mapfile.display(),
        project = %project.id,
        cmip6 = project.cmip6,
        "pipeline start"
    );

    let scan_file = tempfile::Builder::new()
        .prefix("esgpublish-scan-")
        .suffix(".json")
        .tempfile_in(&config.scan_dir)
        .with_context(|| format!("create autocurator scan file in {}", config.scan_dir.display()))?;

    println!("Converting mapfile...");
    let records = collaborators
        .converter
        .convert(mapfile, &project.id)
        .context(Stage::ConvertMapfile.failure_message())?;
    println!("Done.");

    if project.cmip6 {
        collaborators
            .validator
            .validate(mapfile, &records)
            .context(Stage::Prepare.failure_message())?;
    }

    println!("Running autocurator...");
    let status = collaborators
        .curator
        .curate(mapfile, &records, scan_file.path())
        .context(Stage::Curate.failure_message())?;
    enforce(config.tool_failures, "autocurator", status)
        .context(Stage::Curate.failure_message())?;

    println!("Done.\nMaking dataset...");
    let assembled = collaborators
        .assembler
        .assemble(&records, scan_file.path(), config.json_override.as_deref())
        .context(Stage::Assemble.failure_message())?;
    let mut versions = DatasetVersions::new(assembled);

    if project.cmip6 {
        println!("Done.\nRunning pid cite...");
        let cited = collaborators
            .registrar
            .cite(versions.assembled(), &project, &config.settings)
            .context(Stage::PidCite.failure_message())?;
        versions.record_citation(cited);
    }

    println!("Done.\nUpdating...");
    collaborators
        .updater
        .update(versions.select(config.update_input), &project, &config.settings)
        .context(Stage::Update.failure_message())?;

    println!("Done.\nRunning pub test...");
    collaborators
        .tester
        .pub_test(versions.select(config.test_input), &project, &config.settings)
        .context(Stage::PubTest.failure_message())?;

    println!("Done. Cleaning up.");
    scan_file.close().context("remove autocurator scan file")?;
    tracing::info!(
        mapfile = %mapfile.display(),
        records = records.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "pipeline complete"
    );
    Ok(())
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
