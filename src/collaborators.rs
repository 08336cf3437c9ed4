//! Collaborator seams of the publication pipeline.
//!
//! Each stage the driver does not own is a trait here. Production runs wire
//! them to configured commands (`command`), the CMOR validator (`validate`)
//! and the autocurator (`curation`); tests wire in fakes.
use crate::config::{PublishSettings, RunConfig, ValidatorVariant};
use crate::curation::Autocurator;
use crate::dataset::DatasetDescription;
use crate::mapfile::MapfileRecord;
use crate::project::Project;
use crate::tool::ToolStatus;
use crate::validate::{CmorTableValidator, ExternalPrepare};
use anyhow::Result;
use std::path::Path;

mod command;

pub use command::CommandCollaborator;

pub trait MapfileConverter {
    fn convert(&self, mapfile: &Path, project: &str) -> Result<Vec<MapfileRecord>>;
}

/// CMIP6 format validation over one mapfile.
pub trait FormatValidator {
    fn validate(&self, mapfile: &Path, records: &[MapfileRecord]) -> Result<()>;
}

/// Scans the mapfile's data files and writes results to `scan_file`.
pub trait Curator {
    fn curate(
        &self,
        mapfile: &Path,
        records: &[MapfileRecord],
        scan_file: &Path,
    ) -> Result<ToolStatus>;
}

pub trait DatasetAssembler {
    fn assemble(
        &self,
        records: &[MapfileRecord],
        scan_file: &Path,
        json_override: Option<&Path>,
    ) -> Result<DatasetDescription>;
}

pub trait PidRegistrar {
    fn cite(
        &self,
        dataset: &DatasetDescription,
        project: &Project,
        settings: &PublishSettings,
    ) -> Result<DatasetDescription>;
}

pub trait MetadataUpdater {
    fn update(
        &self,
        dataset: &DatasetDescription,
        project: &Project,
        settings: &PublishSettings,
    ) -> Result<()>;
}

pub trait PublicationTester {
    fn pub_test(
        &self,
        dataset: &DatasetDescription,
        project: &Project,
        settings: &PublishSettings,
    ) -> Result<()>;
}

/// Everything a pipeline run calls out to.
pub struct Collaborators {
    pub converter: Box<dyn MapfileConverter>,
    pub validator: Box<dyn FormatValidator>,
    pub curator: Box<dyn Curator>,
    pub assembler: Box<dyn DatasetAssembler>,
    pub registrar: Box<dyn PidRegistrar>,
    pub updater: Box<dyn MetadataUpdater>,
    pub tester: Box<dyn PublicationTester>,
}

impl Collaborators {
    pub fn from_config(config: &RunConfig) -> Self {
        let commands = &config.commands;
        let validator: Box<dyn FormatValidator> = match config.validator {
            ValidatorVariant::Internal => {
                Box::new(CmorTableValidator::new(config.cmor_tables.clone()))
            }
            ValidatorVariant::External => Box::new(ExternalPrepare::new(
                config.prepare_command.clone(),
                config.cmor_tables.clone(),
                config.tool_failures,
            )),
        };
        Self {
            converter: Box::new(CommandCollaborator::new("convert", &commands.convert)),
            validator,
            curator: Box::new(Autocurator::new(
                &config.autocurator,
                config.curator_wrapper.clone(),
            )),
            assembler: Box::new(CommandCollaborator::new("assemble", &commands.assemble)),
            registrar: Box::new(CommandCollaborator::new("pid_cite", &commands.pid_cite)),
            updater: Box::new(CommandCollaborator::new("update", &commands.update)),
            tester: Box::new(CommandCollaborator::new("pub_test", &commands.pub_test)),
        }
    }
}
