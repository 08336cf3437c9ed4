//! CLI argument parsing for the publication pipeline.
//!
//! Arguments are parsed once here and resolved into a `RunConfig` by
//! `config::RunConfig::resolve`; no stage looks at argv again.
use crate::config::{DatasetSelection, ToolFailurePolicy, ValidatorVariant};
use clap::builder::TypedValueParser;
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_DATA_NODE: &str = "greyworm1-rh7.llnl.gov";
pub const DEFAULT_INDEX_NODE: &str = "esgf-fedtest.llnl.gov";
pub const DEFAULT_CERTIFICATE: &str = "./cert.pem";

/// Root CLI entrypoint.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "esgpublish",
    version,
    about = "Publish data sets to ESGF databases.",
    after_help = "Examples:\n  esgpublish --map /data/CMIP6.test.map --autocurator /opt/autocurator --cmor-tables /opt/cmip6-cmor-tables/Tables\n  esgpublish --map mapfiles.txt --autocurator /opt/autocurator --json overrides.json"
)]
pub struct PublishArgs {
    /// Mapfile or file containing a list of mapfiles
    #[arg(long, value_name = "PATH")]
    pub map: PathBuf,

    /// Path to autocurator repository folder
    #[arg(long, value_name = "DIR")]
    pub autocurator: PathBuf,

    /// Run PID registration in 'test' mode (use unless performing production publications)
    #[arg(long)]
    pub test: bool,

    /// Enable replica publication for this dataset(s)
    #[arg(long)]
    pub set_replica: bool,

    /// Disable replica publication
    #[arg(long)]
    pub no_replica: bool,

    /// Load attributes from a JSON file; they override DRS and global attributes
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Data node hostname
    #[arg(long, value_name = "HOST", default_value = DEFAULT_DATA_NODE)]
    pub data_node: String,

    /// Index node hostname
    #[arg(long, value_name = "HOST", default_value = DEFAULT_INDEX_NODE)]
    pub index_node: String,

    /// Certificate file in .pem form used for publishing (generate with a myproxy login)
    #[arg(long, short = 'c', value_name = "PATH", default_value = DEFAULT_CERTIFICATE)]
    pub certificate: PathBuf,

    /// Set/override the project for the given mapfile (selects PrePARE and PID)
    #[arg(long, value_name = "NAME", default_value = "")]
    pub project: String,

    /// Path to CMIP6 CMOR tables for PrePARE (CMIP6 only)
    #[arg(long, value_name = "DIR", default_value = "", value_parser = clap::builder::OsStringValueParser::new().map(PathBuf::from))]
    pub cmor_tables: PathBuf,

    /// Collaborator config file (defaults to $ESGPUB_CONFIG, then the user config dir)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Which format validator runs for CMIP6 mapfiles
    #[arg(long, value_enum)]
    pub validator: Option<ValidatorVariant>,

    /// What to do when the autocurator or external PrePARE exits non-zero
    #[arg(long, value_enum)]
    pub tool_failures: Option<ToolFailurePolicy>,

    /// Dataset version handed to the metadata update
    #[arg(long, value_enum)]
    pub update_input: Option<DatasetSelection>,

    /// Dataset version handed to the publication test
    #[arg(long, value_enum)]
    pub test_input: Option<DatasetSelection>,
}
