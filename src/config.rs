//! Run configuration.
//!
//! `PublishConfig` is the optional collaborator config file; `RunConfig` is the
//! fully resolved view (CLI flags layered over the file) built once per
//! process and borrowed by every stage.
use crate::cli::PublishArgs;
use crate::preflight::check_replica_flags;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;
pub const CONFIG_ENV_VAR: &str = "ESGPUB_CONFIG";
const USER_CONFIG_REL: &str = "esgpublish/config.json";
const DEFAULT_PREPARE_COMMAND: &str = "PrePARE";

/// Which CMIP6 format validator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorVariant {
    /// Control-vocabulary check against the CMOR tables, per mapfile record.
    #[default]
    Internal,
    /// One `PrePARE` process per raw mapfile line.
    External,
}

/// Reaction to a non-zero exit from the autocurator or external PrePARE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ToolFailurePolicy {
    /// Log a warning and keep going.
    #[default]
    Warn,
    /// Abort the pipeline.
    Fail,
}

/// Dataset version handed to a downstream stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DatasetSelection {
    /// Most recent version: PID output on CMIP6 runs, assembly output otherwise.
    Latest,
    /// Assembly output, before PID citation.
    Assembled,
}

/// External commands backing each collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollaboratorCommands {
    pub convert: String,
    pub assemble: String,
    pub pid_cite: String,
    pub update: String,
    pub pub_test: String,
}

impl Default for CollaboratorCommands {
    fn default() -> Self {
        Self {
            convert: "esgmapconv".to_string(),
            assemble: "esgmkpubrec".to_string(),
            pid_cite: "esgpidcitepub".to_string(),
            update: "esgupdate".to_string(),
            pub_test: "esgpubtest".to_string(),
        }
    }
}

/// On-disk collaborator config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishConfig {
    pub schema_version: u32,
    #[serde(default)]
    pub commands: CollaboratorCommands,
    #[serde(default = "default_prepare_command")]
    pub prepare_command: String,
    #[serde(default)]
    pub validator: ValidatorVariant,
    #[serde(default)]
    pub tool_failures: ToolFailurePolicy,
    #[serde(default = "default_update_input")]
    pub update_input: DatasetSelection,
    #[serde(default = "default_test_input")]
    pub test_input: DatasetSelection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curator_wrapper: Option<String>,
    /// Directory for autocurator scan files; the system temp dir when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_dir: Option<PathBuf>,
}

fn default_prepare_command() -> String {
    DEFAULT_PREPARE_COMMAND.to_string()
}

fn default_update_input() -> DatasetSelection {
    DatasetSelection::Latest
}

fn default_test_input() -> DatasetSelection {
    DatasetSelection::Assembled
}

/// Config used when no file is found.
pub fn default_config() -> PublishConfig {
    PublishConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        commands: CollaboratorCommands::default(),
        prepare_command: default_prepare_command(),
        validator: ValidatorVariant::default(),
        tool_failures: ToolFailurePolicy::default(),
        update_input: default_update_input(),
        test_input: default_test_input(),
        curator_wrapper: None,
        scan_dir: None,
    }
}

/// Where the collaborator config comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named by `--config` or `ESGPUB_CONFIG`; must exist.
    Required(PathBuf),
    /// Found in the user config dir.
    Discovered(PathBuf),
    Builtin,
}

pub fn config_source(
    explicit: Option<&Path>,
    env_value: Option<OsString>,
    user_config_dir: Option<PathBuf>,
) -> ConfigSource {
    if let Some(path) = explicit {
        return ConfigSource::Required(path.to_path_buf());
    }
    if let Some(value) = env_value.filter(|value| !value.is_empty()) {
        return ConfigSource::Required(PathBuf::from(value));
    }
    user_config_dir
        .map(|dir| dir.join(USER_CONFIG_REL))
        .filter(|path| path.is_file())
        .map(ConfigSource::Discovered)
        .unwrap_or(ConfigSource::Builtin)
}

pub fn load_config(source: &ConfigSource) -> Result<PublishConfig> {
    let path = match source {
        ConfigSource::Required(path) | ConfigSource::Discovered(path) => path,
        ConfigSource::Builtin => return Ok(default_config()),
    };
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: PublishConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(config)
}

pub fn validate_config(config: &PublishConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    let commands = [
        ("commands.convert", &config.commands.convert),
        ("commands.assemble", &config.commands.assemble),
        ("commands.pid_cite", &config.commands.pid_cite),
        ("commands.update", &config.commands.update),
        ("commands.pub_test", &config.commands.pub_test),
        ("prepare_command", &config.prepare_command),
    ];
    for (label, command) in commands {
        if command.trim().is_empty() {
            return Err(anyhow!("{label} must be non-empty"));
        }
        shell_words::split(command).with_context(|| format!("parse {label}: {command}"))?;
    }
    if let Some(wrapper) = config.curator_wrapper.as_deref() {
        let words = shell_words::split(wrapper)
            .with_context(|| format!("parse curator_wrapper: {wrapper}"))?;
        if words.is_empty() {
            return Err(anyhow!("curator_wrapper must be non-empty when set"));
        }
    }
    Ok(())
}

/// Settings collaborators need to talk to the federation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishSettings {
    pub data_node: String,
    pub index_node: String,
    pub certificate: PathBuf,
    pub replica: bool,
    pub test: bool,
}

/// Fully resolved configuration for one process.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// `--map` as given: a mapfile or a list of mapfiles.
    pub map: PathBuf,
    pub autocurator: PathBuf,
    pub json_override: Option<PathBuf>,
    pub cmor_tables: PathBuf,
    pub project_override: Option<String>,
    pub settings: PublishSettings,
    pub validator: ValidatorVariant,
    pub tool_failures: ToolFailurePolicy,
    pub update_input: DatasetSelection,
    pub test_input: DatasetSelection,
    pub commands: CollaboratorCommands,
    pub prepare_command: String,
    pub curator_wrapper: Option<String>,
    pub scan_dir: PathBuf,
}

impl RunConfig {
    /// Layer CLI flags over the collaborator config.
    ///
    /// Fails on contradictory replica flags before anything else is looked at.
    pub fn resolve(args: &PublishArgs, config: PublishConfig) -> Result<Self> {
        check_replica_flags(args.set_replica, args.no_replica)?;
        validate_config(&config)?;

        let project_override = Some(args.project.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Ok(Self {
            map: args.map.clone(),
            autocurator: args.autocurator.clone(),
            json_override: args.json.clone(),
            cmor_tables: args.cmor_tables.clone(),
            project_override,
            settings: PublishSettings {
                data_node: args.data_node.clone(),
                index_node: args.index_node.clone(),
                certificate: args.certificate.clone(),
                replica: args.set_replica,
                test: args.test,
            },
            validator: args.validator.unwrap_or(config.validator),
            tool_failures: args.tool_failures.unwrap_or(config.tool_failures),
            update_input: args.update_input.unwrap_or(config.update_input),
            test_input: args.test_input.unwrap_or(config.test_input),
            commands: config.commands,
            prepare_command: config.prepare_command,
            curator_wrapper: config.curator_wrapper,
            scan_dir: config.scan_dir.unwrap_or_else(std::env::temp_dir),
        })
    }

    /// Files that must be readable before a pipeline run starts.
    pub fn input_files(&self, mapfile: &Path) -> Vec<PathBuf> {
        let mut files = vec![mapfile.to_path_buf()];
        if let Some(json) = &self.json_override {
            files.push(json.clone());
        }
        files
    }
}
