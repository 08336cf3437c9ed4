//! Top-level publish command: resolve configuration once, then run the
//! pipeline for every mapfile named by `--map`.
use crate::cli::PublishArgs;
use crate::collaborators::Collaborators;
use crate::config::{config_source, load_config, RunConfig, CONFIG_ENV_VAR};
use crate::mapfile::expand_targets;
use crate::pipeline::run_pipeline;
use anyhow::Result;
use std::env;
use std::path::PathBuf;

pub fn run_publish(args: &PublishArgs) -> Result<()> {
    let source = config_source(
        args.config.as_deref(),
        env::var_os(CONFIG_ENV_VAR),
        dirs::config_dir(),
    );
    tracing::debug!(?source, "collaborator config source");
    let config = RunConfig::resolve(args, load_config(&source)?)?;
    let collaborators = Collaborators::from_config(&config);
    let targets = expand_targets(&config.map)?;
    publish_all(&targets, &config, &collaborators)
}

/// Run mapfiles one after another; the first failure ends the whole batch.
pub fn publish_all(
    targets: &[PathBuf],
    config: &RunConfig,
    collaborators: &Collaborators,
) -> Result<()> {
    for (index, mapfile) in targets.iter().enumerate() {
        tracing::info!(
            mapfile = %mapfile.display(),
            index,
            total = targets.len(),
            "publishing mapfile"
        );
        run_pipeline(mapfile, config, collaborators)?;
    }
    Ok(())
}
