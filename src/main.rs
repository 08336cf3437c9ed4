use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod collaborators;
mod config;
mod curation;
mod dataset;
mod mapfile;
mod pipeline;
mod preflight;
mod project;
mod tool;
mod validate;
mod workflow;

use cli::PublishArgs;

const LOG_ENV_VAR: &str = "ESGPUB_LOG";

fn main() -> ExitCode {
    init_tracing();
    let args = PublishArgs::parse();

    match workflow::run_publish(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
