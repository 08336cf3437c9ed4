//! Checks that run before any collaborator is invoked.
use anyhow::{anyhow, Result};
use std::fs::File;
use std::path::PathBuf;

/// Confirm every input file can be opened for reading.
pub fn check_files(files: &[PathBuf]) -> Result<()> {
    for file in files {
        if let Err(err) = File::open(file) {
            return Err(anyhow!("Error opening file {}: {err}", file.display()));
        }
    }
    Ok(())
}

pub fn check_replica_flags(set_replica: bool, no_replica: bool) -> Result<()> {
    if set_replica && no_replica {
        return Err(anyhow!("ERROR: Replica simultaneously set and disabled."));
    }
    Ok(())
}
