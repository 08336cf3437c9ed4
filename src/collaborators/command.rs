//! Collaborators backed by a configured command.
//!
//! The request is written to the command's stdin as JSON; the response, where
//! the stage has one, is read from stdout as JSON. A non-zero exit is a stage
//! failure carrying the command's stderr.
use super::{DatasetAssembler, MapfileConverter, MetadataUpdater, PidRegistrar, PublicationTester};
use crate::config::PublishSettings;
use crate::dataset::DatasetDescription;
use crate::mapfile::MapfileRecord;
use crate::project::Project;
use crate::tool::{split_command, stderr_trim};
use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Instant;

#[derive(Serialize)]
struct ConvertRequest<'a> {
    mapfile: &'a Path,
    project: &'a str,
}

#[derive(Serialize)]
struct AssembleRequest<'a> {
    records: &'a [MapfileRecord],
    scan_file: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    json_override: Option<&'a Path>,
}

#[derive(Serialize)]
struct DatasetRequest<'a> {
    dataset: &'a DatasetDescription,
    project: &'a str,
    settings: &'a PublishSettings,
}

#[derive(Debug, Clone)]
pub struct CommandCollaborator {
    label: &'static str,
    command: String,
}

impl CommandCollaborator {
    pub fn new(label: &'static str, command: &str) -> Self {
        Self {
            label,
            command: command.to_string(),
        }
    }

    fn invoke<T: Serialize>(&self, request: &T) -> Result<Vec<u8>> {
        let label = self.label;
        let (program, args) = split_command(&self.command)
            .with_context(|| format!("resolve {label} command"))?;
        let payload =
            serde_json::to_vec(request).with_context(|| format!("serialize {label} request"))?;

        let start = Instant::now();
        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn {label} command: {}", program.display()))?;

        // Stdin is fed from a thread so a large request cannot deadlock
        // against a full stdout pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            let payload = payload.clone();
            thread::spawn(move || stdin.write_all(&payload))
        });

        let output = child
            .wait_with_output()
            .with_context(|| format!("wait for {label} command"))?;
        let elapsed_ms = start.elapsed().as_millis();

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // The command may legitimately exit without reading its request.
                Ok(Err(err)) if err.kind() == ErrorKind::BrokenPipe => {}
                Ok(Err(err)) => {
                    return Err(err).with_context(|| format!("write {label} request to stdin"))
                }
                Err(_) => return Err(anyhow!("{label} stdin writer panicked")),
            }
        }

        tracing::info!(
            collaborator = label,
            elapsed_ms,
            request_bytes = payload.len(),
            response_bytes = output.stdout.len(),
            "collaborator invoke complete"
        );

        if !output.status.success() {
            return Err(anyhow!(
                "{label} command failed with status {}: {}",
                output.status,
                stderr_trim(&output)
            ));
        }
        Ok(output.stdout)
    }

    fn invoke_json<T: Serialize, R: DeserializeOwned>(&self, request: &T) -> Result<R> {
        let stdout = self.invoke(request)?;
        serde_json::from_slice(&stdout)
            .with_context(|| format!("parse {} output as JSON", self.label))
    }
}

impl MapfileConverter for CommandCollaborator {
    fn convert(&self, mapfile: &Path, project: &str) -> Result<Vec<MapfileRecord>> {
        self.invoke_json(&ConvertRequest { mapfile, project })
    }
}

impl DatasetAssembler for CommandCollaborator {
    fn assemble(
        &self,
        records: &[MapfileRecord],
        scan_file: &Path,
        json_override: Option<&Path>,
    ) -> Result<DatasetDescription> {
        self.invoke_json(&AssembleRequest {
            records,
            scan_file,
            json_override,
        })
    }
}

impl PidRegistrar for CommandCollaborator {
    fn cite(
        &self,
        dataset: &DatasetDescription,
        project: &Project,
        settings: &PublishSettings,
    ) -> Result<DatasetDescription> {
        self.invoke_json(&DatasetRequest {
            dataset,
            project: &project.id,
            settings,
        })
    }
}

impl MetadataUpdater for CommandCollaborator {
    fn update(
        &self,
        dataset: &DatasetDescription,
        project: &Project,
        settings: &PublishSettings,
    ) -> Result<()> {
        self.invoke(&DatasetRequest {
            dataset,
            project: &project.id,
            settings,
        })
        .map(drop)
    }
}

impl PublicationTester for CommandCollaborator {
    fn pub_test(
        &self,
        dataset: &DatasetDescription,
        project: &Project,
        settings: &PublishSettings,
    ) -> Result<()> {
        self.invoke(&DatasetRequest {
            dataset,
            project: &project.id,
            settings,
        })
        .map(drop)
    }
}
