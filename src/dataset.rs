//! Dataset descriptions passed between the assembly, citation, update and test stages.
use crate::config::DatasetSelection;
use serde::{Deserialize, Serialize};

/// Dataset description produced by the assembler; contents are collaborator-owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetDescription(pub serde_json::Value);

/// Dataset versions kept through one pipeline run.
#[derive(Debug, Clone)]
pub struct DatasetVersions {
    assembled: DatasetDescription,
    cited: Option<DatasetDescription>,
}

impl DatasetVersions {
    pub fn new(assembled: DatasetDescription) -> Self {
        Self {
            assembled,
            cited: None,
        }
    }

    pub fn assembled(&self) -> &DatasetDescription {
        &self.assembled
    }

    pub fn record_citation(&mut self, cited: DatasetDescription) {
        self.cited = Some(cited);
    }

    pub fn latest(&self) -> &DatasetDescription {
        self.cited.as_ref().unwrap_or(&self.assembled)
    }

    pub fn select(&self, selection: DatasetSelection) -> &DatasetDescription {
        match selection {
            DatasetSelection::Latest => self.latest(),
            DatasetSelection::Assembled => self.assembled(),
        }
    }
}
