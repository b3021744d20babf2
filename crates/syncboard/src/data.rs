//! JSON data file backing the CLI's in-memory stores.
//!
//! The file holds raw wire records per kind. It is read once at startup
//! and written back after a mutating command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use syncboard_core::{AdditionalTask, Deviation, MemoryRemote, Project, Remotes};

use crate::error::CliError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct DataFile {
    #[serde(default)]
    projects: Vec<serde_json::Value>,
    #[serde(default)]
    deviations: Vec<serde_json::Value>,
    #[serde(default)]
    additional_tasks: Vec<serde_json::Value>,
}

/// The three in-memory stores and the file they persist to.
pub struct LocalStore {
    path: PathBuf,
    projects: Arc<MemoryRemote<Project>>,
    deviations: Arc<MemoryRemote<Deviation>>,
    additional_tasks: Arc<MemoryRemote<AdditionalTask>>,
}

impl LocalStore {
    /// Read `path`. A missing file is an empty store.
    pub fn open(path: &Path) -> Result<Self, CliError> {
        let data = match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| data_error(path, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no data file yet; starting empty");
                DataFile::default()
            }
            Err(e) => return Err(data_error(path, e)),
        };

        Ok(Self {
            path: path.to_path_buf(),
            projects: Arc::new(
                MemoryRemote::from_records(data.projects).map_err(|e| data_error(path, e))?,
            ),
            deviations: Arc::new(
                MemoryRemote::from_records(data.deviations).map_err(|e| data_error(path, e))?,
            ),
            additional_tasks: Arc::new(
                MemoryRemote::from_records(data.additional_tasks)
                    .map_err(|e| data_error(path, e))?,
            ),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remotes(&self) -> Remotes {
        Remotes {
            projects: self.projects.clone(),
            deviations: self.deviations.clone(),
            additional_tasks: self.additional_tasks.clone(),
        }
    }

    /// Write every store back to the file, replacing it atomically.
    pub async fn save(&self) -> Result<(), CliError> {
        let data = DataFile {
            projects: self.projects.records().await,
            deviations: self.deviations.records().await,
            additional_tasks: self.additional_tasks.records().await,
        };
        let text = serde_json::to_string_pretty(&data)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "data file written");
        Ok(())
    }
}

fn data_error(path: &Path, source: impl std::error::Error + Send + Sync + 'static) -> CliError {
    CliError::DataFile {
        path: path.display().to_string(),
        source: Box::new(source),
    }
}
