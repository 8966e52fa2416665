//! Artifact store: one JSON file ("slot") per task under a directory.
//!
//! Writes are atomic: serialize to a uniquely named temporary sibling, fsync,
//! then rename over the slot. A reader sees either the previous artifact or
//! the new one, and concurrent writers of one slot never share a temp file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;

use crate::dataset::Task;
use crate::pipeline::FittedPipeline;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("no artifact at {0}")]
    NotFound(PathBuf),

    #[error("artifact I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("artifact {path} could not be (de)serialized: {reason}")]
    Serialization { path: PathBuf, reason: String },

    #[error("artifact {path} holds a {found} pipeline, expected {expected}")]
    TaskMismatch {
        path: PathBuf,
        expected: Task,
        found: Task,
    },
}

/// File name of a task's slot.
pub fn slot_file(task: Task) -> &'static str {
    match task {
        Task::Regression => "lr_model.json",
        Task::Classification => "lgr_model.json",
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slot_path(&self, task: Task) -> PathBuf {
        self.dir.join(slot_file(task))
    }

    /// Write the pipeline into its task's slot, replacing any previous one.
    pub fn save(&self, pipeline: &FittedPipeline) -> Result<PathBuf, ArtifactError> {
        let path = self.slot_path(pipeline.task());
        let bytes =
            serde_json::to_vec_pretty(pipeline).map_err(|e| ArtifactError::Serialization {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        fs::create_dir_all(&self.dir).map_err(|source| ArtifactError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|source| ArtifactError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let tmp_path = tmp.path().to_path_buf();
        tmp.write_all(&bytes)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|source| ArtifactError::Io {
                path: tmp_path,
                source,
            })?;
        // A failed persist drops the temp file, which deletes it.
        tmp.persist(&path).map_err(|e| ArtifactError::Io {
            path: path.clone(),
            source: e.error,
        })?;

        info!(
            path = %path.display(),
            task = %pipeline.task(),
            bytes = bytes.len(),
            "artifact written"
        );
        Ok(path)
    }

    /// Read the pipeline stored in the task's slot.
    pub fn load(&self, task: Task) -> Result<FittedPipeline, ArtifactError> {
        let path = self.slot_path(task);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound(path))
            }
            Err(source) => return Err(ArtifactError::Io { path, source }),
        };

        let pipeline: FittedPipeline =
            serde_json::from_slice(&bytes).map_err(|e| ArtifactError::Serialization {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        if pipeline.task() != task {
            return Err(ArtifactError::TaskMismatch {
                path,
                expected: task,
                found: pipeline.task(),
            });
        }
        Ok(pipeline)
    }
}
