//! Result store: one JSON file per pipeline run.
//!
//! Each run is saved as `{RESULTS_DIR}/{uuid}.json`. Files are never updated
//! in place; a result is either present or deleted.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use prospect_common::{PipelineResult, ProspectError};
use tempfile::NamedTempFile;
use tracing::{info, warn};
use uuid::Uuid;

pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Persist under a fresh id. Written to a temp file first, then renamed.
    pub fn save(&self, result: &PipelineResult) -> Result<Uuid, ProspectError> {
        fs::create_dir_all(&self.dir)?;
        let id = Uuid::new_v4();
        let path = self.path(id);

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, result)?;
        tmp.flush()?;
        tmp.persist(&path)
            .map_err(|e| ProspectError::Store(format!("{}: {}", path.display(), e.error)))?;

        info!(%id, profiles = result.len(), path = %path.display(), "Result saved");
        Ok(id)
    }

    /// `None` when no result exists under `id`.
    pub fn load(&self, id: Uuid) -> Result<Option<PipelineResult>, ProspectError> {
        let json = match fs::read_to_string(self.path(id)) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Remove a result. Deleting something already gone is not an error.
    pub fn delete(&self, id: Uuid) -> Result<bool, ProspectError> {
        match fs::remove_file(self.path(id)) {
            Ok(()) => {
                info!(%id, "Result deleted");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Ids of every stored result, sorted.
    pub fn list(&self) -> Result<Vec<Uuid>, ProspectError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()).map(Uuid::parse_str) {
                Some(Ok(id)) => ids.push(id),
                _ => warn!(path = %path.display(), "Ignoring non-result file"),
            }
        }
        ids.sort();
        Ok(ids)
    }
}
