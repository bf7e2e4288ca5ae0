//! JSON file repository
//!
//! Keeps the whole graph as one JSON snapshot under the data directory.
//! Every commit rewrites the snapshot through a temp file and a rename, so a
//! crash leaves either the old or the new file, never a torn one.

use crate::domain::entities::{Composition, CompositionId};
use crate::domain::errors::RepositoryError;
use crate::ports::outbound::{ChangeSet, CompositionRepository};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Snapshot file name inside the data directory
pub const SNAPSHOT_FILE: &str = "compositions.json";

pub struct JsonFileRepository {
    path: PathBuf,
    data: Mutex<BTreeMap<CompositionId, Composition>>,
}

impl JsonFileRepository {
    /// Open (or create) the snapshot under `data_dir`
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, RepositoryError> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(SNAPSHOT_FILE);

        let data = if path.exists() {
            let bytes = fs::read(&path)?;
            let nodes: Vec<Composition> = serde_json::from_slice(&bytes)?;
            info!(
                "[cs-01] Loaded {} compositions from {}",
                nodes.len(),
                path.display()
            );
            nodes.into_iter().map(|n| (n.id.clone(), n)).collect()
        } else {
            info!("[cs-01] No snapshot at {}, starting empty", path.display());
            BTreeMap::new()
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_snapshot(
        &self,
        data: &BTreeMap<CompositionId, Composition>,
    ) -> Result<(), RepositoryError> {
        let nodes: Vec<&Composition> = data.values().collect();
        let bytes = serde_json::to_vec_pretty(&nodes)?;

        let temp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)?;

        debug!(
            "[cs-01] Wrote snapshot: {} compositions, {} bytes",
            nodes.len(),
            bytes.len()
        );
        Ok(())
    }
}

impl CompositionRepository for JsonFileRepository {
    fn load_all(&self) -> Result<Vec<Composition>, RepositoryError> {
        Ok(self.data.lock().values().cloned().collect())
    }

    fn commit(&self, changes: ChangeSet) -> Result<(), RepositoryError> {
        let mut data = self.data.lock();

        // Stage on a copy so a failed write leaves the cache untouched
        let mut staged = data.clone();
        for id in changes.deletes {
            staged.remove(&id);
        }
        for node in changes.upserts {
            staged.insert(node.id.clone(), node);
        }

        self.write_snapshot(&staged)?;
        *data = staged;
        Ok(())
    }
}
