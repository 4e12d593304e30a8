//! Baseline storage
//!
//! The baseline manager reads and writes snapshots through the
//! `BaselineStore` trait so it carries no global state. `MemoryStore`
//! keeps each project's snapshots as a JSON blob, the same shape the
//! dashboard keeps in on-device storage.

use crate::error::{AnalyticsError, Result};
use crate::types::{BaselineSnapshot, BaselineStatus};
use std::collections::HashMap;

/// Key-value access to snapshots, keyed by project id
pub trait BaselineStore {
    /// All snapshots for a project, oldest first. Unknown projects yield an empty list.
    fn load(&self, project_id: &str) -> Result<Vec<BaselineSnapshot>>;

    /// Replace the snapshot list for a project
    fn save(&mut self, project_id: &str, baselines: &[BaselineSnapshot]) -> Result<()>;

    /// Projects with stored snapshots
    fn project_ids(&self) -> Vec<String>;
}

/// In-memory store holding serialized snapshot lists.
///
/// Every `load` deserializes a fresh copy, so callers never share
/// task data with the stored snapshot.
#[derive(Default, Debug, Clone)]
pub struct MemoryStore {
    blobs: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw JSON blob for a project, for the host to persist
    pub fn export_json(&self, project_id: &str) -> Option<&str> {
        self.blobs.get(project_id).map(String::as_str)
    }

    /// Load a blob previously produced by `export_json`.
    ///
    /// The blob is parsed first so a malformed one never replaces good data.
    /// Snapshots filed under another project are rejected. When several are
    /// marked active, the last one stays active and the rest are archived.
    pub fn import_json(&mut self, project_id: &str, json: &str) -> Result<usize> {
        let mut baselines: Vec<BaselineSnapshot> = serde_json::from_str(json)?;
        if let Some(stray) = baselines.iter().find(|b| b.project_id != project_id) {
            return Err(AnalyticsError::ProjectMismatch {
                expected: project_id.to_string(),
                found: stray.project_id.clone(),
            });
        }

        let last_active = baselines.iter().rposition(|b| b.status == BaselineStatus::Active);
        for (i, baseline) in baselines.iter_mut().enumerate() {
            if baseline.status == BaselineStatus::Active && Some(i) != last_active {
                tracing::warn!(
                    project = project_id,
                    baseline = %baseline.id,
                    "archiving extra active baseline on import"
                );
                baseline.status = BaselineStatus::Archived;
            }
        }

        self.save(project_id, &baselines)?;
        Ok(baselines.len())
    }

    pub fn clear(&mut self) {
        self.blobs.clear();
    }
}

impl BaselineStore for MemoryStore {
    fn load(&self, project_id: &str) -> Result<Vec<BaselineSnapshot>> {
        match self.blobs.get(project_id) {
            Some(json) => Ok(serde_json::from_str(json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&mut self, project_id: &str, baselines: &[BaselineSnapshot]) -> Result<()> {
        let json = serde_json::to_string(baselines)?;
        self.blobs.insert(project_id.to_string(), json);
        Ok(())
    }

    fn project_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.blobs.keys().cloned().collect();
        ids.sort();
        ids
    }
}
