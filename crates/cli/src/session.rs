use anyhow::{Context as AnyhowContext, Result};
use fct_allocation::InMemoryTicketing;
use fct_designation::InMemoryDesignationStore;
use fct_model::DesignationRecord;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// State carried between CLI invocations: the working set shown to the
/// planner, the designation store and the ticketing stand-in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Session {
    #[serde(default)]
    pub records: Vec<DesignationRecord>,
    #[serde(default)]
    pub store: InMemoryDesignationStore,
    #[serde(default)]
    pub ticketing: InMemoryTicketing,
}

impl Session {
    /// Loads the session at `path`, or an empty one when the file does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Starting new session at {}", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse session {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, raw).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to write session {}", path.display()))?;
        log::debug!(
            "Saved session with {} working records, {} stored",
            self.records.len(),
            self.store.len()
        );
        Ok(())
    }
}
