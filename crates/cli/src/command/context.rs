use crate::config::{FctConfig, LoadedConfig};
use crate::session::Session;
use anyhow::{Context as AnyhowContext, Result};
use fct_lineage::InMemoryLabStore;
use fct_protocol::{RequestOptions, ResponseMeta};
use std::fs;
use std::path::{Path, PathBuf};

/// Where one request reads its inputs from.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    config: LoadedConfig,
    lab: Option<PathBuf>,
    session: Option<PathBuf>,
}

impl CommandContext {
    pub fn new(config: LoadedConfig, lab: Option<PathBuf>, session: Option<PathBuf>) -> Self {
        Self {
            config,
            lab,
            session,
        }
    }

    /// Request options take precedence over the front end's flags.
    pub fn with_options(mut self, options: Option<RequestOptions>) -> Self {
        if let Some(options) = options {
            if let Some(lab) = options.lab {
                self.lab = Some(PathBuf::from(lab));
            }
            if let Some(session) = options.session {
                self.session = Some(PathBuf::from(session));
            }
        }
        self
    }

    pub fn config(&self) -> &FctConfig {
        &self.config.config
    }

    pub fn lab_store(&self) -> Result<InMemoryLabStore> {
        let path = self
            .lab
            .as_deref()
            .context("Lab snapshot not specified")?;
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read lab snapshot {}", path.display()))?;
        let store = InMemoryLabStore::from_json_str(&raw)
            .with_context(|| format!("Invalid JSON in lab snapshot {}", path.display()))?;
        log::debug!(
            "Loaded {} vessels and {} batches from {}",
            store.vessel_count(),
            store.batch_count(),
            path.display()
        );
        Ok(store)
    }

    pub fn session_path(&self) -> Result<&Path> {
        self.session.as_deref().context("Session file not specified")
    }

    pub fn load_session(&self) -> Result<Session> {
        Session::load(self.session_path()?)
    }

    pub fn save_session(&self, session: &Session) -> Result<()> {
        session.save(self.session_path()?)
    }

    pub fn base_meta(&self) -> ResponseMeta {
        ResponseMeta {
            config_path: self
                .config
                .path
                .as_ref()
                .map(|p| p.display().to_string()),
            session_path: self.session.as_ref().map(|p| p.display().to_string()),
            ..ResponseMeta::default()
        }
    }
}
