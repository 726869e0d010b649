use anyhow::{Context as AnyhowContext, Result};
use fct_allocation::{AllocationConfig, DEFAULT_MAX_FLOWCELLS_PER_REQUEST};
use fct_lineage::{BatchCache, NeverInvalidate};
use fct_model::{FlowcellType, LabEventType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "FCT_CONFIG";

/// One hundred years.
const MAX_WINDOW_DAYS: u32 = 36_500;

/// Planner settings read from TOML.
///
/// ```toml
/// [designation]
/// loading_events = ["denature_transfer", "pooling_transfer"]
/// window_days = 30
///
/// [allocation]
/// partial_flowcells = false
/// lane_capacity = { hi_seq4000 = 4 }
/// max_flowcells_per_request = 8
///
/// [cache]
/// batch_capacity = 128
/// ttl_seconds = 0   # never expire
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FctConfig {
    #[serde(default)]
    pub designation: DesignationSettings,
    #[serde(default)]
    pub allocation: AllocationSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesignationSettings {
    /// Event kinds that make a tube a loading tube
    #[serde(default = "default_loading_events")]
    pub loading_events: Vec<LabEventType>,

    /// Length of the trailing event window, ending now
    #[serde(default = "default_window_days")]
    pub window_days: u32,
}

fn default_loading_events() -> Vec<LabEventType> {
    LabEventType::LOADING.to_vec()
}

fn default_window_days() -> u32 {
    60
}

impl Default for DesignationSettings {
    fn default() -> Self {
        Self {
            loading_events: default_loading_events(),
            window_days: default_window_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllocationSettings {
    #[serde(default = "default_true")]
    pub partial_flowcells: bool,

    /// Lane count overrides keyed by flowcell type name
    #[serde(default)]
    pub lane_capacity: BTreeMap<String, u32>,

    /// Designations asking for more flowcells than this are left queued
    #[serde(default = "default_max_flowcells_per_request")]
    pub max_flowcells_per_request: u32,
}

fn default_true() -> bool {
    true
}

fn default_max_flowcells_per_request() -> u32 {
    DEFAULT_MAX_FLOWCELLS_PER_REQUEST
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self {
            partial_flowcells: true,
            lane_capacity: BTreeMap::new(),
            max_flowcells_per_request: default_max_flowcells_per_request(),
        }
    }
}

impl AllocationSettings {
    pub fn engine_config(&self) -> Result<AllocationConfig> {
        let mut lane_capacity = BTreeMap::new();
        for (name, lanes) in &self.lane_capacity {
            let flowcell_type: FlowcellType = name
                .parse()
                .with_context(|| format!("Invalid config key allocation.lane_capacity.{name}"))?;
            lane_capacity.insert(flowcell_type, *lanes);
        }
        if self.max_flowcells_per_request == 0 {
            anyhow::bail!(
                "Invalid config value in allocation.max_flowcells_per_request: must be positive"
            );
        }
        let config = AllocationConfig {
            partial_flowcells: self.partial_flowcells,
            lane_capacity,
            max_flowcells_per_request: self.max_flowcells_per_request,
        };
        config
            .validate()
            .context("Invalid config value in allocation.lane_capacity")?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    #[serde(default = "default_batch_capacity")]
    pub batch_capacity: usize,

    /// Zero keeps cached batches for the life of the process
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

fn default_batch_capacity() -> usize {
    64
}

fn default_ttl_seconds() -> u64 {
    300
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            batch_capacity: default_batch_capacity(),
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

impl CacheSettings {
    pub fn batch_cache(&self) -> Result<BatchCache> {
        let cache = if self.ttl_seconds == 0 {
            BatchCache::new(self.batch_capacity, Box::new(NeverInvalidate))
        } else {
            BatchCache::with_ttl(self.batch_capacity, Duration::from_secs(self.ttl_seconds))
        };
        cache.context("Invalid config value in cache.batch_capacity")
    }
}

/// Config plus the file it came from, if any.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: FctConfig,
    pub path: Option<PathBuf>,
}

impl FctConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: FctConfig = toml::from_str(raw).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.designation.loading_events.is_empty() {
            anyhow::bail!("Invalid config value in designation.loading_events: list is empty");
        }
        if self.designation.window_days == 0 {
            anyhow::bail!("Invalid config value in designation.window_days: must be positive");
        }
        if self.designation.window_days > MAX_WINDOW_DAYS {
            anyhow::bail!(
                "Invalid config value in designation.window_days: at most {MAX_WINDOW_DAYS} days"
            );
        }
        self.allocation.engine_config()?;
        self.cache.batch_cache()?;
        Ok(())
    }

    /// Reads `explicit`, else the file named by `FCT_CONFIG`, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => env::var_os(CONFIG_ENV)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
        };

        let Some(path) = path else {
            log::debug!("No config file given, using defaults");
            return Ok(LoadedConfig::default());
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml_str(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(LoadedConfig {
            config,
            path: Some(path),
        })
    }
}
