//! Tunable heuristics for the analyzers.
//!
//! None of these constants has a principled derivation; they are thresholds
//! that worked on real schemas. Every field has a default, so a config file
//! only needs the keys it overrides:
//!
//! ```yaml
//! coupling_threshold: 25
//! large_table_rows: 50000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File name looked up in the working directory when no config path is given.
pub const CONFIG_FILE_NAME: &str = ".dbgraph.yaml";

/// Default combined fan-in/fan-out at which a node is flagged as a god object.
pub const DEFAULT_COUPLING_THRESHOLD: usize = 15;

/// Default largest component size still reported as an isolated group.
pub const DEFAULT_ISOLATED_GROUP_MAX_SIZE: usize = 2;

/// Default row count above which cascade warnings quote the table size.
pub const DEFAULT_LARGE_TABLE_ROWS: u64 = 1000;

/// Default impact depth from which a view dependency counts as indirect coupling.
pub const DEFAULT_VIEW_COUPLING_MIN_DEPTH: usize = 2;

/// Thresholds used by the topology, coupling, and impact analyzers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Total degree (`in + out`) at or above which a node is flagged.
    pub coupling_threshold: usize,
    /// Components with at most this many nodes are reported as islands.
    pub isolated_group_max_size: usize,
    /// Cascade warnings include the row estimate above this many rows.
    pub large_table_rows: u64,
    /// View dependencies reached at this depth or deeper are warned about.
    pub view_coupling_min_depth: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            coupling_threshold: DEFAULT_COUPLING_THRESHOLD,
            isolated_group_max_size: DEFAULT_ISOLATED_GROUP_MAX_SIZE,
            large_table_rows: DEFAULT_LARGE_TABLE_ROWS,
            view_coupling_min_depth: DEFAULT_VIEW_COUPLING_MIN_DEPTH,
        }
    }
}

impl AnalysisConfig {
    /// Parse and validate a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Yaml`] for malformed YAML and [`Error::Config`] if
    /// validation fails.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise the
    /// errors of [`AnalysisConfig::from_yaml`].
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config = Self::from_yaml(&yaml)?;
        tracing::debug!(path = %path.display(), ?config, "Loaded analysis config");
        Ok(config)
    }

    /// Load `.dbgraph.yaml` from `dir` if it exists, otherwise use defaults.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`AnalysisConfig::load`] when the file exists.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            tracing::debug!(dir = %dir.display(), "No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Reject values that would make an analyzer meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `coupling_threshold` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.coupling_threshold == 0 {
            return Err(Error::Config(
                "coupling_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
