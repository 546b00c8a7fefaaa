// ⚙️ Engine Configuration - Defaults as data
// Loaded from a JSON file; every field is optional in the file.

use crate::graph::EdgeWeighting;
use anyhow::{bail, Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rank cutoff for ranked queries when no `limit` filter is given (None = all rows)
    pub default_top_n: Option<usize>,

    /// HAVING threshold for location/industry stats when no `min_count` filter is given
    pub min_companies_per_group: u64,

    /// Highest pitch position reported when no `max_position` filter is given
    pub max_pitch_position: usize,

    /// Rows in the valuation chart
    pub valuation_chart_limit: usize,

    /// How collaboration graph edges are weighted
    pub edge_weighting: EdgeWeighting,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            default_top_n: None,
            min_companies_per_group: 2,
            max_pitch_position: 5,
            valuation_chart_limit: 10,
            edge_weighting: EdgeWeighting::SharedInvestments,
        }
    }
}

impl EngineConfig {
    /// Load config from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: EngineConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.validate()?;

        Ok(config)
    }

    /// Reject settings a query could never satisfy
    pub fn validate(&self) -> Result<()> {
        if self.default_top_n == Some(0) {
            bail!("default_top_n must be at least 1 (omit it to return all rows)");
        }
        if self.min_companies_per_group == 0 {
            bail!("min_companies_per_group must be at least 1");
        }
        if self.max_pitch_position == 0 {
            bail!("max_pitch_position must be at least 1");
        }
        if self.valuation_chart_limit == 0 {
            bail!("valuation_chart_limit must be at least 1");
        }
        Ok(())
    }

    /// Load config if the file exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) if p.as_ref().exists() => Self::from_file(p),
            Some(p) => {
                debug!(path = ?p.as_ref(), "config file not found, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }
}
