use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::model::IpRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub source_file: String,
    pub total_ips: usize,
    pub successful: usize,
    pub failed: usize,
    /// Set when the run was stopped before every address was checked
    #[serde(default)]
    pub interrupted: bool,
    pub generated_at: DateTime<Utc>,
    pub api_key_used: bool,
}

/// On-disk form of a checker run, keyed by address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsFile {
    pub metadata: RunMetadata,
    pub results: BTreeMap<String, IpRecord>,
}

impl ResultsFile {
    pub fn new(source_file: &Path, total_ips: usize, records: &[IpRecord], api_key_used: bool) -> Self {
        let successful = records.iter().filter(|r| r.is_resolved()).count();
        let failed = records.len() - successful;

        ResultsFile {
            metadata: RunMetadata {
                source_file: source_file.display().to_string(),
                total_ips,
                successful,
                failed,
                interrupted: records.len() < total_ips,
                generated_at: Utc::now(),
                api_key_used,
            },
            results: records.iter().map(|r| (r.ip.clone(), r.clone())).collect(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize results")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
        info!(path = %path.display(), records = self.results.len(), "Results saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read results file {}", path.display()))?;
        let file: ResultsFile = serde_json::from_str(&content)
            .with_context(|| format!("Invalid results JSON in {}", path.display()))?;
        info!(path = %path.display(), records = file.results.len(), "Loaded results");
        Ok(file)
    }

    pub fn records(&self) -> Vec<IpRecord> {
        self.results.values().cloned().collect()
    }
}
