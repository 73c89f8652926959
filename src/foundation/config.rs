use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context;

use crate::foundation::{
    error::{IngestError, IngestResult},
    selector::SelectorMode,
};

/// Runtime configuration for the ingestion pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Worker count for the thread pool; `None` uses the available parallelism.
    pub worker_threads: Option<usize>,
    /// How channel selectors given on the command line are interpreted.
    pub selector_mode: SelectorMode,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
}

impl IngestConfig {
    /// Read a JSON config file.
    pub fn from_json_file(path: &Path) -> IngestResult<Self> {
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| IngestError::config(format!("parse '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the pool cannot honor.
    pub fn validate(&self) -> IngestResult<()> {
        if self.worker_threads == Some(0) {
            return Err(IngestError::config("'worker_threads' must be >= 1 when set"));
        }
        Ok(())
    }

    /// Worker count after resolving the default.
    pub fn resolved_worker_threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
