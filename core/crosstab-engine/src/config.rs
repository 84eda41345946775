//! FILENAME: core/crosstab-engine/src/config.rs
//! Engine Configuration - tuning knobs for background counting.
//!
//! The defaults match interactive use: a read unit never holds the store for
//! much longer than the time slice, and a "not ready yet" view is retried
//! after about a second.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CrossTabError, CrossTabResult};

fn default_time_slice_ms() -> u64 {
    300
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

/// Configuration shared by every computation a `CountingTable` starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Wall-clock budget of one Building read unit.
    #[serde(default = "default_time_slice_ms")]
    pub time_slice_ms: u64,

    /// Delay used by `CountingTable::reschedule_default` after a Retry.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Run the matrix fill on tokio's blocking pool instead of inline in the
    /// computation task.
    #[serde(default = "default_true")]
    pub matrix_on_blocking_pool: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            time_slice_ms: default_time_slice_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            matrix_on_blocking_pool: true,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> CrossTabResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CrossTabResult<()> {
        if self.time_slice_ms == 0 {
            return Err(CrossTabError::InvalidConfig(
                "time_slice_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn time_slice(&self) -> Duration {
        Duration::from_millis(self.time_slice_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
