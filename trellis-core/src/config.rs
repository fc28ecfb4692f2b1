//! Runtime Configuration
//!
//! A [`RuntimeConfig`] controls how writes propagate and how far a chain of
//! nested runs may go before the runtime refuses to continue. The defaults
//! reproduce plain synchronous, depth-first notification.
//!
//! Configurations can be built in code or loaded from JSON:
//!
//! ```rust
//! use trellis_core::{Propagation, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_json(r#"{ "propagation": "queued", "max_depth": 64 }"#).unwrap();
//! assert_eq!(config.propagation, Propagation::Queued);
//! assert_eq!(config.max_depth, 64);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How a write delivers notifications to its subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Propagation {
    /// Subscribers run immediately, nested inside the write that notified
    /// them. A write performed by a running computation recurses before the
    /// outer write returns.
    #[default]
    Recursive,

    /// Subscribers are pushed onto a worklist. The outermost write drains it
    /// iteratively; writes made while draining only enqueue. Every run still
    /// completes before the outermost write returns.
    Queued,
}

/// Configuration for a [`Runtime`](crate::reactive::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub propagation: Propagation,

    /// Maximum number of computation runs nested inside one another.
    pub max_depth: usize,

    /// Run budget for a single queue flush in [`Propagation::Queued`] mode.
    pub max_queued_runs: usize,

    /// Number of errors retained for [`take_errors`](crate::reactive::Runtime::take_errors).
    /// Oldest entries are dropped first.
    pub diagnostics_capacity: usize,
}

impl RuntimeConfig {
    pub const DEFAULT_MAX_DEPTH: usize = 256;
    pub const DEFAULT_MAX_QUEUED_RUNS: usize = 10_000;
    pub const DEFAULT_DIAGNOSTICS_CAPACITY: usize = 128;

    /// Parse a configuration from a JSON document. Missing fields take
    /// their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_queued_runs(mut self, max_queued_runs: usize) -> Self {
        self.max_queued_runs = max_queued_runs;
        self
    }

    pub fn with_diagnostics_capacity(mut self, capacity: usize) -> Self {
        self.diagnostics_capacity = capacity;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            propagation: Propagation::Recursive,
            max_depth: Self::DEFAULT_MAX_DEPTH,
            max_queued_runs: Self::DEFAULT_MAX_QUEUED_RUNS,
            diagnostics_capacity: Self::DEFAULT_DIAGNOSTICS_CAPACITY,
        }
    }
}
