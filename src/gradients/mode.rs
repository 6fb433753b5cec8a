use serde::{Deserialize, Serialize};

/// How per-sample gradients are computed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// A fresh graph per sample over a detached copy of the parameters, samples evaluated
    /// in parallel.
    Functional,
    /// A single graph over the whole batch, one reverse sweep per sample.
    #[default]
    Iterative,
}
