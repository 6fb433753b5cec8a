use std::{fs, num::NonZeroUsize, path::Path};

use serde::{Deserialize, Serialize};

use super::{DatasetSpec, ModelSpec, OutputSpec, TrakSpec};
use crate::{Result, gradients::ExtractionMode};

/// Everything the `trak-featurize` binary needs for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSpec {
    #[serde(default)]
    pub trak: TrakSpec,
    pub model: ModelSpec,
    pub dataset: DatasetSpec,
    #[serde(default)]
    pub output: OutputSpec,
    pub batch_size: NonZeroUsize,
    #[serde(default)]
    pub mode: ExtractionMode,
    /// The seed for the model's weight initialization.
    #[serde(default)]
    pub param_seed: u64,
}

impl RunSpec {
    /// Reads, parses and validates a `RunSpec` from a json file.
    ///
    /// # Errors
    /// An `Io` error if the file can't be read, a `Config` error otherwise.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let spec: Self = serde_json::from_str(&json)?;
        spec.trak.validate()?;
        Ok(spec)
    }
}
