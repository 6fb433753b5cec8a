use std::{fs, num::NonZeroUsize, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};

use crate::{GradDtype, Result, TrakErr, projection::ProjectionType};

/// Which projector implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectorSpec {
    /// Materializes the whole projection matrix once.
    #[default]
    Basic,
    /// Regenerates `block_size` columns of the matrix at a time on every call.
    Blocked { block_size: NonZeroUsize },
    /// The identity, for when no compression is wanted.
    NoOp,
}

/// Where the computation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    #[default]
    Cpu,
}

/// Whether the samples of a batch share the forward pass randomness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Randomness {
    /// Every sample sees the same random stream.
    Same,
    /// Every sample gets its own random stream.
    #[default]
    Different,
}

/// The construction time configuration of a featurization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrakSpec {
    /// The width of every projected gradient.
    pub proj_dim: usize,
    pub projector: ProjectorSpec,
    pub proj_type: ProjectionType,
    pub proj_seed: u64,
    /// Where a persistence layer should write results, unused by the featurizer itself.
    pub save_dir: PathBuf,
    pub device: Device,
    /// The amount of rows in the feature store.
    pub train_set_size: usize,
    pub grad_dtype: GradDtype,
    pub randomness: Randomness,
    /// The seed for stochastic layers during gradient extraction.
    pub forward_seed: u64,
    /// Whether stochastic layers are active during gradient extraction.
    pub train_mode: bool,
    /// Whether to reject projections holding a NaN or an infinity.
    pub check_finite: bool,
}

impl Default for TrakSpec {
    fn default() -> Self {
        Self {
            proj_dim: 10,
            projector: ProjectorSpec::default(),
            proj_type: ProjectionType::default(),
            proj_seed: 0,
            save_dir: PathBuf::from("./trak_results"),
            device: Device::default(),
            train_set_size: 1,
            grad_dtype: GradDtype::default(),
            randomness: Randomness::default(),
            forward_seed: 0,
            train_mode: false,
            check_finite: true,
        }
    }
}

impl TrakSpec {
    /// Parses and validates a `TrakSpec` from json.
    ///
    /// # Errors
    /// A `Config` error if the json is malformed or the configuration is invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: Self = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Reads, parses and validates a `TrakSpec` from a json file.
    ///
    /// # Errors
    /// An `Io` error if the file can't be read, a `Config` error otherwise.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Checks the dimensions are usable.
    pub fn validate(&self) -> Result<()> {
        if self.proj_dim == 0 {
            return Err(TrakErr::Config("proj_dim must be at least 1".into()));
        }

        if self.train_set_size == 0 {
            return Err(TrakErr::Config("train_set_size must be at least 1".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_takes_defaults() {
        let spec = TrakSpec::from_json("{}").unwrap();
        assert_eq!(spec, TrakSpec::default());
        assert_eq!(spec.proj_dim, 10);
        assert_eq!(spec.grad_dtype, GradDtype::F16);
        assert_eq!(spec.save_dir, PathBuf::from("./trak_results"));
        assert!(spec.check_finite);
    }

    #[test]
    fn parses_every_field() {
        let json = r#"{
            "proj_dim": 20,
            "projector": { "blocked": { "block_size": 4 } },
            "proj_type": "rademacher",
            "proj_seed": 7,
            "train_set_size": 5,
            "grad_dtype": "f32",
            "randomness": "same",
            "train_mode": true,
            "check_finite": false
        }"#;

        let spec = TrakSpec::from_json(json).unwrap();

        assert_eq!(spec.proj_dim, 20);
        assert_eq!(
            spec.projector,
            ProjectorSpec::Blocked {
                block_size: NonZeroUsize::new(4).unwrap()
            }
        );
        assert_eq!(spec.proj_type, ProjectionType::Rademacher);
        assert_eq!(spec.proj_seed, 7);
        assert_eq!(spec.grad_dtype, GradDtype::F32);
        assert_eq!(spec.randomness, Randomness::Same);
        assert!(spec.train_mode);
        assert!(!spec.check_finite);
    }

    #[test]
    fn unknown_projection_type_is_config_error() {
        let err = TrakSpec::from_json(r#"{ "proj_type": "gaussian" }"#).unwrap_err();
        assert!(matches!(err, TrakErr::Config(_)));
    }

    #[test]
    fn zero_proj_dim_is_config_error() {
        let err = TrakSpec::from_json(r#"{ "proj_dim": 0 }"#).unwrap_err();
        assert!(matches!(err, TrakErr::Config(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = TrakSpec::from_path("does/not/exist.json").unwrap_err();
        assert!(matches!(err, TrakErr::Io(_)));
    }
}
