//! Serde specifications for configuring a featurization run.

mod machine_learning;
mod run;
mod trak;

pub use machine_learning::{ActFnSpec, DatasetSpec, LayerSpec, ModelSpec, OutputSpec};
pub use run::RunSpec;
pub use trak::{Device, ProjectorSpec, Randomness, TrakSpec};
