use ndarray::Array2;

use super::{ExtractionMode, GradientExtractor, functional, iterative};
use crate::{Result, arch::Model, dataset::Batch, output::ModelOutput, specs::TrakSpec};

/// Every gradient extraction strategy.
#[derive(Debug, Clone, Copy)]
pub enum Extractor {
    Functional(functional::Functional),
    Iterative(iterative::Iterative),
}

impl Extractor {
    /// Creates the extractor for `mode` with the forward pass settings of `spec`.
    pub fn from_spec(mode: ExtractionMode, spec: &TrakSpec) -> Self {
        match mode {
            ExtractionMode::Functional => Self::Functional(functional::Functional::new(
                spec.randomness,
                spec.forward_seed,
                spec.train_mode,
            )),
            ExtractionMode::Iterative => Self::Iterative(iterative::Iterative::new(
                spec.forward_seed,
                spec.train_mode,
            )),
        }
    }

    pub fn mode(&self) -> ExtractionMode {
        match self {
            Self::Functional(_) => ExtractionMode::Functional,
            Self::Iterative(_) => ExtractionMode::Iterative,
        }
    }
}

impl GradientExtractor for Extractor {
    fn extract<M, O>(&self, model: &M, out_fn: &O, batch: Batch<'_>) -> Result<Array2<f32>>
    where
        M: Model + ?Sized,
        O: ModelOutput + ?Sized,
    {
        match self {
            Self::Functional(e) => e.extract(model, out_fn, batch),
            Self::Iterative(e) => e.extract(model, out_fn, batch),
        }
    }
}
