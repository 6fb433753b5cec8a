use log::debug;
use ndarray::Array2;

use super::GradientExtractor;
use crate::{Result, TrakErr, arch::Model, dataset::Batch, output::ModelOutput, specs::Randomness};

#[cfg(feature = "vectorized")]
use {
    super::checked_output,
    crate::{
        arch::{ForwardCtx, bind_params},
        autograd::Graph,
    },
    ndarray::Array1,
};

/// Computes every per-sample gradient on its own graph, bound to a detached copy of the
/// parameters, evaluating the samples of a batch in parallel.
///
/// Only available with the `vectorized` feature, and only for models whose samples don't
/// interact during the forward pass.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(not(feature = "vectorized"), allow(dead_code))]
pub struct Functional {
    randomness: Randomness,
    seed: u64,
    train: bool,
}

impl Functional {
    /// Creates a new `Functional` extractor.
    ///
    /// # Arguments
    /// * `randomness` - Whether every sample gets its own random stream.
    /// * `seed` - The seed of the forward passes.
    /// * `train` - Whether stochastic layers are active.
    pub fn new(randomness: Randomness, seed: u64, train: bool) -> Self {
        Self {
            randomness,
            seed,
            train,
        }
    }

    #[cfg(feature = "vectorized")]
    fn sample_seed(&self, i: usize) -> u64 {
        match self.randomness {
            Randomness::Same => self.seed,
            Randomness::Different => self
                .seed
                .wrapping_add((i as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)),
        }
    }

    /// Computes the gradient of the output of row `i` of `batch`.
    #[cfg(feature = "vectorized")]
    fn sample_grad<M, O>(
        &self,
        model: &M,
        out_fn: &O,
        batch: Batch<'_>,
        i: usize,
        shapes: &[(usize, usize)],
    ) -> Result<Array1<f32>>
    where
        M: Model + ?Sized,
        O: ModelOutput + ?Sized,
    {
        let sample = batch.sample(i);
        let mut graph = Graph::new();
        let mut ctx = ForwardCtx::new(self.sample_seed(i), self.train);

        let params = bind_params(&mut graph, shapes, model.params(), true)?;
        let x = graph.constant(sample.x().to_owned());
        let raw_out = model.forward(&mut graph, &params, x, &mut ctx)?;
        let out = checked_output(&mut graph, out_fn, raw_out, sample)?;

        let adjoints = graph.backward(out, Array2::ones((1, 1)))?;
        let mut grad = Array1::zeros(model.size());
        adjoints.flatten_into(&params, shapes, grad.view_mut())?;

        Ok(grad)
    }

    #[cfg(feature = "vectorized")]
    fn extract_rows<M, O>(&self, model: &M, out_fn: &O, batch: Batch<'_>) -> Result<Array2<f32>>
    where
        M: Model + ?Sized,
        O: ModelOutput + ?Sized,
    {
        use rayon::prelude::*;

        let shapes = model.param_shapes();
        let rows = (0..batch.len())
            .into_par_iter()
            .map(|i| self.sample_grad(model, out_fn, batch, i, &shapes))
            .collect::<Result<Vec<_>>>()?;

        let mut grads = Array2::zeros((batch.len(), model.size()));
        for (mut dst, row) in grads.rows_mut().into_iter().zip(rows) {
            dst.assign(&row);
        }

        Ok(grads)
    }

    #[cfg(not(feature = "vectorized"))]
    fn extract_rows<M, O>(&self, _model: &M, _out_fn: &O, _batch: Batch<'_>) -> Result<Array2<f32>>
    where
        M: Model + ?Sized,
        O: ModelOutput + ?Sized,
    {
        Err(TrakErr::UnsupportedMode(
            "functional extraction needs the `vectorized` feature".into(),
        ))
    }
}

impl GradientExtractor for Functional {
    fn extract<M, O>(&self, model: &M, out_fn: &O, batch: Batch<'_>) -> Result<Array2<f32>>
    where
        M: Model + ?Sized,
        O: ModelOutput + ?Sized,
    {
        if !model.supports_functional() {
            return Err(TrakErr::UnsupportedMode(
                "the model couples the samples of a batch".into(),
            ));
        }

        if batch.is_empty() {
            return Ok(Array2::zeros((0, model.size())));
        }

        debug!(batch = batch.len(), grad_dim = model.size(); "extracting gradients functionally");
        self.extract_rows(model, out_fn, batch)
    }
}
