use log::debug;
use ndarray::Array2;

use super::{GradientExtractor, checked_output};
use crate::{
    Result,
    arch::{ForwardCtx, Model, bind_params},
    autograd::Graph,
    dataset::Batch,
    output::ModelOutput,
};

/// Runs a single forward pass over the whole batch and then one reverse sweep per sample,
/// each seeded with that sample's one-hot vector, over the same retained graph.
#[derive(Debug, Clone, Copy)]
pub struct Iterative {
    seed: u64,
    train: bool,
}

impl Iterative {
    /// Creates a new `Iterative` extractor.
    ///
    /// # Arguments
    /// * `seed` - The seed of the forward pass.
    /// * `train` - Whether stochastic layers are active.
    pub fn new(seed: u64, train: bool) -> Self {
        Self { seed, train }
    }
}

impl GradientExtractor for Iterative {
    fn extract<M, O>(&self, model: &M, out_fn: &O, batch: Batch<'_>) -> Result<Array2<f32>>
    where
        M: Model + ?Sized,
        O: ModelOutput + ?Sized,
    {
        let rows = batch.len();
        let mut grads = Array2::zeros((rows, model.size()));
        if rows == 0 {
            return Ok(grads);
        }

        debug!(batch = rows, grad_dim = model.size(); "extracting gradients iteratively");

        let shapes = model.param_shapes();
        let mut graph = Graph::new();
        let mut ctx = ForwardCtx::new(self.seed, self.train);

        let params = bind_params(&mut graph, &shapes, model.params(), true)?;
        let x = graph.constant(batch.x().to_owned());
        let raw_out = model.forward(&mut graph, &params, x, &mut ctx)?;
        let out = checked_output(&mut graph, out_fn, raw_out, batch)?;

        for (i, row) in grads.rows_mut().into_iter().enumerate() {
            let mut seed = Array2::zeros((rows, 1));
            seed[[i, 0]] = 1.;

            let adjoints = graph.backward(out, seed)?;
            adjoints.flatten_into(&params, &shapes, row)?;
        }

        Ok(grads)
    }
}
