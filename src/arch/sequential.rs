use rand::{SeedableRng, rngs::StdRng};

use super::{ForwardCtx, Model, RandWeightGen, layers::Layer};
use crate::{
    Result, TrakErr,
    autograd::{Graph, NodeId},
};

/// A sequential model: every layer feeds the next one.
///
/// The parameters of all layers live in a single flat vector, laid out layer after layer,
/// weights before biases, each tensor row-major.
#[derive(Debug, Clone)]
pub struct Sequential {
    layers: Vec<Layer>,
    params: Vec<f32>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    /// * `params` - The flattened parameters of every layer.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if the amount of parameters doesn't match the layers.
    pub fn new<I>(layers: I, params: Vec<f32>) -> Result<Self>
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<_> = layers.into_iter().collect();
        let expected: usize = layers.iter().map(Layer::size).sum();

        if params.len() != expected {
            return Err(TrakErr::ShapeMismatch {
                what: "sequential parameters",
                got: params.len(),
                expected,
            });
        }

        Ok(Self { layers, params })
    }

    /// Creates a new `Sequential` with Xavier normal weights and zeroed biases.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    /// * `seed` - The seed for the weight initialization.
    pub fn seeded<I>(layers: I, seed: u64) -> Result<Self>
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<_> = layers.into_iter().collect();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut params = Vec::new();

        for layer in &layers {
            let Layer::Dense(dense) = layer else {
                continue;
            };

            let (fan_in, fan_out) = dense.dim();
            let mut weight_gen = RandWeightGen::xavier(fan_in * fan_out, fan_in, fan_out)?;
            if let Some(weights) = weight_gen.sample(&mut rng, fan_in * fan_out) {
                params.extend(weights);
            }

            params.extend(std::iter::repeat_n(0., fan_out));
        }

        Self::new(layers, params)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
}

impl Model for Sequential {
    fn param_shapes(&self) -> Vec<(usize, usize)> {
        self.layers.iter().flat_map(Layer::param_shapes).collect()
    }

    fn params(&self) -> &[f32] {
        &self.params
    }

    fn forward(
        &self,
        graph: &mut Graph,
        mut params: &[NodeId],
        mut x: NodeId,
        ctx: &mut ForwardCtx,
    ) -> Result<NodeId> {
        for layer in &self.layers {
            x = layer.forward(graph, &mut params, x, ctx)?;
        }

        if !params.is_empty() {
            return Err(TrakErr::ShapeMismatch {
                what: "unused parameter tensors",
                got: params.len(),
                expected: 0,
            });
        }

        Ok(x)
    }
}
