use ndarray::{Array2, ArrayView2};
use rand::{SeedableRng, rngs::StdRng};

use super::bind_params;
use crate::{
    Result,
    autograd::{Graph, NodeId},
};

/// The state threaded through a forward pass.
#[derive(Debug, Clone)]
pub struct ForwardCtx {
    rng: StdRng,
    train: bool,
}

impl ForwardCtx {
    /// Creates a new `ForwardCtx`.
    ///
    /// # Arguments
    /// * `seed` - The seed for stochastic layers.
    /// * `train` - Whether stochastic layers (dropout) are active.
    pub fn new(seed: u64, train: bool) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            train,
        }
    }

    /// A deterministic context with every stochastic layer disabled.
    pub fn eval() -> Self {
        Self::new(0, false)
    }

    pub fn is_train(&self) -> bool {
        self.train
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

/// A differentiable model.
///
/// The model owns a flat parameter vector and describes how it splits into ordered
/// parameter tensors. Forward passes never read the parameters directly: they receive
/// graph nodes bound to a copy of them, so the gradient can be taken with respect to
/// those nodes without touching the live model.
pub trait Model: Sync {
    /// Returns the shape of every parameter tensor, in flattening order.
    fn param_shapes(&self) -> Vec<(usize, usize)>;

    /// Returns every parameter flattened into a single vector.
    fn params(&self) -> &[f32];

    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize {
        self.params().len()
    }

    /// Records a forward pass on `graph`.
    ///
    /// # Arguments
    /// * `graph` - The graph to record on.
    /// * `params` - One node per parameter tensor, following `param_shapes`.
    /// * `x` - The `(B, d_in)` input node.
    /// * `ctx` - The forward context.
    ///
    /// # Returns
    /// The `(B, d_out)` output node.
    fn forward(
        &self,
        graph: &mut Graph,
        params: &[NodeId],
        x: NodeId,
        ctx: &mut ForwardCtx,
    ) -> Result<NodeId>;

    /// Whether each sample's output depends only on that sample, which the functional
    /// extraction strategy requires.
    fn supports_functional(&self) -> bool {
        true
    }

    /// Evaluates the model without tracking any gradient.
    ///
    /// # Arguments
    /// * `x` - The `(B, d_in)` input.
    /// * `ctx` - The forward context.
    ///
    /// # Returns
    /// The `(B, d_out)` output.
    fn predict(&self, x: ArrayView2<f32>, ctx: &mut ForwardCtx) -> Result<Array2<f32>> {
        let mut graph = Graph::new();
        let params = bind_params(&mut graph, &self.param_shapes(), self.params(), false)?;
        let x = graph.constant(x.to_owned());
        let out = self.forward(&mut graph, &params, x, ctx)?;
        Ok(graph.value(out).to_owned())
    }
}
