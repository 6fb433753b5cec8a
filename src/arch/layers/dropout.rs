use ndarray::Array2;
use rand_distr::{Bernoulli, Distribution};

use crate::{
    Result, TrakErr,
    arch::ForwardCtx,
    autograd::{Graph, NodeId},
};

/// Inverted dropout: while training, zeroes each activation with probability `p` and
/// scales the survivors by `1 / (1 - p)`. It's the identity otherwise.
#[derive(Debug, Clone)]
pub struct Dropout {
    p: f32,
    keep: Bernoulli,
}

impl Dropout {
    /// Creates a new `Dropout` layer.
    ///
    /// # Arguments
    /// * `p` - The drop probability, in `[0, 1)`.
    ///
    /// # Returns
    /// A `Config` error if `p` is out of range.
    pub fn new(p: f32) -> Result<Self> {
        if !(0.0..1.0).contains(&p) {
            return Err(TrakErr::Config(format!(
                "dropout probability must be in [0, 1), got {p}"
            )));
        }

        let keep = Bernoulli::new(1. - p as f64).map_err(|e| TrakErr::Config(e.to_string()))?;
        Ok(Self { p, keep })
    }

    pub fn p(&self) -> f32 {
        self.p
    }

    pub fn forward(&self, graph: &mut Graph, x: NodeId, ctx: &mut ForwardCtx) -> Result<NodeId> {
        if !ctx.is_train() || self.p == 0. {
            return Ok(x);
        }

        let scale = 1. / (1. - self.p);
        let rng = ctx.rng();
        let mask = Array2::from_shape_simple_fn(graph.dim(x), || {
            if self.keep.sample(rng) { scale } else { 0. }
        });

        graph.mask(x, mask)
    }
}
