use crate::{
    Result, TrakErr,
    arch::{ActFn, ForwardCtx},
    autograd::{Graph, NodeId},
};

/// A fully connected layer `act_fn(x @ W + b)`.
///
/// Owns two parameter tensors: the `(dim_in, dim_out)` weights and the `(1, dim_out)`
/// biases, in that order.
#[derive(Debug, Clone)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The `(input, output)` dimensions.
    /// * `act_fn` - An optional activation applied to the weighted sums.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self { dim, act_fn }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        (self.dim.0 + 1) * self.dim.1
    }

    pub fn param_shapes(&self) -> [(usize, usize); 2] {
        [self.dim, (1, self.dim.1)]
    }

    /// Records the layer's forward pass, consuming its two parameter nodes from the front
    /// of `params`.
    pub fn forward(
        &self,
        graph: &mut Graph,
        params: &mut &[NodeId],
        x: NodeId,
        _ctx: &mut ForwardCtx,
    ) -> Result<NodeId> {
        if params.len() < 2 {
            return Err(TrakErr::ShapeMismatch {
                what: "dense parameter tensors",
                got: params.len(),
                expected: 2,
            });
        }

        let (w, b) = (params[0], params[1]);
        *params = &params[2..];

        let z = graph.matmul(x, w)?;
        let z = graph.add_row(z, b)?;

        let Some(act_fn) = self.act_fn else {
            return Ok(z);
        };

        Ok(graph.map(z, act_fn))
    }
}
