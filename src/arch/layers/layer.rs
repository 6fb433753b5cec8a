use super::{Dense, Dropout};
use crate::{
    Result,
    arch::{ActFn, ForwardCtx},
    autograd::{Graph, NodeId},
};

#[derive(Debug, Clone)]
pub enum Layer {
    Dense(Dense),
    Dropout(Dropout),
}
use Layer::*;

impl Layer {
    pub fn dense(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self::Dense(Dense::new(dim, act_fn))
    }

    pub fn dropout(p: f32) -> Result<Self> {
        Ok(Self::Dropout(Dropout::new(p)?))
    }

    /// Returns the amount of parameters this layer owns.
    pub fn size(&self) -> usize {
        match self {
            Dense(l) => l.size(),
            Dropout(_) => 0,
        }
    }

    pub fn param_shapes(&self) -> Vec<(usize, usize)> {
        match self {
            Dense(l) => l.param_shapes().to_vec(),
            Dropout(_) => Vec::new(),
        }
    }

    pub fn forward(
        &self,
        graph: &mut Graph,
        params: &mut &[NodeId],
        x: NodeId,
        ctx: &mut ForwardCtx,
    ) -> Result<NodeId> {
        match self {
            Dense(l) => l.forward(graph, params, x, ctx),
            Dropout(l) => l.forward(graph, x, ctx),
        }
    }
}
