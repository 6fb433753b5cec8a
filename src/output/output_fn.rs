use ndarray::{Array1, ArrayView2};

use super::{ClassificationMargin, ModelOutput, OutToLoss, Regression};
use crate::{
    Result,
    autograd::{Graph, NodeId},
    specs::OutputSpec,
};

/// Every output function this crate ships with.
#[derive(Debug, Clone, Copy)]
pub enum OutputFn {
    Margin(ClassificationMargin),
    Regression(Regression),
}

impl OutputFn {
    pub fn from_spec(spec: OutputSpec) -> Self {
        match spec {
            OutputSpec::Margin => Self::Margin(ClassificationMargin),
            OutputSpec::Regression => Self::Regression(Regression),
        }
    }
}

impl ModelOutput for OutputFn {
    fn output(&self, graph: &mut Graph, raw_out: NodeId, y: ArrayView2<f32>) -> Result<NodeId> {
        match self {
            Self::Margin(f) => f.output(graph, raw_out, y),
            Self::Regression(f) => f.output(graph, raw_out, y),
        }
    }
}

impl OutToLoss for OutputFn {
    fn out_to_loss(&self, raw_out: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<Array1<f32>> {
        match self {
            Self::Margin(f) => f.out_to_loss(raw_out, y),
            Self::Regression(f) => f.out_to_loss(raw_out, y),
        }
    }
}
