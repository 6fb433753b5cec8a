//! The quantities being differentiated, and their link to the training loss.

mod labels;
mod margin;
mod output_fn;
mod regression;

pub use margin::ClassificationMargin;
pub use output_fn::OutputFn;
pub use regression::Regression;

use ndarray::{Array1, ArrayView2};

use crate::{
    Result,
    autograd::{Graph, NodeId},
};

/// The scalar per-sample output whose gradient gets featurized.
pub trait ModelOutput: Sync {
    /// Records the output of every sample on `graph`.
    ///
    /// # Arguments
    /// * `graph` - The graph the model's forward pass was recorded on.
    /// * `raw_out` - The `(B, d_out)` node the model returned.
    /// * `y` - The `(B, y_size)` targets of the batch.
    ///
    /// # Returns
    /// A `(B, 1)` node, one output per sample.
    fn output(&self, graph: &mut Graph, raw_out: NodeId, y: ArrayView2<f32>) -> Result<NodeId>;
}

/// Maps raw model outputs to the per-sample derivative of the loss with respect to the
/// output of [`ModelOutput`].
pub trait OutToLoss: Sync {
    /// # Arguments
    /// * `raw_out` - The `(B, d_out)` model outputs.
    /// * `y` - The `(B, y_size)` targets of the batch.
    ///
    /// # Returns
    /// One value per sample.
    fn out_to_loss(&self, raw_out: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<Array1<f32>>;
}
