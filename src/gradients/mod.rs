//! Per-sample gradients of a model output with respect to every model parameter.

mod extractor;
mod functional;
mod iterative;
mod mode;

pub use extractor::Extractor;
pub use functional::Functional;
pub use iterative::Iterative;
pub use mode::ExtractionMode;

use ndarray::Array2;

use crate::{
    Result, TrakErr,
    arch::Model,
    autograd::{Graph, NodeId},
    dataset::Batch,
    output::ModelOutput,
};

/// A strategy for computing per-sample gradients.
pub trait GradientExtractor {
    /// Computes the gradient of every sample's output.
    ///
    /// # Arguments
    /// * `model` - The model, its parameters are never modified.
    /// * `out_fn` - The per-sample output being differentiated.
    /// * `batch` - The `B` samples.
    ///
    /// # Returns
    /// A `(B, grad_dim)` matrix whose row `i` is the flattened gradient of sample `i`.
    ///
    /// # Errors
    /// `UnsupportedMode` if the strategy can't run here, `ShapeMismatch` if the output
    /// function doesn't yield one value per sample.
    fn extract<M, O>(&self, model: &M, out_fn: &O, batch: Batch<'_>) -> Result<Array2<f32>>
    where
        M: Model + ?Sized,
        O: ModelOutput + ?Sized;
}

/// Records `out_fn` on `graph` and checks it yields a `(B, 1)` node.
fn checked_output<O: ModelOutput + ?Sized>(
    graph: &mut Graph,
    out_fn: &O,
    raw_out: NodeId,
    batch: Batch<'_>,
) -> Result<NodeId> {
    let out = out_fn.output(graph, raw_out, batch.y())?;
    let (rows, cols) = graph.dim(out);

    if cols != 1 {
        return Err(TrakErr::ShapeMismatch {
            what: "outputs per sample",
            got: cols,
            expected: 1,
        });
    }

    if rows != batch.len() {
        return Err(TrakErr::ShapeMismatch {
            what: "output rows",
            got: rows,
            expected: batch.len(),
        });
    }

    Ok(out)
}
