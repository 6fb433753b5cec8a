//! Reverse-mode automatic differentiation over dense 2-D tensors.
//!
//! A [`Graph`] records every operation of a forward pass in creation order, which
//! is also a topological order. [`Graph::backward`] sweeps it in reverse and never
//! mutates the graph, so it can be run once per sample over the same forward pass.

mod adjoints;
mod graph;
mod op;

pub use adjoints::Adjoints;
pub use graph::{Graph, NodeId};
pub use op::Unary;

use ndarray::{Array2, ArrayView2, linalg};

/// Computes `a @ b`.
///
/// Shapes must already be compatible.
pub(crate) fn matmul(a: &ArrayView2<f32>, b: &ArrayView2<f32>) -> Array2<f32> {
    let mut c = Array2::zeros((a.nrows(), b.ncols()));

    if a.ncols() > 0 && !c.is_empty() {
        linalg::general_mat_mul(1.0, a, b, 0.0, &mut c);
    }

    c
}
