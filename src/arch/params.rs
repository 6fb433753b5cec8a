use ndarray::Array2;

use crate::{
    Result, TrakErr,
    autograd::{Graph, NodeId},
};

/// Splits a flat parameter vector into its tensors and adds each one to `graph`.
///
/// The values are copied, the graph never aliases the model's parameters.
///
/// # Arguments
/// * `graph` - The graph to add the parameters to.
/// * `shapes` - The shape of every tensor, in flattening order.
/// * `flat` - The flattened parameters.
/// * `track` - Whether the gradient with respect to the parameters is needed.
///
/// # Returns
/// One node per tensor, or a `ShapeMismatch` if `flat` doesn't hold exactly the
/// parameters `shapes` describe.
pub fn bind_params(
    graph: &mut Graph,
    shapes: &[(usize, usize)],
    flat: &[f32],
    track: bool,
) -> Result<Vec<NodeId>> {
    let expected: usize = shapes.iter().map(|(r, c)| r * c).sum();
    if flat.len() != expected {
        return Err(TrakErr::ShapeMismatch {
            what: "model parameters",
            got: flat.len(),
            expected,
        });
    }

    let mut rest = flat;
    let mut nodes = Vec::with_capacity(shapes.len());

    for &shape in shapes {
        let (chunk, tail) = rest.split_at(shape.0 * shape.1);
        rest = tail;

        let value = Array2::from_shape_vec(shape, chunk.to_vec())?;
        let node = if track {
            graph.leaf(value)
        } else {
            graph.constant(value)
        };

        nodes.push(node);
    }

    Ok(nodes)
}
