use ndarray::{Array2, ArrayView2, ArrayViewMut1};

use super::NodeId;
use crate::{Result, TrakErr};

/// The adjoints computed by a reverse sweep over a `Graph`.
#[derive(Debug)]
pub struct Adjoints {
    grads: Vec<Option<Array2<f32>>>,
}

impl Adjoints {
    pub(crate) fn new(grads: Vec<Option<Array2<f32>>>) -> Self {
        Self { grads }
    }

    /// Returns the adjoint of `id`, `None` if the root doesn't depend on it.
    pub fn get(&self, id: NodeId) -> Option<ArrayView2<'_, f32>> {
        self.grads.get(id.0)?.as_ref().map(|g| g.view())
    }

    /// Writes the adjoints of `nodes` one after the other into `out`, nodes the root doesn't
    /// depend on contribute zeros.
    ///
    /// # Arguments
    /// * `nodes` - The nodes to flatten, in order.
    /// * `dims` - The shape of each node.
    /// * `out` - The destination, as long as all the nodes together.
    ///
    /// # Errors
    /// A `ShapeMismatch` if `out` has the wrong length.
    pub fn flatten_into(
        &self,
        nodes: &[NodeId],
        dims: &[(usize, usize)],
        mut out: ArrayViewMut1<f32>,
    ) -> Result<()> {
        let total: usize = dims.iter().map(|(r, c)| r * c).sum();
        if out.len() != total {
            return Err(TrakErr::ShapeMismatch {
                what: "flattened gradient",
                got: out.len(),
                expected: total,
            });
        }

        let mut offset = 0;
        for (&id, &(rows, cols)) in nodes.iter().zip(dims) {
            let size = rows * cols;
            let mut chunk = out.slice_mut(ndarray::s![offset..offset + size]);

            match self.get(id) {
                Some(g) => chunk
                    .iter_mut()
                    .zip(g.iter())
                    .for_each(|(dst, &src)| *dst = src),
                None => chunk.fill(0.),
            }

            offset += size;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::Graph;
    use ndarray::{Array1, array};

    #[test]
    fn flatten_is_row_major_and_zero_fills() {
        let mut graph = Graph::new();
        let x = graph.constant(array![[1., 2.]]);
        let w = graph.leaf(array![[1., 0., 0.], [0., 1., 0.]]);
        let unused = graph.leaf(array![[7.]]);
        let out = graph.matmul(x, w).unwrap();

        let adj = graph.backward(out, array![[1., 2., 3.]]).unwrap();
        let mut flat = Array1::from_elem(7, -1.);
        adj.flatten_into(&[w, unused], &[(2, 3), (1, 1)], flat.view_mut())
            .unwrap();

        assert_eq!(flat, array![1f32, 2., 3., 2., 4., 6., 0.]);
    }

    #[test]
    fn flatten_checks_length() {
        let adj = Adjoints::new(vec![]);
        let mut flat = Array1::zeros(3);

        assert!(adj.flatten_into(&[], &[(2, 2)], flat.view_mut()).is_err());
    }
}
