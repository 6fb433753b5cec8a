use ndarray::{Array2, ArrayView2};

use super::{ProjectionType, Projector, check_grads, sketch::Sketch};
use crate::{GradDtype, Result, autograd::matmul};

/// Projects with a matrix materialized once at construction.
#[derive(Debug, Clone)]
pub struct BasicProjector {
    sketch: Sketch,
    matrix: Array2<f32>,
}

impl BasicProjector {
    /// Creates a new `BasicProjector`.
    ///
    /// # Arguments
    /// * `seed` - The seed the whole matrix derives from.
    /// * `grad_dim` - The width of the gradients to project.
    /// * `proj_dim` - The width of the projections.
    /// * `proj_type` - The distribution of the matrix entries.
    /// * `dtype` - The working precision.
    pub fn new(
        seed: u64,
        grad_dim: usize,
        proj_dim: usize,
        proj_type: ProjectionType,
        dtype: GradDtype,
    ) -> Self {
        let sketch = Sketch::new(seed, grad_dim, proj_dim, proj_type, dtype);
        let matrix = sketch.columns(0..proj_dim);
        Self { sketch, matrix }
    }
}

impl Projector for BasicProjector {
    fn grad_dim(&self) -> usize {
        self.sketch.grad_dim()
    }

    fn proj_dim(&self) -> usize {
        self.sketch.proj_dim()
    }

    fn project(&self, grads: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_grads(self, &grads)?;

        let grads = self.sketch.prepare(grads);
        let acc = matmul(&grads.view(), &self.matrix.view());
        Ok(self.sketch.finish(acc))
    }
}
