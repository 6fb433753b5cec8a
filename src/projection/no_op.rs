use ndarray::{Array2, ArrayView2};

use super::{Projector, check_grads};
use crate::{GradDtype, Result};

/// The identity map, only rounding to the working dtype.
#[derive(Debug, Clone)]
pub struct NoOpProjector {
    dim: usize,
    dtype: GradDtype,
}

impl NoOpProjector {
    pub fn new(dim: usize, dtype: GradDtype) -> Self {
        Self { dim, dtype }
    }
}

impl Projector for NoOpProjector {
    fn grad_dim(&self) -> usize {
        self.dim
    }

    fn proj_dim(&self) -> usize {
        self.dim
    }

    fn project(&self, grads: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_grads(self, &grads)?;
        Ok(self.dtype.quantize_array(grads))
    }
}
