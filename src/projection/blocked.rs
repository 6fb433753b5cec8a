use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayView2, s};

use super::{ProjectionType, Projector, check_grads, sketch::Sketch};
use crate::{GradDtype, Result, autograd::matmul};

/// Projects regenerating the matrix `block_size` columns at a time, so at most
/// `grad_dim * block_size` entries live in memory at once.
///
/// Yields the same map as a [`BasicProjector`](super::BasicProjector) built with the same
/// seed.
#[derive(Debug, Clone)]
pub struct BlockProjector {
    sketch: Sketch,
    block_size: NonZeroUsize,
}

impl BlockProjector {
    /// Creates a new `BlockProjector`.
    ///
    /// # Arguments
    /// * `seed` - The seed the whole matrix derives from.
    /// * `grad_dim` - The width of the gradients to project.
    /// * `proj_dim` - The width of the projections.
    /// * `proj_type` - The distribution of the matrix entries.
    /// * `dtype` - The working precision.
    /// * `block_size` - The amount of columns generated at a time.
    pub fn new(
        seed: u64,
        grad_dim: usize,
        proj_dim: usize,
        proj_type: ProjectionType,
        dtype: GradDtype,
        block_size: NonZeroUsize,
    ) -> Self {
        Self {
            sketch: Sketch::new(seed, grad_dim, proj_dim, proj_type, dtype),
            block_size,
        }
    }
}

impl Projector for BlockProjector {
    fn grad_dim(&self) -> usize {
        self.sketch.grad_dim()
    }

    fn proj_dim(&self) -> usize {
        self.sketch.proj_dim()
    }

    fn project(&self, grads: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_grads(self, &grads)?;

        let proj_dim = self.proj_dim();
        let mut acc = Array2::zeros((grads.nrows(), proj_dim));
        if grads.nrows() == 0 {
            return Ok(acc);
        }

        let grads = self.sketch.prepare(grads);

        for start in (0..proj_dim).step_by(self.block_size.get()) {
            let end = (start + self.block_size.get()).min(proj_dim);
            let block = self.sketch.columns(start..end);

            acc.slice_mut(s![.., start..end])
                .assign(&matmul(&grads.view(), &block.view()));
        }

        Ok(self.sketch.finish(acc))
    }
}
