use std::ops::Range;

use ndarray::{Array2, ArrayView2};
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::ProjectionType;
use crate::GradDtype;

/// The recipe of a random projection matrix.
///
/// Every column owns a seed drawn from the master seed, so any range of columns can be
/// regenerated on its own and always comes out the same.
#[derive(Debug, Clone)]
pub(super) struct Sketch {
    col_seeds: Vec<u64>,
    grad_dim: usize,
    proj_type: ProjectionType,
    dtype: GradDtype,
    scale: f32,
}

impl Sketch {
    pub fn new(
        seed: u64,
        grad_dim: usize,
        proj_dim: usize,
        proj_type: ProjectionType,
        dtype: GradDtype,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let col_seeds = (0..proj_dim).map(|_| rng.random()).collect();

        Self {
            col_seeds,
            grad_dim,
            proj_type,
            dtype,
            scale: 1. / (proj_dim as f32).sqrt(),
        }
    }

    pub fn grad_dim(&self) -> usize {
        self.grad_dim
    }

    pub fn proj_dim(&self) -> usize {
        self.col_seeds.len()
    }

    /// Generates the `(grad_dim, cols.len())` block of the matrix holding `cols`.
    pub fn columns(&self, cols: Range<usize>) -> Array2<f32> {
        let mut block = Array2::zeros((self.grad_dim, cols.len()));

        for (mut col, &seed) in block.columns_mut().into_iter().zip(&self.col_seeds[cols]) {
            let mut rng = StdRng::seed_from_u64(seed);
            col.map_inplace(|v| *v = self.dtype.quantize(self.proj_type.sample(&mut rng)));
        }

        block
    }

    /// Rounds the input gradients to the working dtype.
    pub fn prepare(&self, grads: ArrayView2<f32>) -> Array2<f32> {
        self.dtype.quantize_array(grads)
    }

    /// Scales the accumulated products and rounds them to the working dtype.
    pub fn finish(&self, mut acc: Array2<f32>) -> Array2<f32> {
        let (scale, dtype) = (self.scale, self.dtype);
        acc.mapv_inplace(|v| dtype.quantize(v * scale));
        acc
    }
}
