//! Reproducible random projections of gradients to a lower dimension.

mod basic;
mod blocked;
mod builder;
mod no_op;
mod proj_type;
mod sketch;

pub use basic::BasicProjector;
pub use blocked::BlockProjector;
pub use builder::ProjectorBuilder;
pub use no_op::NoOpProjector;
pub use proj_type::ProjectionType;

use std::fmt::Debug;

use ndarray::{Array2, ArrayView2};

use crate::{Result, TrakErr};

/// A fixed linear map from `grad_dim` to `proj_dim` dimensions.
pub trait Projector: Send + Sync + Debug {
    fn grad_dim(&self) -> usize;

    fn proj_dim(&self) -> usize;

    /// Projects every row of `grads` independently.
    ///
    /// # Arguments
    /// * `grads` - A `(B, grad_dim)` matrix, `B` may be zero.
    ///
    /// # Returns
    /// The `(B, proj_dim)` projections, or a `ShapeMismatch` if `grads` has the wrong width.
    fn project(&self, grads: ArrayView2<f32>) -> Result<Array2<f32>>;
}

fn check_grads<P: Projector + ?Sized>(projector: &P, grads: &ArrayView2<f32>) -> Result<()> {
    if grads.ncols() != projector.grad_dim() {
        return Err(TrakErr::ShapeMismatch {
            what: "gradient columns",
            got: grads.ncols(),
            expected: projector.grad_dim(),
        });
    }

    Ok(())
}
