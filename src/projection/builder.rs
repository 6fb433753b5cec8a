use log::warn;

use super::{BasicProjector, BlockProjector, NoOpProjector, Projector};
use crate::{
    Result, TrakErr,
    specs::{ProjectorSpec, TrakSpec},
};

/// Builds `Projector`s given a specification.
#[derive(Debug, Default)]
pub struct ProjectorBuilder;

impl ProjectorBuilder {
    /// Creates a new `ProjectorBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new projector following a spec.
    ///
    /// # Arguments
    /// * `spec` - The featurization spec.
    /// * `grad_dim` - The amount of parameters of the model being featurized.
    ///
    /// # Returns
    /// The projector, or a `Config` error if either dimension is zero or a `no_op`
    /// projector would change the width.
    pub fn build(&self, spec: &TrakSpec, grad_dim: usize) -> Result<Box<dyn Projector>> {
        let proj_dim = spec.proj_dim;

        if grad_dim == 0 {
            return Err(TrakErr::Config("the model has no parameters".into()));
        }

        if proj_dim == 0 {
            return Err(TrakErr::Config("proj_dim must be at least 1".into()));
        }

        if proj_dim >= grad_dim && spec.projector != ProjectorSpec::NoOp {
            warn!(
                proj_dim = proj_dim,
                grad_dim = grad_dim;
                "projecting to at least as many dimensions as there are parameters"
            );
        }

        let projector: Box<dyn Projector> = match spec.projector {
            ProjectorSpec::Basic => Box::new(BasicProjector::new(
                spec.proj_seed,
                grad_dim,
                proj_dim,
                spec.proj_type,
                spec.grad_dtype,
            )),
            ProjectorSpec::Blocked { block_size } => Box::new(BlockProjector::new(
                spec.proj_seed,
                grad_dim,
                proj_dim,
                spec.proj_type,
                spec.grad_dtype,
                block_size,
            )),
            ProjectorSpec::NoOp => {
                if proj_dim != grad_dim {
                    return Err(TrakErr::Config(format!(
                        "a no_op projector needs proj_dim == grad_dim, got {proj_dim} and {grad_dim}"
                    )));
                }

                Box::new(NoOpProjector::new(grad_dim, spec.grad_dtype))
            }
        };

        Ok(projector)
    }
}
