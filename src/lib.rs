//! Data attribution features: per-sample gradients of a model output, compressed with a
//! reproducible random projection and kept in a per-sample feature store.

pub mod arch;
pub mod autograd;
pub mod dataset;
mod dtype;
mod error;
pub mod gradients;
pub mod output;
pub mod projection;
pub mod specs;
pub mod store;
mod traker;

pub use dtype::GradDtype;
pub use error::{Result, TrakErr};
pub use traker::{Featurized, Featurizer, Traker};
