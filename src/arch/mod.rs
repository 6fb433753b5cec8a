mod builder;
mod init;
pub mod layers;
mod model;
mod params;
mod sequential;

pub use crate::autograd::Unary as ActFn;
pub use builder::ModelBuilder;
pub use init::RandWeightGen;
pub use model::{ForwardCtx, Model};
pub use params::bind_params;
pub use sequential::Sequential;
