//! The per-sample table of projected gradients.

mod feature_store;
mod shared;
mod table;

pub use feature_store::FeatureStore;
pub use shared::SharedStore;
