use std::sync::Arc;

use ndarray::ArrayView2;
use parking_lot::Mutex;

use super::FeatureStore;
use crate::{Result, traker::Featurized};

/// A cloneable handle to a `FeatureStore` shared by several workers.
///
/// Every write goes through a single lock, so workers featurizing in parallel never
/// interleave half written batches.
#[derive(Debug, Clone)]
pub struct SharedStore(Arc<Mutex<FeatureStore>>);

impl SharedStore {
    /// Creates a new `SharedStore`.
    ///
    /// # Arguments
    /// * `store` - The underlying feature store.
    pub fn new(store: FeatureStore) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }

    /// Locks the store and calls `FeatureStore::record`.
    pub fn record(&self, featurized: &Featurized, inds: &[usize]) -> Result<()> {
        self.0.lock().record(featurized, inds)
    }

    /// Locks the store and calls `FeatureStore::write_rows`.
    pub fn record_rows(&self, rows: ArrayView2<f32>, inds: &[usize]) -> Result<()> {
        self.0.lock().write_rows(rows, inds)
    }

    /// Runs `f` with the store locked.
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&FeatureStore) -> R,
    {
        f(&self.0.lock())
    }

    /// Returns the store if this is the last handle to it, the handle itself otherwise.
    pub fn into_inner(self) -> std::result::Result<FeatureStore, Self> {
        Arc::try_unwrap(self.0)
            .map(Mutex::into_inner)
            .map_err(Self)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use ndarray::array;

    use super::*;
    use crate::GradDtype;

    #[test]
    fn disjoint_writers() {
        let shared = SharedStore::new(FeatureStore::new(8, 2, GradDtype::F32).unwrap());

        thread::scope(|s| {
            for w in 0..4 {
                let shared = shared.clone();
                s.spawn(move || {
                    let v = w as f32;
                    let rows = array![[v, v], [v + 0.5, v + 0.5]];
                    shared.record_rows(rows.view(), &[2 * w, 2 * w + 1]).unwrap();
                });
            }
        });

        let store = shared.into_inner().unwrap();
        assert_eq!(store.num_featurized(), 8);
        assert_eq!(store.row(5).unwrap(), array![2.5f32, 2.5]);
    }

    #[test]
    fn into_inner_needs_last_handle() {
        let shared = SharedStore::new(FeatureStore::new(1, 1, GradDtype::F32).unwrap());
        let other = shared.clone();

        let shared = shared.into_inner().unwrap_err();
        drop(other);

        assert!(shared.into_inner().is_ok());
    }
}
