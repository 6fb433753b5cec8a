use log::trace;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use super::table::Table;
use crate::{GradDtype, Result, TrakErr, traker::Featurized};

/// A `(train_set_size, proj_dim)` table of projected gradients, one row per training
/// sample, plus the latest out-to-loss value of every sample.
///
/// Rows start zeroed and are only ever overwritten, the table never changes shape.
#[derive(Debug, Clone)]
pub struct FeatureStore {
    table: Table,
    dtype: GradDtype,
    out_to_loss: Array1<f32>,
    featurized: Vec<bool>,
}

impl FeatureStore {
    /// Creates a new zeroed `FeatureStore`.
    ///
    /// # Arguments
    /// * `train_set_size` - The amount of rows.
    /// * `proj_dim` - The width of every row.
    /// * `dtype` - The dtype values are stored in.
    ///
    /// # Returns
    /// A `Config` error if either dimension is zero.
    pub fn new(train_set_size: usize, proj_dim: usize, dtype: GradDtype) -> Result<Self> {
        if train_set_size == 0 || proj_dim == 0 {
            return Err(TrakErr::Config(format!(
                "a feature store needs rows and columns, got ({train_set_size}, {proj_dim})"
            )));
        }

        Ok(Self {
            table: Table::zeros((train_set_size, proj_dim), dtype),
            dtype,
            out_to_loss: Array1::zeros(train_set_size),
            featurized: vec![false; train_set_size],
        })
    }

    /// Returns `(train_set_size, proj_dim)`.
    pub fn shape(&self) -> (usize, usize) {
        self.table.dim()
    }

    pub fn len(&self) -> usize {
        self.featurized.len()
    }

    pub fn is_empty(&self) -> bool {
        self.featurized.is_empty()
    }

    pub fn dtype(&self) -> GradDtype {
        self.dtype
    }

    /// Overwrites the rows at `inds` with `rows`, a later repeated index wins.
    ///
    /// # Errors
    /// `ShapeMismatch` or `IndexOutOfBounds`, in which case nothing is written.
    pub fn write_rows(&mut self, rows: ArrayView2<f32>, inds: &[usize]) -> Result<()> {
        self.check_rows(rows, inds)?;

        for (row, &i) in rows.rows().into_iter().zip(inds) {
            self.table.write_row(i, row);
            self.featurized[i] = true;
        }

        trace!(rows = inds.len(); "wrote feature rows");
        Ok(())
    }

    /// Overwrites the out-to-loss values at `inds`.
    ///
    /// # Errors
    /// `ShapeMismatch` or `IndexOutOfBounds`, in which case nothing is written.
    pub fn write_out_to_loss(&mut self, values: ArrayView1<f32>, inds: &[usize]) -> Result<()> {
        self.check_inds(values.len(), inds)?;

        for (&v, &i) in values.iter().zip(inds) {
            self.out_to_loss[i] = v;
        }

        Ok(())
    }

    /// Writes both the projected gradients and the out-to-loss values of a featurized batch.
    ///
    /// Everything is validated before anything gets written.
    pub fn record(&mut self, featurized: &Featurized, inds: &[usize]) -> Result<()> {
        self.check_rows(featurized.projected.view(), inds)?;
        self.check_inds(featurized.out_to_loss.len(), inds)?;

        self.write_rows(featurized.projected.view(), inds)?;
        self.write_out_to_loss(featurized.out_to_loss.view(), inds)
    }

    /// Returns the whole table decoded to `f32`.
    pub fn features(&self) -> Array2<f32> {
        self.table.decode()
    }

    /// Returns row `i` decoded to `f32`.
    pub fn row(&self, i: usize) -> Result<Array1<f32>> {
        self.check_index(i)?;
        Ok(self.table.row(i))
    }

    pub fn out_to_loss(&self) -> ArrayView1<'_, f32> {
        self.out_to_loss.view()
    }

    /// Whether row `i` was ever written, `false` when out of bounds.
    pub fn is_featurized(&self, i: usize) -> bool {
        self.featurized.get(i).copied().unwrap_or(false)
    }

    pub fn num_featurized(&self) -> usize {
        self.featurized.iter().filter(|&&f| f).count()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.len() {
            return Err(TrakErr::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }

        Ok(())
    }

    /// Checks `inds` holds `rows` valid sample indices.
    pub fn check_inds(&self, rows: usize, inds: &[usize]) -> Result<()> {
        if inds.len() != rows {
            return Err(TrakErr::ShapeMismatch {
                what: "sample indices",
                got: inds.len(),
                expected: rows,
            });
        }

        inds.iter().try_for_each(|&i| self.check_index(i))
    }

    fn check_rows(&self, rows: ArrayView2<f32>, inds: &[usize]) -> Result<()> {
        let (_, proj_dim) = self.shape();
        if rows.ncols() != proj_dim {
            return Err(TrakErr::ShapeMismatch {
                what: "feature columns",
                got: rows.ncols(),
                expected: proj_dim,
            });
        }

        self.check_inds(rows.nrows(), inds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn starts_zeroed() {
        let store = FeatureStore::new(4, 3, GradDtype::F16).unwrap();

        assert_eq!(store.shape(), (4, 3));
        assert_eq!(store.features(), Array2::<f32>::zeros((4, 3)));
        assert_eq!(store.num_featurized(), 0);
        assert!(store.out_to_loss().iter().all(|&v| v == 0.));
    }

    #[test]
    fn rejects_empty_shape() {
        assert!(FeatureStore::new(0, 3, GradDtype::F16).is_err());
        assert!(FeatureStore::new(3, 0, GradDtype::F16).is_err());
    }

    #[test]
    fn overwrites_rows() {
        let mut store = FeatureStore::new(3, 2, GradDtype::F32).unwrap();

        store.write_rows(array![[1f32, 2.]].view(), &[1]).unwrap();
        store.write_rows(array![[3f32, 4.]].view(), &[1]).unwrap();

        assert_eq!(store.features(), array![[0f32, 0.], [3., 4.], [0., 0.]]);
        assert!(store.is_featurized(1));
        assert!(!store.is_featurized(0));
        assert!(!store.is_featurized(7));
    }

    #[test]
    fn later_duplicate_wins() {
        let mut store = FeatureStore::new(2, 1, GradDtype::F32).unwrap();

        store
            .write_rows(array![[1f32], [2.]].view(), &[0, 0])
            .unwrap();

        assert_eq!(store.row(0).unwrap(), array![2f32]);
        assert_eq!(store.num_featurized(), 1);
    }

    #[test]
    fn stores_in_half_precision() {
        let mut store = FeatureStore::new(1, 2, GradDtype::Bf16).unwrap();

        store
            .write_rows(array![[1f32 + 1e-4, 3.]].view(), &[0])
            .unwrap();

        assert_eq!(store.row(0).unwrap(), array![1f32, 3.]);
    }

    #[test]
    fn bad_index_writes_nothing() {
        let mut store = FeatureStore::new(2, 1, GradDtype::F32).unwrap();

        let err = store
            .write_rows(array![[1f32], [2.]].view(), &[0, 2])
            .unwrap_err();

        assert!(matches!(err, TrakErr::IndexOutOfBounds { index: 2, len: 2 }));
        assert_eq!(store.num_featurized(), 0);
        assert_eq!(store.features(), Array2::<f32>::zeros((2, 1)));
    }

    #[test]
    fn index_count_must_match_rows() {
        let mut store = FeatureStore::new(2, 1, GradDtype::F32).unwrap();

        let err = store.write_rows(array![[1f32]].view(), &[0, 1]).unwrap_err();
        assert!(matches!(err, TrakErr::ShapeMismatch { .. }));
    }

    #[test]
    fn record_writes_both() {
        let mut store = FeatureStore::new(3, 2, GradDtype::F32).unwrap();
        let featurized = Featurized {
            projected: array![[1f32, 2.], [3., 4.]],
            out_to_loss: array![0.25f32, 0.75],
        };

        store.record(&featurized, &[2, 0]).unwrap();

        assert_eq!(store.features(), array![[3f32, 4.], [0., 0.], [1., 2.]]);
        assert_eq!(store.out_to_loss(), array![0.75f32, 0., 0.25]);
    }
}
