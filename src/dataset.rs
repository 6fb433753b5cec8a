use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayView2, s};

use crate::{Result, TrakErr, specs::DatasetSpec};

/// A borrowed batch of samples: paired inputs and targets sharing their leading dimension.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    x: ArrayView2<'a, f32>,
    y: ArrayView2<'a, f32>,
}

impl<'a> Batch<'a> {
    /// Creates a new `Batch`.
    ///
    /// # Arguments
    /// * `x` - The `(B, x_size)` inputs.
    /// * `y` - The `(B, y_size)` targets.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if `x` and `y` hold a different amount of rows.
    pub fn new(x: ArrayView2<'a, f32>, y: ArrayView2<'a, f32>) -> Result<Self> {
        if x.nrows() != y.nrows() {
            return Err(TrakErr::ShapeMismatch {
                what: "batch targets",
                got: y.nrows(),
                expected: x.nrows(),
            });
        }

        Ok(Self { x, y })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn x(&self) -> ArrayView2<'a, f32> {
        self.x
    }

    #[inline]
    pub fn y(&self) -> ArrayView2<'a, f32> {
        self.y
    }

    /// Returns the single sample batch at row `i` (panics if out of bounds).
    pub fn sample(&self, i: usize) -> Batch<'a> {
        Self {
            x: self.x.slice_move(s![i..i + 1, ..]),
            y: self.y.slice_move(s![i..i + 1, ..]),
        }
    }
}

/// An in-memory dataset where every row holds `x_size` inputs followed by `y_size` targets.
#[derive(Debug, Clone)]
pub struct Dataset {
    rows: Array2<f32>,
    x_size: usize,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Errors
    /// A `Config` error if a row size is zero, a `ShapeMismatch` if `data` doesn't hold a
    /// whole amount of rows.
    pub fn new(data: Vec<f32>, x_size: usize, y_size: usize) -> Result<Self> {
        if x_size == 0 || y_size == 0 {
            return Err(TrakErr::Config(format!(
                "dataset rows need inputs and targets, got x_size {x_size} and y_size {y_size}"
            )));
        }

        let cols = x_size + y_size;
        if data.len() % cols != 0 {
            return Err(TrakErr::ShapeMismatch {
                what: "dataset values",
                got: data.len(),
                expected: data.len().next_multiple_of(cols),
            });
        }

        let rows = Array2::from_shape_vec((data.len() / cols, cols), data)?;
        Ok(Self { rows, x_size })
    }

    pub fn from_spec(spec: DatasetSpec) -> Result<Self> {
        Self::new(spec.data, spec.x_size, spec.y_size)
    }

    /// Returns the amount of samples.
    pub fn len(&self) -> usize {
        self.rows.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the whole dataset as a single batch.
    pub fn as_batch(&self) -> Batch<'_> {
        Batch {
            x: self.rows.slice(s![.., ..self.x_size]),
            y: self.rows.slice(s![.., self.x_size..]),
        }
    }

    /// Splits the dataset in consecutive batches, the last one possibly smaller.
    ///
    /// # Returns
    /// An iterator over the sample indices of every batch along with the batch itself.
    pub fn batches(
        &self,
        batch_size: NonZeroUsize,
    ) -> impl Iterator<Item = (Vec<usize>, Batch<'_>)> + '_ {
        let all = self.as_batch();
        let len = self.len();

        (0..len).step_by(batch_size.get()).map(move |start| {
            let end = (start + batch_size.get()).min(len);
            let batch = Batch {
                x: all.x.slice_move(s![start..end, ..]),
                y: all.y.slice_move(s![start..end, ..]),
            };

            ((start..end).collect(), batch)
        })
    }
}
