use ndarray::ArrayView2;

use crate::{Result, TrakErr};

/// Reads a `(B, 1)` target column as class indices.
///
/// # Errors
/// A `ShapeMismatch` if `y` isn't a single column, an `InvalidLabel` if a value is negative
/// or not integral.
pub(super) fn class_labels(y: ArrayView2<f32>) -> Result<Vec<usize>> {
    if y.ncols() != 1 {
        return Err(TrakErr::ShapeMismatch {
            what: "label columns",
            got: y.ncols(),
            expected: 1,
        });
    }

    y.column(0)
        .iter()
        .enumerate()
        .map(|(row, &value)| {
            if value < 0. || value.fract() != 0. || !value.is_finite() {
                return Err(TrakErr::InvalidLabel { row, value });
            }

            Ok(value as usize)
        })
        .collect()
}
