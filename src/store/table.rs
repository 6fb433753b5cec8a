use half::{bf16, f16};
use ndarray::{Array1, Array2, ArrayView1, Zip};

use crate::GradDtype;

/// A 2-D table stored in one of the gradient dtypes.
#[derive(Debug, Clone)]
pub(super) enum Table {
    F16(Array2<f16>),
    Bf16(Array2<bf16>),
    F32(Array2<f32>),
}
use Table::*;

impl Table {
    pub fn zeros(shape: (usize, usize), dtype: GradDtype) -> Self {
        match dtype {
            GradDtype::F16 => F16(Array2::from_elem(shape, f16::ZERO)),
            GradDtype::Bf16 => Bf16(Array2::from_elem(shape, bf16::ZERO)),
            GradDtype::F32 => F32(Array2::from_elem(shape, 0.)),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        match self {
            F16(t) => t.dim(),
            Bf16(t) => t.dim(),
            F32(t) => t.dim(),
        }
    }

    /// Overwrites row `i` with `values`, rounding them to the table's dtype.
    pub fn write_row(&mut self, i: usize, values: ArrayView1<f32>) {
        match self {
            F16(t) => Zip::from(t.row_mut(i))
                .and(values)
                .for_each(|d, &v| *d = f16::from_f32(v)),
            Bf16(t) => Zip::from(t.row_mut(i))
                .and(values)
                .for_each(|d, &v| *d = bf16::from_f32(v)),
            F32(t) => t.row_mut(i).assign(&values),
        }
    }

    pub fn row(&self, i: usize) -> Array1<f32> {
        match self {
            F16(t) => t.row(i).mapv(f16::to_f32),
            Bf16(t) => t.row(i).mapv(bf16::to_f32),
            F32(t) => t.row(i).to_owned(),
        }
    }

    pub fn decode(&self) -> Array2<f32> {
        match self {
            F16(t) => t.mapv(f16::to_f32),
            Bf16(t) => t.mapv(bf16::to_f32),
            F32(t) => t.clone(),
        }
    }
}
