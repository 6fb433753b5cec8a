use half::{bf16, f16};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// The working precision used for projecting and storing gradients.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradDtype {
    #[default]
    F16,
    Bf16,
    F32,
}

impl GradDtype {
    /// Rounds `x` to the closest value representable in this dtype.
    ///
    /// # Arguments
    /// * `x` - The value to round.
    ///
    /// # Returns
    /// `x` after a round trip through this dtype.
    pub fn quantize(self, x: f32) -> f32 {
        match self {
            GradDtype::F16 => f16::from_f32(x).to_f32(),
            GradDtype::Bf16 => bf16::from_f32(x).to_f32(),
            GradDtype::F32 => x,
        }
    }

    /// Rounds every entry of `xs` to this dtype.
    pub fn quantize_array(self, xs: ArrayView2<f32>) -> Array2<f32> {
        match self {
            GradDtype::F32 => xs.to_owned(),
            _ => xs.mapv(|x| self.quantize(x)),
        }
    }
}
