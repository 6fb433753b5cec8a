use ndarray::Array2;

use super::NodeId;

/// Element-wise functions with a known derivative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Unary {
    /// `amp / (1 + e^-z)`.
    Sigmoid { amp: f32 },
    Tanh,
    Relu,
}

impl Unary {
    pub fn f(&self, z: f32) -> f32 {
        match *self {
            Unary::Sigmoid { amp } => amp / (1. + (-z).exp()),
            Unary::Tanh => z.tanh(),
            Unary::Relu => z.max(0.),
        }
    }

    pub fn df(&self, z: f32) -> f32 {
        match *self {
            Unary::Sigmoid { amp } => {
                let s = 1. / (1. + (-z).exp());
                amp * s * (1. - s)
            }
            Unary::Tanh => 1. - z.tanh().powi(2),
            Unary::Relu => {
                if z > 0. {
                    1.
                } else {
                    0.
                }
            }
        }
    }
}

/// The operation that produced a node.
#[derive(Debug, Clone)]
pub(crate) enum Op {
    /// Parameters and inputs.
    Leaf,
    /// `a @ b`.
    MatMul(NodeId, NodeId),
    /// `a + b` where `b` is a single row broadcast over the rows of `a`.
    AddRow(NodeId, NodeId),
    Add(NodeId, NodeId),
    Mul(NodeId, NodeId),
    Scale(NodeId, f32),
    /// Element-wise product with a constant of the same shape.
    Mask(NodeId, Array2<f32>),
    Map(NodeId, Unary),
    /// Per-row `z[y] - logsumexp(z[j != y])`.
    Margin(NodeId, Vec<usize>),
}

impl Op {
    /// Returns the nodes this operation reads from.
    pub(crate) fn inputs(&self) -> [Option<NodeId>; 2] {
        match *self {
            Op::Leaf => [None, None],
            Op::MatMul(a, b) | Op::AddRow(a, b) | Op::Add(a, b) | Op::Mul(a, b) => {
                [Some(a), Some(b)]
            }
            Op::Scale(a, _) | Op::Mask(a, _) | Op::Map(a, _) | Op::Margin(a, _) => [Some(a), None],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_df(f: &Unary, z: f32) -> f32 {
        let h = 1e-3;
        (f.f(z + h) - f.f(z - h)) / (2. * h)
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let fns = [Unary::Sigmoid { amp: 1. }, Unary::Sigmoid { amp: 2.5 }, Unary::Tanh];

        for f in fns {
            for z in [-2.0, -0.3, 0.0, 0.7, 1.9] {
                let diff = (f.df(z) - numeric_df(&f, z)).abs();
                assert!(diff < 1e-3, "{f:?} at {z}: {diff}");
            }
        }
    }

    #[test]
    fn relu() {
        assert_eq!(Unary::Relu.f(-1.), 0.);
        assert_eq!(Unary::Relu.f(2.), 2.);
        assert_eq!(Unary::Relu.df(-1.), 0.);
        assert_eq!(Unary::Relu.df(2.), 1.);
    }
}
