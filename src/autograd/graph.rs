use ndarray::{Array2, ArrayView2, Axis, Zip};

use super::{Adjoints, Unary, matmul, op::Op};
use crate::{Result, TrakErr};

/// The handle of a node in a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug)]
struct Node {
    value: Array2<f32>,
    op: Op,
    requires_grad: bool,
}

/// A computation graph recorded while running a forward pass.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    /// Creates a new empty `Graph`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a leaf whose gradient will be tracked.
    pub fn leaf(&mut self, value: Array2<f32>) -> NodeId {
        self.push(value, Op::Leaf, true)
    }

    /// Adds a leaf whose gradient is never needed, like the input data.
    pub fn constant(&mut self, value: Array2<f32>) -> NodeId {
        self.push(value, Op::Leaf, false)
    }

    /// Returns the value of a node.
    ///
    /// # Panics
    /// If `id` wasn't created by this graph.
    pub fn value(&self, id: NodeId) -> ArrayView2<'_, f32> {
        self.nodes[id.0].value.view()
    }

    /// Returns the shape of a node.
    pub fn dim(&self, id: NodeId) -> (usize, usize) {
        self.nodes[id.0].value.dim()
    }

    /// Records `a @ b`.
    ///
    /// # Errors
    /// A `ShapeMismatch` if the inner dimensions differ.
    pub fn matmul(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        let (_, k) = self.dim(a);
        let (kb, _) = self.dim(b);

        if k != kb {
            return Err(TrakErr::ShapeMismatch {
                what: "matmul inner dimension",
                got: kb,
                expected: k,
            });
        }

        let value = matmul(&self.value(a), &self.value(b));
        Ok(self.record(value, Op::MatMul(a, b)))
    }

    /// Records `a + b` where `b` is a `(1, n)` row added to every row of `a`.
    ///
    /// # Errors
    /// A `ShapeMismatch` if `b` isn't a single row as wide as `a`.
    pub fn add_row(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        let (_, n) = self.dim(a);
        let (rows, nb) = self.dim(b);

        if rows != 1 {
            return Err(TrakErr::ShapeMismatch {
                what: "broadcast row count",
                got: rows,
                expected: 1,
            });
        }

        if nb != n {
            return Err(TrakErr::ShapeMismatch {
                what: "broadcast row width",
                got: nb,
                expected: n,
            });
        }

        let mut value = self.value(a).to_owned();
        value += &self.value(b);
        Ok(self.record(value, Op::AddRow(a, b)))
    }

    /// Records the element-wise `a + b`.
    pub fn add(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        self.check_same_dim(a, b)?;
        let value = &self.value(a) + &self.value(b);
        Ok(self.record(value, Op::Add(a, b)))
    }

    /// Records the element-wise `a * b`.
    pub fn mul(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        self.check_same_dim(a, b)?;
        let value = &self.value(a) * &self.value(b);
        Ok(self.record(value, Op::Mul(a, b)))
    }

    /// Records `a * s`.
    pub fn scale(&mut self, a: NodeId, s: f32) -> NodeId {
        let value = self.value(a).mapv(|x| x * s);
        self.record(value, Op::Scale(a, s))
    }

    /// Records the element-wise product of `a` with a constant `mask`.
    pub fn mask(&mut self, a: NodeId, mask: Array2<f32>) -> Result<NodeId> {
        let (rows, cols) = self.dim(a);
        if mask.dim() != (rows, cols) {
            return Err(TrakErr::ShapeMismatch {
                what: "mask elements",
                got: mask.len(),
                expected: rows * cols,
            });
        }

        let value = &self.value(a) * &mask;
        Ok(self.record(value, Op::Mask(a, mask)))
    }

    /// Records `f(a)` applied element-wise.
    pub fn map(&mut self, a: NodeId, f: Unary) -> NodeId {
        let value = self.value(a).mapv(|z| f.f(z));
        self.record(value, Op::Map(a, f))
    }

    /// Records the classification margin of every row of `logits`, that is the correct
    /// class logit minus the log-sum-exp of the remaining ones.
    ///
    /// # Arguments
    /// * `logits` - A `(B, C)` node.
    /// * `labels` - The correct class of each of the `B` rows.
    ///
    /// # Returns
    /// A `(B, 1)` node.
    ///
    /// # Errors
    /// A `ShapeMismatch` if there are less than two classes or the label count differs from
    /// `B`, an `InvalidLabel` if a label is not a valid class.
    pub fn margin(&mut self, logits: NodeId, labels: Vec<usize>) -> Result<NodeId> {
        let (rows, classes) = self.dim(logits);

        if classes < 2 {
            return Err(TrakErr::ShapeMismatch {
                what: "margin classes",
                got: classes,
                expected: 2,
            });
        }

        if labels.len() != rows {
            return Err(TrakErr::ShapeMismatch {
                what: "margin labels",
                got: labels.len(),
                expected: rows,
            });
        }

        if let Some((row, &label)) = labels.iter().enumerate().find(|(_, l)| **l >= classes) {
            return Err(TrakErr::InvalidLabel {
                row,
                value: label as f32,
            });
        }

        let z = self.value(logits);
        let mut value = Array2::zeros((rows, 1));
        for (i, &y) in labels.iter().enumerate() {
            let row = z.row(i);
            value[[i, 0]] = row[y] - logsumexp_except(row.iter().copied(), y);
        }

        Ok(self.record(value, Op::Margin(logits, labels)))
    }

    /// Runs a reverse sweep from `root`, seeding its adjoint with `seed`.
    ///
    /// The graph is left untouched, so this can be called any number of times.
    ///
    /// # Arguments
    /// * `root` - The node to differentiate.
    /// * `seed` - The adjoint of `root`, same shape as its value.
    ///
    /// # Returns
    /// The adjoints of every node that `root` depends on.
    ///
    /// # Errors
    /// A `ShapeMismatch` if `seed` and `root` differ in shape.
    pub fn backward(&self, root: NodeId, seed: Array2<f32>) -> Result<Adjoints> {
        let (rows, cols) = self.dim(root);
        if seed.dim() != (rows, cols) {
            return Err(TrakErr::ShapeMismatch {
                what: "backward seed elements",
                got: seed.len(),
                expected: rows * cols,
            });
        }

        let mut grads: Vec<Option<Array2<f32>>> = vec![None; root.0 + 1];
        grads[root.0] = Some(seed);

        for idx in (0..=root.0).rev() {
            let Some(g) = grads[idx].take() else {
                continue;
            };

            let node = &self.nodes[idx];
            if node.requires_grad {
                self.propagate(&node.op, &g, &mut grads);
            }

            grads[idx] = Some(g);
        }

        Ok(Adjoints::new(grads))
    }

    fn propagate(&self, op: &Op, g: &Array2<f32>, grads: &mut [Option<Array2<f32>>]) {
        let [a, b] = op.inputs();
        let wants = |id: Option<NodeId>| id.is_some_and(|id| self.nodes[id.0].requires_grad);
        let (want_a, want_b) = (wants(a), wants(b));

        match op {
            Op::Leaf => {}
            Op::MatMul(a, b) => {
                if want_a {
                    accumulate(grads, *a, matmul(&g.view(), &self.value(*b).t()));
                }
                if want_b {
                    accumulate(grads, *b, matmul(&self.value(*a).t(), &g.view()));
                }
            }
            Op::AddRow(a, b) => {
                if want_a {
                    accumulate(grads, *a, g.clone());
                }
                if want_b {
                    accumulate(grads, *b, g.sum_axis(Axis(0)).insert_axis(Axis(0)));
                }
            }
            Op::Add(a, b) => {
                if want_a {
                    accumulate(grads, *a, g.clone());
                }
                if want_b {
                    accumulate(grads, *b, g.clone());
                }
            }
            Op::Mul(a, b) => {
                if want_a {
                    accumulate(grads, *a, g * &self.value(*b));
                }
                if want_b {
                    accumulate(grads, *b, g * &self.value(*a));
                }
            }
            Op::Scale(a, s) => {
                if want_a {
                    accumulate(grads, *a, g.mapv(|x| x * s));
                }
            }
            Op::Mask(a, mask) => {
                if want_a {
                    accumulate(grads, *a, g * mask);
                }
            }
            Op::Map(a, f) => {
                if want_a {
                    let mut d = g.clone();
                    Zip::from(&mut d)
                        .and(&self.value(*a))
                        .for_each(|d, &z| *d *= f.df(z));
                    accumulate(grads, *a, d);
                }
            }
            Op::Margin(logits, labels) => {
                if want_a {
                    accumulate(grads, *logits, self.margin_grad(*logits, labels, g));
                }
            }
        }
    }

    fn margin_grad(&self, logits: NodeId, labels: &[usize], g: &Array2<f32>) -> Array2<f32> {
        let z = self.value(logits);
        let mut d = Array2::zeros(z.dim());

        for (i, &y) in labels.iter().enumerate() {
            let row = z.row(i);
            let lse = logsumexp_except(row.iter().copied(), y);
            let gi = g[[i, 0]];

            for (j, &zj) in row.iter().enumerate() {
                d[[i, j]] = if j == y { gi } else { -gi * (zj - lse).exp() };
            }
        }

        d
    }

    fn check_same_dim(&self, a: NodeId, b: NodeId) -> Result<()> {
        let (ra, ca) = self.dim(a);
        let (rb, cb) = self.dim(b);

        if ra != rb {
            return Err(TrakErr::ShapeMismatch {
                what: "element-wise rows",
                got: rb,
                expected: ra,
            });
        }

        if ca != cb {
            return Err(TrakErr::ShapeMismatch {
                what: "element-wise columns",
                got: cb,
                expected: ca,
            });
        }

        Ok(())
    }

    fn record(&mut self, value: Array2<f32>, op: Op) -> NodeId {
        let requires_grad = op
            .inputs()
            .into_iter()
            .flatten()
            .any(|id| self.nodes[id.0].requires_grad);

        self.push(value, op, requires_grad)
    }

    fn push(&mut self, value: Array2<f32>, op: Op, requires_grad: bool) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            value,
            op,
            requires_grad,
        });
        id
    }
}

fn accumulate(grads: &mut [Option<Array2<f32>>], id: NodeId, contribution: Array2<f32>) {
    match &mut grads[id.0] {
        Some(existing) => *existing += &contribution,
        slot => *slot = Some(contribution),
    }
}

/// Computes `log(sum(exp(z_j)))` over every `j != skip`.
fn logsumexp_except<I>(zs: I, skip: usize) -> f32
where
    I: Iterator<Item = f32> + Clone,
{
    let others = zs.enumerate().filter(|&(j, _)| j != skip).map(|(_, z)| z);
    let max = others.clone().fold(f32::NEG_INFINITY, f32::max);
    max + others.map(|z| (z - max).exp()).sum::<f32>().ln()
}
