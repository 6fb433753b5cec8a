use ndarray::{Array1, ArrayView2};

use super::{ModelOutput, OutToLoss, labels::class_labels};
use crate::{
    Result, TrakErr,
    autograd::{Graph, NodeId},
};

/// The classification margin `log(p / (1 - p))` of the correct class, where `p` is its
/// softmax probability.
///
/// Its loss link is `1 - p`, the derivative of the cross entropy with respect to the margin.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassificationMargin;

impl ModelOutput for ClassificationMargin {
    fn output(&self, graph: &mut Graph, raw_out: NodeId, y: ArrayView2<f32>) -> Result<NodeId> {
        let labels = class_labels(y)?;
        graph.margin(raw_out, labels)
    }
}

impl OutToLoss for ClassificationMargin {
    fn out_to_loss(&self, raw_out: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<Array1<f32>> {
        let labels = class_labels(y)?;

        if labels.len() != raw_out.nrows() {
            return Err(TrakErr::ShapeMismatch {
                what: "labels",
                got: labels.len(),
                expected: raw_out.nrows(),
            });
        }

        let classes = raw_out.ncols();
        let mut out = Array1::zeros(labels.len());

        for (i, &label) in labels.iter().enumerate() {
            if label >= classes {
                return Err(TrakErr::InvalidLabel {
                    row: i,
                    value: label as f32,
                });
            }

            let row = raw_out.row(i);
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let total: f32 = row.iter().map(|z| (z - max).exp()).sum();
            let p = (row[label] - max).exp() / total;

            out[i] = 1. - p;
        }

        Ok(out)
    }
}
