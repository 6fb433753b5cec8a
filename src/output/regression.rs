use ndarray::{Array1, ArrayView2};

use super::{ModelOutput, OutToLoss};
use crate::{
    Result, TrakErr,
    autograd::{Graph, NodeId},
};

/// The raw prediction of a single output regression model, linked to a squared error loss.
#[derive(Debug, Clone, Copy, Default)]
pub struct Regression;

fn check_single_output(rows: usize, cols: usize, y: ArrayView2<f32>) -> Result<()> {
    if cols != 1 {
        return Err(TrakErr::ShapeMismatch {
            what: "regression outputs",
            got: cols,
            expected: 1,
        });
    }

    if y.dim() != (rows, 1) {
        return Err(TrakErr::ShapeMismatch {
            what: "regression targets",
            got: y.len(),
            expected: rows,
        });
    }

    Ok(())
}

impl ModelOutput for Regression {
    fn output(&self, graph: &mut Graph, raw_out: NodeId, y: ArrayView2<f32>) -> Result<NodeId> {
        let (rows, cols) = graph.dim(raw_out);
        check_single_output(rows, cols, y)?;
        Ok(raw_out)
    }
}

impl OutToLoss for Regression {
    fn out_to_loss(&self, raw_out: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<Array1<f32>> {
        check_single_output(raw_out.nrows(), raw_out.ncols(), y)?;
        Ok((&raw_out.column(0) - &y.column(0)) * 2.)
    }
}
