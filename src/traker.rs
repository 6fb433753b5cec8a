use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView2};

use crate::{
    Result, TrakErr,
    arch::{ForwardCtx, Model},
    dataset::Batch,
    gradients::{ExtractionMode, Extractor, GradientExtractor},
    output::{ModelOutput, OutToLoss},
    projection::{Projector, ProjectorBuilder},
    specs::TrakSpec,
    store::FeatureStore,
};

/// The result of featurizing a batch, ready to be written to a store.
#[derive(Debug, Clone, PartialEq)]
pub struct Featurized {
    /// The `(B, proj_dim)` projected gradients.
    pub projected: Array2<f32>,
    /// The `B` out-to-loss values.
    pub out_to_loss: Array1<f32>,
}

/// Computes featurized batches without touching any store.
///
/// It holds no mutable state, so a single `Featurizer` can be shared by several threads
/// writing their results to a `SharedStore`.
#[derive(Debug)]
pub struct Featurizer {
    projector: Box<dyn Projector>,
    spec: TrakSpec,
}

impl Featurizer {
    /// Creates a new `Featurizer`.
    ///
    /// # Arguments
    /// * `grad_dim` - The amount of parameters of the model being featurized.
    /// * `spec` - The featurization spec.
    ///
    /// # Returns
    /// A `Config` error if the dimensions are invalid.
    pub fn new(grad_dim: usize, spec: &TrakSpec) -> Result<Self> {
        spec.validate()?;
        let projector = ProjectorBuilder::new().build(spec, grad_dim)?;

        Ok(Self {
            projector,
            spec: spec.clone(),
        })
    }

    pub fn grad_dim(&self) -> usize {
        self.projector.grad_dim()
    }

    pub fn proj_dim(&self) -> usize {
        self.projector.proj_dim()
    }

    pub fn spec(&self) -> &TrakSpec {
        &self.spec
    }

    pub fn extractor(&self, mode: ExtractionMode) -> Extractor {
        Extractor::from_spec(mode, &self.spec)
    }

    /// Computes the `(B, grad_dim)` per-sample gradients of `out_fn`.
    ///
    /// # Errors
    /// A `ShapeMismatch` if the model no longer has `grad_dim` parameters, or whatever the
    /// extraction strategy fails with.
    pub fn grads<M, O>(
        &self,
        out_fn: &O,
        model: &M,
        batch: Batch<'_>,
        mode: ExtractionMode,
    ) -> Result<Array2<f32>>
    where
        M: Model + ?Sized,
        O: ModelOutput + ?Sized,
    {
        self.check_model(model)?;
        self.extractor(mode).extract(model, out_fn, batch)
    }

    /// Returns a `ShapeMismatch` if `model` no longer has `grad_dim` parameters.
    pub fn check_model<M: Model + ?Sized>(&self, model: &M) -> Result<()> {
        if model.size() != self.grad_dim() {
            return Err(TrakErr::ShapeMismatch {
                what: "model parameters",
                got: model.size(),
                expected: self.grad_dim(),
            });
        }

        Ok(())
    }

    /// Projects raw per-sample gradients.
    ///
    /// # Errors
    /// A `ShapeMismatch` if `grads` is not `grad_dim` wide, a `NonFinite` naming the first
    /// offending row if finite checks are enabled.
    pub fn project(&self, grads: ArrayView2<f32>) -> Result<Array2<f32>> {
        let projected = self.projector.project(grads)?;

        if self.spec.check_finite {
            let bad_row = projected
                .rows()
                .into_iter()
                .position(|row| row.iter().any(|v| !v.is_finite()));

            if let Some(row) = bad_row {
                return Err(TrakErr::NonFinite { row });
            }
        }

        Ok(projected)
    }

    /// Computes the per-sample out-to-loss values from a single evaluation forward pass.
    pub fn out_to_loss<M, L>(&self, loss_fn: &L, model: &M, batch: Batch<'_>) -> Result<Array1<f32>>
    where
        M: Model + ?Sized,
        L: OutToLoss + ?Sized,
    {
        if batch.is_empty() {
            return Ok(Array1::zeros(0));
        }

        let raw_out = model.predict(batch.x(), &mut ForwardCtx::eval())?;
        let out_to_loss = loss_fn.out_to_loss(raw_out.view(), batch.y())?;

        if out_to_loss.len() != batch.len() {
            return Err(TrakErr::ShapeMismatch {
                what: "out-to-loss values",
                got: out_to_loss.len(),
                expected: batch.len(),
            });
        }

        Ok(out_to_loss)
    }

    /// Extracts, projects and computes the out-to-loss values of a batch.
    pub fn featurize<M, O, L>(
        &self,
        out_fn: &O,
        loss_fn: &L,
        model: &M,
        batch: Batch<'_>,
        mode: ExtractionMode,
    ) -> Result<Featurized>
    where
        M: Model + ?Sized,
        O: ModelOutput + ?Sized,
        L: OutToLoss + ?Sized,
    {
        let grads = self.grads(out_fn, model, batch, mode)?;
        let projected = self.project(grads.view())?;
        let out_to_loss = self.out_to_loss(loss_fn, model, batch)?;

        Ok(Featurized {
            projected,
            out_to_loss,
        })
    }
}

/// Drives featurization passes over batches, writing their results into an owned
/// `FeatureStore`.
#[derive(Debug)]
pub struct Traker {
    featurizer: Featurizer,
    store: FeatureStore,
}

impl Traker {
    /// Creates a new `Traker`.
    ///
    /// # Arguments
    /// * `model` - The model to featurize, its parameter count is fixed from now on.
    /// * `spec` - The featurization spec.
    ///
    /// # Returns
    /// A `Config` error if the model has no parameters or the spec is invalid.
    pub fn new<M: Model + ?Sized>(model: &M, spec: TrakSpec) -> Result<Self> {
        let grad_dim = model.size();
        let featurizer = Featurizer::new(grad_dim, &spec)?;
        let store = FeatureStore::new(spec.train_set_size, spec.proj_dim, spec.grad_dtype)?;

        info!(
            grad_dim = grad_dim,
            proj_dim = spec.proj_dim,
            train_set_size = spec.train_set_size;
            "created traker"
        );

        Ok(Self { featurizer, store })
    }

    /// Featurizes a batch and writes the results at `inds`.
    ///
    /// # Arguments
    /// * `out_fn` - The per-sample output being differentiated.
    /// * `loss_fn` - Maps the raw model outputs to the per-sample out-to-loss values.
    /// * `model` - The model.
    /// * `batch` - The `B` samples.
    /// * `inds` - The store row of every sample.
    /// * `mode` - The gradient extraction strategy.
    ///
    /// # Returns
    /// The out-to-loss value of every sample.
    ///
    /// # Errors
    /// Any error leaves the store untouched.
    pub fn featurize<M, O, L>(
        &mut self,
        out_fn: &O,
        loss_fn: &L,
        model: &M,
        batch: Batch<'_>,
        inds: &[usize],
        mode: ExtractionMode,
    ) -> Result<Array1<f32>>
    where
        M: Model + ?Sized,
        O: ModelOutput + ?Sized,
        L: OutToLoss + ?Sized,
    {
        self.store.check_inds(batch.len(), inds)?;
        self.featurizer.check_model(model)?;

        if batch.is_empty() {
            return Ok(Array1::zeros(0));
        }

        debug!(batch = batch.len(); "featurizing batch");

        let featurized = self
            .featurizer
            .featurize(out_fn, loss_fn, model, batch, mode)?;
        self.store.record(&featurized, inds)?;

        Ok(featurized.out_to_loss)
    }

    /// Projects raw per-sample gradients and overwrites the rows at `inds` with them.
    ///
    /// # Errors
    /// Any error leaves the store untouched.
    pub fn record_grads(&mut self, grads: ArrayView2<f32>, inds: &[usize]) -> Result<()> {
        self.store.check_inds(grads.nrows(), inds)?;

        let projected = self.featurizer.project(grads)?;
        self.store.write_rows(projected.view(), inds)
    }

    pub fn store(&self) -> &FeatureStore {
        &self.store
    }

    pub fn featurizer(&self) -> &Featurizer {
        &self.featurizer
    }

    pub fn spec(&self) -> &TrakSpec {
        self.featurizer.spec()
    }

    pub fn into_store(self) -> FeatureStore {
        self.store
    }
}
