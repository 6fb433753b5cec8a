use super::{ActFn, Sequential, layers::Layer};
use crate::{
    Result, TrakErr,
    specs::{ActFnSpec, LayerSpec, ModelSpec},
};

/// Builds models given a specification.
#[derive(Debug, Default)]
pub struct ModelBuilder;

impl ModelBuilder {
    /// Creates a new `ModelBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new model following a spec.
    ///
    /// # Arguments
    /// * `spec` - The specification for the model.
    /// * `seed` - The seed for the weight initialization.
    ///
    /// # Returns
    /// The model, or a `Config` error if the layers don't chain together.
    pub fn build(&self, spec: &ModelSpec, seed: u64) -> Result<Sequential> {
        match spec {
            ModelSpec::Sequential {
                layers: layer_specs,
            } => {
                self.validate_layers(layer_specs)?;

                let layers = layer_specs
                    .iter()
                    .map(|ls| self.resolve_layer(*ls))
                    .collect::<Result<Vec<_>>>()?;

                Sequential::seeded(layers, seed)
            }
        }
    }

    fn validate_layers(&self, layers: &[LayerSpec]) -> Result<()> {
        if layers.is_empty() {
            return Err(TrakErr::Config("model must have at least one layer".into()));
        }

        let mut prev_out: Option<usize> = None;

        for (i, layer) in layers.iter().enumerate() {
            let LayerSpec::Dense { dim: (n, m), .. } = *layer else {
                continue;
            };

            if n == 0 || m == 0 {
                return Err(TrakErr::Config(format!(
                    "layer {i} has an empty dimension ({n}, {m})"
                )));
            }

            match prev_out {
                Some(prev) if prev != n => {
                    return Err(TrakErr::Config(format!(
                        "layer {i} takes {n} inputs but the previous dense layer outputs {prev}"
                    )));
                }
                _ => {}
            }

            prev_out = Some(m);
        }

        Ok(())
    }

    fn resolve_layer(&self, spec: LayerSpec) -> Result<Layer> {
        match spec {
            LayerSpec::Dense { dim, act_fn } => {
                let factory = |act_fn| Layer::dense(dim, act_fn);
                Ok(self.resolve_act_fn(act_fn, factory))
            }
            LayerSpec::Dropout { p } => Layer::dropout(p),
        }
    }

    fn resolve_act_fn<F>(&self, spec: Option<ActFnSpec>, layer_factory: F) -> Layer
    where
        F: FnOnce(Option<ActFn>) -> Layer,
    {
        let Some(act_fn) = spec else {
            return layer_factory(None);
        };

        let act_fn = match act_fn {
            ActFnSpec::Sigmoid { amp } => ActFn::Sigmoid { amp },
            ActFnSpec::Tanh => ActFn::Tanh,
            ActFnSpec::Relu => ActFn::Relu,
        };

        layer_factory(Some(act_fn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::Model;

    fn dense(dim: (usize, usize)) -> LayerSpec {
        LayerSpec::Dense { dim, act_fn: None }
    }

    #[test]
    fn builds_sequential() {
        let spec = ModelSpec::Sequential {
            layers: vec![
                LayerSpec::Dense {
                    dim: (4, 3),
                    act_fn: Some(ActFnSpec::Sigmoid { amp: 1. }),
                },
                LayerSpec::Dropout { p: 0.2 },
                dense((3, 2)),
            ],
        };

        let model = ModelBuilder::new().build(&spec, 0).unwrap();

        assert_eq!(model.layers().len(), 3);
        assert_eq!(model.size(), 4 * 3 + 3 + 3 * 2 + 2);
    }

    #[test]
    fn rejects_mismatched_layers() {
        let spec = ModelSpec::Sequential {
            layers: vec![dense((4, 3)), LayerSpec::Dropout { p: 0.5 }, dense((2, 1))],
        };

        let err = ModelBuilder::new().build(&spec, 0).unwrap_err();
        assert!(matches!(err, TrakErr::Config(_)));
    }

    #[test]
    fn rejects_empty_model() {
        let spec = ModelSpec::Sequential { layers: vec![] };
        assert!(ModelBuilder::new().build(&spec, 0).is_err());
    }

    #[test]
    fn rejects_bad_dropout() {
        let spec = ModelSpec::Sequential {
            layers: vec![dense((2, 2)), LayerSpec::Dropout { p: 1.5 }],
        };
        assert!(ModelBuilder::new().build(&spec, 0).is_err());
    }
}
