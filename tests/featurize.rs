use std::thread;

use ndarray::{Array2, ArrayView2, s};
use rand::{Rng, SeedableRng, rngs::StdRng};

use trak::{
    Featurizer, Result, TrakErr, Traker,
    arch::{ActFn, ForwardCtx, Model, Sequential, layers::Layer},
    autograd::{Graph, NodeId},
    dataset::Batch,
    gradients::ExtractionMode,
    output::{ClassificationMargin, Regression},
    specs::TrakSpec,
    store::{FeatureStore, SharedStore},
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn random_inputs(rows: usize, cols: usize, seed: u64) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_simple_fn((rows, cols), || rng.random_range(-1.0..1.0))
}

fn labels(rows: usize, classes: usize) -> Array2<f32> {
    Array2::from_shape_fn((rows, 1), |(i, _)| (i % classes) as f32)
}

/// `Dense((99, 10))` holds exactly 1000 parameters.
fn thousand_param_model() -> Sequential {
    Sequential::seeded([Layer::dense((99, 10), None)], 0).unwrap()
}

fn example_spec() -> TrakSpec {
    TrakSpec {
        proj_dim: 20,
        proj_seed: 0,
        train_set_size: 5,
        ..Default::default()
    }
}

#[test]
fn example_scenario() {
    init_logger();

    let model = thousand_param_model();
    assert_eq!(model.size(), 1000);

    let mut traker = Traker::new(&model, example_spec()).unwrap();
    let x = random_inputs(2, 99, 1);
    let y = labels(2, 10);
    let batch = Batch::new(x.view(), y.view()).unwrap();
    let out_fn = ClassificationMargin;

    assert_eq!(traker.store().features(), Array2::<f32>::zeros((5, 20)));

    traker
        .featurize(&out_fn, &out_fn, &model, batch, &[3, 4], ExtractionMode::Iterative)
        .unwrap();
    let first = traker.store().features();

    assert!(first.slice(s![..3, ..]).iter().all(|&v| v == 0.));
    assert!(first.slice(s![3.., ..]).iter().any(|&v| v != 0.));
    assert_eq!(traker.store().num_featurized(), 2);

    traker
        .featurize(&out_fn, &out_fn, &model, batch, &[3, 4], ExtractionMode::Iterative)
        .unwrap();

    assert_eq!(traker.store().features(), first);
}

#[test]
fn independently_built_trakers_agree() {
    let model = thousand_param_model();
    let x = random_inputs(2, 99, 7);
    let y = labels(2, 10);
    let batch = Batch::new(x.view(), y.view()).unwrap();

    let run = || {
        let mut traker = Traker::new(&model, example_spec()).unwrap();
        traker
            .featurize(
                &ClassificationMargin,
                &ClassificationMargin,
                &model,
                batch,
                &[0, 1],
                ExtractionMode::Iterative,
            )
            .unwrap();
        traker.into_store().features()
    };

    assert_eq!(run(), run());
}

#[test]
fn record_grads_overwrites_with_latest() {
    let model = thousand_param_model();
    let mut traker = Traker::new(&model, example_spec()).unwrap();
    let first = random_inputs(2, 1000, 1);
    let second = random_inputs(2, 1000, 2);

    traker.record_grads(first.view(), &[0, 2]).unwrap();
    traker.record_grads(second.view(), &[0, 2]).unwrap();

    let expected = traker.featurizer().project(second.view()).unwrap();
    let features = traker.store().features();

    assert_eq!(features.row(0), expected.row(0));
    assert_eq!(features.row(2), expected.row(1));
}

#[cfg(feature = "vectorized")]
#[test]
fn strategies_agree_on_gradients() {
    let model = Sequential::seeded(
        [
            Layer::dense((6, 8), Some(ActFn::Tanh)),
            Layer::dense((8, 4), None),
        ],
        11,
    )
    .unwrap();
    let spec = TrakSpec {
        grad_dtype: trak::GradDtype::F32,
        ..Default::default()
    };
    let featurizer = Featurizer::new(model.size(), &spec).unwrap();
    let x = random_inputs(5, 6, 3);
    let y = labels(5, 4);
    let batch = Batch::new(x.view(), y.view()).unwrap();

    let functional = featurizer
        .grads(&ClassificationMargin, &model, batch, ExtractionMode::Functional)
        .unwrap();
    let iterative = featurizer
        .grads(&ClassificationMargin, &model, batch, ExtractionMode::Iterative)
        .unwrap();

    for (a, b) in functional.iter().zip(&iterative) {
        assert!((a - b).abs() <= 1e-4 * a.abs().max(b.abs()).max(1.), "{a} != {b}");
    }
}

#[cfg(feature = "vectorized")]
#[test]
fn dropout_randomness_per_sample() {
    use trak::specs::Randomness;

    let model = Sequential::seeded(
        [
            Layer::dense((4, 16), Some(ActFn::Relu)),
            Layer::dropout(0.5).unwrap(),
            Layer::dense((16, 1), None),
        ],
        2,
    )
    .unwrap();
    let x = Array2::from_elem((2, 4), 1f32);
    let y = Array2::zeros((2, 1));
    let batch = Batch::new(x.view(), y.view()).unwrap();

    let grads = |randomness: Randomness| {
        let spec = TrakSpec {
            randomness,
            train_mode: true,
            ..Default::default()
        };
        Featurizer::new(model.size(), &spec)
            .unwrap()
            .grads(&Regression, &model, batch, ExtractionMode::Functional)
            .unwrap()
    };

    // Identical samples only diverge when their dropout masks do.
    let same = grads(Randomness::Same);
    assert_eq!(same.row(0), same.row(1));

    let different = grads(Randomness::Different);
    assert_ne!(different.row(0), different.row(1));
}

/// A model whose forward pass mixes the samples of a batch.
struct BatchCoupled(Sequential);

impl Model for BatchCoupled {
    fn param_shapes(&self) -> Vec<(usize, usize)> {
        self.0.param_shapes()
    }

    fn params(&self) -> &[f32] {
        self.0.params()
    }

    fn forward(
        &self,
        graph: &mut Graph,
        params: &[NodeId],
        x: NodeId,
        ctx: &mut ForwardCtx,
    ) -> Result<NodeId> {
        self.0.forward(graph, params, x, ctx)
    }

    fn supports_functional(&self) -> bool {
        false
    }
}

#[test]
fn functional_rejects_coupled_models() {
    let model = BatchCoupled(Sequential::seeded([Layer::dense((3, 2), None)], 0).unwrap());
    let mut traker = Traker::new(&model, TrakSpec::default()).unwrap();
    let x = random_inputs(1, 3, 0);
    let y = labels(1, 2);
    let batch = Batch::new(x.view(), y.view()).unwrap();

    let err = traker
        .featurize(
            &ClassificationMargin,
            &ClassificationMargin,
            &model,
            batch,
            &[0],
            ExtractionMode::Functional,
        )
        .unwrap_err();

    assert!(matches!(err, TrakErr::UnsupportedMode(_)));
    assert_eq!(traker.store().num_featurized(), 0);

    // The caller falls back to the iterative strategy explicitly.
    traker
        .featurize(
            &ClassificationMargin,
            &ClassificationMargin,
            &model,
            batch,
            &[0],
            ExtractionMode::Iterative,
        )
        .unwrap();
    assert!(traker.store().is_featurized(0));
}

#[test]
fn half_precision_overflow_is_rejected() {
    let model = Sequential::seeded([Layer::dense((4, 1), None)], 0).unwrap();
    let mut traker = Traker::new(&model, TrakSpec::default()).unwrap();
    let x = Array2::from_elem((1, 4), 1e5f32);
    let y = Array2::zeros((1, 1));
    let batch = Batch::new(x.view(), y.view()).unwrap();

    let err = traker
        .featurize(
            &Regression,
            &Regression,
            &model,
            batch,
            &[0],
            ExtractionMode::Iterative,
        )
        .unwrap_err();

    assert!(matches!(err, TrakErr::NonFinite { row: 0 }));
    assert_eq!(traker.store().num_featurized(), 0);
    assert!(traker.store().out_to_loss().iter().all(|&v| v == 0.));
}

#[test]
fn out_of_bounds_index_is_rejected() {
    let model = thousand_param_model();
    let mut traker = Traker::new(&model, example_spec()).unwrap();
    let x = random_inputs(1, 99, 0);
    let y = labels(1, 10);
    let batch = Batch::new(x.view(), y.view()).unwrap();

    let err = traker
        .featurize(
            &ClassificationMargin,
            &ClassificationMargin,
            &model,
            batch,
            &[5],
            ExtractionMode::Iterative,
        )
        .unwrap_err();

    assert!(matches!(err, TrakErr::IndexOutOfBounds { index: 5, len: 5 }));
}

fn featurize_chunk(
    featurizer: &Featurizer,
    model: &Sequential,
    x: ArrayView2<f32>,
    y: ArrayView2<f32>,
    inds: &[usize],
) -> trak::Featurized {
    let start = inds[0];
    let end = start + inds.len();
    let batch = Batch::new(x.slice(s![start..end, ..]), y.slice(s![start..end, ..])).unwrap();

    featurizer
        .featurize(
            &ClassificationMargin,
            &ClassificationMargin,
            model,
            batch,
            ExtractionMode::Iterative,
        )
        .unwrap()
}

#[test]
fn shared_store_with_disjoint_workers() {
    init_logger();

    let model = Sequential::seeded([Layer::dense((5, 3), Some(ActFn::Sigmoid { amp: 1. }))], 4)
        .unwrap();
    let spec = TrakSpec {
        proj_dim: 6,
        train_set_size: 8,
        ..Default::default()
    };
    let x = random_inputs(8, 5, 9);
    let y = labels(8, 3);

    let featurizer = Featurizer::new(model.size(), &spec).unwrap();
    let shared = SharedStore::new(
        FeatureStore::new(spec.train_set_size, spec.proj_dim, spec.grad_dtype).unwrap(),
    );

    thread::scope(|s| {
        for chunk in [[0, 1], [2, 3], [4, 5], [6, 7]] {
            let (featurizer, model, shared) = (&featurizer, &model, shared.clone());
            let (x, y) = (x.view(), y.view());

            s.spawn(move || {
                let featurized = featurize_chunk(featurizer, model, x, y, &chunk);
                shared.record(&featurized, &chunk).unwrap();
            });
        }
    });

    let mut traker = Traker::new(&model, spec).unwrap();
    let batch = Batch::new(x.view(), y.view()).unwrap();
    let inds: Vec<usize> = (0..8).collect();
    traker
        .featurize(
            &ClassificationMargin,
            &ClassificationMargin,
            &model,
            batch,
            &inds,
            ExtractionMode::Iterative,
        )
        .unwrap();

    let store = shared.into_inner().unwrap();
    assert_eq!(store.num_featurized(), 8);

    for (a, b) in store.features().iter().zip(&traker.store().features()) {
        assert!((a - b).abs() <= 1e-2 * a.abs().max(1.), "{a} != {b}");
    }
}
