use std::{fs, num::NonZeroUsize, process};

use trak::{
    TrakErr, Traker,
    arch::{Model, ModelBuilder},
    dataset::Dataset,
    gradients::ExtractionMode,
    output::OutputFn,
    specs::{OutputSpec, RunSpec, TrakSpec},
};

const RUN_SPEC: &str = r#"{
    "trak": { "proj_dim": 4, "train_set_size": 4, "grad_dtype": "f32" },
    "model": {
        "sequential": {
            "layers": [
                { "dense": { "dim": [2, 3], "act_fn": "relu" } },
                { "dense": { "dim": [3, 2] } }
            ]
        }
    },
    "dataset": {
        "data": [0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.5, 0.5, 0.0, -1.0, 2.0, 1.0],
        "x_size": 2,
        "y_size": 1
    },
    "output": "margin",
    "batch_size": 3,
    "mode": "iterative",
    "param_seed": 1
}"#;

fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("{}-{name}", process::id()));
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn run_spec_from_file() {
    let path = write_temp("run.json", RUN_SPEC);
    let spec = RunSpec::from_path(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(spec.trak.proj_dim, 4);
    assert_eq!(spec.output, OutputSpec::Margin);
    assert_eq!(spec.batch_size, NonZeroUsize::new(3).unwrap());
    assert_eq!(spec.mode, ExtractionMode::Iterative);
    assert!(spec.trak.check_finite);
}

#[test]
fn run_spec_drives_a_full_pass() {
    let path = write_temp("pass.json", RUN_SPEC);
    let spec = RunSpec::from_path(&path).unwrap();
    fs::remove_file(&path).unwrap();

    let model = ModelBuilder::new().build(&spec.model, spec.param_seed).unwrap();
    let dataset = Dataset::from_spec(spec.dataset).unwrap();
    let out_fn = OutputFn::from_spec(spec.output);
    assert_eq!(model.size(), 2 * 3 + 3 + 3 * 2 + 2);
    assert_eq!(dataset.len(), 4);

    let mut traker = Traker::new(&model, spec.trak).unwrap();
    for (inds, batch) in dataset.batches(spec.batch_size) {
        traker
            .featurize(&out_fn, &out_fn, &model, batch, &inds, spec.mode)
            .unwrap();
    }

    assert_eq!(traker.store().num_featurized(), 4);
}

#[test]
fn trak_spec_file_errors() {
    let err = TrakSpec::from_path("/nonexistent/trak.json").unwrap_err();
    assert!(matches!(err, TrakErr::Io(_)));

    let path = write_temp("bad.json", r#"{ "projector": "sparse" }"#);
    let err = TrakSpec::from_path(&path).unwrap_err();
    fs::remove_file(&path).unwrap();

    assert!(matches!(err, TrakErr::Config(_)));
}
