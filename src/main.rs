use std::env;

use anyhow::{Context, bail};
use log::info;
use serde_json::json;

use trak::{Traker, arch::ModelBuilder, dataset::Dataset, output::OutputFn, specs::RunSpec};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let Some(path) = env::args().nth(1) else {
        bail!("usage: trak-featurize <run-spec.json>");
    };

    let spec = RunSpec::from_path(&path).with_context(|| format!("loading {path}"))?;
    let model = ModelBuilder::new().build(&spec.model, spec.param_seed)?;
    let dataset = Dataset::from_spec(spec.dataset)?;
    let out_fn = OutputFn::from_spec(spec.output);

    if dataset.len() > spec.trak.train_set_size {
        bail!(
            "the dataset has {} samples but the store only holds {}",
            dataset.len(),
            spec.trak.train_set_size
        );
    }

    let mut traker = Traker::new(&model, spec.trak)?;
    info!(samples = dataset.len(); "featurizing dataset");

    for (inds, batch) in dataset.batches(spec.batch_size) {
        traker.featurize(&out_fn, &out_fn, &model, batch, &inds, spec.mode)?;
    }

    let store = traker.store();
    let features: Vec<Vec<f32>> = store
        .features()
        .rows()
        .into_iter()
        .map(|row| row.to_vec())
        .collect();

    let summary = json!({
        "grad_dim": traker.featurizer().grad_dim(),
        "proj_dim": traker.featurizer().proj_dim(),
        "featurized": store.num_featurized(),
        "features": features,
        "out_to_loss": store.out_to_loss().to_vec(),
    });

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
