use std::cell::Cell;
use std::rc::Rc;

use rescale_config::{FINAL_CONFIG_FILE, load_file, load_toml};
use rescale_core::{CalibrationError, prepare, run};
use rescale_data::{InMemoryDataset, ReferenceModelBuilder};
use rescale_traits::{
    AtomicFrame, BoxError, Model, ModelCompiler, ModelOutput, Quantity, TrainingLoop,
};

fn water() -> InMemoryDataset {
    let frames = [(2usize, 1usize, -76.4), (4, 2, -152.9), (2, 2, -151.1), (1, 1, -75.6)]
        .into_iter()
        .map(|(h, o, e)| {
            let mut species = vec![0; h];
            species.extend(std::iter::repeat_n(1, o));
            let n = species.len();
            AtomicFrame {
                species,
                positions: (0..n).map(|i| [i as f64 * 0.5, 0.0, 0.0]).collect(),
                total_energy: Some(e),
                forces: Some((0..n).map(|i| [0.1 * i as f64, -0.2, 0.05]).collect()),
            }
        })
        .collect();
    InMemoryDataset::new(frames, vec!["H".into(), "O".into()]).unwrap()
}

#[derive(Default)]
struct RecordingTrainer {
    config: Option<toml::Table>,
    energy: Option<f64>,
}

impl TrainingLoop for RecordingTrainer {
    fn train(&mut self, model: Box<dyn Model>, config: &toml::Table) -> Result<(), BoxError> {
        let out = model.forward(&AtomicFrame {
            species: vec![0, 1],
            ..AtomicFrame::default()
        })?;
        self.energy = out.total_energy;
        self.config = Some(config.clone());
        Ok(())
    }
}

struct CountingCompiler(Rc<Cell<usize>>);

struct Compiled(Box<dyn Model>);

impl Model for Compiled {
    fn produces(&self, quantity: Quantity) -> bool {
        self.0.produces(quantity)
    }

    fn forward(&self, frame: &AtomicFrame) -> Result<ModelOutput, BoxError> {
        self.0.forward(frame)
    }
}

impl ModelCompiler for CountingCompiler {
    fn compile(&self, model: Box<dyn Model>) -> Result<Box<dyn Model>, BoxError> {
        self.0.set(self.0.get() + 1);
        Ok(Box::new(Compiled(model)))
    }
}

#[test]
fn run_writes_final_config_before_training() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_toml(&format!(
        r#"
root = '{}'
run_name = "water"
loss_coeffs = ["forces", "total_energy"]
model_initializers = ["zeros"]
"#,
        dir.path().display()
    ))
    .unwrap();
    let mut trainer = RecordingTrainer::default();

    let path = run(cfg, &water(), &ReferenceModelBuilder, None, &mut trainer).unwrap();

    assert_eq!(path, dir.path().join("water").join(FINAL_CONFIG_FILE));
    let saved = load_file(&path).unwrap();
    assert_eq!(saved.get("num_types").and_then(toml::Value::as_integer), Some(2));
    assert_eq!(
        saved.get("type_names"),
        Some(&toml::Value::Array(vec!["H".into(), "O".into()]))
    );
    assert_eq!(trainer.config.as_ref(), Some(saved.as_table()));

    // zero-initialized species energies at the origin leave only the energy-mean shift
    let mean = (-76.4 - 152.9 - 151.1 - 75.6) / 4.0;
    let energy = trainer.energy.expect("model produces total energy");
    assert!((energy - mean).abs() < 1e-9, "{energy} vs {mean}");
}

#[test]
fn per_species_run_persists_relative_values() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_toml(&format!(
        r#"
root = '{}'
global_rescale_shift = "none"
global_rescale_scale = 2.0
PerSpeciesScaleShift_enable = true
PerSpeciesScaleShift_scales = [4.0, 6.0]
PerSpeciesScaleShift_shifts = "dataset_per_species_energy_mean"
[PerSpeciesScaleShift_algorithm_kwargs]
algorithm = "least_squares"
"#,
        dir.path().display()
    ))
    .unwrap();

    let path = run(
        cfg,
        &water(),
        &ReferenceModelBuilder,
        None,
        &mut RecordingTrainer::default(),
    )
    .unwrap();
    let saved = load_file(&path).unwrap();
    assert_eq!(
        saved.get("PerSpeciesScaleShift_scales"),
        Some(&toml::Value::Array(vec![
            toml::Value::Float(2.0),
            toml::Value::Float(3.0)
        ]))
    );
    let shifts = saved
        .get("PerSpeciesScaleShift_shifts")
        .and_then(toml::Value::as_array)
        .expect("resolved shifts are persisted");
    assert_eq!(shifts.len(), 2);
    assert!(shifts.iter().all(toml::Value::is_float));
}

#[test]
fn compile_step_runs_once_when_enabled() {
    let calls = Rc::new(Cell::new(0));
    let compiler = CountingCompiler(calls.clone());
    let cfg = load_toml("compile_model = true").unwrap();

    let prepared = prepare(cfg, &water(), &ReferenceModelBuilder, Some(&compiler)).unwrap();
    assert_eq!(calls.get(), 1);
    assert!(prepared.model.produces(Quantity::Forces));
}

#[test]
fn compile_step_is_skipped_by_default() {
    let calls = Rc::new(Cell::new(0));
    let compiler = CountingCompiler(calls.clone());
    prepare(load_toml("").unwrap(), &water(), &ReferenceModelBuilder, Some(&compiler)).unwrap();
    assert_eq!(calls.get(), 0);
}

#[test]
fn missing_force_labels_make_force_rms_unsatisfiable() {
    let mut frames: Vec<AtomicFrame> = water().frames().to_vec();
    frames[1].forces = None;
    let ds = InMemoryDataset::new(frames, vec!["H".into(), "O".into()]).unwrap();
    let cfg = load_toml(r#"loss_coeffs = ["forces", "total_energy"]"#).unwrap();

    let err = prepare(cfg, &ds, &ReferenceModelBuilder, None).unwrap_err();
    match err.downcast_ref::<CalibrationError>() {
        Some(CalibrationError::UnsatisfiableStatistic { statistic, reason }) => {
            assert_eq!(statistic, "dataset_force_rms");
            assert!(reason.contains("structure 1"), "{reason}");
        }
        other => panic!("expected UnsatisfiableStatistic, got {other:?}"),
    }
}
