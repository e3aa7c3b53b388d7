//! Test and helper mocks for rescale_core

use std::cell::RefCell;

use rescale_traits::{
    Aggregate, AtomicFrame, BoxError, CoreModel, Dataset, Model, ModelBuilder, ModelOutput,
    Quantity, StatisticMode, StatisticsOptions, Tensor,
};

/// Dataset with fixed statistics that records every aggregate request.
#[derive(Debug, Clone)]
pub struct StubDataset {
    pub force_rms: f64,
    pub energy_mean: f64,
    pub energy_std: f64,
    pub per_species_mean: Vec<f64>,
    pub per_species_std: Vec<f64>,
    pub type_names: Vec<String>,
    calls: RefCell<Vec<(Quantity, StatisticMode)>>,
    last_options: RefCell<Option<StatisticsOptions>>,
}

impl Default for StubDataset {
    fn default() -> Self {
        Self {
            force_rms: 1.0,
            energy_mean: -10.0,
            energy_std: 2.0,
            per_species_mean: vec![-1.0, -2.0],
            per_species_std: vec![0.5, 1.5],
            type_names: vec!["H".to_string(), "O".to_string()],
            calls: RefCell::new(Vec::new()),
            last_options: RefCell::new(None),
        }
    }
}

impl StubDataset {
    /// Number of requests made for `mode`.
    pub fn calls(&self, mode: StatisticMode) -> usize {
        self.calls.borrow().iter().filter(|(_, m)| *m == mode).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn last_options(&self) -> Option<StatisticsOptions> {
        self.last_options.borrow().clone()
    }
}

impl Dataset for StubDataset {
    fn len(&self) -> usize {
        8
    }

    fn num_types(&self) -> usize {
        self.type_names.len()
    }

    fn type_names(&self) -> &[String] {
        &self.type_names
    }

    fn statistics(
        &self,
        fields: &[Quantity],
        modes: &[StatisticMode],
        options: &StatisticsOptions,
    ) -> Result<Vec<Aggregate>, BoxError> {
        *self.last_options.borrow_mut() = Some(options.clone());
        let mut out = Vec::with_capacity(fields.len());
        for (field, mode) in fields.iter().zip(modes) {
            self.calls.borrow_mut().push((*field, *mode));
            out.push(match mode {
                StatisticMode::Rms => Aggregate::Rms(Tensor::Scalar(self.force_rms)),
                StatisticMode::MeanStd => Aggregate::MeanStd {
                    mean: Tensor::Scalar(self.energy_mean),
                    std: Tensor::Scalar(self.energy_std),
                },
                StatisticMode::PerSpeciesMeanStd => Aggregate::MeanStd {
                    mean: Tensor::PerSpecies(self.per_species_mean.clone()),
                    std: Tensor::PerSpecies(self.per_species_std.clone()),
                },
            });
        }
        Ok(out)
    }
}

/// Core model that predicts one unit of energy per atom and a unit x-force.
#[derive(Debug, Clone)]
pub struct StubModel {
    outputs: Vec<Quantity>,
    pub params: Vec<(String, Vec<f64>)>,
}

impl StubModel {
    pub fn new(outputs: &[Quantity]) -> Self {
        Self {
            outputs: outputs.to_vec(),
            params: vec![("weight".to_string(), vec![0.5; 4])],
        }
    }
}

impl Model for StubModel {
    fn produces(&self, quantity: Quantity) -> bool {
        self.outputs.contains(&quantity)
    }

    fn forward(&self, frame: &AtomicFrame) -> Result<ModelOutput, BoxError> {
        let n = frame.num_atoms();
        Ok(ModelOutput {
            total_energy: self
                .produces(Quantity::TotalEnergy)
                .then_some(n as f64),
            per_atom_energy: self
                .produces(Quantity::PerAtomEnergy)
                .then(|| vec![1.0; n]),
            forces: self
                .produces(Quantity::Forces)
                .then(|| vec![[1.0, 0.0, 0.0]; n]),
        })
    }
}

impl CoreModel for StubModel {
    fn visit_parameters_mut(&mut self, visit: &mut dyn FnMut(&str, &mut [f64])) {
        for (name, values) in &mut self.params {
            visit(name.as_str(), values.as_mut_slice());
        }
    }
}

/// Builds `StubModel`s and keeps the configuration it was handed.
#[derive(Debug, Default)]
pub struct StubBuilder {
    pub outputs: Vec<Quantity>,
    seen: RefCell<Option<toml::Table>>,
}

impl StubBuilder {
    pub fn new(outputs: &[Quantity]) -> Self {
        Self {
            outputs: outputs.to_vec(),
            seen: RefCell::new(None),
        }
    }

    pub fn seen_config(&self) -> Option<toml::Table> {
        self.seen.borrow().clone()
    }
}

impl ModelBuilder for StubBuilder {
    fn build(&self, config: &toml::Table) -> Result<Box<dyn CoreModel>, BoxError> {
        *self.seen.borrow_mut() = Some(config.clone());
        Ok(Box::new(StubModel::new(&self.outputs)))
    }
}
