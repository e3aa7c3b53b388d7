//! Model Assembler: core model + output-rescaling adapter (+ optional compile).

use rescale_traits::{CoreModel, Model, ModelCompiler, Quantity};

use crate::data_error::map_model_error;
use crate::error::{CalibrationError, Result};
use crate::rescale::{RescaleOutput, RescaleParams};

/// Quantities the adapter rescales: total energy always, forces and per-atom
/// energy only when the core model produces them.
pub fn scale_targets<M: Model + ?Sized>(model: &M) -> Vec<Quantity> {
    let mut keys = vec![Quantity::TotalEnergy];
    for q in [Quantity::Forces, Quantity::PerAtomEnergy] {
        if model.produces(q) {
            keys.push(q);
        }
    }
    keys
}

/// Resolved global parameters handed to the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlobalRescale {
    pub scale: Option<f64>,
    pub shift: Option<f64>,
    pub trainable_scale: bool,
    pub trainable_shift: bool,
}

pub fn assemble(core: Box<dyn CoreModel>, global: GlobalRescale) -> RescaleOutput {
    let params = RescaleParams {
        scale_keys: scale_targets(core.as_ref()),
        shift_keys: vec![Quantity::TotalEnergy],
        scale_by: global.scale,
        shift_by: global.shift,
        trainable_scale: global.trainable_scale,
        trainable_shift: global.trainable_shift,
    };
    tracing::info!(
        scale = ?global.scale,
        shift = ?global.shift,
        scale_keys = ?params.scale_keys,
        "initially outputs are scaled and energies shifted"
    );
    RescaleOutput::new(core, params)
}

/// Box the assembled model, compiling it first when `compile` is set.
pub fn finalize(
    model: RescaleOutput,
    compile: bool,
    compiler: Option<&dyn ModelCompiler>,
) -> Result<Box<dyn Model>> {
    let boxed: Box<dyn Model> = Box::new(model);
    if !compile {
        return Ok(boxed);
    }
    let compiler = compiler.ok_or_else(|| eyre::Report::new(CalibrationError::MissingCompiler))?;
    let compiled = compiler
        .compile(boxed)
        .map_err(|e| eyre::Report::new(map_model_error(e.as_ref())))?;
    tracing::info!("successfully compiled model");
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::StubModel;
    use rstest::rstest;

    #[rstest]
    #[case(&[Quantity::TotalEnergy], &[Quantity::TotalEnergy])]
    #[case(&[Quantity::TotalEnergy, Quantity::Forces], &[Quantity::TotalEnergy, Quantity::Forces])]
    #[case(
        &[Quantity::PerAtomEnergy, Quantity::TotalEnergy, Quantity::Forces],
        &[Quantity::TotalEnergy, Quantity::Forces, Quantity::PerAtomEnergy]
    )]
    #[case(&[Quantity::PerAtomEnergy], &[Quantity::TotalEnergy, Quantity::PerAtomEnergy])]
    fn targets_follow_declared_outputs(
        #[case] produced: &[Quantity],
        #[case] expected: &[Quantity],
    ) {
        assert_eq!(scale_targets(&StubModel::new(produced)), expected);
    }

    #[test]
    fn compile_without_compiler_is_an_error() {
        let m = assemble(
            Box::new(StubModel::new(&[Quantity::TotalEnergy])),
            GlobalRescale::default(),
        );
        let Err(err) = finalize(m, true, None) else {
            panic!("compile_model without a compiler must fail");
        };
        assert_eq!(
            err.downcast_ref::<CalibrationError>(),
            Some(&CalibrationError::MissingCompiler)
        );
    }
}
