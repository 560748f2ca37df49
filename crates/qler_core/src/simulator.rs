//! Trial simulation.
//!
//! One trial runs `prep → encode → noise^{⊗n} → decode → inverse_prep` and
//! then reads the logical register. A perfect round trip leaves `|0...0>`,
//! so any measured 1 marks a logical error.

use crate::channel::KrausChannel;
use crate::code::Code;
use crate::sampler::TrialState;
use crate::state::StateVector;
use crate::{QlerError, Result};
use rand::RngCore;

/// Result of one trial.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrialOutcome {
    /// Shots whose logical register differed from `|0...0>`.
    pub defects: usize,
}

impl TrialOutcome {
    pub fn is_error(&self) -> bool {
        self.defects > 0
    }
}

impl From<bool> for TrialOutcome {
    fn from(error: bool) -> Self {
        Self {
            defects: error as usize,
        }
    }
}

/// Executes one composed trial.
pub trait Simulator: Send + Sync {
    /// Runs the trial for `shots` shots with `noise` applied independently
    /// to each of the code's physical qubits between encode and decode.
    fn run_once(
        &self,
        trial: &TrialState,
        code: &dyn Code,
        noise: &KrausChannel,
        shots: usize,
        rng: &mut dyn RngCore,
    ) -> Result<TrialOutcome>;
}

/// Dense state-vector simulator with trajectory-sampled Kraus noise.
#[derive(Clone, Copy, Debug, Default)]
pub struct StateVectorSimulator;

impl StateVectorSimulator {
    pub fn new() -> Self {
        Self
    }

    fn run_shot(
        &self,
        trial: &TrialState,
        code: &dyn Code,
        noise: &KrausChannel,
        rng: &mut dyn RngCore,
    ) -> Result<bool> {
        let mut state = StateVector::new(code.n())?;
        state.apply_circuit(&trial.prep)?;
        code.encode(&mut state)?;
        for q in 0..code.n() {
            state.apply_kraus(q, noise.operators(), rng)?;
        }
        code.decode(&mut state, rng)?;
        state.apply_circuit(&trial.inverse_prep)?;

        let mut flipped = false;
        for q in 0..code.k() {
            flipped |= state.measure_qubit(q, rng)?;
        }
        Ok(flipped)
    }
}

impl Simulator for StateVectorSimulator {
    fn run_once(
        &self,
        trial: &TrialState,
        code: &dyn Code,
        noise: &KrausChannel,
        shots: usize,
        rng: &mut dyn RngCore,
    ) -> Result<TrialOutcome> {
        if shots == 0 {
            return Err(QlerError::Simulation("shot count must be positive".into()));
        }
        if trial.prep.width() > code.k() || trial.inverse_prep.width() > code.k() {
            return Err(QlerError::Simulation(format!(
                "preparation touches {} qubits but {} has {} logical qubits",
                trial.prep.width().max(trial.inverse_prep.width()),
                code.name(),
                code.k()
            )));
        }

        let mut defects = 0;
        for _ in 0..shots {
            if self.run_shot(trial, code, noise, rng)? {
                defects += 1;
            }
        }
        Ok(TrialOutcome { defects })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{NoiseChannelFamily, StandardChannel};
    use crate::code::{CodeCatalog, CodeProvider};
    use crate::sampler::{InitStateMode, TrialSampler};
    use qler_common::circuit::Circuit;
    use qler_common::isa::{Instruction, Opcode};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn noiseless_trials_never_fail() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let sim = StateVectorSimulator::new();
        let catalog = CodeCatalog::builtin();
        let sampler = TrialSampler::new(InitStateMode::Continuous);
        for id in catalog.ids() {
            let code = catalog.get_code(id).unwrap();
            let noise = StandardChannel::Depolarizing.channel(0.0).unwrap();
            for _ in 0..10 {
                let trial = sampler.sample(code.k(), &mut rng);
                let outcome = sim.run_once(&trial, code.as_ref(), &noise, 1, &mut rng).unwrap();
                assert!(!outcome.is_error(), "{}", id);
            }
        }
    }

    #[test]
    fn certain_flips_defeat_the_repetition_code() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let sim = StateVectorSimulator::new();
        let code = CodeCatalog::builtin().get_code("bit_flip_code").unwrap();
        let noise = StandardChannel::BitFlip.channel(1.0).unwrap();
        let mut prep = Circuit::new();
        prep.gate(Opcode::GateX, 0);
        let trial = TrialState {
            inverse_prep: prep.inverse(),
            prep,
        };
        let outcome = sim.run_once(&trial, code.as_ref(), &noise, 3, &mut rng).unwrap();
        assert_eq!(outcome.defects, 3);
    }

    #[test]
    fn rejects_zero_shots_and_wide_preparations() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let sim = StateVectorSimulator::new();
        let code = CodeCatalog::builtin().get_code("five_qubit_code").unwrap();
        let noise = KrausChannel::identity();
        let trial = TrialState::default();
        assert!(sim.run_once(&trial, code.as_ref(), &noise, 0, &mut rng).is_err());

        let mut prep = Circuit::new();
        prep.push(Instruction::new(Opcode::GateX, 3));
        let wide = TrialState {
            inverse_prep: prep.inverse(),
            prep,
        };
        assert!(matches!(
            sim.run_once(&wide, code.as_ref(), &noise, 1, &mut rng),
            Err(QlerError::Simulation(_))
        ));
    }
}
