//! Monte Carlo estimation of logical error rates for stabilizer codes.
//!
//! This crate provides the engine behind logical-vs-physical error rate
//! curves: a dense state-vector simulator with stochastic Kraus noise,
//! stabilizer codes with lookup-table decoding, single-qubit noise channel
//! families, the random trial-state sampler, the per-cell estimator and the
//! sweep driver that turns a grid of cells into labeled curve sets.

use thiserror::Error;

/// Noise channels described by single-qubit Kraus operators.
///
/// Provides the validated `KrausChannel` instance type, the
/// `NoiseChannelFamily` capability that maps a strength in [0, 1] to a
/// channel, the standard families (amplitude damping, dephasing, bit flip,
/// phase flip, depolarizing) and an ordered registry.
pub mod channel;

/// Stabilizer codes and the code catalog.
///
/// A code is consumed through the `Code` trait: physical qubit count `n`,
/// logical qubit count `k`, an encode operation and a decode operation.
/// `StabilizerCode` builds both from stabilizer generators and logical
/// operators; `CodeCatalog` resolves code identifiers.
pub mod code;

/// Logical error estimator for a single (code, channel) pair.
///
/// Runs independent trials, optionally on the rayon pool, each with its own
/// random stream, and reports the fraction of trials that ended in a logical
/// error.
pub mod estimator;

/// Pauli operators in symplectic bit-mask form.
pub mod pauli;

/// Random logical input states and their exact inverses.
pub mod sampler;

/// The trial simulator capability and its state-vector implementation.
///
/// Composes preparation, encoding, per-qubit noise, decoding and the
/// inverse preparation, then measures the logical register.
pub mod simulator;

/// Dense state vectors over a small qubit register.
pub mod state;

/// Parameter sweeps over channel families, codes and strengths.
///
/// Drives the estimator over the full grid, accumulates one curve set per
/// channel family and hands it to a renderer.
pub mod sweep;

pub use channel::{ChannelRegistry, FnChannelFamily, KrausChannel, NoiseChannelFamily, StandardChannel};
pub use code::{Code, CodeCatalog, CodeDefinition, CodeProvider, StabilizerCode};
pub use estimator::LogicalErrorEstimator;
pub use sampler::{InitStateMode, PolarSampling, TrialSampler, TrialState};
pub use simulator::{Simulator, StateVectorSimulator, TrialOutcome};
pub use sweep::{
    Curve, CurveRenderer, CurveSet, ErrorRatePoint, NullRenderer, SweepConfig, SweepDriver,
    SweepResult,
};

/// Result alias used throughout the engine.
pub type Result<T> = core::result::Result<T, QlerError>;

/// Errors returned by the estimation engine.
///
/// Every variant is fatal to the run that produced it. `stage()` names the
/// part of the pipeline that failed so front ends can report it.
#[derive(Debug, Clone, Error)]
pub enum QlerError {
    /// A run parameter was rejected before any simulation started.
    ///
    /// Covers a zero trial count, empty code or channel lists, an empty
    /// strength grid and grid values outside [0, 1].
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The code provider does not know this identifier.
    #[error("unknown code '{0}'")]
    UnknownCode(String),

    /// No channel family with this name is registered.
    #[error("unknown noise channel '{0}'")]
    UnknownChannel(String),

    /// A channel family was asked for a strength outside [0, 1].
    #[error("strength {strength} is outside [0, 1] for channel '{channel}'")]
    InvalidStrength { channel: String, strength: f64 },

    /// Kraus operators that do not form a trace-preserving channel.
    #[error("invalid noise channel: {0}")]
    InvalidChannel(String),

    /// Stabilizer generators or logical operators that do not define a code.
    #[error("invalid code '{name}': {reason}")]
    InvalidCode { name: String, reason: String },

    /// The simulator could not complete a trial.
    #[error("simulation failed: {0}")]
    Simulation(String),

    /// The curve renderer failed to emit a curve set.
    #[error("rendering failed: {0}")]
    Render(String),
}

/// Pipeline stage a `QlerError` originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    InputValidation,
    CodeLookup,
    ChannelConstruction,
    Simulation,
    Rendering,
}

impl core::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            FailureStage::InputValidation => "input validation",
            FailureStage::CodeLookup => "code lookup",
            FailureStage::ChannelConstruction => "channel construction",
            FailureStage::Simulation => "simulation",
            FailureStage::Rendering => "rendering",
        };
        f.write_str(label)
    }
}

impl QlerError {
    pub fn invalid_code(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCode {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Stage of the run this error aborted.
    pub fn stage(&self) -> FailureStage {
        match self {
            QlerError::InvalidInput(_) => FailureStage::InputValidation,
            QlerError::UnknownCode(_) | QlerError::InvalidCode { .. } => FailureStage::CodeLookup,
            QlerError::UnknownChannel(_)
            | QlerError::InvalidStrength { .. }
            | QlerError::InvalidChannel(_) => FailureStage::ChannelConstruction,
            QlerError::Simulation(_) => FailureStage::Simulation,
            QlerError::Render(_) => FailureStage::Rendering,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_classification() {
        assert_eq!(
            QlerError::InvalidInput("x".into()).stage(),
            FailureStage::InputValidation
        );
        assert_eq!(
            QlerError::UnknownCode("not_a_code".into()).stage(),
            FailureStage::CodeLookup
        );
        let err = QlerError::InvalidStrength {
            channel: "bit flip".into(),
            strength: 1.5,
        };
        assert_eq!(err.stage(), FailureStage::ChannelConstruction);
        assert!(err.to_string().contains("1.5"));
        assert_eq!(
            QlerError::Simulation("boom".into()).stage().to_string(),
            "simulation"
        );
    }
}
