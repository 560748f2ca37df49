//! Logical error rate estimation for one (code, channel) pair.

use crate::channel::KrausChannel;
use crate::code::Code;
use crate::sampler::TrialSampler;
use crate::simulator::Simulator;
use crate::{QlerError, Result};
use qler_common::defaults::SHOTS_PER_TRIAL;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;

/// Independent random stream for one trial of an estimate.
///
/// Streams for different trial indices under the same seed do not overlap,
/// so trials can run on any worker without sharing a generator.
pub fn trial_rng(seed: u64, trial: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(trial);
    rng
}

/// Estimates the logical error rate of a code under a channel.
///
/// Every trial draws its own logical input, runs one simulator call and
/// counts as an error when the round trip fails. Trials share no state, so
/// with `parallel` set they run on the rayon pool; results for a given seed
/// do not depend on the execution order.
pub struct LogicalErrorEstimator<'a> {
    simulator: &'a dyn Simulator,
    sampler: TrialSampler,
    shots: usize,
    parallel: bool,
}

impl<'a> LogicalErrorEstimator<'a> {
    /// Creates an estimator that runs trials on `simulator`.
    ///
    /// # Arguments
    ///
    /// * `simulator` - Executes one prepare, encode, noise, decode, unprepare
    ///   round per trial.
    /// * `sampler` - Draws the random logical input state of each trial.
    ///
    /// # Returns
    ///
    /// An estimator that fans trials out over the rayon pool. Call
    /// [`LogicalErrorEstimator::parallel`] with `false` to keep them on the
    /// calling thread.
    pub fn new(simulator: &'a dyn Simulator, sampler: TrialSampler) -> Self {
        Self {
            simulator,
            sampler,
            shots: SHOTS_PER_TRIAL,
            parallel: true,
        }
    }

    /// Chooses between the rayon pool and a serial loop. The error count for
    /// a given seed is the same either way.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Number of failed trials out of `num_trials`.
    ///
    /// Fails fast on `num_trials == 0`. A simulator error in any trial aborts
    /// the whole tally.
    pub fn tally(
        &self,
        code: &dyn Code,
        channel: &KrausChannel,
        num_trials: usize,
        seed: u64,
    ) -> Result<usize> {
        if num_trials == 0 {
            return Err(QlerError::InvalidInput(
                "number of trials must be positive".into(),
            ));
        }

        let errors = if self.parallel {
            (0..num_trials)
                .into_par_iter()
                .map(|t| self.run_trial(code, channel, seed, t as u64))
                .try_reduce(|| 0, |a, b| Ok(a + b))?
        } else {
            let mut errors = 0;
            for t in 0..num_trials {
                errors += self.run_trial(code, channel, seed, t as u64)?;
            }
            errors
        };

        debug!(
            code = code.name(),
            trials = num_trials,
            errors,
            "estimate finished"
        );
        Ok(errors)
    }

    /// Fraction of `num_trials` trials that ended in a logical error.
    pub fn estimate(
        &self,
        code: &dyn Code,
        channel: &KrausChannel,
        num_trials: usize,
        seed: u64,
    ) -> Result<f64> {
        let errors = self.tally(code, channel, num_trials, seed)?;
        Ok(errors as f64 / num_trials as f64)
    }

    fn run_trial(
        &self,
        code: &dyn Code,
        channel: &KrausChannel,
        seed: u64,
        trial: u64,
    ) -> Result<usize> {
        let mut rng = trial_rng(seed, trial);
        let state = self.sampler.sample(code.k(), &mut rng);
        let outcome = self
            .simulator
            .run_once(&state, code, channel, self.shots, &mut rng)?;
        Ok(outcome.is_error() as usize)
    }
}
