//! Strength sweeps over channel families and codes.

use crate::channel::NoiseChannelFamily;
use crate::code::CodeProvider;
use crate::estimator::LogicalErrorEstimator;
use crate::sampler::{InitStateMode, PolarSampling, TrialSampler};
use crate::simulator::Simulator;
use crate::{QlerError, Result};
use qler_common::defaults::{GRID_POINTS, NUM_TRIALS};
use std::sync::Arc;
use tracing::{debug, info, info_span};

/// Estimated logical error rate for one (code, channel, strength) cell.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorRatePoint {
    pub code_id: String,
    pub channel_name: String,
    pub strength: f64,
    pub trials: usize,
    pub errors: usize,
    /// `errors / trials`, always in [0, 1].
    pub rate: f64,
}

impl ErrorRatePoint {
    pub fn new(
        code_id: impl Into<String>,
        channel_name: impl Into<String>,
        strength: f64,
        trials: usize,
        errors: usize,
    ) -> Self {
        let rate = if trials == 0 {
            0.0
        } else {
            errors as f64 / trials as f64
        };
        Self {
            code_id: code_id.into(),
            channel_name: channel_name.into(),
            strength,
            trials,
            errors,
            rate,
        }
    }

    /// Binomial standard error of the rate.
    pub fn standard_error(&self) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        (self.rate * (1.0 - self.rate) / self.trials as f64).sqrt()
    }

    /// Wilson score interval at `z` standard deviations (1.96 for 95%).
    ///
    /// Unlike the normal approximation it stays inside [0, 1] and has
    /// nonzero width when no errors (or only errors) were observed.
    pub fn wilson_interval(&self, z: f64) -> (f64, f64) {
        if self.trials == 0 {
            return (0.0, 1.0);
        }
        let n = self.trials as f64;
        let p = self.rate;
        let z2 = z * z;
        let denom = 1.0 + z2 / n;
        let center = (p + z2 / (2.0 * n)) / denom;
        let half = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denom;
        ((center - half).max(0.0), (center + half).min(1.0))
    }
}

/// Rates of one code across the strength grid, in grid order.
#[derive(Clone, Debug, PartialEq)]
pub struct Curve {
    pub code_id: String,
    pub points: Vec<ErrorRatePoint>,
}

impl Curve {
    pub fn strengths(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.strength).collect()
    }

    pub fn rates(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.rate).collect()
    }
}

/// All curves measured under one channel family.
#[derive(Clone, Debug, PartialEq)]
pub struct CurveSet {
    pub channel_label: String,
    pub curves: Vec<Curve>,
}

impl CurveSet {
    pub fn new(channel_label: impl Into<String>) -> Self {
        Self {
            channel_label: channel_label.into(),
            curves: Vec::new(),
        }
    }
}

/// Curve sets in channel-list order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SweepResult {
    pub curve_sets: Vec<CurveSet>,
}

impl SweepResult {
    /// First curve for `code_id` under the channel labelled `channel`.
    pub fn curve(&self, channel: &str, code_id: &str) -> Option<&Curve> {
        self.curve_sets
            .iter()
            .filter(|s| s.channel_label == channel)
            .flat_map(|s| s.curves.iter())
            .find(|c| c.code_id == code_id)
    }

    pub fn points(&self) -> impl Iterator<Item = &ErrorRatePoint> {
        self.curve_sets
            .iter()
            .flat_map(|s| s.curves.iter())
            .flat_map(|c| c.points.iter())
    }
}

/// Receives each finished curve set exactly once.
pub trait CurveRenderer {
    fn render(&mut self, curves: &CurveSet) -> Result<()>;
}

/// Renderer that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderer;

impl CurveRenderer for NullRenderer {
    fn render(&mut self, _curves: &CurveSet) -> Result<()> {
        Ok(())
    }
}

/// `points` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (points - 1) as f64;
            (0..points)
                .map(|i| {
                    if i == points - 1 {
                        end
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}

/// Parameters shared by every cell of a sweep.
#[derive(Clone, Debug, PartialEq)]
pub struct SweepConfig {
    pub mode: InitStateMode,
    pub polar: PolarSampling,
    pub num_trials: usize,
    pub strength_grid: Vec<f64>,
    /// Base seed. `None` draws a fresh one per run.
    pub seed: Option<u64>,
    /// Run trials inside a cell on the rayon pool.
    pub parallel: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            mode: InitStateMode::Discrete,
            polar: PolarSampling::default(),
            num_trials: NUM_TRIALS,
            strength_grid: linspace(0.0, 1.0, GRID_POINTS),
            seed: None,
            parallel: true,
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_trials == 0 {
            return Err(QlerError::InvalidInput(
                "number of trials must be positive".into(),
            ));
        }
        if self.strength_grid.is_empty() {
            return Err(QlerError::InvalidInput("strength grid is empty".into()));
        }
        if let Some(bad) = self
            .strength_grid
            .iter()
            .find(|s| !(0.0..=1.0).contains(*s))
        {
            return Err(QlerError::InvalidInput(format!(
                "strength {} is outside [0, 1]",
                bad
            )));
        }
        Ok(())
    }

    pub fn sampler(&self) -> TrialSampler {
        TrialSampler::new(self.mode).with_polar(self.polar)
    }
}

/// SplitMix64 finalizer over the base seed advanced `index + 1` steps.
pub fn cell_seed(base: u64, index: u64) -> u64 {
    let mut z = base.wrapping_add(index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Runs the estimator over {family} x {code} x {strength}.
pub struct SweepDriver<'a> {
    codes: &'a dyn CodeProvider,
    simulator: &'a dyn Simulator,
    config: SweepConfig,
}

impl<'a> SweepDriver<'a> {
    pub fn new(
        codes: &'a dyn CodeProvider,
        simulator: &'a dyn Simulator,
        config: SweepConfig,
    ) -> Self {
        Self {
            codes,
            simulator,
            config,
        }
    }

    /// Estimates every cell and returns one curve set per family.
    ///
    /// Families are the outer loop, codes the middle loop and strengths the
    /// inner loop, so each curve lists its points in grid order. A family's
    /// curve set goes to `renderer` as soon as the family is done. Any
    /// failure aborts the sweep; sets already rendered stay rendered.
    pub fn run<S: AsRef<str>>(
        &self,
        code_ids: &[S],
        families: &[Arc<dyn NoiseChannelFamily>],
        renderer: &mut dyn CurveRenderer,
    ) -> Result<SweepResult> {
        self.config.validate()?;
        if code_ids.is_empty() {
            return Err(QlerError::InvalidInput("no codes selected".into()));
        }
        if families.is_empty() {
            return Err(QlerError::InvalidInput(
                "no noise channels selected".into(),
            ));
        }

        let base_seed = self.config.seed.unwrap_or_else(rand::random);
        let estimator = LogicalErrorEstimator::new(self.simulator, self.config.sampler())
            .parallel(self.config.parallel);
        debug!(
            base_seed,
            codes = code_ids.len(),
            channels = families.len(),
            points = self.config.strength_grid.len(),
            trials = self.config.num_trials,
            "starting sweep"
        );

        let mut result = SweepResult::default();
        let mut cell: u64 = 0;
        for family in families {
            let span = info_span!("channel", name = family.name());
            let _enter = span.enter();

            let mut set = CurveSet::new(family.name());
            for id in code_ids {
                let id = id.as_ref();
                let mut curve = Curve {
                    code_id: id.to_string(),
                    points: Vec::with_capacity(self.config.strength_grid.len()),
                };
                for &strength in &self.config.strength_grid {
                    let code = self.codes.get_code(id)?;
                    let channel = family.channel(strength)?;
                    let seed = cell_seed(base_seed, cell);
                    cell += 1;

                    let errors =
                        estimator.tally(code.as_ref(), &channel, self.config.num_trials, seed)?;
                    let point = ErrorRatePoint::new(
                        id,
                        family.name(),
                        strength,
                        self.config.num_trials,
                        errors,
                    );
                    info!(
                        code = id,
                        strength,
                        rate = point.rate,
                        "point finished"
                    );
                    curve.points.push(point);
                }
                set.curves.push(curve);
            }

            renderer.render(&set)?;
            result.curve_sets.push(set);
        }
        Ok(result)
    }
}
