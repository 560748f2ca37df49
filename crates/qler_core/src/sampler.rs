//! Random logical input states for trials.
//!
//! Each trial prepares its logical register with a random circuit and undoes
//! it after decoding; a perfect round trip therefore ends in `|0...0>`.

use qler_common::circuit::Circuit;
use qler_common::isa::{Instruction, Opcode};
use rand::Rng;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// How logical input states are drawn. Fixed for a whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InitStateMode {
    /// Each logical qubit is `|0>` or `|1>` with equal probability.
    #[default]
    Discrete,
    /// Each logical qubit is a random pure state on the Bloch sphere.
    Continuous,
}

impl fmt::Display for InitStateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitStateMode::Discrete => f.write_str("discrete"),
            InitStateMode::Continuous => f.write_str("continuous"),
        }
    }
}

impl FromStr for InitStateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discrete" | "0" => Ok(InitStateMode::Discrete),
            "continuous" | "1" => Ok(InitStateMode::Continuous),
            other => Err(format!("unknown init state mode '{}'", other)),
        }
    }
}

/// Distribution of the polar angle in continuous mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PolarSampling {
    /// θ uniform on [0, π). Over-weights the poles; kept as the default so
    /// curves stay comparable with earlier runs.
    #[default]
    UniformAngle,
    /// cos θ uniform on [-1, 1], which is uniform over the sphere.
    UniformCosine,
}

/// Preparation circuit for one trial and its exact inverse.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrialState {
    pub prep: Circuit,
    pub inverse_prep: Circuit,
}

/// Draws trial states according to a fixed mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrialSampler {
    pub mode: InitStateMode,
    pub polar: PolarSampling,
}

impl TrialSampler {
    /// Creates a sampler for the given input-state policy.
    ///
    /// # Arguments
    ///
    /// * `mode` - Discrete computational basis states or continuous Bloch
    ///   sphere states.
    ///
    /// # Returns
    ///
    /// A sampler using the default polar angle distribution,
    /// [`PolarSampling::UniformAngle`].
    pub fn new(mode: InitStateMode) -> Self {
        Self {
            mode,
            polar: PolarSampling::default(),
        }
    }

    /// Replaces the polar angle distribution. Ignored in discrete mode.
    pub fn with_polar(mut self, polar: PolarSampling) -> Self {
        self.polar = polar;
        self
    }

    /// Draws a preparation for `k` logical qubits.
    ///
    /// Discrete mode flips each qubit on a fair coin, and the inverse is the
    /// same set of X gates. Continuous mode applies `Ry(θ)` then `Rz(φ)` per
    /// qubit, taking |0> to the Bloch vector at polar angle θ and azimuth φ.
    /// The inverse is the reversed circuit with negated angles.
    pub fn sample<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> TrialState {
        let mut prep = Circuit::with_capacity(2 * k);
        for q in 0..k as u16 {
            match self.mode {
                InitStateMode::Discrete => {
                    if rng.gen_bool(0.5) {
                        prep.gate(Opcode::GateX, q);
                    }
                }
                InitStateMode::Continuous => {
                    let phi = rng.gen_range(0.0..2.0 * PI);
                    let theta = match self.polar {
                        PolarSampling::UniformAngle => rng.gen_range(0.0..PI),
                        PolarSampling::UniformCosine => rng.gen_range(-1.0f64..=1.0).acos(),
                    };
                    prep.push(Instruction::ry(q, theta));
                    prep.push(Instruction::rz(q, phi));
                }
            }
        }
        let inverse_prep = prep.inverse();
        TrialState { prep, inverse_prep }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pauli::Pauli;
    use crate::state::StateVector;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn discrete_flip_fraction_is_near_half() {
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        let sampler = TrialSampler::new(InitStateMode::Discrete);
        let draws = 10_000;
        let flips = (0..draws)
            .filter(|_| !sampler.sample(1, &mut rng).prep.is_empty())
            .count();
        let fraction = flips as f64 / draws as f64;
        assert!((fraction - 0.5).abs() < 0.03, "fraction {}", fraction);
    }

    #[test]
    fn discrete_inverse_matches_prep() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let sampler = TrialSampler::new(InitStateMode::Discrete);
        for _ in 0..100 {
            let t = sampler.sample(4, &mut rng);
            let mut fwd: Vec<_> = t.prep.iter().map(|i| i.qubit).collect();
            let mut inv: Vec<_> = t.inverse_prep.iter().map(|i| i.qubit).collect();
            fwd.sort_unstable();
            inv.sort_unstable();
            assert_eq!(fwd, inv);
            assert!(t.inverse_prep.iter().all(|i| i.opcode == Opcode::GateX));
        }
    }

    #[test]
    fn continuous_angles_stay_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for polar in [PolarSampling::UniformAngle, PolarSampling::UniformCosine] {
            let sampler = TrialSampler::new(InitStateMode::Continuous).with_polar(polar);
            for _ in 0..500 {
                let t = sampler.sample(2, &mut rng);
                assert_eq!(t.prep.len(), 4);
                for i in t.prep.iter() {
                    match i.opcode {
                        Opcode::GateRz => assert!((0.0..2.0 * PI).contains(&i.angle)),
                        Opcode::GateRy => assert!((0.0..=PI).contains(&i.angle)),
                        other => panic!("unexpected {:?}", other),
                    }
                }
            }
        }
    }

    #[test]
    fn cosine_sampling_balances_hemispheres() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let sampler =
            TrialSampler::new(InitStateMode::Continuous).with_polar(PolarSampling::UniformCosine);
        let draws = 20_000;
        let mut near_pole = 0;
        for _ in 0..draws {
            let theta = sampler.sample(1, &mut rng).prep.instructions()[0].angle;
            if theta < PI / 3.0 {
                near_pole += 1;
            }
        }
        // P(θ < π/3) = (1 - cos(π/3)) / 2 = 0.25 on the sphere.
        let fraction = near_pole as f64 / draws as f64;
        assert!((fraction - 0.25).abs() < 0.02, "fraction {}", fraction);
    }

    #[test]
    fn continuous_states_point_along_the_sampled_bloch_vector() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let sampler = TrialSampler::new(InitStateMode::Continuous);
        for _ in 0..50 {
            let t = sampler.sample(1, &mut rng);
            let (theta, phi) = (t.prep.instructions()[0].angle, t.prep.instructions()[1].angle);
            let mut s = StateVector::new(1).unwrap();
            s.apply_circuit(&t.prep).unwrap();
            let expect = |letter: &str| {
                let p = Pauli::from_letters(letter).unwrap();
                s.overlap(&s.pauli_image(&p)).re
            };
            let (x, y, z) = (expect("X"), expect("Y"), expect("Z"));
            assert!((x - theta.sin() * phi.cos()).abs() < 1e-9);
            assert!((y - theta.sin() * phi.sin()).abs() < 1e-9);
            assert!((z - theta.cos()).abs() < 1e-9);
        }
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("Continuous".parse::<InitStateMode>(), Ok(InitStateMode::Continuous));
        assert_eq!("0".parse::<InitStateMode>(), Ok(InitStateMode::Discrete));
        assert!("bloch".parse::<InitStateMode>().is_err());
    }
}
