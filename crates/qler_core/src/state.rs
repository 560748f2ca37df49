//! Dense state vectors over a small qubit register.
//!
//! Amplitude index bit q corresponds to qubit q, so qubit 0 is the least
//! significant bit. All operations act in place. Noise is applied as a
//! quantum trajectory: one Kraus operator is drawn with its Born probability
//! and the state is renormalised, which reproduces the channel on average
//! over many trials.

use crate::pauli::Pauli;
use crate::{QlerError, Result};
use num_complex::Complex64;
use qler_common::circuit::Circuit;
use qler_common::defaults::MAX_SIMULATED_QUBITS;
use qler_common::isa::{Instruction, Opcode};
use rand::Rng;

/// Row-major 2x2 complex matrix.
pub type Matrix2 = [[Complex64; 2]; 2];

/// Norms below this are treated as a vanished state.
pub const NORM_TOLERANCE: f64 = 1e-12;

/// Standard single-qubit matrices.
pub mod gates {
    use super::Matrix2;
    use num_complex::Complex64;

    const ZERO: Complex64 = Complex64::new(0.0, 0.0);
    const ONE: Complex64 = Complex64::new(1.0, 0.0);
    const I: Complex64 = Complex64::new(0.0, 1.0);

    pub fn identity() -> Matrix2 {
        [[ONE, ZERO], [ZERO, ONE]]
    }

    pub fn pauli_x() -> Matrix2 {
        [[ZERO, ONE], [ONE, ZERO]]
    }

    pub fn pauli_y() -> Matrix2 {
        [[ZERO, -I], [I, ZERO]]
    }

    pub fn pauli_z() -> Matrix2 {
        [[ONE, ZERO], [ZERO, -ONE]]
    }

    /// `Rz(θ) = diag(e^{-iθ/2}, e^{iθ/2})`.
    pub fn rz(theta: f64) -> Matrix2 {
        [
            [Complex64::from_polar(1.0, -theta / 2.0), ZERO],
            [ZERO, Complex64::from_polar(1.0, theta / 2.0)],
        ]
    }

    /// `Ry(θ) = [[cos θ/2, -sin θ/2], [sin θ/2, cos θ/2]]`.
    pub fn ry(theta: f64) -> Matrix2 {
        let (s, c) = (theta / 2.0).sin_cos();
        [
            [Complex64::new(c, 0.0), Complex64::new(-s, 0.0)],
            [Complex64::new(s, 0.0), Complex64::new(c, 0.0)],
        ]
    }

    /// Multiplies a matrix by a real scalar.
    pub fn scaled(m: Matrix2, factor: f64) -> Matrix2 {
        [
            [m[0][0] * factor, m[0][1] * factor],
            [m[1][0] * factor, m[1][1] * factor],
        ]
    }
}

/// Pure state of an n-qubit register.
#[derive(Clone, Debug, PartialEq)]
pub struct StateVector {
    num_qubits: usize,
    amps: Vec<Complex64>,
}

impl StateVector {
    /// Creates the all-zero state `|0...0>`.
    pub fn new(num_qubits: usize) -> Result<Self> {
        if num_qubits == 0 || num_qubits > MAX_SIMULATED_QUBITS {
            return Err(QlerError::Simulation(format!(
                "register of {} qubits is outside 1..={}",
                num_qubits, MAX_SIMULATED_QUBITS
            )));
        }
        let mut amps = vec![Complex64::new(0.0, 0.0); 1 << num_qubits];
        amps[0] = Complex64::new(1.0, 0.0);
        Ok(Self { num_qubits, amps })
    }

    /// Wraps existing amplitudes; the length must be a power of two.
    pub fn from_amplitudes(amps: Vec<Complex64>) -> Result<Self> {
        let len = amps.len();
        if len < 2 || !len.is_power_of_two() {
            return Err(QlerError::Simulation(format!(
                "amplitude vector of length {} is not a qubit register",
                len
            )));
        }
        let num_qubits = len.trailing_zeros() as usize;
        if num_qubits > MAX_SIMULATED_QUBITS {
            return Err(QlerError::Simulation(format!(
                "register of {} qubits exceeds the simulator limit of {}",
                num_qubits, MAX_SIMULATED_QUBITS
            )));
        }
        Ok(Self { num_qubits, amps })
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn dimension(&self) -> usize {
        self.amps.len()
    }

    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amps
    }

    /// Replaces the amplitudes; the dimension must not change.
    pub fn set_amplitudes(&mut self, amps: Vec<Complex64>) -> Result<()> {
        if amps.len() != self.amps.len() {
            return Err(QlerError::Simulation(format!(
                "expected {} amplitudes, got {}",
                self.amps.len(),
                amps.len()
            )));
        }
        self.amps = amps;
        Ok(())
    }

    pub fn norm_sqr(&self) -> f64 {
        self.amps.iter().map(|a| a.norm_sqr()).sum()
    }

    /// Rescales to unit norm. Fails if the state has vanished.
    pub fn normalize(&mut self) -> Result<()> {
        let norm = self.norm_sqr().sqrt();
        if norm < NORM_TOLERANCE {
            return Err(QlerError::Simulation("state vector norm vanished".into()));
        }
        let inv = 1.0 / norm;
        for a in &mut self.amps {
            *a *= inv;
        }
        Ok(())
    }

    /// `<other|self>` for an amplitude vector of the same dimension.
    pub fn overlap(&self, other: &[Complex64]) -> Complex64 {
        other
            .iter()
            .zip(&self.amps)
            .map(|(o, a)| o.conj() * *a)
            .sum()
    }

    fn check_qubit(&self, q: usize) -> Result<()> {
        if q >= self.num_qubits {
            return Err(QlerError::Simulation(format!(
                "qubit {} out of range for a {}-qubit register",
                q, self.num_qubits
            )));
        }
        Ok(())
    }

    /// Applies a 2x2 matrix to qubit `q` without renormalising.
    pub fn apply_matrix(&mut self, q: usize, m: &Matrix2) {
        let bit = 1usize << q;
        for i in 0..self.amps.len() {
            if i & bit != 0 {
                continue;
            }
            let j = i | bit;
            let a0 = self.amps[i];
            let a1 = self.amps[j];
            self.amps[i] = m[0][0] * a0 + m[0][1] * a1;
            self.amps[j] = m[1][0] * a0 + m[1][1] * a1;
        }
    }

    pub fn apply_instruction(&mut self, instr: &Instruction) -> Result<()> {
        let q = instr.qubit as usize;
        self.check_qubit(q)?;
        let m = match instr.opcode {
            Opcode::GateX => gates::pauli_x(),
            Opcode::GateRz => gates::rz(instr.angle),
            Opcode::GateRy => gates::ry(instr.angle),
        };
        self.apply_matrix(q, &m);
        Ok(())
    }

    pub fn apply_circuit(&mut self, circuit: &Circuit) -> Result<()> {
        for instr in circuit {
            self.apply_instruction(instr)?;
        }
        Ok(())
    }

    /// Returns `P|self>` as a fresh amplitude vector.
    ///
    /// `P = i^{#Y} X^x Z^z`, so basis state `|b>` maps to
    /// `i^{#Y} (-1)^{|b & z|} |b ^ x>`.
    pub fn pauli_image(&self, p: &Pauli) -> Vec<Complex64> {
        let y_phase = match p.y_count() % 4 {
            0 => Complex64::new(1.0, 0.0),
            1 => Complex64::new(0.0, 1.0),
            2 => Complex64::new(-1.0, 0.0),
            _ => Complex64::new(0.0, -1.0),
        };
        let (x, z) = (p.x_mask() as usize, p.z_mask() as usize);
        let mut out = vec![Complex64::new(0.0, 0.0); self.amps.len()];
        for (b, a) in self.amps.iter().enumerate() {
            let sign = if (b & z).count_ones() % 2 == 1 { -1.0 } else { 1.0 };
            out[b ^ x] = y_phase * *a * sign;
        }
        out
    }

    pub fn apply_pauli(&mut self, p: &Pauli) {
        if !p.is_identity() {
            self.amps = self.pauli_image(p);
        }
    }

    /// Projectively measures the observable `p`.
    ///
    /// Returns `true` for eigenvalue -1. The state collapses onto the
    /// observed eigenspace via `(I ± P)/2` and is renormalised.
    pub fn measure_pauli<R: Rng + ?Sized>(&mut self, p: &Pauli, rng: &mut R) -> Result<bool> {
        if p.span() > self.num_qubits {
            return Err(QlerError::Simulation(format!(
                "observable spans {} qubits but the register has {}",
                p.span(),
                self.num_qubits
            )));
        }
        let image = self.pauli_image(p);
        // <self|P|self> is real for a Hermitian Pauli.
        let expectation = self.overlap(&image).re;
        let p_minus = ((1.0 - expectation) / 2.0).clamp(0.0, 1.0);
        let minus = rng.gen_bool(p_minus);
        let sign = if minus { -0.5 } else { 0.5 };
        for (a, b) in self.amps.iter_mut().zip(image) {
            *a = *a * 0.5 + b * sign;
        }
        self.normalize()?;
        Ok(minus)
    }

    /// Probability that measuring qubit `q` in Z yields 1.
    pub fn probability_one(&self, q: usize) -> f64 {
        let bit = 1usize << q;
        self.amps
            .iter()
            .enumerate()
            .filter(|(i, _)| i & bit != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum()
    }

    /// Measures qubit `q` in the computational basis and collapses.
    pub fn measure_qubit<R: Rng + ?Sized>(&mut self, q: usize, rng: &mut R) -> Result<bool> {
        self.check_qubit(q)?;
        let p1 = self.probability_one(q).clamp(0.0, 1.0);
        let one = rng.gen_bool(p1);
        let bit = 1usize << q;
        for (i, a) in self.amps.iter_mut().enumerate() {
            if (i & bit != 0) != one {
                *a = Complex64::new(0.0, 0.0);
            }
        }
        self.normalize()?;
        Ok(one)
    }

    /// Applies one Kraus operator of `ops` to qubit `q`, drawn with its Born
    /// probability `||K_j ψ||^2`, and renormalises.
    ///
    /// Returns the index of the operator that fired.
    pub fn apply_kraus<R: Rng + ?Sized>(
        &mut self,
        q: usize,
        ops: &[Matrix2],
        rng: &mut R,
    ) -> Result<usize> {
        self.check_qubit(q)?;
        if ops.is_empty() {
            return Err(QlerError::Simulation("empty Kraus operator set".into()));
        }
        if ops.len() == 1 {
            self.apply_matrix(q, &ops[0]);
            self.normalize()?;
            return Ok(0);
        }

        let bit = 1usize << q;
        let mut weights = Vec::with_capacity(ops.len());
        for m in ops {
            let mut w = 0.0;
            for i in (0..self.amps.len()).filter(|i| i & bit == 0) {
                let a0 = self.amps[i];
                let a1 = self.amps[i | bit];
                w += (m[0][0] * a0 + m[0][1] * a1).norm_sqr();
                w += (m[1][0] * a0 + m[1][1] * a1).norm_sqr();
            }
            weights.push(w);
        }

        let total: f64 = weights.iter().sum();
        if total < NORM_TOLERANCE {
            return Err(QlerError::Simulation(
                "every Kraus branch has zero probability".into(),
            ));
        }
        let mut r = rng.gen_range(0.0..total);
        let mut chosen = ops.len() - 1;
        for (j, w) in weights.iter().enumerate() {
            if r < *w {
                chosen = j;
                break;
            }
            r -= w;
        }
        // Skip zero-weight tail entries picked up by rounding.
        while weights[chosen] <= 0.0 && chosen > 0 {
            chosen -= 1;
        }

        self.apply_matrix(q, &ops[chosen]);
        self.normalize()?;
        Ok(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn rejects_oversized_register() {
        assert!(StateVector::new(0).is_err());
        assert!(StateVector::new(MAX_SIMULATED_QUBITS + 1).is_err());
        assert!(StateVector::from_amplitudes(vec![Complex64::new(1.0, 0.0); 3]).is_err());
    }

    #[test]
    fn x_on_each_qubit_builds_11() {
        let mut s = StateVector::new(2).unwrap();
        s.apply_instruction(&Instruction::new(Opcode::GateX, 0)).unwrap();
        assert!(approx(s.amplitudes()[1].norm_sqr(), 1.0));
        s.apply_instruction(&Instruction::new(Opcode::GateX, 1)).unwrap();
        assert!(approx(s.amplitudes()[3].norm_sqr(), 1.0));
        assert!(s.apply_instruction(&Instruction::new(Opcode::GateX, 2)).is_err());
    }

    #[test]
    fn rotations_undo() {
        let mut s = StateVector::new(1).unwrap();
        let mut c = Circuit::new();
        c.push(Instruction::rz(0, 1.1));
        c.push(Instruction::ry(0, 2.3));
        s.apply_circuit(&c).unwrap();
        assert!(!approx(s.probability_one(0), 0.0));
        s.apply_circuit(&c.inverse()).unwrap();
        assert!(approx(s.amplitudes()[0].norm_sqr(), 1.0));
    }

    #[test]
    fn pauli_y_phase() {
        let mut s = StateVector::new(1).unwrap();
        s.apply_pauli(&Pauli::from_letters("Y").unwrap());
        assert!(approx(s.amplitudes()[1].im, 1.0));
        s.apply_pauli(&Pauli::from_letters("Y").unwrap());
        assert!(approx(s.amplitudes()[0].re, 1.0));
    }

    #[test]
    fn measuring_a_stabilized_observable_is_deterministic() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut s = StateVector::new(2).unwrap();
        let zz = Pauli::from_letters("ZZ").unwrap();
        assert!(approx(s.overlap(&s.pauli_image(&zz)).re, 1.0));
        for _ in 0..20 {
            assert!(!s.measure_pauli(&zz, &mut rng).unwrap());
        }
        s.apply_pauli(&Pauli::from_letters("XI").unwrap());
        assert!(s.measure_pauli(&zz, &mut rng).unwrap());
    }

    #[test]
    fn measurement_collapses() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut s = StateVector::new(1).unwrap();
        s.apply_instruction(&Instruction::ry(0, std::f64::consts::FRAC_PI_2)).unwrap();
        let first = s.measure_qubit(0, &mut rng).unwrap();
        for _ in 0..10 {
            assert_eq!(s.measure_qubit(0, &mut rng).unwrap(), first);
        }
    }

    #[test]
    fn kraus_branch_follows_born_rule() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let ops = [gates::identity(), gates::scaled(gates::identity(), 0.0)];
        let mut s = StateVector::new(1).unwrap();
        for _ in 0..50 {
            assert_eq!(s.apply_kraus(0, &ops, &mut rng).unwrap(), 0);
        }

        let flip = [gates::scaled(gates::identity(), 0.0), gates::pauli_x()];
        assert_eq!(s.apply_kraus(0, &flip, &mut rng).unwrap(), 1);
        assert!(approx(s.probability_one(0), 1.0));
    }
}
