//! Stabilizer codes with lookup-table decoding.
//!
//! A `StabilizerCode` is built from its stabilizer generators and a logical
//! X/Z pair for every logical qubit. Construction checks the commutation
//! relations, computes the logical basis states `|x_L>` on the dense
//! register, and precomputes a minimum-weight correction for every syndrome.
//!
//! Encoding maps the logical register held on qubits `0..k` (with qubits
//! `k..n` in `|0>`) onto the code space. Decoding measures every generator,
//! applies the tabulated correction and maps the code space back onto qubits
//! `0..k`.

use crate::pauli::{Pauli, PauliOp};
use crate::state::StateVector;
use crate::{QlerError, Result};
use num_complex::Complex64;
use qler_common::defaults::MAX_SIMULATED_QUBITS;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Residual norm below which a projected basis state is discarded.
const PROJECTION_TOLERANCE: f64 = 1e-6;

/// Largest tolerated norm outside the logical register or code space.
const LEAKAGE_TOLERANCE: f64 = 1e-8;

/// A quantum error-correcting code as consumed by the simulator.
pub trait Code: Send + Sync {
    /// Identifier the code was requested under.
    fn name(&self) -> &str;

    /// Physical qubit count.
    fn n(&self) -> usize;

    /// Logical qubit count, `1 <= k <= n`.
    fn k(&self) -> usize;

    /// Maps `Σ a_x |x>` on qubits `0..k` to `Σ a_x |x_L>`.
    fn encode(&self, state: &mut StateVector) -> Result<()>;

    /// Extracts the syndrome, corrects, and maps the code space back onto
    /// qubits `0..k`.
    fn decode(&self, state: &mut StateVector, rng: &mut dyn RngCore) -> Result<()>;
}

/// Resolves code identifiers to codes.
pub trait CodeProvider: Send + Sync {
    /// Fails with `UnknownCode` for an unrecognised identifier.
    fn get_code(&self, id: &str) -> Result<Arc<dyn Code>>;

    /// Identifiers this provider can resolve, in catalog order.
    fn code_ids(&self) -> Vec<String>;
}

/// Generators and logical operators describing a stabilizer code.
#[derive(Clone, Debug, PartialEq)]
pub struct CodeDefinition {
    pub name: String,
    pub n: usize,
    pub stabilizers: Vec<Pauli>,
    pub logical_x: Vec<Pauli>,
    pub logical_z: Vec<Pauli>,
}

impl CodeDefinition {
    /// Builds a definition from Pauli letter strings such as `"XZZXI"`.
    ///
    /// All strings must have the same length, which becomes `n`.
    pub fn from_letters(
        name: &str,
        stabilizers: &[&str],
        logical_x: &[&str],
        logical_z: &[&str],
    ) -> Result<Self> {
        let mut n = None;
        let mut parse_all = |rows: &[&str]| -> Result<Vec<Pauli>> {
            rows.iter()
                .map(|row| {
                    let len = row.chars().count();
                    if *n.get_or_insert(len) != len {
                        return Err(QlerError::invalid_code(
                            name,
                            format!("row '{}' does not have {} qubits", row, n.unwrap_or(len)),
                        ));
                    }
                    Pauli::from_letters(row).ok_or_else(|| {
                        QlerError::invalid_code(name, format!("'{}' is not a Pauli string", row))
                    })
                })
                .collect()
        };
        let stabilizers = parse_all(stabilizers)?;
        let logical_x = parse_all(logical_x)?;
        let logical_z = parse_all(logical_z)?;
        Ok(Self {
            name: name.to_string(),
            n: n.unwrap_or(0),
            stabilizers,
            logical_x,
            logical_z,
        })
    }

    /// Logical qubit count implied by the generator count.
    pub fn k(&self) -> usize {
        self.n.saturating_sub(self.stabilizers.len())
    }

    fn fail(&self, reason: impl Into<String>) -> QlerError {
        QlerError::invalid_code(&self.name, reason)
    }

    /// Checks sizes, commutation relations and independence.
    pub fn validate(&self) -> Result<()> {
        let n = self.n;
        if n == 0 || n > MAX_SIMULATED_QUBITS {
            return Err(self.fail(format!(
                "n = {} is outside 1..={}",
                n, MAX_SIMULATED_QUBITS
            )));
        }
        if self.stabilizers.len() >= n {
            return Err(self.fail(format!(
                "{} generators on {} qubits leave no logical qubit",
                self.stabilizers.len(),
                n
            )));
        }
        let k = self.k();
        if self.logical_x.len() != k || self.logical_z.len() != k {
            return Err(self.fail(format!(
                "expected {} logical X and Z operators, got {} and {}",
                k,
                self.logical_x.len(),
                self.logical_z.len()
            )));
        }

        let all = self
            .stabilizers
            .iter()
            .chain(&self.logical_x)
            .chain(&self.logical_z);
        for p in all {
            if p.span() > n {
                return Err(self.fail(format!("operator {} exceeds {} qubits", p.to_letters(p.span()), n)));
            }
        }

        for (i, g) in self.stabilizers.iter().enumerate() {
            if g.is_identity() {
                return Err(self.fail(format!("generator {} is the identity", i)));
            }
            for (j, h) in self.stabilizers.iter().enumerate().skip(i + 1) {
                if !g.commutes_with(h) {
                    return Err(self.fail(format!("generators {} and {} anticommute", i, j)));
                }
            }
            for (j, (x, z)) in self.logical_x.iter().zip(&self.logical_z).enumerate() {
                if !g.commutes_with(x) || !g.commutes_with(z) {
                    return Err(self.fail(format!(
                        "logical pair {} does not commute with generator {}",
                        j, i
                    )));
                }
            }
        }

        for i in 0..k {
            for j in 0..k {
                let anticommute = !self.logical_x[i].commutes_with(&self.logical_z[j]);
                if anticommute != (i == j) {
                    return Err(self.fail(format!(
                        "logical X{} and Z{} have the wrong commutation relation",
                        i, j
                    )));
                }
                if i != j
                    && (!self.logical_x[i].commutes_with(&self.logical_x[j])
                        || !self.logical_z[i].commutes_with(&self.logical_z[j]))
                {
                    return Err(self.fail(format!("logical pairs {} and {} do not commute", i, j)));
                }
            }
        }

        let rows = self.stabilizers.len() + 2 * k;
        if symplectic_rank(self.stabilizers.iter().chain(&self.logical_x).chain(&self.logical_z)) != rows {
            return Err(self.fail("generators and logical operators are not independent"));
        }
        Ok(())
    }
}

/// GF(2) rank of Pauli operators viewed as 2n-bit symplectic rows.
fn symplectic_rank<'a>(rows: impl Iterator<Item = &'a Pauli>) -> usize {
    let mut basis: Vec<u128> = Vec::new();
    for p in rows {
        let mut v = (p.x_mask() as u128) | ((p.z_mask() as u128) << 64);
        for b in &basis {
            v = v.min(v ^ b);
        }
        if v != 0 {
            basis.push(v);
            basis.sort_unstable_by(|a, b| b.cmp(a));
        }
    }
    basis.len()
}

/// A validated stabilizer code ready for simulation.
#[derive(Debug)]
pub struct StabilizerCode {
    definition: CodeDefinition,
    codewords: Vec<Vec<Complex64>>,
    corrections: HashMap<u64, Pauli>,
}

impl StabilizerCode {
    /// Validates a definition and precomputes what encoding and decoding need.
    ///
    /// # Arguments
    ///
    /// * `definition` - Generators and logical operators of the code.
    ///
    /// # Returns
    ///
    /// The code with its `2^k` logical basis codewords projected out of the
    /// stabilizer group and a minimum-weight correction for every reachable
    /// syndrome, or `InvalidCode` when the definition is inconsistent.
    pub fn new(definition: CodeDefinition) -> Result<Self> {
        definition.validate()?;
        let codewords = build_codewords(&definition)?;
        let corrections = build_corrections(&definition);
        debug!(
            code = %definition.name,
            n = definition.n,
            k = definition.k(),
            syndromes = corrections.len(),
            "built stabilizer code"
        );
        Ok(Self {
            definition,
            codewords,
            corrections,
        })
    }

    /// Tabulated correction for a syndrome.
    pub fn correction(&self, syndrome: u64) -> Option<&Pauli> {
        self.corrections.get(&syndrome)
    }

    fn check_register(&self, state: &StateVector) -> Result<()> {
        if state.num_qubits() != self.definition.n {
            return Err(QlerError::Simulation(format!(
                "{} acts on {} qubits, register has {}",
                self.definition.name,
                self.definition.n,
                state.num_qubits()
            )));
        }
        Ok(())
    }
}

impl Code for StabilizerCode {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn n(&self) -> usize {
        self.definition.n
    }

    fn k(&self) -> usize {
        self.definition.k()
    }

    fn encode(&self, state: &mut StateVector) -> Result<()> {
        self.check_register(state)?;
        let logical_dim = 1usize << self.k();
        let amps = state.amplitudes();

        let leaked: f64 = amps[logical_dim..].iter().map(|a| a.norm_sqr()).sum();
        if leaked > LEAKAGE_TOLERANCE {
            return Err(QlerError::Simulation(format!(
                "qubits {}..{} must be |0> before encoding (leaked weight {:.3e})",
                self.k(),
                self.n(),
                leaked
            )));
        }

        let mut out = vec![Complex64::new(0.0, 0.0); state.dimension()];
        for (x, a) in amps[..logical_dim].iter().enumerate() {
            if a.norm_sqr() == 0.0 {
                continue;
            }
            for (o, c) in out.iter_mut().zip(&self.codewords[x]) {
                *o += a * c;
            }
        }
        state.set_amplitudes(out)?;
        state.normalize()
    }

    fn decode(&self, state: &mut StateVector, rng: &mut dyn RngCore) -> Result<()> {
        self.check_register(state)?;

        let mut syndrome = 0u64;
        for (i, g) in self.definition.stabilizers.iter().enumerate() {
            if state.measure_pauli(g, rng)? {
                syndrome |= 1 << i;
            }
        }
        let correction = self.correction(syndrome).ok_or_else(|| {
            QlerError::Simulation(format!(
                "{} has no correction for syndrome {:#b}",
                self.definition.name, syndrome
            ))
        })?;
        state.apply_pauli(correction);

        let logical_dim = 1usize << self.k();
        let mut out = vec![Complex64::new(0.0, 0.0); state.dimension()];
        let mut captured = 0.0;
        for (x, slot) in out.iter_mut().take(logical_dim).enumerate() {
            let b = state.overlap(&self.codewords[x]);
            captured += b.norm_sqr();
            *slot = b;
        }
        if (captured - 1.0).abs() > LEAKAGE_TOLERANCE.sqrt() {
            return Err(QlerError::Simulation(format!(
                "corrected state of {} left the code space (captured weight {:.6})",
                self.definition.name, captured
            )));
        }
        state.set_amplitudes(out)?;
        state.normalize()
    }
}

/// Bit i is set when `error` anticommutes with generator i.
fn syndrome_of(stabilizers: &[Pauli], error: &Pauli) -> u64 {
    stabilizers
        .iter()
        .enumerate()
        .filter(|(_, g)| !g.commutes_with(error))
        .fold(0u64, |acc, (i, _)| acc | (1 << i))
}

/// `(I + P)/2` applied in place, without renormalising.
fn project_plus(state: &mut StateVector, p: &Pauli) -> Result<()> {
    let image = state.pauli_image(p);
    let projected = state
        .amplitudes()
        .iter()
        .zip(image)
        .map(|(a, b)| (a + b) * 0.5)
        .collect();
    state.set_amplitudes(projected)
}

/// Logical basis states: `|0_L>` is the normalised projection of the first
/// computational basis state that survives `Π (I+g)/2 Π (I+Z_j)/2`, and
/// `|x_L>` applies `X_j` for every set bit j of x.
fn build_codewords(def: &CodeDefinition) -> Result<Vec<Vec<Complex64>>> {
    let dim = 1usize << def.n;
    let mut zero_l = None;
    for s in 0..dim {
        let mut amps = vec![Complex64::new(0.0, 0.0); dim];
        amps[s] = Complex64::new(1.0, 0.0);
        let mut state = StateVector::from_amplitudes(amps)?;
        for p in def.stabilizers.iter().chain(&def.logical_z) {
            project_plus(&mut state, p)?;
        }
        if state.norm_sqr().sqrt() > PROJECTION_TOLERANCE {
            state.normalize()?;
            zero_l = Some(state);
            break;
        }
    }
    let zero_l = zero_l.ok_or_else(|| def.fail("code space is empty"))?;

    let k = def.k();
    let mut codewords = Vec::with_capacity(1 << k);
    for x in 0..(1usize << k) {
        let mut state = zero_l.clone();
        for (j, lx) in def.logical_x.iter().enumerate() {
            if (x >> j) & 1 == 1 {
                state.apply_pauli(lx);
            }
        }
        codewords.push(state.amplitudes().to_vec());
    }
    Ok(codewords)
}

/// Minimum-weight correction per syndrome.
///
/// Errors are enumerated by increasing weight; within a weight, supports in
/// increasing bit-mask order and factors in the order X, Z, Y. The first
/// error reaching a syndrome is kept.
fn build_corrections(def: &CodeDefinition) -> HashMap<u64, Pauli> {
    let n = def.n;
    let target = 1usize << def.stabilizers.len();
    let mut table = HashMap::with_capacity(target);
    table.insert(0, Pauli::IDENTITY);

    'weights: for w in 1..=n {
        let supports: Vec<u64> = (1u64..(1 << n)).filter(|m| m.count_ones() as usize == w).collect();
        for support in supports {
            let qubits: Vec<usize> = (0..n).filter(|q| (support >> q) & 1 == 1).collect();
            for assignment in 0..3usize.pow(w as u32) {
                let mut error = Pauli::IDENTITY;
                let mut digits = assignment;
                for &q in qubits.iter().rev() {
                    error = error.compose(&Pauli::single(q, PauliOp::ERRORS[digits % 3]));
                    digits /= 3;
                }
                table
                    .entry(syndrome_of(&def.stabilizers, &error))
                    .or_insert(error);
                if table.len() == target {
                    break 'weights;
                }
            }
        }
    }
    table
}

/// Ordered set of code definitions resolvable by identifier.
#[derive(Clone, Debug)]
pub struct CodeCatalog {
    definitions: Vec<CodeDefinition>,
}

impl Default for CodeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CodeCatalog {
    pub fn empty() -> Self {
        Self {
            definitions: Vec::new(),
        }
    }

    /// The built-in codes: repetition codes against bit and phase flips,
    /// the five-qubit perfect code, the Steane code and the Shor code.
    pub fn builtin() -> Self {
        let table: [(&str, &[&str], &str, &str); 5] = [
            ("bit_flip_code", &["ZZI", "IZZ"], "XXX", "ZII"),
            ("phase_flip_code", &["XXI", "IXX"], "ZZZ", "XII"),
            (
                "steane_code",
                &[
                    "IIIXXXX", "IXXIIXX", "XIXIXIX", "IIIZZZZ", "IZZIIZZ", "ZIZIZIZ",
                ],
                "XXXXXXX",
                "ZZZZZZZ",
            ),
            (
                "five_qubit_code",
                &["XZZXI", "IXZZX", "XIXZZ", "ZXIXZ"],
                "XXXXX",
                "ZZZZZ",
            ),
            (
                "shor_code",
                &[
                    "ZZIIIIIII", "IZZIIIIII", "IIIZZIIII", "IIIIZZIII", "IIIIIIZZI", "IIIIIIIZZ",
                    "XXXXXXIII", "IIIXXXXXX",
                ],
                "ZZZZZZZZZ",
                "XXXXXXXXX",
            ),
        ];
        let definitions = table
            .iter()
            .map(|(name, stabilizers, lx, lz)| {
                CodeDefinition::from_letters(name, stabilizers, &[*lx], &[*lz])
                    .expect("built-in code definitions are well formed")
            })
            .collect();
        Self { definitions }
    }

    /// Adds a user definition after validating it, replacing any code with
    /// the same name.
    pub fn register(&mut self, definition: CodeDefinition) -> Result<()> {
        definition.validate()?;
        match self.definitions.iter().position(|d| d.name == definition.name) {
            Some(idx) => self.definitions[idx] = definition,
            None => self.definitions.push(definition),
        }
        Ok(())
    }

    pub fn definition(&self, id: &str) -> Option<&CodeDefinition> {
        self.definitions.iter().find(|d| d.name == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.definitions.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn definitions(&self) -> &[CodeDefinition] {
        &self.definitions
    }
}

impl CodeProvider for CodeCatalog {
    fn get_code(&self, id: &str) -> Result<Arc<dyn Code>> {
        let definition = self
            .definition(id)
            .ok_or_else(|| QlerError::UnknownCode(id.to_string()))?;
        Ok(Arc::new(StabilizerCode::new(definition.clone())?))
    }

    fn code_ids(&self) -> Vec<String> {
        self.ids().into_iter().map(String::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qler_common::isa::{Instruction, Opcode};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn code(id: &str) -> Arc<dyn Code> {
        CodeCatalog::builtin().get_code(id).unwrap()
    }

    #[test]
    fn builtin_parameters() {
        let catalog = CodeCatalog::builtin();
        let expected = [
            ("bit_flip_code", 3, 1),
            ("phase_flip_code", 3, 1),
            ("steane_code", 7, 1),
            ("five_qubit_code", 5, 1),
            ("shor_code", 9, 1),
        ];
        for (id, n, k) in expected {
            let c = catalog.get_code(id).unwrap();
            assert_eq!((c.n(), c.k()), (n, k), "{}", id);
        }
    }

    #[test]
    fn unknown_code() {
        let err = CodeCatalog::builtin().get_code("not_a_code").err().unwrap();
        assert!(matches!(err, QlerError::UnknownCode(ref id) if id == "not_a_code"));
    }

    #[test]
    fn noiseless_round_trip_is_identity() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for id in CodeCatalog::builtin().ids() {
            let c = code(id);
            let mut state = StateVector::new(c.n()).unwrap();
            state.apply_instruction(&Instruction::ry(0, 0.7)).unwrap();
            state.apply_instruction(&Instruction::rz(0, 1.9)).unwrap();
            let before = state.clone();

            c.encode(&mut state).unwrap();
            c.decode(&mut state, &mut rng).unwrap();

            let fidelity = state.overlap(before.amplitudes()).norm_sqr();
            assert!((fidelity - 1.0).abs() < 1e-9, "{}: {}", id, fidelity);
        }
    }

    #[test]
    fn single_qubit_errors_are_corrected() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for id in ["steane_code", "five_qubit_code", "shor_code"] {
            let c = code(id);
            for q in 0..c.n() {
                for op in PauliOp::ERRORS {
                    let mut state = StateVector::new(c.n()).unwrap();
                    state.apply_instruction(&Instruction::ry(0, 1.1)).unwrap();
                    let before = state.clone();
                    c.encode(&mut state).unwrap();
                    state.apply_pauli(&Pauli::single(q, op));
                    c.decode(&mut state, &mut rng).unwrap();
                    let fidelity = state.overlap(before.amplitudes()).norm_sqr();
                    assert!((fidelity - 1.0).abs() < 1e-9, "{} {:?} on {}", id, op, q);
                }
            }
        }
    }

    #[test]
    fn three_flips_on_the_repetition_code_are_a_logical_error() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let c = code("bit_flip_code");
        let mut state = StateVector::new(3).unwrap();
        c.encode(&mut state).unwrap();
        state.apply_pauli(&Pauli::from_letters("XXX").unwrap());
        c.decode(&mut state, &mut rng).unwrap();
        assert!((state.probability_one(0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn encoding_requires_clean_ancillas() {
        let c = code("bit_flip_code");
        let mut state = StateVector::new(3).unwrap();
        state.apply_instruction(&Instruction::new(Opcode::GateX, 2)).unwrap();
        assert!(matches!(c.encode(&mut state), Err(QlerError::Simulation(_))));
    }

    #[test]
    fn invalid_definitions_are_rejected() {
        let anticommuting = CodeDefinition::from_letters("bad", &["XI", "ZI"], &[], &[]).unwrap();
        assert!(matches!(
            anticommuting.validate(),
            Err(QlerError::InvalidCode { .. })
        ));

        let dependent =
            CodeDefinition::from_letters("dep", &["ZZI", "ZZI"], &["XXX"], &["ZII"]).unwrap();
        assert!(dependent.validate().is_err());

        assert!(CodeDefinition::from_letters("ragged", &["ZZI", "ZZ"], &["XXX"], &["ZII"]).is_err());

        let mut catalog = CodeCatalog::empty();
        assert!(catalog.register(anticommuting).is_err());
        assert!(catalog.ids().is_empty());
    }

    #[test]
    fn correction_table_prefers_low_weight() {
        let def = CodeCatalog::builtin().definition("bit_flip_code").unwrap().clone();
        let x1 = Pauli::single(1, PauliOp::X);
        let s = syndrome_of(&def.stabilizers, &x1);
        let c = StabilizerCode::new(def).unwrap();
        assert_eq!(s, 0b11);
        assert_eq!(c.correction(s), Some(&x1));
        assert_eq!(c.correction(0), Some(&Pauli::IDENTITY));
    }
}
