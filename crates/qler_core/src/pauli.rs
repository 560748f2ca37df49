//! Pauli operators in symplectic bit-mask form.
//!
//! An n-qubit Pauli operator (up to global phase) is stored as two bit masks:
//! bit q of `x` is set when the operator has an X or Y factor on qubit q, and
//! bit q of `z` is set when it has a Z or Y factor. Commutation, products and
//! syndrome extraction reduce to popcounts on these masks.

/// Single-qubit Pauli factor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PauliOp {
    I,
    X,
    Y,
    Z,
}

impl PauliOp {
    /// Non-identity factors in the order the correction table prefers them.
    pub const ERRORS: [PauliOp; 3] = [PauliOp::X, PauliOp::Z, PauliOp::Y];

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'I' | '_' => Some(PauliOp::I),
            'X' => Some(PauliOp::X),
            'Y' => Some(PauliOp::Y),
            'Z' => Some(PauliOp::Z),
            _ => None,
        }
    }

    fn bits(self) -> (bool, bool) {
        match self {
            PauliOp::I => (false, false),
            PauliOp::X => (true, false),
            PauliOp::Y => (true, true),
            PauliOp::Z => (false, true),
        }
    }
}

/// Phase-free Pauli string over at most 64 qubits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Pauli {
    x: u64,
    z: u64,
}

impl Pauli {
    pub const IDENTITY: Pauli = Pauli { x: 0, z: 0 };

    /// A single factor `op` on `qubit`.
    pub fn single(qubit: usize, op: PauliOp) -> Self {
        let (x, z) = op.bits();
        Self {
            x: (x as u64) << qubit,
            z: (z as u64) << qubit,
        }
    }

    /// Parses a letter string such as `"XZZXI"`; qubit 0 is the leftmost letter.
    ///
    /// Returns `None` for an unknown letter or a string longer than 64.
    pub fn from_letters(s: &str) -> Option<Self> {
        if s.chars().count() > 64 {
            return None;
        }
        let mut p = Pauli::IDENTITY;
        for (q, c) in s.chars().enumerate() {
            p = p.compose(&Pauli::single(q, PauliOp::from_char(c)?));
        }
        Some(p)
    }

    /// Builds an operator from per-qubit X and Z bits of a check-matrix row.
    pub fn from_symplectic<I, J>(x_bits: I, z_bits: J) -> Self
    where
        I: IntoIterator<Item = bool>,
        J: IntoIterator<Item = bool>,
    {
        let fold = |bits: &mut dyn Iterator<Item = bool>| {
            bits.enumerate()
                .filter(|&(_, b)| b)
                .fold(0u64, |acc, (q, _)| acc | (1 << q))
        };
        Self {
            x: fold(&mut x_bits.into_iter()),
            z: fold(&mut z_bits.into_iter()),
        }
    }

    pub fn x_mask(&self) -> u64 {
        self.x
    }

    pub fn z_mask(&self) -> u64 {
        self.z
    }

    pub fn op(&self, qubit: usize) -> PauliOp {
        match ((self.x >> qubit) & 1, (self.z >> qubit) & 1) {
            (0, 0) => PauliOp::I,
            (1, 0) => PauliOp::X,
            (1, 1) => PauliOp::Y,
            _ => PauliOp::Z,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.x == 0 && self.z == 0
    }

    /// Highest qubit index with a non-identity factor, plus one.
    pub fn span(&self) -> usize {
        64 - (self.x | self.z).leading_zeros() as usize
    }

    /// True when the two operators commute.
    pub fn commutes_with(&self, other: &Pauli) -> bool {
        ((self.x & other.z).count_ones() + (self.z & other.x).count_ones()) % 2 == 0
    }

    /// Product of two operators with the global phase dropped.
    pub fn compose(&self, other: &Pauli) -> Pauli {
        Pauli {
            x: self.x ^ other.x,
            z: self.z ^ other.z,
        }
    }

    /// Number of Y factors, which fixes the phase `i^{#Y}` of `X^x Z^z`.
    pub fn y_count(&self) -> u32 {
        (self.x & self.z).count_ones()
    }

    /// Renders the operator as `n` letters.
    pub fn to_letters(&self, n: usize) -> String {
        (0..n)
            .map(|q| match self.op(q) {
                PauliOp::I => 'I',
                PauliOp::X => 'X',
                PauliOp::Y => 'Y',
                PauliOp::Z => 'Z',
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_render() {
        let p = Pauli::from_letters("XZZXI").unwrap();
        assert_eq!(p.to_letters(5), "XZZXI");
        assert_eq!(p.span(), 4);
        assert!(Pauli::from_letters("XQ").is_none());
    }

    #[test]
    fn commutation() {
        let zz = Pauli::from_letters("ZZI").unwrap();
        let x0 = Pauli::single(0, PauliOp::X);
        let xx = Pauli::from_letters("XXI").unwrap();
        assert!(!zz.commutes_with(&x0));
        assert!(zz.commutes_with(&xx));
        assert!(Pauli::single(1, PauliOp::Y).commutes_with(&Pauli::single(1, PauliOp::Y)));
    }

    #[test]
    fn compose_drops_phase() {
        let x = Pauli::single(2, PauliOp::X);
        let z = Pauli::single(2, PauliOp::Z);
        assert_eq!(x.compose(&z), Pauli::single(2, PauliOp::Y));
        assert!(x.compose(&x).is_identity());
    }

    #[test]
    fn symplectic_rows() {
        let p = Pauli::from_symplectic([true, false, true], [false, false, true]);
        assert_eq!(p.to_letters(3), "XIY");
        assert_eq!(p.y_count(), 1);
    }
}
