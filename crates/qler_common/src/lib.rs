//! Common definitions shared across the logical error rate workspace.
//!
//! This crate provides the circuit instruction set used to prepare and undo
//! random logical input states, the `Circuit` container built from those
//! instructions, and the default sweep parameters shared by the engine and
//! the command line front end.

#![no_std]

extern crate alloc;

// Default parameters for logical error rate sweeps.
//
// These values reproduce the reference sweep: 500 trials per cell and an
// evenly spaced strength grid of 11 points over [0, 1]. The host binary uses
// them as CLI defaults and the engine uses them for `SweepConfig::default()`.
pub mod defaults {
    /// Number of Monte Carlo trials per (code, channel, strength) cell.
    pub const NUM_TRIALS: usize = 500;

    /// Number of evenly spaced points in the default strength grid.
    ///
    /// The grid always includes both endpoints, so 11 points yields the
    /// strengths 0.0, 0.1, ..., 1.0.
    pub const GRID_POINTS: usize = 11;

    /// Largest register the dense state-vector simulator accepts.
    ///
    /// A register of this size holds 2^16 complex amplitudes (1 MiB), which
    /// keeps thousands of concurrent trials within memory on a workstation.
    pub const MAX_SIMULATED_QUBITS: usize = 16;

    /// Measurement shots per trial.
    pub const SHOTS_PER_TRIAL: usize = 1;
}

/// Instruction set for state preparation circuits.
///
/// Defines the gates a trial preparation circuit may contain and the layout
/// of a single instruction. Every opcode has an exact inverse within the set,
/// which is what allows a preparation to be undone after decoding.
pub mod isa {
    /// Opcode enumeration for circuit instructions.
    ///
    /// Every gate acts on `qubit`. The rotation gates read their angle from
    /// the instruction's `angle` field.
    #[repr(u8)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Opcode {
        /// Pauli X (bit flip). Self-inverse.
        ///
        /// Prepares logical |1> from |0> in discrete mode.
        GateX = 0x01,

        /// Rotation about the Z axis, `Rz(θ) = exp(-iθZ/2)`.
        ///
        /// Used for the azimuthal angle of a continuous-mode trial state.
        /// The inverse is the same rotation with the angle negated.
        GateRz = 0x10,

        /// Rotation about the Y axis, `Ry(θ) = exp(-iθY/2)`.
        ///
        /// Used for the polar angle of a continuous-mode trial state.
        GateRy = 0x11,
    }

    impl Opcode {
        /// True for the parametrized rotations.
        pub fn is_rotation(self) -> bool {
            matches!(self, Opcode::GateRz | Opcode::GateRy)
        }
    }

    /// A single circuit instruction.
    ///
    /// The angle is in radians and is ignored by every opcode except the
    /// rotations. Constructors set it to zero for `GateX` so instructions
    /// compare equal by value.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Instruction {
        /// Operation code identifying the gate.
        pub opcode: Opcode,

        /// Target qubit.
        pub qubit: u16,

        /// Rotation angle in radians for `GateRz` and `GateRy`.
        pub angle: f64,
    }

    impl Instruction {
        /// Constructs a non-parametrized single-qubit instruction.
        pub fn new(opcode: Opcode, qubit: u16) -> Self {
            Self {
                opcode,
                qubit,
                angle: 0.0,
            }
        }

        /// Constructs a rotation about the Z axis.
        pub fn rz(qubit: u16, angle: f64) -> Self {
            Self {
                opcode: Opcode::GateRz,
                qubit,
                angle,
            }
        }

        /// Constructs a rotation about the Y axis.
        pub fn ry(qubit: u16, angle: f64) -> Self {
            Self {
                opcode: Opcode::GateRy,
                qubit,
                angle,
            }
        }

        /// Returns the instruction that undoes this one.
        ///
        /// Rotations negate their angle. `GateX` is its own inverse.
        pub fn inverse(&self) -> Self {
            let angle = if self.opcode.is_rotation() {
                -self.angle
            } else {
                self.angle
            };
            Self {
                opcode: self.opcode,
                qubit: self.qubit,
                angle,
            }
        }
    }
}

/// Ordered instruction lists.
pub mod circuit {
    use crate::isa::{Instruction, Opcode};
    use alloc::vec::Vec;

    /// An ordered sequence of instructions applied left to right.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Circuit {
        instructions: Vec<Instruction>,
    }

    impl Circuit {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_capacity(capacity: usize) -> Self {
            Self {
                instructions: Vec::with_capacity(capacity),
            }
        }

        pub fn push(&mut self, instr: Instruction) {
            self.instructions.push(instr);
        }

        /// Appends a non-parametrized single-qubit gate.
        pub fn gate(&mut self, opcode: Opcode, qubit: u16) -> &mut Self {
            self.push(Instruction::new(opcode, qubit));
            self
        }

        /// Builds the exact inverse circuit.
        ///
        /// Instruction order is reversed and each instruction is replaced by
        /// its inverse, so `self` followed by `self.inverse()` is the identity.
        pub fn inverse(&self) -> Circuit {
            Circuit {
                instructions: self.instructions.iter().rev().map(|i| i.inverse()).collect(),
            }
        }

        pub fn len(&self) -> usize {
            self.instructions.len()
        }

        pub fn is_empty(&self) -> bool {
            self.instructions.is_empty()
        }

        pub fn iter(&self) -> core::slice::Iter<'_, Instruction> {
            self.instructions.iter()
        }

        pub fn instructions(&self) -> &[Instruction] {
            &self.instructions
        }

        /// Number of qubits needed to run the circuit (highest index + 1).
        pub fn width(&self) -> usize {
            self.instructions
                .iter()
                .map(|i| i.qubit as usize + 1)
                .max()
                .unwrap_or(0)
        }
    }

    impl<'a> IntoIterator for &'a Circuit {
        type Item = &'a Instruction;
        type IntoIter = core::slice::Iter<'a, Instruction>;

        fn into_iter(self) -> Self::IntoIter {
            self.instructions.iter()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::circuit::Circuit;
    use super::isa::{Instruction, Opcode};

    #[test]
    fn inverse_reverses_and_negates() {
        let mut c = Circuit::new();
        c.push(Instruction::rz(0, 0.25));
        c.push(Instruction::ry(0, 1.5));
        c.gate(Opcode::GateX, 1);

        let inv = c.inverse();
        let ops: alloc::vec::Vec<_> = inv.iter().map(|i| (i.opcode, i.qubit, i.angle)).collect();
        assert_eq!(
            ops,
            [
                (Opcode::GateX, 1, 0.0),
                (Opcode::GateRy, 0, -1.5),
                (Opcode::GateRz, 0, -0.25)
            ]
        );
    }

    #[test]
    fn pauli_circuit_is_its_own_inverse() {
        let mut c = Circuit::new();
        c.gate(Opcode::GateX, 0).gate(Opcode::GateX, 2);
        let inv = c.inverse();
        assert_eq!(inv.len(), 2);
        assert!(inv.iter().all(|i| i.opcode == Opcode::GateX));
        assert_eq!(c.width(), 3);
        assert!(Circuit::new().is_empty());
    }
}
