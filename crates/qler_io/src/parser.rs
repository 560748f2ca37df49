use anyhow::{Result, anyhow, bail};
use bitvec::prelude::*;
use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, one_of, space0, space1};
use nom::combinator::{all_consuming, map};
use nom::sequence::{delimited, pair, preceded, separated_pair};
use qler_core::CodeDefinition;
use qler_core::pauli::Pauli;
use qler_common::defaults::MAX_SIMULATED_QUBITS;

/// Which operator list a row belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowKind {
    Stabilizer,
    LogicalX,
    LogicalZ,
}

/// Operator text as written in the file, before width checks.
#[derive(Clone, Debug, PartialEq)]
pub enum RowOperator {
    Letters(String),
    Symplectic {
        x: BitVec<u64, Lsb0>,
        z: BitVec<u64, Lsb0>,
    },
}

impl RowOperator {
    pub fn width(&self) -> usize {
        match self {
            RowOperator::Letters(s) => s.len(),
            RowOperator::Symplectic { x, .. } => x.len(),
        }
    }

    fn to_pauli(&self) -> Option<Pauli> {
        match self {
            RowOperator::Letters(s) => Pauli::from_letters(&s.to_ascii_uppercase()),
            RowOperator::Symplectic { x, z } => {
                Some(Pauli::from_symplectic(x.iter().by_vals(), z.iter().by_vals()))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Line {
    Name(String),
    Row(RowKind, RowOperator),
}

fn bits(input: &str) -> IResult<&str, BitVec<u64, Lsb0>> {
    map(take_while1(|c: char| c == '0' || c == '1'), |s: &str| {
        s.chars().map(|c| c == '1').collect()
    })(input)
}

fn symplectic(input: &str) -> IResult<&str, RowOperator> {
    map(separated_pair(bits, char('|'), bits), |(x, z)| {
        RowOperator::Symplectic { x, z }
    })(input)
}

fn letters(input: &str) -> IResult<&str, RowOperator> {
    map(take_while1(|c: char| "IXYZixyz".contains(c)), |s: &str| {
        RowOperator::Letters(s.to_string())
    })(input)
}

fn row_kind(input: &str) -> IResult<&str, RowKind> {
    map(one_of("SXZ"), |c| match c {
        'S' => RowKind::Stabilizer,
        'X' => RowKind::LogicalX,
        _ => RowKind::LogicalZ,
    })(input)
}

fn name_line(input: &str) -> IResult<&str, Line> {
    map(
        preceded(
            pair(tag("name"), space1),
            take_while1(|c: char| !c.is_whitespace()),
        ),
        |s: &str| Line::Name(s.to_string()),
    )(input)
}

fn row_line(input: &str) -> IResult<&str, Line> {
    map(
        separated_pair(row_kind, space1, alt((symplectic, letters))),
        |(kind, op)| Line::Row(kind, op),
    )(input)
}

/// Parses one comment-free, non-blank line.
pub fn parse_line(input: &str) -> IResult<&str, Line> {
    all_consuming(delimited(space0, alt((name_line, row_line)), space0))(input)
}

/// Parses a whole code file.
///
/// `fallback_name` names the code when the text has no `name` line. The
/// definition is validated before it is returned.
pub fn parse_code(text: &str, fallback_name: &str) -> Result<CodeDefinition> {
    let mut name = None;
    let mut width = None;
    let mut stabilizers = Vec::new();
    let mut logical_x = Vec::new();
    let mut logical_z = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }

        let (_, line) = parse_line(content)
            .map_err(|_| anyhow!("line {}: cannot parse '{}'", line_no, content))?;
        match line {
            Line::Name(n) => {
                if name.replace(n).is_some() {
                    bail!("line {}: code name given twice", line_no);
                }
            }
            Line::Row(kind, op) => {
                if let RowOperator::Symplectic { x, z } = &op
                    && x.len() != z.len()
                {
                    bail!(
                        "line {}: x part has {} bits but z part has {}",
                        line_no,
                        x.len(),
                        z.len()
                    );
                }
                let w = op.width();
                if w > MAX_SIMULATED_QUBITS {
                    bail!(
                        "line {}: {} qubits exceeds the simulator limit of {}",
                        line_no,
                        w,
                        MAX_SIMULATED_QUBITS
                    );
                }
                if *width.get_or_insert(w) != w {
                    bail!(
                        "line {}: row has {} qubits, earlier rows have {}",
                        line_no,
                        w,
                        width.unwrap_or(w)
                    );
                }
                let pauli = op
                    .to_pauli()
                    .ok_or_else(|| anyhow!("line {}: invalid operator", line_no))?;
                match kind {
                    RowKind::Stabilizer => stabilizers.push(pauli),
                    RowKind::LogicalX => logical_x.push(pauli),
                    RowKind::LogicalZ => logical_z.push(pauli),
                }
            }
        }
    }

    let Some(n) = width else {
        bail!("no operator rows found");
    };
    let definition = CodeDefinition {
        name: name.unwrap_or_else(|| fallback_name.to_string()),
        n,
        stabilizers,
        logical_x,
        logical_z,
    };
    definition.validate()?;
    Ok(definition)
}
