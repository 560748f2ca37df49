//! Loading user-defined stabilizer codes from text files.
//!
//! A code file lists stabilizer generators and logical operators one per
//! line, either as Pauli letter strings or as binary check-matrix rows. The
//! result is a `CodeDefinition` ready to be registered in a `CodeCatalog`.
//!
//! ```text
//! # [[5,1,3]] perfect code
//! name five_qubit_custom
//! S XZZXI
//! S IXZZX
//! S 10100|00011
//! S 01010|10001
//! X XXXXX
//! Z ZZZZZ
//! ```

/// File loading for code definitions.
///
/// Reads a code file from disk, names the code after the file stem when the
/// file carries no `name` line, and registers batches of files in a catalog.
pub mod loader;

/// Line grammar for code files.
///
/// `#` starts a comment. Every other non-blank line is either `name <id>` or
/// a row `S|X|Z <operator>`, where the operator is a Pauli letter string or
/// a symplectic `x-bits|z-bits` row with qubit 0 leftmost.
pub mod parser;

pub use loader::{load_code_file, register_code_files};
pub use parser::parse_code;
