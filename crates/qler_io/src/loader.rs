use crate::parser::parse_code;
use anyhow::{Context, Result};
use qler_core::{CodeCatalog, CodeDefinition};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Loads and validates one code file.
///
/// Without a `name` line the code is named after the file stem.
pub fn load_code_file<P: AsRef<Path>>(path: P) -> Result<CodeDefinition> {
    let path = path.as_ref();
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open code file {}", path.display()))?;
    let mut text = String::new();
    file.read_to_string(&mut text)
        .with_context(|| format!("Failed to read code file {}", path.display()))?;

    let fallback = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("custom_code");
    parse_code(&text, fallback).with_context(|| format!("Invalid code file {}", path.display()))
}

/// Loads every file in `paths` into `catalog` and returns the registered ids
/// in file order. A later file replaces an earlier code of the same name.
pub fn register_code_files<P: AsRef<Path>>(
    catalog: &mut CodeCatalog,
    paths: &[P],
) -> Result<Vec<String>> {
    let mut ids = Vec::with_capacity(paths.len());
    for path in paths {
        let definition = load_code_file(path)?;
        let id = definition.name.clone();
        catalog
            .register(definition)
            .with_context(|| format!("Failed to register code '{}'", id))?;
        ids.push(id);
    }
    Ok(ids)
}
