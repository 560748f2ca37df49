use qler_core::{
    CodeCatalog, CodeProvider, LogicalErrorEstimator, NoiseChannelFamily, StandardChannel,
    StateVectorSimulator, TrialSampler,
};
use qler_io::{load_code_file, register_code_files};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes `contents` to a fresh per-test directory and returns the file path.
fn scratch_file(tag: &str, name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("qler_io_{}_{}", tag, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn remove_scratch(path: &Path) {
    if let Some(dir) = path.parent() {
        fs::remove_dir_all(dir).unwrap();
    }
}

#[test]
fn file_stem_names_unnamed_codes() {
    let path = scratch_file(
        "stem",
        "rep3_bits.code",
        "S 000|110\nS 000|011\nX 111|000\nZ 000|100\n",
    );
    let def = load_code_file(&path).unwrap();
    assert_eq!(def.name, "rep3_bits");
    assert_eq!((def.n, def.k()), (3, 1));

    remove_scratch(&path);
}

#[test]
fn missing_file_reports_the_path() {
    let err = load_code_file("/definitely/not/here.code").unwrap_err();
    assert!(format!("{:#}", err).contains("/definitely/not/here.code"));
}

#[test]
fn registered_codes_are_simulated() {
    let path = scratch_file(
        "registered",
        "perfect.code",
        "name perfect_copy\nS XZZXI\nS IXZZX\nS XIXZZ\nS ZXIXZ\nX XXXXX\nZ ZZZZZ\n",
    );
    let mut catalog = CodeCatalog::builtin();
    let ids = register_code_files(&mut catalog, &[&path]).unwrap();
    assert_eq!(ids, vec!["perfect_copy"]);
    assert!(catalog.code_ids().contains(&"perfect_copy".to_string()));

    let code = catalog.get_code("perfect_copy").unwrap();
    let sim = StateVectorSimulator::new();
    let channel = StandardChannel::Depolarizing.channel(0.0).unwrap();
    let rate = LogicalErrorEstimator::new(&sim, TrialSampler::default())
        .estimate(code.as_ref(), &channel, 50, 9)
        .unwrap();
    assert_eq!(rate, 0.0);

    remove_scratch(&path);
}
