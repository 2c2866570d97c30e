use std::fs;
use std::path::Path;

use mazewalk::Program;
use mazewalk::blocks::LoadError;

#[test]
fn bundled_program_matches_builtin() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("programs/depth_first.json");
    let loaded = Program::load(&path).unwrap();
    assert_eq!(loaded, Program::depth_first());
}

#[test]
fn builtin_program_survives_pretty_json() {
    let json = Program::depth_first().to_json_pretty().unwrap();
    assert!(json.contains("\"block\": \"step_back\""));
    assert_eq!(Program::from_json(&json).unwrap(), Program::depth_first());
}

#[test]
fn missing_file_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.json");
    match Program::load(&path) {
        Err(LoadError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn malformed_file_is_a_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{"body": [{"block": "turn", "direction": "UP"}]}"#).unwrap();
    assert!(matches!(Program::load(&path), Err(LoadError::Json(_))));
}
