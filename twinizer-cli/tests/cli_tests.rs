//! CLI integration tests

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

/// Build command for the twinizer-cli binary (found in target/debug when run via cargo test).
fn twinizer_cli() -> Command {
    cargo_bin_cmd!("twinizer-cli")
}

/// Path to twinizer library test fixtures (relative to workspace).
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("twinizer")
        .join("tests")
        .join("fixtures")
}

#[test]
fn test_cli_help() {
    let mut cmd = twinizer_cli();

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("KiCad"));
}

#[test]
fn test_cli_version() {
    let mut cmd = twinizer_cli();

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_parse_schematic() {
    let mut cmd = twinizer_cli();

    cmd.arg("parse").arg(fixtures_dir().join("amplifier.kicad_sch"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("components: 4"));
}

#[test]
fn test_cli_parse_corrupt_file_fails() {
    let mut cmd = twinizer_cli();

    cmd.arg("parse").arg(fixtures_dir().join("corrupt.kicad_sch"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("never closed"));
}

#[test]
fn test_cli_bom_csv() {
    let mut cmd = twinizer_cli();

    cmd.arg("bom").arg(fixtures_dir().join("amplifier.kicad_sch"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Item,Quantity,References"))
        .stdout(predicate::str::contains("\"R1, R2\""));
}

#[test]
fn test_cli_bom_exclude_pattern() {
    let mut cmd = twinizer_cli();

    cmd.arg("bom")
        .arg(fixtures_dir().join("amplifier.kicad_sch"))
        .arg("--exclude")
        .arg("^R");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("C1"))
        .stdout(predicate::str::contains("R1").not());
}

#[test]
fn test_cli_bom_rejects_board_file() {
    let mut cmd = twinizer_cli();

    cmd.arg("bom").arg(fixtures_dir().join("board.kicad_pcb"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("schematic"));
}

#[test]
fn test_cli_diagram_flowchart() {
    let mut cmd = twinizer_cli();

    cmd.arg("diagram")
        .arg(fixtures_dir().join("amplifier.kicad_sch"))
        .arg("--direction")
        .arg("lr");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("flowchart LR"));
}

#[test]
fn test_cli_model3d_open_outline_fails() {
    let mut cmd = twinizer_cli();

    cmd.arg("model3d")
        .arg(fixtures_dir().join("open_outline.kicad_pcb"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("gap"));
}

#[test]
fn test_cli_model3d_writes_obj() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("board.obj");
    let mut cmd = twinizer_cli();

    cmd.arg("model3d")
        .arg(fixtures_dir().join("board.kicad_pcb"))
        .arg("--output")
        .arg(&out);
    cmd.assert().success();
    let obj = std::fs::read_to_string(&out).unwrap();
    assert!(obj.contains("g board"));
}

#[test]
fn test_cli_stats() {
    let mut cmd = twinizer_cli();

    cmd.arg("stats").arg(fixtures_dir().join("board.kicad_pcb"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("modules: 2"))
        .stdout(predicate::str::contains("50.0 x 30.0 mm"));
}

#[test]
fn test_cli_batch_best_effort_vs_strict() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["amplifier.kicad_sch", "corrupt.kicad_sch"] {
        std::fs::copy(fixtures_dir().join(name), dir.path().join(name)).unwrap();
    }

    // Best effort: bad file is reported but exit code stays zero.
    let mut cmd = twinizer_cli();
    cmd.arg("batch")
        .arg(dir.path())
        .arg("--output")
        .arg(dir.path().join("out"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1 succeeded, 1 failed"));

    // Strict: same failure flips the exit code.
    let mut cmd = twinizer_cli();
    cmd.arg("batch")
        .arg(dir.path())
        .arg("--output")
        .arg(dir.path().join("out2"))
        .arg("--strict");
    cmd.assert().failure();
}
