//! Fixture-based parsing tests covering both schematic formats and boards.

use std::path::PathBuf;

use twinizer::parser::{parse_file, Design};
use twinizer::{ParseOptions, TwinizerError};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn parse_fixture(name: &str) -> twinizer::ParseOutcome {
    parse_file(&fixture_path(name), ParseOptions::default()).expect("fixture should parse")
}

#[test]
fn test_parse_sexpr_schematic_fixture() {
    let outcome = parse_fixture("amplifier.kicad_sch");
    let sch = outcome.design.as_schematic().expect("schematic design");

    assert_eq!(sch.components.len(), 4);
    let r1 = sch.component("R1").expect("R1");
    assert_eq!(r1.value, "10k");
    assert_eq!(r1.field("Tolerance"), Some("1%"));
    assert_eq!(
        r1.footprint.as_deref(),
        Some("Resistor_SMD:R_0805_2012Metric")
    );
    // A bare "~" datasheet means none.
    assert_eq!(r1.datasheet, None);

    let gnd = sch.net("GND").expect("GND net");
    assert_eq!(gnd.connections.len(), 2);
    assert!(sch.net("VDD").is_some());
    assert!(sch.net("OUT").is_some());
    assert!(!outcome.report.has_errors());
}

#[test]
fn test_parse_legacy_schematic_fixture() {
    let outcome = parse_fixture("blinky.sch");
    let sch = outcome.design.as_schematic().expect("schematic design");

    assert_eq!(sch.components.len(), 2);
    let d1 = sch.component("D1").expect("D1");
    assert_eq!(d1.value, "LED_RED");
    assert_eq!(d1.lib_id, "Device:LED");

    let r1 = sch.component("R1").expect("R1");
    assert_eq!(r1.field("Power"), Some("0.125W"));

    // Global label creates a net under its own name, local under a wrapper.
    assert!(sch.net("VDD").is_some());
    assert!(sch.net("Net-(LED_K)").is_some());
    assert!(outcome.report.is_empty());
}

#[test]
fn test_parse_board_fixture() {
    let outcome = parse_fixture("board.kicad_pcb");
    let pcb = outcome.design.as_pcb().expect("pcb design");

    assert_eq!(pcb.modules.len(), 2);
    assert_eq!(pcb.tracks.len(), 2);
    assert_eq!(pcb.vias.len(), 1);
    assert_eq!(pcb.zones.len(), 1);
    assert_eq!(pcb.outline.len(), 4);
    assert!(outcome.report.is_empty());

    let r1 = pcb.module("R1").expect("R1");
    assert_eq!(r1.pads[0].net.as_deref(), Some("VDD"));

    let dims = pcb.board_dimensions();
    assert!((dims.0 - 50.0).abs() < 1e-9);
    assert!((dims.1 - 30.0).abs() < 1e-9);
}

#[test]
fn test_board_statistics() {
    let outcome = parse_fixture("board.kicad_pcb");
    let pcb = outcome.design.as_pcb().expect("pcb design");
    let stats = pcb.statistics();

    assert_eq!(stats.module_count, 2);
    assert_eq!(stats.modules_by_side.len(), 2);
    assert_eq!(stats.track_count, 2);
    // 8.125 mm + 9.0625 mm of track.
    assert!((stats.total_track_length - 17.1875).abs() < 1e-6);
}

#[test]
fn test_corrupt_file_is_fatal() {
    let result = parse_file(&fixture_path("corrupt.kicad_sch"), ParseOptions::default());
    match result {
        Err(TwinizerError::Parse(e)) => assert!(e.message.contains("never closed")),
        other => panic!("expected parse error, got {:?}", other.map(|o| o.design)),
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let result = parse_file(
        &fixture_path("does_not_exist.kicad_sch"),
        ParseOptions::default(),
    );
    assert!(matches!(result, Err(TwinizerError::Io(_))));
}

#[test]
fn test_parse_is_deterministic_across_runs() {
    let a = parse_fixture("amplifier.kicad_sch");
    let b = parse_fixture("amplifier.kicad_sch");
    assert_eq!(a.design.as_schematic(), b.design.as_schematic());
}

#[test]
fn test_design_kind_matches_content() {
    assert!(matches!(
        parse_fixture("amplifier.kicad_sch").design,
        Design::Schematic(_)
    ));
    assert!(matches!(
        parse_fixture("board.kicad_pcb").design,
        Design::Pcb(_)
    ));
}
