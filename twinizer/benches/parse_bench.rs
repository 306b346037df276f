use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::PathBuf;
use twinizer::prelude::*;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn bench_parse_schematic(c: &mut Criterion) {
    let content = std::fs::read_to_string(fixture_path("amplifier.kicad_sch")).unwrap();
    c.bench_function("parse_schematic", |b| {
        b.iter(|| {
            parse_content(
                black_box(&content),
                "amplifier.kicad_sch",
                ParseOptions::default(),
            )
        });
    });
}

fn bench_parse_pcb(c: &mut Criterion) {
    let content = std::fs::read_to_string(fixture_path("board.kicad_pcb")).unwrap();
    c.bench_function("parse_pcb", |b| {
        b.iter(|| {
            parse_content(
                black_box(&content),
                "board.kicad_pcb",
                ParseOptions::default(),
            )
        });
    });
}

fn bench_bom_projection(c: &mut Criterion) {
    let content = std::fs::read_to_string(fixture_path("amplifier.kicad_sch")).unwrap();
    let outcome = parse_content(&content, "amplifier.kicad_sch", ParseOptions::default()).unwrap();
    let Design::Schematic(schematic) = outcome.design else {
        panic!("fixture is a schematic");
    };
    c.bench_function("bom_projection", |b| {
        b.iter(|| Bom::from_schematic(black_box(&schematic), &BomOptions::default()));
    });
}

criterion_group!(
    benches,
    bench_parse_schematic,
    bench_parse_pcb,
    bench_bom_projection
);
criterion_main!(benches);
