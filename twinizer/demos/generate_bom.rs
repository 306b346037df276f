//! Generate a CSV BOM from a schematic and print it.

use std::path::Path;
use twinizer::prelude::*;

fn main() -> Result<(), TwinizerError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/amplifier.kicad_sch".to_string());
    let path = Path::new(&path);

    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        eprintln!("Usage: cargo run --example generate_bom [path/to/file.kicad_sch]");
        std::process::exit(1);
    }

    let outcome = parse_file(path, ParseOptions::default())?;
    for diagnostic in &outcome.report.diagnostics {
        eprintln!("{}", diagnostic);
    }

    let Design::Schematic(schematic) = &outcome.design else {
        eprintln!("{} is not a schematic", path.display());
        std::process::exit(1);
    };

    let bom = Bom::from_schematic(schematic, &BomOptions::default());
    println!("{}", bom.to_csv()?);
    Ok(())
}
