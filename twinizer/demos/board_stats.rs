//! Print statistics and a flowchart for a board file.

use std::path::Path;
use twinizer::prelude::*;

fn main() -> Result<(), TwinizerError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/board.kicad_pcb".to_string());
    let path = Path::new(&path);

    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        eprintln!("Usage: cargo run --example board_stats [path/to/file.kicad_pcb]");
        std::process::exit(1);
    }

    let outcome = parse_file(path, ParseOptions::default())?;
    let Design::Pcb(pcb) = &outcome.design else {
        eprintln!("{} is not a board file", path.display());
        std::process::exit(1);
    };

    let stats = pcb.statistics();
    println!("{} modules, {} tracks", stats.module_count, stats.track_count);
    println!(
        "board {:.1} x {:.1} mm, {:.2} mm of track",
        stats.board_dimensions.0, stats.board_dimensions.1, stats.total_track_length
    );
    println!();
    println!("{}", mermaid::pcb_flowchart(pcb, Direction::LeftRight));
    Ok(())
}
