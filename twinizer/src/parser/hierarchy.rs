//! Hierarchical sheet resolution.
//!
//! A parent schematic links child sheets by path. Resolution walks the tree
//! depth-first, parsing each sheet file relative to its parent's directory.
//! An in-flight path set catches cycles: re-entering a path that is still
//! being resolved fails with [`TwinizerError::CyclicSheetReference`] before
//! any components from the cycle are returned. Missing sheet files degrade to
//! a warning and the rest of the tree still resolves.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::core::{ParseOptions, TwinizerError};
use crate::parser::format::{parse_file, Design};
use crate::parser::schema::{Net, Schematic};
use crate::report::ParseReport;

/// Parse a schematic and every sheet reachable from it, depth-first, root
/// first.
pub fn resolve_hierarchy(
    root: &Path,
    options: ParseOptions,
) -> Result<(Vec<Schematic>, ParseReport), TwinizerError> {
    let mut sheets = Vec::new();
    let mut report = ParseReport::new();
    let mut in_flight = HashSet::new();
    resolve_into(root, options, &mut in_flight, &mut sheets, &mut report)?;
    Ok((sheets, report))
}

fn resolve_into(
    path: &Path,
    options: ParseOptions,
    in_flight: &mut HashSet<PathBuf>,
    out: &mut Vec<Schematic>,
    report: &mut ParseReport,
) -> Result<(), TwinizerError> {
    // Canonical paths so the same sheet reached via different relative
    // spellings still collides.
    let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !in_flight.insert(key.clone()) {
        return Err(TwinizerError::CyclicSheetReference {
            path: path.to_path_buf(),
        });
    }

    let outcome = parse_file(path, options)?;
    report.extend(outcome.report);
    let schematic = match outcome.design {
        Design::Schematic(s) => s,
        Design::Pcb(_) => {
            return Err(TwinizerError::Other(format!(
                "{} is a board file, not a schematic sheet",
                path.display()
            )));
        }
    };

    let links = schematic.sheets.clone();
    out.push(schematic);

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for link in links {
        let child = base.join(&link.path);
        if !child.is_file() {
            report.warn(
                format!(
                    "sheet file {} referenced by {} not found; skipped",
                    link.path,
                    path.display()
                ),
                None,
            );
            continue;
        }
        resolve_into(&child, options, in_flight, out, report)?;
    }

    in_flight.remove(&key);
    Ok(())
}

/// Merge resolved sheets into one flat schematic: components and labels
/// concatenate in sheet order, nets merge by name.
pub fn flatten(sheets: &[Schematic]) -> Schematic {
    let mut flat = Schematic::new(
        sheets
            .first()
            .map(|s| s.filename.clone())
            .unwrap_or_default(),
    );
    for sheet in sheets {
        flat.components.extend(sheet.components.iter().cloned());
        flat.labels.extend(sheet.labels.iter().cloned());
        for net in &sheet.nets {
            match flat.nets.iter_mut().find(|n| n.name == net.name) {
                Some(existing) => existing.connections.extend(net.connections.iter().cloned()),
                None => {
                    let code = flat.nets.len() as u32 + 1;
                    let mut merged = Net::new(net.name.clone(), code);
                    merged.connections = net.connections.clone();
                    flat.nets.push(merged);
                }
            }
        }
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sheet_with_link(child: &str) -> String {
        format!(
            "(kicad_sch (sheet (at 10 10) (property \"Sheetname\" \"sub\") (property \"Sheetfile\" \"{}\")))",
            child
        )
    }

    fn sheet_with_symbol(reference: &str) -> String {
        format!(
            "(kicad_sch (symbol (lib_id \"Device:R\") (at 0 0 0) (property \"Reference\" \"{}\") (property \"Value\" \"1k\")))",
            reference
        )
    }

    #[test]
    fn test_resolves_two_levels() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("top.kicad_sch"), sheet_with_link("mid.kicad_sch")).unwrap();
        fs::write(dir.path().join("mid.kicad_sch"), sheet_with_link("leaf.kicad_sch")).unwrap();
        fs::write(dir.path().join("leaf.kicad_sch"), sheet_with_symbol("R5")).unwrap();

        let (sheets, report) =
            resolve_hierarchy(&dir.path().join("top.kicad_sch"), ParseOptions::default())
                .unwrap();
        assert_eq!(sheets.len(), 3);
        assert!(report.is_empty());

        let flat = flatten(&sheets);
        assert_eq!(flat.components.len(), 1);
        assert_eq!(flat.components[0].reference, "R5");
    }

    #[test]
    fn test_cycle_detected_before_returning_components() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.kicad_sch"), sheet_with_link("b.kicad_sch")).unwrap();
        fs::write(dir.path().join("b.kicad_sch"), sheet_with_link("a.kicad_sch")).unwrap();

        let result = resolve_hierarchy(&dir.path().join("a.kicad_sch"), ParseOptions::default());
        assert!(matches!(
            result,
            Err(TwinizerError::CyclicSheetReference { .. })
        ));
    }

    #[test]
    fn test_missing_sheet_degrades_to_warning() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("top.kicad_sch"),
            sheet_with_link("nowhere.kicad_sch"),
        )
        .unwrap();

        let (sheets, report) =
            resolve_hierarchy(&dir.path().join("top.kicad_sch"), ParseOptions::default())
                .unwrap();
        assert_eq!(sheets.len(), 1);
        assert!(report.warnings().any(|d| d.message.contains("nowhere")));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let top = "(kicad_sch \
          (sheet (property \"Sheetname\" \"l\") (property \"Sheetfile\" \"shared.kicad_sch\")) \
          (sheet (property \"Sheetname\" \"r\") (property \"Sheetfile\" \"shared.kicad_sch\")))";
        fs::write(dir.path().join("top.kicad_sch"), top).unwrap();
        fs::write(dir.path().join("shared.kicad_sch"), sheet_with_symbol("C9")).unwrap();

        let (sheets, _) =
            resolve_hierarchy(&dir.path().join("top.kicad_sch"), ParseOptions::default())
                .unwrap();
        // Shared sheet instantiated twice, once per reference.
        assert_eq!(sheets.len(), 3);
    }

    #[test]
    fn test_flatten_merges_nets_by_name() {
        let mut a = Schematic::new("a.kicad_sch");
        let mut net_a = Net::new("GND", 1);
        net_a.connections.push(crate::parser::schema::Connection {
            reference: "R1".to_string(),
            pin: "1".to_string(),
        });
        a.nets.push(net_a);

        let mut b = Schematic::new("b.kicad_sch");
        let mut net_b = Net::new("GND", 4);
        net_b.connections.push(crate::parser::schema::Connection {
            reference: "C1".to_string(),
            pin: "2".to_string(),
        });
        b.nets.push(net_b);

        let flat = flatten(&[a, b]);
        assert_eq!(flat.nets.len(), 1);
        assert_eq!(flat.nets[0].connections.len(), 2);
    }
}
