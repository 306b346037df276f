//! Core error taxonomy, parse options, and design-file discovery.
//! Shared by the library API, the batch orchestrator and the CLI.

use std::path::{Path, PathBuf};

use crate::parser::sexp::ParseError;

#[derive(Debug, thiserror::Error)]
pub enum TwinizerError {
    /// Malformed token stream; fatal for the file being parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A hierarchical schematic references a sheet that is already being
    /// resolved higher up the call chain.
    #[error("cyclic sheet reference: {} is already being resolved", path.display())]
    CyclicSheetReference { path: PathBuf },

    /// The board outline cannot be closed into a simple polygon. Fatal for
    /// the 3D projection only; other projections of the same design succeed.
    #[error("unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    #[error("unrecognized design format: {0}")]
    UnknownFormat(String),

    /// Two input files would write the same output artifact. Raised by the
    /// batch pre-flight check before any parsing starts.
    #[error("output collision: {} and {} both map to {}", first.display(), second.display(), output.display())]
    OutputCollision {
        first: PathBuf,
        second: PathBuf,
        output: PathBuf,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Options for parse runs (library callers, batch, CLI).
#[derive(Clone, Copy, Debug, Default)]
pub struct ParseOptions {
    /// Escalate duplicate reference designators from a warning to an error
    /// diagnostic. Duplicates are common in multi-unit parts, so the default
    /// keeps them as warnings.
    pub strict_references: bool,
}

/// Which design files a discovery pass should pick up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileTypeFilter {
    Schematic,
    Pcb,
    Both,
}

impl FileTypeFilter {
    pub fn matches(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        match self {
            FileTypeFilter::Schematic => matches!(ext, "sch" | "kicad_sch"),
            FileTypeFilter::Pcb => ext == "kicad_pcb",
            FileTypeFilter::Both => matches!(ext, "sch" | "kicad_sch" | "kicad_pcb"),
        }
    }
}

/// Discover design files under a directory, sorted by path for a stable
/// processing order.
pub fn discover_design_files(
    dir: &Path,
    filter: FileTypeFilter,
    recursive: bool,
) -> Result<Vec<PathBuf>, TwinizerError> {
    let mut files = Vec::new();
    walk_dir(dir, filter, recursive, &mut files, 0)?;
    files.sort();
    tracing::debug!("discovered {} design files under {}", files.len(), dir.display());
    Ok(files)
}

fn walk_dir(
    dir: &Path,
    filter: FileTypeFilter,
    recursive: bool,
    files: &mut Vec<PathBuf>,
    depth: usize,
) -> Result<(), TwinizerError> {
    if depth > 20 {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.starts_with('.') || name == "node_modules" || name == "target" || name == "build"
            {
                continue;
            }
            if recursive {
                walk_dir(&path, filter, recursive, files, depth + 1)?;
            }
        } else if path.is_file() && filter.matches(&path) {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_filter_matches() {
        assert!(FileTypeFilter::Schematic.matches(Path::new("a.sch")));
        assert!(FileTypeFilter::Schematic.matches(Path::new("a.kicad_sch")));
        assert!(!FileTypeFilter::Schematic.matches(Path::new("a.kicad_pcb")));
        assert!(FileTypeFilter::Pcb.matches(Path::new("a.kicad_pcb")));
        assert!(FileTypeFilter::Both.matches(Path::new("a.kicad_pcb")));
        assert!(!FileTypeFilter::Both.matches(Path::new("a.txt")));
    }

    #[test]
    fn test_discover_respects_recursive_flag() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("top.kicad_sch"), "(kicad_sch)").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("inner.kicad_pcb"), "(kicad_pcb)").unwrap();

        let flat = discover_design_files(dir.path(), FileTypeFilter::Both, false).unwrap();
        assert_eq!(flat.len(), 1);

        let deep = discover_design_files(dir.path(), FileTypeFilter::Both, true).unwrap();
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn test_discover_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.sch"), "").unwrap();
        fs::write(dir.path().join("a.sch"), "").unwrap();

        let files = discover_design_files(dir.path(), FileTypeFilter::Both, false).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.sch", "b.sch"]);
    }
}
