//! Format detection and the parser registry.
//!
//! Detection sniffs content, never the file extension: the first non-blank
//! line decides. A leading `(` means an S-expression file, whose root head
//! symbol then picks schematic or board; an `EESchema` header means a legacy
//! schematic. The registry is an explicit table from format tag to
//! constructor, so adding a format is one new row.

use std::path::Path;

use crate::core::{ParseOptions, TwinizerError};
use crate::parser::pcb::PcbParser;
use crate::parser::pcb_schema::Pcb;
use crate::parser::schema::Schematic;
use crate::parser::schematic::SchematicParser;
use crate::report::ParseReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTag {
    LegacySchematic,
    SexprSchematic,
    SexprPcb,
}

impl FormatTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatTag::LegacySchematic => "legacy schematic",
            FormatTag::SexprSchematic => "schematic",
            FormatTag::SexprPcb => "pcb",
        }
    }

    /// Sniff the format from the first non-blank line of `content`.
    pub fn sniff(content: &str) -> Result<FormatTag, TwinizerError> {
        let first = content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("");

        if let Some(rest) = first.strip_prefix('(') {
            let head: String = rest
                .trim_start()
                .chars()
                .take_while(|c| !c.is_whitespace() && *c != '(' && *c != ')')
                .collect();
            return match head.as_str() {
                "kicad_sch" => Ok(FormatTag::SexprSchematic),
                "kicad_pcb" => Ok(FormatTag::SexprPcb),
                other => Err(TwinizerError::UnknownFormat(format!(
                    "unrecognized root group ({})",
                    other
                ))),
            };
        }
        if first.starts_with("EESchema") {
            return Ok(FormatTag::LegacySchematic);
        }
        Err(TwinizerError::UnknownFormat(
            "first non-blank line is neither a group nor an EESchema header".to_string(),
        ))
    }
}

/// A parsed design of either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Design {
    Schematic(Schematic),
    Pcb(Pcb),
}

impl Design {
    pub fn as_schematic(&self) -> Option<&Schematic> {
        match self {
            Design::Schematic(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_pcb(&self) -> Option<&Pcb> {
        match self {
            Design::Pcb(p) => Some(p),
            _ => None,
        }
    }
}

/// A design plus the non-fatal diagnostics raised while building it.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub design: Design,
    pub report: ParseReport,
}

type Constructor = fn(&str, &str, ParseOptions) -> Result<ParseOutcome, TwinizerError>;

/// Registry rows, one per supported format.
const REGISTRY: &[(FormatTag, Constructor)] = &[
    (FormatTag::LegacySchematic, build_legacy_schematic),
    (FormatTag::SexprSchematic, build_sexpr_schematic),
    (FormatTag::SexprPcb, build_pcb),
];

pub fn parser_for(tag: FormatTag) -> Constructor {
    // The registry covers every tag variant; the lookup cannot miss.
    REGISTRY
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, f)| *f)
        .unwrap_or(build_sexpr_schematic)
}

fn build_legacy_schematic(
    content: &str,
    filename: &str,
    options: ParseOptions,
) -> Result<ParseOutcome, TwinizerError> {
    let (schematic, report) = SchematicParser::parse_legacy(content, filename, options)?;
    Ok(ParseOutcome {
        design: Design::Schematic(schematic),
        report,
    })
}

fn build_sexpr_schematic(
    content: &str,
    filename: &str,
    options: ParseOptions,
) -> Result<ParseOutcome, TwinizerError> {
    let (schematic, report) = SchematicParser::parse_sexpr(content, filename, options)?;
    Ok(ParseOutcome {
        design: Design::Schematic(schematic),
        report,
    })
}

fn build_pcb(
    content: &str,
    filename: &str,
    _options: ParseOptions,
) -> Result<ParseOutcome, TwinizerError> {
    let (pcb, report) = PcbParser::parse(content, filename)?;
    Ok(ParseOutcome {
        design: Design::Pcb(pcb),
        report,
    })
}

/// Parse in-memory content, sniffing the format first.
pub fn parse_content(
    content: &str,
    filename: &str,
    options: ParseOptions,
) -> Result<ParseOutcome, TwinizerError> {
    let tag = FormatTag::sniff(content)?;
    tracing::debug!("detected {} format for {}", tag.as_str(), filename);
    parser_for(tag)(content, filename, options)
}

/// Read and parse a design file.
pub fn parse_file(path: &Path, options: ParseOptions) -> Result<ParseOutcome, TwinizerError> {
    let content = std::fs::read_to_string(path)?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("design")
        .to_string();
    parse_content(&content, &filename, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_sexpr_schematic() {
        assert_eq!(
            FormatTag::sniff("\n  (kicad_sch (version 1))").unwrap(),
            FormatTag::SexprSchematic
        );
    }

    #[test]
    fn test_sniff_sexpr_pcb() {
        assert_eq!(
            FormatTag::sniff("(kicad_pcb (version 1))").unwrap(),
            FormatTag::SexprPcb
        );
    }

    #[test]
    fn test_sniff_legacy_header() {
        assert_eq!(
            FormatTag::sniff("EESchema Schematic File Version 4\n").unwrap(),
            FormatTag::LegacySchematic
        );
    }

    #[test]
    fn test_sniff_rejects_garbage() {
        assert!(matches!(
            FormatTag::sniff("hello world"),
            Err(TwinizerError::UnknownFormat(_))
        ));
        assert!(matches!(
            FormatTag::sniff(""),
            Err(TwinizerError::UnknownFormat(_))
        ));
        assert!(matches!(
            FormatTag::sniff("(export (version D))"),
            Err(TwinizerError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_parse_content_dispatches_by_content_not_name() {
        // Board content behind a schematic-looking name still parses as a
        // board.
        let outcome = parse_content(
            "(kicad_pcb (net 0 \"\"))",
            "mislabeled.kicad_sch",
            ParseOptions::default(),
        )
        .unwrap();
        assert!(outcome.design.as_pcb().is_some());
    }
}
