//! Schematic model builder.
//!
//! Consumes token streams from the legacy line reader or the S-expression
//! reader and emits a [`Schematic`]. The legacy path drives a small state
//! machine over block markers (`$Comp`, `$Sheet`, `Text ...`); the modern
//! path dispatches on top-level group heads.
//!
//! Recoverable problems (duplicate reference designators, dangling net
//! connections, unknown block markers, corrupt field rows) are collected in
//! the [`ParseReport`] and never abort the parse.

use crate::core::{ParseOptions, TwinizerError};
use crate::parser::legacy::{LegacyReader, LineRecord};
use crate::parser::schema::*;
use crate::parser::sexp::{ParseError, Sexp, SexpReader};
use crate::report::{Location, ParseReport};

/// Parser facade for schematic files, both legacy `.sch` and modern
/// `.kicad_sch`.
pub struct SchematicParser;

/// Block-marker states for the legacy format.
enum BlockState {
    TopLevel,
    InComponent(ComponentDraft),
    InSheet(SheetDraft),
    InLabel(LabelDraft),
    /// Consuming an unrecognized `$Block` until its terminator or a blank line.
    SkippingUnknown { end_marker: String },
    /// Consuming exactly one payload line (`Text Notes` and friends).
    SkippingLine,
    /// Consuming `$Descr` (page settings, not modeled).
    SkippingDescr,
}

#[derive(Default)]
struct ComponentDraft {
    lib_id: String,
    reference: String,
    value: String,
    footprint: Option<String>,
    datasheet: Option<String>,
    position: Position,
    rotation: f64,
    fields: Vec<(String, String)>,
}

#[derive(Default)]
struct SheetDraft {
    name: String,
    path: String,
}

struct LabelDraft {
    kind: LabelKind,
    position: Position,
}

impl SchematicParser {
    /// Parse a legacy `.sch` schematic from its content.
    pub fn parse_legacy(
        content: &str,
        filename: &str,
        options: ParseOptions,
    ) -> Result<(Schematic, ParseReport), TwinizerError> {
        let mut reader = LegacyReader::new(content);

        // Header line must identify the legacy schematic format.
        let header = loop {
            match reader.next() {
                Some(record) => {
                    let record = record?;
                    if !record.is_blank() {
                        break record;
                    }
                }
                None => {
                    return Err(ParseError::new(content, 0, "file is empty").into());
                }
            }
        };
        if header.keyword != "EESchema" {
            return Err(ParseError::new(content, 0, "expected EESchema header").into());
        }

        let mut schematic = Schematic::new(filename);
        let mut report = ParseReport::new();
        let mut state = BlockState::TopLevel;

        for record in reader {
            let record = record?;
            let at_end = record.keyword == "$EndSCHEMATC";
            state = match state {
                BlockState::TopLevel => {
                    Self::handle_top_level(&record, &mut schematic, &mut report)
                }
                BlockState::InComponent(draft) => {
                    Self::handle_component_row(record, draft, &mut schematic, &mut report)
                }
                BlockState::InSheet(draft) => Self::handle_sheet_row(record, draft, &mut schematic),
                BlockState::InLabel(draft) => {
                    Self::finish_label(record, draft, &mut schematic);
                    BlockState::TopLevel
                }
                BlockState::SkippingLine => BlockState::TopLevel,
                BlockState::SkippingUnknown { end_marker } => {
                    if record.keyword == end_marker || record.is_blank() {
                        BlockState::TopLevel
                    } else {
                        BlockState::SkippingUnknown { end_marker }
                    }
                }
                BlockState::SkippingDescr => {
                    if record.keyword == "$EndDescr" {
                        BlockState::TopLevel
                    } else {
                        BlockState::SkippingDescr
                    }
                }
            };
            if at_end && matches!(state, BlockState::TopLevel) {
                break;
            }
        }

        if !matches!(state, BlockState::TopLevel) {
            report.warn(
                "file ended inside an unterminated block; partial block dropped",
                None,
            );
        }

        Self::finalize(&mut schematic, &mut report, options);
        Ok((schematic, report))
    }

    fn handle_top_level(
        record: &LineRecord,
        schematic: &mut Schematic,
        report: &mut ParseReport,
    ) -> BlockState {
        match record.keyword.as_str() {
            "$Comp" => BlockState::InComponent(ComponentDraft::default()),
            "$Sheet" => BlockState::InSheet(SheetDraft::default()),
            "$Descr" => BlockState::SkippingDescr,
            "Text" => match record.arg(0) {
                Some("Label") => BlockState::InLabel(LabelDraft {
                    kind: LabelKind::Local,
                    position: label_position(record),
                }),
                Some("GLabel") => BlockState::InLabel(LabelDraft {
                    kind: LabelKind::Global,
                    position: label_position(record),
                }),
                Some("HLabel") => BlockState::InLabel(LabelDraft {
                    kind: LabelKind::Hierarchical,
                    position: label_position(record),
                }),
                // Text Notes and friends carry their payload on the next
                // line too; consume it without modeling.
                _ => BlockState::SkippingLine,
            },
            // Known record kinds that the model does not capture.
            "" | "EELAYER" | "Wire" | "Entry" | "Connection" | "NoConn" | "Kmarq"
            | "$EndSCHEMATC" | "Sheet" => BlockState::TopLevel,
            other if other.starts_with('$') => {
                report.warn(
                    format!("unknown block {}; skipped", other),
                    Some(Location::line(record.line_no)),
                );
                BlockState::SkippingUnknown {
                    end_marker: format!("$End{}", &other[1..]),
                }
            }
            _ => {
                // Stray continuation lines (wire coordinates etc.).
                BlockState::TopLevel
            }
        }
    }

    fn handle_component_row(
        record: LineRecord,
        mut draft: ComponentDraft,
        schematic: &mut Schematic,
        report: &mut ParseReport,
    ) -> BlockState {
        match record.keyword.as_str() {
            "$EndComp" => {
                let mut component = Component::new(if draft.reference.is_empty() {
                    "?".to_string()
                } else {
                    draft.reference
                });
                component.value = draft.value;
                component.footprint = draft.footprint;
                component.datasheet = draft.datasheet;
                component.lib_id = draft.lib_id;
                component.position = draft.position;
                component.rotation = draft.rotation;
                for (name, value) in draft.fields {
                    component.set_field(name, value);
                }
                schematic.components.push(component);
                return BlockState::TopLevel;
            }
            "L" => {
                // L Library:Part Reference
                if let Some(lib) = record.arg(0) {
                    draft.lib_id = lib.to_string();
                }
                if let Some(reference) = record.arg(1) {
                    draft.reference = reference.to_string();
                }
            }
            "P" => {
                draft.position = Position::new(
                    record.f64_arg(0).unwrap_or(0.0),
                    record.f64_arg(1).unwrap_or(0.0),
                );
            }
            "U" => {
                // Unit / convert / timestamp; not modeled.
            }
            "F" => {
                // F n "text" orient X Y size flags hjust vjust ["FieldName"]
                match (record.arg(0).and_then(|n| n.parse::<usize>().ok()), record.arg(1)) {
                    (Some(0), Some(text)) => draft.reference = text.to_string(),
                    (Some(1), Some(text)) => draft.value = text.to_string(),
                    (Some(2), Some(text)) => draft.footprint = Some(text.to_string()),
                    (Some(3), Some(text)) => draft.datasheet = Some(text.to_string()),
                    (Some(n), Some(text)) => {
                        // User fields name themselves in the trailing token
                        // when present.
                        let name = if record.args.len() >= 10 {
                            record.args[record.args.len() - 1].clone()
                        } else {
                            format!("F{}", n)
                        };
                        draft.fields.push((name, text.to_string()));
                    }
                    _ => {
                        report.warn(
                            "corrupt field row inside $Comp; dropped",
                            Some(Location::line(record.line_no)),
                        );
                    }
                }
            }
            _ => {
                // Placement matrix rows and pin rows; not modeled.
            }
        }
        BlockState::InComponent(draft)
    }

    fn handle_sheet_row(
        record: LineRecord,
        mut draft: SheetDraft,
        schematic: &mut Schematic,
    ) -> BlockState {
        match record.keyword.as_str() {
            "$EndSheet" => {
                if !draft.path.is_empty() {
                    schematic.sheets.push(SheetLink {
                        name: if draft.name.is_empty() {
                            draft.path.clone()
                        } else {
                            draft.name
                        },
                        path: draft.path,
                        page: None,
                    });
                }
                return BlockState::TopLevel;
            }
            "F0" => {
                if let Some(name) = record.arg(0) {
                    draft.name = name.to_string();
                }
            }
            "F1" => {
                if let Some(path) = record.arg(0) {
                    draft.path = path.to_string();
                }
            }
            _ => {}
        }
        BlockState::InSheet(draft)
    }

    fn finish_label(record: LineRecord, draft: LabelDraft, schematic: &mut Schematic) {
        let text = record.raw.trim().to_string();
        if text.is_empty() {
            return;
        }
        let net_name = match draft.kind {
            LabelKind::Global => text.clone(),
            LabelKind::Local => format!("Net-({})", text),
            LabelKind::Hierarchical => format!("Hier-{}", text),
        };
        ensure_net(&mut schematic.nets, &net_name);
        schematic.labels.push(Label {
            text,
            position: draft.position,
            kind: draft.kind,
        });
    }

    /// Parse a modern `.kicad_sch` schematic from its content.
    pub fn parse_sexpr(
        content: &str,
        filename: &str,
        options: ParseOptions,
    ) -> Result<(Schematic, ParseReport), TwinizerError> {
        let root = SexpReader::new(content).parse()?;
        if root.head() != Some("kicad_sch") {
            return Err(TwinizerError::UnknownFormat(format!(
                "expected kicad_sch root, found {}",
                root.head().unwrap_or("<atom>")
            )));
        }

        let mut schematic = Schematic::new(filename);
        let mut report = ParseReport::new();

        for item in root.as_list().unwrap_or(&[]).iter().skip(1) {
            let Some(head) = item.head() else { continue };
            match head {
                "symbol" => schematic.components.push(Self::build_symbol(item)),
                "sheet" => {
                    if let Some(link) = Self::build_sheet_link(item) {
                        schematic.sheets.push(link);
                    }
                }
                "label" | "global_label" | "hierarchical_label" => {
                    Self::build_sexpr_label(item, head, &mut schematic);
                }
                "net" => Self::build_net(item, &mut schematic),
                // Cosmetic or structural groups that the model does not
                // capture; their absence from the model is expected.
                "version" | "generator" | "generator_version" | "uuid" | "paper"
                | "title_block" | "lib_symbols" | "wire" | "bus" | "bus_entry" | "junction"
                | "no_connect" | "text" | "text_box" | "polyline" | "image"
                | "sheet_instances" | "symbol_instances" | "embedded_fonts" => {}
                other => {
                    report.warn(format!("unknown group ({}); skipped", other), None);
                }
            }
        }

        Self::finalize(&mut schematic, &mut report, options);
        Ok((schematic, report))
    }

    fn build_symbol(item: &Sexp) -> Component {
        let mut component = Component::new("?");
        component.lib_id = item.value_of("lib_id").unwrap_or("").to_string();
        if let Some(at) = item.child("at") {
            component.position = Position::new(
                at.f64_arg(0).unwrap_or(0.0),
                at.f64_arg(1).unwrap_or(0.0),
            );
            component.rotation = at.f64_arg(2).unwrap_or(0.0);
        }
        for prop in item.children("property") {
            let (Some(name), Some(value)) = (prop.arg(0), prop.arg(1)) else {
                continue;
            };
            match name {
                "Reference" => component.reference = value.to_string(),
                "Value" => component.value = value.to_string(),
                "Footprint" => {
                    if !value.is_empty() {
                        component.footprint = Some(value.to_string());
                    }
                }
                "Datasheet" => {
                    if !value.is_empty() && value != "~" {
                        component.datasheet = Some(value.to_string());
                    }
                }
                _ => component.set_field(name, value),
            }
        }
        component
    }

    fn build_sheet_link(item: &Sexp) -> Option<SheetLink> {
        let mut name = None;
        let mut path = None;
        for prop in item.children("property") {
            match (prop.arg(0), prop.arg(1)) {
                (Some("Sheetname") | Some("Sheet name"), Some(v)) => name = Some(v.to_string()),
                (Some("Sheetfile") | Some("Sheet file"), Some(v)) => path = Some(v.to_string()),
                _ => {}
            }
        }
        let path = path?;
        Some(SheetLink {
            name: name.unwrap_or_else(|| path.clone()),
            path,
            page: None,
        })
    }

    fn build_sexpr_label(item: &Sexp, head: &str, schematic: &mut Schematic) {
        let Some(text) = item.arg(0) else { return };
        let kind = match head {
            "global_label" => LabelKind::Global,
            "hierarchical_label" => LabelKind::Hierarchical,
            _ => LabelKind::Local,
        };
        let position = item
            .child("at")
            .map(|at| {
                Position::new(at.f64_arg(0).unwrap_or(0.0), at.f64_arg(1).unwrap_or(0.0))
            })
            .unwrap_or_default();
        let net_name = match kind {
            LabelKind::Global => text.to_string(),
            LabelKind::Local => format!("Net-({})", text),
            LabelKind::Hierarchical => format!("Hier-{}", text),
        };
        ensure_net(&mut schematic.nets, &net_name);
        schematic.labels.push(Label {
            text: text.to_string(),
            position,
            kind,
        });
    }

    /// Netlist-style net group: `(net (code N) (name "X") (node (ref "R1")
    /// (pin "1")) ...)`. Connections are appended in encounter order.
    fn build_net(item: &Sexp, schematic: &mut Schematic) {
        let name = item
            .value_of("name")
            .map(str::to_string)
            .unwrap_or_else(|| format!("Net-{}", schematic.nets.len() + 1));
        let code = item.u32_of("code").unwrap_or(0);

        let index = ensure_net(&mut schematic.nets, &name);
        if code != 0 {
            schematic.nets[index].code = code;
        }
        for node in item.children("node") {
            let (Some(reference), Some(pin)) = (node.value_of("ref"), node.value_of("pin"))
            else {
                continue;
            };
            schematic.nets[index].connections.push(Connection {
                reference: reference.to_string(),
                pin: pin.to_string(),
            });
        }
    }

    /// Shared post-pass: duplicate reference designators and dangling net
    /// connections are flagged, never dropped.
    fn finalize(schematic: &mut Schematic, report: &mut ParseReport, options: ParseOptions) {
        for reference in schematic.duplicate_references() {
            let message = format!(
                "duplicate reference designator {}; all copies kept, last one wins for lookups",
                reference
            );
            if options.strict_references {
                report.error(message, None);
            } else {
                report.warn(message, None);
            }
        }

        for net in &schematic.nets {
            for connection in &net.connections {
                if schematic.component(&connection.reference).is_none() {
                    report.warn(
                        format!(
                            "net {} references unknown component {} (pin {}); connection kept",
                            net.name, connection.reference, connection.pin
                        ),
                        None,
                    );
                }
            }
        }
    }
}

fn label_position(record: &LineRecord) -> Position {
    Position::new(
        record.f64_arg(1).unwrap_or(0.0),
        record.f64_arg(2).unwrap_or(0.0),
    )
}

/// Net table keyed by name; returns the index, inserting with the next code
/// when absent.
fn ensure_net(nets: &mut Vec<Net>, name: &str) -> usize {
    if let Some(index) = nets.iter().position(|n| n.name == name) {
        return index;
    }
    let code = nets.len() as u32 + 1;
    nets.push(Net::new(name, code));
    nets.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY_BASIC: &str = r#"EESchema Schematic File Version 4
EELAYER 30 0
EELAYER END
$Descr A3 16535 11693
encoding utf-8
Sheet 1 5
Title "Test"
$EndDescr
$Comp
L Device:R R1
U 1 1 561E4EB0
P 1200 8900
F 0 "R1" H 1200 8650 50  0001 C CNN
F 1 "10k" H 1200 8750 50  0000 C CNN
F 2 "Resistor_SMD:R_0805" H 1200 8900 50 0001 C CNN
$EndComp
Text Label 5000 3300 0    60   ~ 0
VCC
Text GLabel 6000 3300 0    60   Input ~ 0
RESET
$EndSCHEMATC"#;

    #[test]
    fn test_parse_legacy_basic() {
        let (sch, report) =
            SchematicParser::parse_legacy(LEGACY_BASIC, "test.sch", ParseOptions::default())
                .unwrap();
        assert_eq!(sch.components.len(), 1);
        assert_eq!(sch.components[0].reference, "R1");
        assert_eq!(sch.components[0].value, "10k");
        assert_eq!(
            sch.components[0].footprint.as_deref(),
            Some("Resistor_SMD:R_0805")
        );
        assert_eq!(sch.labels.len(), 2);
        assert!(sch.net("Net-(VCC)").is_some());
        assert!(sch.net("RESET").is_some());
        assert!(report.is_empty(), "unexpected diagnostics: {:?}", report);
    }

    #[test]
    fn test_parse_legacy_deterministic() {
        let opts = ParseOptions::default();
        let (a, _) = SchematicParser::parse_legacy(LEGACY_BASIC, "test.sch", opts).unwrap();
        let (b, _) = SchematicParser::parse_legacy(LEGACY_BASIC, "test.sch", opts).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_legacy_missing_header_is_fatal() {
        let result =
            SchematicParser::parse_legacy("hello world\n", "bad.sch", ParseOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_block_warns_and_continues() {
        let content = "EESchema Schematic File Version 4\n$Bitmap\nstuff\nmore stuff\n$EndBitmap\n$Comp\nL Device:C C1\nF 0 \"C1\" H 0 0 50 0001 C CNN\nF 1 \"100nF\" H 0 0 50 0000 C CNN\n$EndComp\n$EndSCHEMATC\n";
        let (sch, report) =
            SchematicParser::parse_legacy(content, "test.sch", ParseOptions::default()).unwrap();
        assert_eq!(sch.components.len(), 1);
        assert!(report
            .warnings()
            .any(|d| d.message.contains("$Bitmap") && d.location == Some(Location::line(2))));
    }

    #[test]
    fn test_corrupt_field_row_dropped_with_warning() {
        let content = "EESchema Schematic File Version 4\n$Comp\nL Device:R R9\nF notanumber \"junk\" H\nF 1 \"4k7\" H 0 0 50 0000 C CNN\n$EndComp\n$EndSCHEMATC\n";
        let (sch, report) =
            SchematicParser::parse_legacy(content, "test.sch", ParseOptions::default()).unwrap();
        assert_eq!(sch.components.len(), 1);
        assert_eq!(sch.components[0].value, "4k7");
        assert!(report.warnings().any(|d| d.message.contains("corrupt field")));
    }

    #[test]
    fn test_duplicate_reference_policy() {
        let content = "EESchema Schematic File Version 4\n$Comp\nL Device:R R1\nF 0 \"R1\" H 0 0 50 0001 C CNN\nF 1 \"10k\" H 0 0 50 0000 C CNN\n$EndComp\n$Comp\nL Device:R R1\nF 0 \"R1\" H 0 0 50 0001 C CNN\nF 1 \"22k\" H 0 0 50 0000 C CNN\n$EndComp\n$EndSCHEMATC\n";

        let (sch, report) =
            SchematicParser::parse_legacy(content, "test.sch", ParseOptions::default()).unwrap();
        assert_eq!(sch.components.len(), 2);
        assert_eq!(sch.component("R1").unwrap().value, "22k");
        assert!(report.warnings().any(|d| d.message.contains("duplicate")));
        assert!(!report.has_errors());

        let strict = ParseOptions {
            strict_references: true,
        };
        let (_, report) = SchematicParser::parse_legacy(content, "test.sch", strict).unwrap();
        assert!(report.has_errors());
    }

    #[test]
    fn test_legacy_sheet_link_registered_without_recursion() {
        let content = "EESchema Schematic File Version 4\n$Sheet\nS 5000 3000 1500 1000\nU 5D000001\nF0 \"power\" 50\nF1 \"power.sch\" 50\n$EndSheet\n$EndSCHEMATC\n";
        let (sch, _) =
            SchematicParser::parse_legacy(content, "top.sch", ParseOptions::default()).unwrap();
        assert_eq!(sch.sheets.len(), 1);
        assert_eq!(sch.sheets[0].name, "power");
        assert_eq!(sch.sheets[0].path, "power.sch");
    }

    const SEXPR_BASIC: &str = r#"(kicad_sch (version 20211014) (generator "eeschema")
  (symbol (lib_id "Device:R") (at 100.0 50.0 90)
    (property "Reference" "R1" (at 0 0 0))
    (property "Value" "10k" (at 0 0 0))
    (property "Footprint" "Resistor_SMD:R_0805" (at 0 0 0))
    (property "Tolerance" "1%" (at 0 0 0)))
  (symbol (lib_id "Device:C") (at 120.0 50.0 0)
    (property "Reference" "C1" (at 0 0 0))
    (property "Value" "100nF" (at 0 0 0)))
  (global_label "VCC" (at 10 10 0))
  (net (code 1) (name "VCC")
    (node (ref "R1") (pin "1"))
    (node (ref "C1") (pin "1"))
    (node (ref "U9") (pin "3")))
)"#;

    #[test]
    fn test_parse_sexpr_symbols_and_nets() {
        let (sch, report) =
            SchematicParser::parse_sexpr(SEXPR_BASIC, "test.kicad_sch", ParseOptions::default())
                .unwrap();
        assert_eq!(sch.components.len(), 2);
        assert_eq!(sch.components[0].reference, "R1");
        assert_eq!(sch.components[0].field("Tolerance"), Some("1%"));
        assert_eq!(sch.components[0].rotation, 90.0);

        let vcc = sch.net("VCC").unwrap();
        assert_eq!(vcc.code, 1);
        assert_eq!(vcc.connections.len(), 3);
        assert_eq!(vcc.connections[0].reference, "R1");

        // U9 does not exist: connection kept, warning raised.
        assert!(report.warnings().any(|d| d.message.contains("U9")));
        assert_eq!(sch.net("VCC").unwrap().connections.len(), 3);
    }

    #[test]
    fn test_sexpr_wrong_root_rejected() {
        let result = SchematicParser::parse_sexpr(
            "(kicad_pcb (version 1))",
            "x.kicad_sch",
            ParseOptions::default(),
        );
        assert!(matches!(result, Err(TwinizerError::UnknownFormat(_))));
    }

    #[test]
    fn test_sexpr_unbalanced_is_fatal() {
        let result = SchematicParser::parse_sexpr(
            "(kicad_sch (symbol",
            "x.kicad_sch",
            ParseOptions::default(),
        );
        assert!(matches!(result, Err(TwinizerError::Parse(_))));
    }

    #[test]
    fn test_sexpr_sheet_links() {
        let content = r#"(kicad_sch
  (sheet (at 10 10)
    (property "Sheetname" "mcu")
    (property "Sheetfile" "mcu.kicad_sch")))"#;
        let (sch, _) =
            SchematicParser::parse_sexpr(content, "top.kicad_sch", ParseOptions::default())
                .unwrap();
        assert_eq!(sch.sheets.len(), 1);
        assert_eq!(sch.sheets[0].path, "mcu.kicad_sch");
    }

    #[test]
    fn test_empty_design_parses() {
        let (sch, report) =
            SchematicParser::parse_sexpr("(kicad_sch)", "empty.kicad_sch", ParseOptions::default())
                .unwrap();
        assert!(sch.components.is_empty());
        assert!(sch.nets.is_empty());
        assert!(report.is_empty());
    }
}
