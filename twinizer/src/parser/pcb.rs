//! PCB model builder for `.kicad_pcb` files.
//!
//! Dispatches on top-level group heads. A numeric failure inside one element
//! degrades that element only: it is skipped with a warning and the rest of
//! the board still parses. Unknown group heads are ignored without a
//! diagnostic, since boards routinely carry tool-specific groups.

use crate::core::TwinizerError;
use crate::parser::pcb_schema::*;
use crate::parser::sexp::{Sexp, SexpReader};
use crate::report::ParseReport;

pub struct PcbParser;

impl PcbParser {
    pub fn parse(content: &str, filename: &str) -> Result<(Pcb, ParseReport), TwinizerError> {
        let root = SexpReader::new(content).parse()?;
        if root.head() != Some("kicad_pcb") {
            return Err(TwinizerError::UnknownFormat(format!(
                "expected kicad_pcb root, found {}",
                root.head().unwrap_or("<atom>")
            )));
        }

        let mut pcb = Pcb::new(filename);
        let mut report = ParseReport::new();
        let items = root.as_list().unwrap_or(&[]);

        // Net table first so element net references resolve regardless of
        // group order.
        for item in items.iter().skip(1) {
            if item.head() == Some("net") {
                if let (Some(code), Some(name)) =
                    (item.f64_arg(0).map(|c| c as u32), item.arg(1))
                {
                    pcb.nets.push(PcbNet {
                        code,
                        name: name.to_string(),
                    });
                }
            }
        }

        for item in items.iter().skip(1) {
            let Some(head) = item.head() else { continue };
            let result = match head {
                "footprint" | "module" => {
                    Self::build_module(item, &pcb).map(|m| pcb.modules.push(m))
                }
                "segment" => Self::build_track(item, &pcb).map(|t| pcb.tracks.push(t)),
                "via" => Self::build_via(item, &pcb).map(|v| pcb.vias.push(v)),
                "zone" => Self::build_zone(item, &pcb).map(|z| pcb.zones.push(z)),
                "gr_line" | "gr_arc" => {
                    if item.value_of("layer") == Some("Edge.Cuts") {
                        Self::build_outline_segment(item, head).map(|s| pcb.outline.push(s))
                    } else {
                        Ok(())
                    }
                }
                "paper" | "page" => {
                    pcb.page_size = Self::page_size(item);
                    Ok(())
                }
                _ => Ok(()),
            };
            if let Err(reason) = result {
                report.warn(format!("skipped ({}) element: {}", head, reason), None);
            }
        }

        Ok((pcb, report))
    }

    fn build_module(item: &Sexp, pcb: &Pcb) -> Result<Module, String> {
        let footprint = item.arg(0).unwrap_or("").to_string();
        let at = item.child("at").ok_or("missing (at)")?;
        let position = Position::new(req_f64(at, 0, "at")?, req_f64(at, 1, "at")?);
        let rotation = at.f64_arg(2).unwrap_or(0.0);
        let side = BoardSide::from_layer(item.value_of("layer").unwrap_or("F.Cu"));

        let mut reference = String::new();
        let mut value = String::new();
        for text in item.children("fp_text") {
            match (text.arg(0), text.arg(1)) {
                (Some("reference"), Some(t)) => reference = t.to_string(),
                (Some("value"), Some(t)) => value = t.to_string(),
                _ => {}
            }
        }
        for prop in item.children("property") {
            match (prop.arg(0), prop.arg(1)) {
                (Some("Reference"), Some(t)) => reference = t.to_string(),
                (Some("Value"), Some(t)) => value = t.to_string(),
                _ => {}
            }
        }

        let mut pads = Vec::new();
        for pad in item.children("pad") {
            pads.push(Self::build_pad(pad, pcb)?);
        }

        Ok(Module {
            reference,
            value,
            footprint,
            side,
            position,
            rotation,
            pads,
        })
    }

    fn build_pad(pad: &Sexp, pcb: &Pcb) -> Result<Pad, String> {
        let at = pad.child("at").ok_or("missing (at) in pad")?;
        let size = pad.child("size").ok_or("missing (size) in pad")?;
        Ok(Pad {
            number: pad.arg(0).unwrap_or("").to_string(),
            position: Position::new(req_f64(at, 0, "pad at")?, req_f64(at, 1, "pad at")?),
            shape: PadShape::parse(pad.arg(2).unwrap_or("")),
            size: (req_f64(size, 0, "pad size")?, req_f64(size, 1, "pad size")?),
            net: Self::net_of(pad, pcb),
        })
    }

    fn build_track(item: &Sexp, pcb: &Pcb) -> Result<Track, String> {
        let start = item.child("start").ok_or("missing (start)")?;
        let end = item.child("end").ok_or("missing (end)")?;
        Ok(Track {
            start: Position::new(req_f64(start, 0, "start")?, req_f64(start, 1, "start")?),
            end: Position::new(req_f64(end, 0, "end")?, req_f64(end, 1, "end")?),
            width: item.f64_of("width").ok_or("missing or non-numeric (width)")?,
            layer: item.value_of("layer").unwrap_or("F.Cu").to_string(),
            net: Self::net_of(item, pcb),
        })
    }

    fn build_via(item: &Sexp, pcb: &Pcb) -> Result<Via, String> {
        let at = item.child("at").ok_or("missing (at)")?;
        let layers = item.child("layers");
        Ok(Via {
            position: Position::new(req_f64(at, 0, "at")?, req_f64(at, 1, "at")?),
            size: item.f64_of("size").ok_or("missing or non-numeric (size)")?,
            drill: item.f64_of("drill").unwrap_or(0.0),
            layers: (
                layers.and_then(|l| l.arg(0)).unwrap_or("F.Cu").to_string(),
                layers.and_then(|l| l.arg(1)).unwrap_or("B.Cu").to_string(),
            ),
            net: Self::net_of(item, pcb),
        })
    }

    fn build_zone(item: &Sexp, pcb: &Pcb) -> Result<Zone, String> {
        let mut outline = Vec::new();
        if let Some(pts) = item.child("polygon").and_then(|p| p.child("pts")) {
            for xy in pts.children("xy") {
                outline.push(Position::new(
                    req_f64(xy, 0, "zone xy")?,
                    req_f64(xy, 1, "zone xy")?,
                ));
            }
        }
        let net = item
            .value_of("net_name")
            .map(str::to_string)
            .or_else(|| Self::net_of(item, pcb));
        Ok(Zone {
            layer: item.value_of("layer").unwrap_or("F.Cu").to_string(),
            outline,
            net,
        })
    }

    fn build_outline_segment(item: &Sexp, head: &str) -> Result<OutlineSegment, String> {
        let point = |key: &str| -> Result<Position, String> {
            let group = item.child(key).ok_or_else(|| format!("missing ({})", key))?;
            Ok(Position::new(
                req_f64(group, 0, key)?,
                req_f64(group, 1, key)?,
            ))
        };
        if head == "gr_arc" {
            Ok(OutlineSegment::Arc {
                start: point("start")?,
                mid: point("mid")?,
                end: point("end")?,
            })
        } else {
            Ok(OutlineSegment::Line {
                start: point("start")?,
                end: point("end")?,
            })
        }
    }

    /// Resolve a `(net N [name])` child against the board's net table.
    fn net_of(item: &Sexp, pcb: &Pcb) -> Option<String> {
        let net = item.child("net")?;
        if let Some(name) = net.arg(1) {
            return Some(name.to_string());
        }
        let code: u32 = net.arg(0)?.parse().ok()?;
        pcb.net_name(code).map(str::to_string)
    }

    /// Page dimensions in mm for `(paper "A4")` style groups. Custom sizes
    /// carry explicit width and height.
    fn page_size(item: &Sexp) -> Option<(f64, f64)> {
        match item.arg(0)? {
            "A0" => Some((1189.0, 841.0)),
            "A1" => Some((841.0, 594.0)),
            "A2" => Some((594.0, 420.0)),
            "A3" => Some((420.0, 297.0)),
            "A4" => Some((297.0, 210.0)),
            "USLetter" | "Letter" => Some((279.4, 215.9)),
            "User" | "Custom" => Some((item.f64_arg(1)?, item.f64_arg(2)?)),
            _ => None,
        }
    }
}

fn req_f64(group: &Sexp, index: usize, what: &str) -> Result<f64, String> {
    group
        .f64_arg(index)
        .ok_or_else(|| format!("missing or non-numeric coordinate in ({})", what))
}
