//! PCB data model.
//!
//! All coordinates are millimeters. A parsed board owns insertion-ordered
//! lists of modules, tracks, vias, zones and outline segments; net names are
//! resolved from the numeric net table during parse.

use serde::{Deserialize, Serialize};

pub use crate::parser::schema::Position;

/// Which copper side a module sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardSide {
    Top,
    Bottom,
}

impl BoardSide {
    pub fn from_layer(layer: &str) -> Self {
        if layer.starts_with("B.") {
            BoardSide::Bottom
        } else {
            BoardSide::Top
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BoardSide::Top => "F.Cu",
            BoardSide::Bottom => "B.Cu",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PadShape {
    Circle,
    Rect,
    Oval,
    RoundRect,
    Trapezoid,
}

impl PadShape {
    pub fn parse(s: &str) -> Self {
        match s {
            "rect" => PadShape::Rect,
            "oval" => PadShape::Oval,
            "roundrect" => PadShape::RoundRect,
            "trapezoid" => PadShape::Trapezoid,
            _ => PadShape::Circle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    pub number: String,
    /// Position relative to the owning module.
    pub position: Position,
    pub shape: PadShape,
    pub size: (f64, f64),
    pub net: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub reference: String,
    pub value: String,
    /// Footprint library id, e.g. `Resistor_SMD:R_0402`.
    pub footprint: String,
    pub side: BoardSide,
    pub position: Position,
    pub rotation: f64,
    pub pads: Vec<Pad>,
}

impl Module {
    /// Axis-aligned bounding box in board coordinates, derived from pad
    /// extents. Modules without pads get a nominal 1x1 mm box.
    pub fn bounding_box(&self) -> (Position, Position) {
        if self.pads.is_empty() {
            return (
                Position::new(self.position.x - 0.5, self.position.y - 0.5),
                Position::new(self.position.x + 0.5, self.position.y + 0.5),
            );
        }
        let mut min = Position::new(f64::MAX, f64::MAX);
        let mut max = Position::new(f64::MIN, f64::MIN);
        for pad in &self.pads {
            let (hw, hh) = (pad.size.0 / 2.0, pad.size.1 / 2.0);
            let cx = self.position.x + pad.position.x;
            let cy = self.position.y + pad.position.y;
            min.x = min.x.min(cx - hw);
            min.y = min.y.min(cy - hh);
            max.x = max.x.max(cx + hw);
            max.y = max.y.max(cy + hh);
        }
        (min, max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub start: Position,
    pub end: Position,
    pub width: f64,
    pub layer: String,
    pub net: Option<String>,
}

impl Track {
    pub fn length(&self) -> f64 {
        let dx = self.end.x - self.start.x;
        let dy = self.end.y - self.start.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Via {
    pub position: Position,
    pub size: f64,
    pub drill: f64,
    /// Layer span, outermost first, e.g. `("F.Cu", "B.Cu")`.
    pub layers: (String, String),
    pub net: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub layer: String,
    /// Polygon outline, ordered.
    pub outline: Vec<Position>,
    pub net: Option<String>,
}

/// One segment of the board's physical boundary (Edge.Cuts). The outline
/// need not be explicitly closed; consumers must tolerate open outlines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutlineSegment {
    Line {
        start: Position,
        end: Position,
    },
    Arc {
        start: Position,
        mid: Position,
        end: Position,
    },
}

impl OutlineSegment {
    pub fn endpoints(&self) -> (Position, Position) {
        match self {
            OutlineSegment::Line { start, end } => (*start, *end),
            OutlineSegment::Arc { start, end, .. } => (*start, *end),
        }
    }
}

/// Numeric net table entry from the board header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbNet {
    pub code: u32,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pcb {
    pub filename: String,
    pub nets: Vec<PcbNet>,
    pub modules: Vec<Module>,
    pub tracks: Vec<Track>,
    pub vias: Vec<Via>,
    pub zones: Vec<Zone>,
    pub outline: Vec<OutlineSegment>,
    /// Page dimensions in mm, used as a board-size fallback when no outline
    /// exists.
    pub page_size: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PcbStatistics {
    pub module_count: usize,
    pub modules_by_side: Vec<(String, usize)>,
    pub track_count: usize,
    pub tracks_by_layer: Vec<(String, usize)>,
    pub total_track_length: f64,
    pub via_count: usize,
    pub zone_count: usize,
    pub board_dimensions: (f64, f64),
}

impl Pcb {
    pub fn new(filename: impl Into<String>) -> Self {
        Pcb {
            filename: filename.into(),
            ..Default::default()
        }
    }

    pub fn module(&self, reference: &str) -> Option<&Module> {
        self.modules.iter().rev().find(|m| m.reference == reference)
    }

    pub fn net_name(&self, code: u32) -> Option<&str> {
        self.nets
            .iter()
            .find(|n| n.code == code)
            .map(|n| n.name.as_str())
    }

    /// Board dimensions: outline bounding box when present, page size next,
    /// module extent (plus margin) as a last resort.
    pub fn board_dimensions(&self) -> (f64, f64) {
        if !self.outline.is_empty() {
            let mut min = Position::new(f64::MAX, f64::MAX);
            let mut max = Position::new(f64::MIN, f64::MIN);
            for seg in &self.outline {
                let (a, b) = seg.endpoints();
                for p in [a, b] {
                    min.x = min.x.min(p.x);
                    min.y = min.y.min(p.y);
                    max.x = max.x.max(p.x);
                    max.y = max.y.max(p.y);
                }
            }
            return (max.x - min.x, max.y - min.y);
        }
        if let Some(page) = self.page_size {
            return page;
        }
        if !self.modules.is_empty() {
            let xs: Vec<f64> = self.modules.iter().map(|m| m.position.x).collect();
            let ys: Vec<f64> = self.modules.iter().map(|m| m.position.y).collect();
            let min_x = xs.iter().cloned().fold(f64::MAX, f64::min);
            let max_x = xs.iter().cloned().fold(f64::MIN, f64::max);
            let min_y = ys.iter().cloned().fold(f64::MAX, f64::min);
            let max_y = ys.iter().cloned().fold(f64::MIN, f64::max);
            return (max_x - min_x + 20.0, max_y - min_y + 20.0);
        }
        (0.0, 0.0)
    }

    pub fn statistics(&self) -> PcbStatistics {
        let mut modules_by_side: Vec<(String, usize)> = Vec::new();
        for m in &self.modules {
            let key = m.side.as_str().to_string();
            match modules_by_side.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 += 1,
                None => modules_by_side.push((key, 1)),
            }
        }

        let mut tracks_by_layer: Vec<(String, usize)> = Vec::new();
        let mut total_track_length = 0.0;
        for t in &self.tracks {
            total_track_length += t.length();
            match tracks_by_layer.iter_mut().find(|(k, _)| *k == t.layer) {
                Some(slot) => slot.1 += 1,
                None => tracks_by_layer.push((t.layer.clone(), 1)),
            }
        }

        PcbStatistics {
            module_count: self.modules.len(),
            modules_by_side,
            track_count: self.tracks.len(),
            tracks_by_layer,
            total_track_length,
            via_count: self.vias.len(),
            zone_count: self.zones.len(),
            board_dimensions: self.board_dimensions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_length() {
        let t = Track {
            start: Position::new(0.0, 0.0),
            end: Position::new(3.0, 4.0),
            width: 0.25,
            layer: "F.Cu".to_string(),
            net: None,
        };
        assert!((t.length() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_board_side_from_layer() {
        assert_eq!(BoardSide::from_layer("F.Cu"), BoardSide::Top);
        assert_eq!(BoardSide::from_layer("B.Cu"), BoardSide::Bottom);
    }

    #[test]
    fn test_module_bounding_box_from_pads() {
        let m = Module {
            reference: "R1".to_string(),
            value: "10k".to_string(),
            footprint: "R_0402".to_string(),
            side: BoardSide::Top,
            position: Position::new(10.0, 20.0),
            rotation: 0.0,
            pads: vec![
                Pad {
                    number: "1".to_string(),
                    position: Position::new(-0.5, 0.0),
                    shape: PadShape::Rect,
                    size: (0.6, 0.5),
                    net: None,
                },
                Pad {
                    number: "2".to_string(),
                    position: Position::new(0.5, 0.0),
                    shape: PadShape::Rect,
                    size: (0.6, 0.5),
                    net: None,
                },
            ],
        };
        let (min, max) = m.bounding_box();
        assert!((min.x - 9.2).abs() < 1e-9);
        assert!((max.x - 10.8).abs() < 1e-9);
        assert!((min.y - 19.75).abs() < 1e-9);
        assert!((max.y - 20.25).abs() < 1e-9);
    }

    #[test]
    fn test_board_dimensions_fallbacks() {
        let mut pcb = Pcb::new("empty.kicad_pcb");
        assert_eq!(pcb.board_dimensions(), (0.0, 0.0));

        pcb.page_size = Some((297.0, 210.0));
        assert_eq!(pcb.board_dimensions(), (297.0, 210.0));

        pcb.outline.push(OutlineSegment::Line {
            start: Position::new(0.0, 0.0),
            end: Position::new(100.0, 80.0),
        });
        assert_eq!(pcb.board_dimensions(), (100.0, 80.0));
    }
}
