//! Simplified 3D board projection.
//!
//! The board outline is chained into a single closed polygon and extruded to
//! a fixed thickness; modules become flat boxes over their pad bounding box.
//! This is a visualization aid, not a manufacturing model. An outline that
//! cannot be closed into a simple polygon (gaps, self-intersections, stray
//! loops) fails with [`TwinizerError::UnsupportedGeometry`]; it is never
//! silently patched.

use crate::core::TwinizerError;
use crate::parser::pcb_schema::{BoardSide, OutlineSegment, Pcb, Position};

/// Standard 2-layer board thickness in mm.
pub const BOARD_THICKNESS_MM: f64 = 1.6;

/// Height of the flat module boxes in mm.
const MODULE_HEIGHT_MM: f64 = 1.0;

/// Endpoint matching tolerance for outline chaining, in mm.
const CHAIN_TOLERANCE_MM: f64 = 1e-3;

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleBox {
    pub reference: String,
    pub min: Position,
    pub max: Position,
    pub side: BoardSide,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardModel {
    /// Closed outline polygon, in chaining order. The closing vertex is not
    /// repeated.
    pub outline: Vec<Position>,
    pub thickness: f64,
    pub modules: Vec<ModuleBox>,
}

impl BoardModel {
    pub fn from_pcb(pcb: &Pcb) -> Result<BoardModel, TwinizerError> {
        let outline = chain_outline(&pcb.outline)?;
        if has_self_intersection(&outline) {
            return Err(TwinizerError::UnsupportedGeometry(
                "board outline is self-intersecting".to_string(),
            ));
        }

        let modules = pcb
            .modules
            .iter()
            .map(|m| {
                let (min, max) = m.bounding_box();
                ModuleBox {
                    reference: m.reference.clone(),
                    min,
                    max,
                    side: m.side,
                }
            })
            .collect();

        Ok(BoardModel {
            outline,
            thickness: BOARD_THICKNESS_MM,
            modules,
        })
    }

    /// Wavefront OBJ text. Top and bottom board faces are emitted as n-gons
    /// (OBJ permits them and triangulating a possibly concave outline here
    /// would duplicate the renderer's job); sides and module boxes are quads.
    pub fn to_obj(&self) -> String {
        let mut out = String::from("# board model\n");
        let mut vertex_base = 0usize;
        let n = self.outline.len();

        out.push_str("g board\n");
        for z in [0.0, self.thickness] {
            for p in &self.outline {
                out.push_str(&format!("v {:.4} {:.4} {:.4}\n", p.x, p.y, z));
            }
        }
        // Bottom face wound in reverse so its normal points down.
        let bottom: Vec<String> = (0..n).rev().map(|i| (i + 1).to_string()).collect();
        out.push_str(&format!("f {}\n", bottom.join(" ")));
        let top: Vec<String> = (0..n).map(|i| (n + i + 1).to_string()).collect();
        out.push_str(&format!("f {}\n", top.join(" ")));
        for i in 0..n {
            let j = (i + 1) % n;
            out.push_str(&format!(
                "f {} {} {} {}\n",
                i + 1,
                j + 1,
                n + j + 1,
                n + i + 1
            ));
        }
        vertex_base += 2 * n;

        for module in &self.modules {
            let (z0, z1) = match module.side {
                BoardSide::Top => (self.thickness, self.thickness + MODULE_HEIGHT_MM),
                BoardSide::Bottom => (-MODULE_HEIGHT_MM, 0.0),
            };
            out.push_str(&format!("g {}\n", module.reference));
            let corners = [
                (module.min.x, module.min.y),
                (module.max.x, module.min.y),
                (module.max.x, module.max.y),
                (module.min.x, module.max.y),
            ];
            for z in [z0, z1] {
                for (x, y) in corners {
                    out.push_str(&format!("v {:.4} {:.4} {:.4}\n", x, y, z));
                }
            }
            let b = vertex_base;
            out.push_str(&format!("f {} {} {} {}\n", b + 4, b + 3, b + 2, b + 1));
            out.push_str(&format!("f {} {} {} {}\n", b + 5, b + 6, b + 7, b + 8));
            for i in 0..4 {
                let j = (i + 1) % 4;
                out.push_str(&format!(
                    "f {} {} {} {}\n",
                    b + i + 1,
                    b + j + 1,
                    b + j + 5,
                    b + i + 5
                ));
            }
            vertex_base += 8;
        }
        out
    }
}

fn close_enough(a: Position, b: Position) -> bool {
    (a.x - b.x).abs() <= CHAIN_TOLERANCE_MM && (a.y - b.y).abs() <= CHAIN_TOLERANCE_MM
}

/// Chain unordered outline segments into one closed polygon. Arcs contribute
/// their chord; the visual approximation is acceptable for this projection.
fn chain_outline(segments: &[OutlineSegment]) -> Result<Vec<Position>, TwinizerError> {
    if segments.is_empty() {
        return Err(TwinizerError::UnsupportedGeometry(
            "board has no outline".to_string(),
        ));
    }

    let mut used = vec![false; segments.len()];
    let (start, mut cursor) = segments[0].endpoints();
    used[0] = true;
    let mut polygon = vec![start];

    loop {
        if close_enough(cursor, start) {
            break;
        }
        polygon.push(cursor);
        let next = segments.iter().enumerate().find_map(|(i, seg)| {
            if used[i] {
                return None;
            }
            let (a, b) = seg.endpoints();
            if close_enough(a, cursor) {
                Some((i, b))
            } else if close_enough(b, cursor) {
                Some((i, a))
            } else {
                None
            }
        });
        match next {
            Some((i, endpoint)) => {
                used[i] = true;
                cursor = endpoint;
            }
            None => {
                return Err(TwinizerError::UnsupportedGeometry(format!(
                    "board outline has a gap at ({:.3}, {:.3})",
                    cursor.x, cursor.y
                )));
            }
        }
    }

    if used.iter().any(|u| !u) {
        return Err(TwinizerError::UnsupportedGeometry(
            "board outline contains segments outside the main loop".to_string(),
        ));
    }
    if polygon.len() < 3 {
        return Err(TwinizerError::UnsupportedGeometry(
            "board outline degenerates to fewer than 3 vertices".to_string(),
        ));
    }
    Ok(polygon)
}

fn orientation(a: Position, b: Position, c: Position) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn segments_cross(a1: Position, a2: Position, b1: Position, b2: Position) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);
    (d1 * d2 < 0.0) && (d3 * d4 < 0.0)
}

/// Proper-crossing test over all non-adjacent edge pairs. Quadratic, which is
/// fine at board-outline sizes.
fn has_self_intersection(polygon: &[Position]) -> bool {
    let n = polygon.len();
    for i in 0..n {
        for j in (i + 1)..n {
            // Adjacent edges share a vertex and may not be tested.
            if j == i || (j + 1) % n == i || (i + 1) % n == j {
                continue;
            }
            if segments_cross(
                polygon[i],
                polygon[(i + 1) % n],
                polygon[j],
                polygon[(j + 1) % n],
            ) {
                return true;
            }
        }
    }
    false
}
