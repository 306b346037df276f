//! Schematic data model.
//!
//! Built once during parse and immutable afterwards. The schematic owns flat,
//! insertion-ordered lists per entity kind; lookups by reference designator
//! walk the list (last-seen wins, matching the duplicate-reference policy).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Reference designator (R1, C3, U2). Not guaranteed unique; see
    /// [`Schematic::duplicate_references`].
    pub reference: String,
    pub value: String,
    pub footprint: Option<String>,
    pub datasheet: Option<String>,
    pub lib_id: String,
    pub position: Position,
    /// Rotation in degrees.
    pub rotation: f64,
    /// Extra key/value fields in encounter order; duplicate keys overwrite.
    pub fields: Vec<(String, String)>,
}

impl Component {
    pub fn new(reference: impl Into<String>) -> Self {
        Component {
            reference: reference.into(),
            value: String::new(),
            footprint: None,
            datasheet: None,
            lib_id: String::new(),
            position: Position::default(),
            rotation: 0.0,
            fields: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or overwrite a field, preserving first-encounter order.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    /// Power symbols (#PWR refs, GND/VCC flags) are kept in the component
    /// list but excluded from BOMs by default.
    pub fn is_power_symbol(&self) -> bool {
        self.reference.starts_with('#')
    }
}

/// One pin-level attachment of a component to a net.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub reference: String,
    pub pin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Net {
    pub name: String,
    pub code: u32,
    /// Connections in encounter order. A connection whose reference does not
    /// resolve to a component is kept and flagged in the parse report.
    pub connections: Vec<Connection>,
}

impl Net {
    pub fn new(name: impl Into<String>, code: u32) -> Self {
        Net {
            name: name.into(),
            code,
            connections: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelKind {
    Local,
    Global,
    Hierarchical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub text: String,
    pub position: Position,
    pub kind: LabelKind,
}

/// Reference to a child sheet. The child is parsed independently and linked
/// by path, never owned; cycle detection happens at resolution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetLink {
    pub name: String,
    /// Path as written in the parent file, usually relative.
    pub path: String,
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schematic {
    pub filename: String,
    pub components: Vec<Component>,
    pub nets: Vec<Net>,
    pub labels: Vec<Label>,
    pub sheets: Vec<SheetLink>,
}

impl Schematic {
    pub fn new(filename: impl Into<String>) -> Self {
        Schematic {
            filename: filename.into(),
            ..Default::default()
        }
    }

    /// Look up a component by reference designator. When the designator is
    /// duplicated, the last-seen copy wins.
    pub fn component(&self, reference: &str) -> Option<&Component> {
        self.components
            .iter()
            .rev()
            .find(|c| c.reference == reference)
    }

    pub fn net(&self, name: &str) -> Option<&Net> {
        self.nets.iter().find(|n| n.name == name)
    }

    /// Reference designators that appear more than once, in first-encounter
    /// order. Callers needing strict uniqueness check this explicitly.
    pub fn duplicate_references(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        let mut dups = Vec::new();
        for c in &self.components {
            if !seen.insert(c.reference.as_str()) && !dups.contains(&c.reference.as_str()) {
                dups.push(c.reference.as_str());
            }
        }
        dups
    }
}
