//! Mermaid diagram projections.
//!
//! Emits plain-text diagram descriptions; rendering to images is someone
//! else's job. Every generator accepts an empty design and produces a valid
//! empty shell. Connection chains, not cliques: a net with N connections
//! contributes N-1 edges, in connection order.

use crate::parser::pcb_schema::Pcb;
use crate::parser::schema::Schematic;

/// Flow direction for flowchart output. Purely cosmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    TopDown,
    BottomUp,
    LeftRight,
    RightLeft,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::TopDown => "TD",
            Direction::BottomUp => "BT",
            Direction::LeftRight => "LR",
            Direction::RightLeft => "RL",
        }
    }
}

/// Mermaid identifiers tolerate little punctuation; everything outside
/// `[A-Za-z0-9_]` becomes an underscore.
fn node_id(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// One node per component, one chain of edges per net labeled with the net
/// name.
pub fn flowchart(schematic: &Schematic, direction: Direction) -> String {
    let mut out = format!("flowchart {}\n", direction.as_str());
    for component in &schematic.components {
        if component.is_power_symbol() {
            continue;
        }
        let label = if component.value.is_empty() {
            component.reference.clone()
        } else {
            format!("{}: {}", component.reference, component.value)
        };
        out.push_str(&format!(
            "    {}[\"{}\"]\n",
            node_id(&component.reference),
            label
        ));
    }
    for net in &schematic.nets {
        for pair in net.connections.windows(2) {
            out.push_str(&format!(
                "    {} -- {} --> {}\n",
                node_id(&pair[0].reference),
                net.name,
                node_id(&pair[1].reference)
            ));
        }
    }
    out
}

/// One class per distinct component value; attributes are the field names
/// seen on any instance of that value.
pub fn class_diagram(schematic: &Schematic) -> String {
    let mut out = String::from("classDiagram\n");
    let mut values: Vec<(&str, Vec<&str>)> = Vec::new();
    for component in &schematic.components {
        if component.is_power_symbol() || component.value.is_empty() {
            continue;
        }
        let index = match values.iter().position(|(v, _)| *v == component.value) {
            Some(i) => i,
            None => {
                values.push((component.value.as_str(), Vec::new()));
                values.len() - 1
            }
        };
        for (name, _) in &component.fields {
            if !values[index].1.contains(&name.as_str()) {
                values[index].1.push(name.as_str());
            }
        }
    }
    for (value, fields) in values {
        out.push_str(&format!("    class {} {{\n", node_id(value)));
        for field in fields {
            out.push_str(&format!("        +{}\n", field));
        }
        out.push_str("    }\n");
    }
    out
}

/// One entity per net; attributes are the connected component references.
pub fn er_diagram(schematic: &Schematic) -> String {
    let mut out = String::from("erDiagram\n");
    for net in &schematic.nets {
        out.push_str(&format!("    {} {{\n", node_id(&net.name)));
        for connection in &net.connections {
            out.push_str(&format!(
                "        ref {}_{}\n",
                node_id(&connection.reference),
                node_id(&connection.pin)
            ));
        }
        out.push_str("    }\n");
    }
    out
}

/// Board view: modules grouped per side, nets as connection chains between
/// the modules whose pads touch them.
pub fn pcb_flowchart(pcb: &Pcb, direction: Direction) -> String {
    let mut out = format!("flowchart {}\n", direction.as_str());

    for side in ["F.Cu", "B.Cu"] {
        let members: Vec<_> = pcb
            .modules
            .iter()
            .filter(|m| m.side.as_str() == side)
            .collect();
        if members.is_empty() {
            continue;
        }
        out.push_str(&format!("    subgraph {}\n", node_id(side)));
        for module in members {
            let label = if module.value.is_empty() {
                module.reference.clone()
            } else {
                format!("{}: {}", module.reference, module.value)
            };
            out.push_str(&format!(
                "        {}[\"{}\"]\n",
                node_id(&module.reference),
                label
            ));
        }
        out.push_str("    end\n");
    }

    // Net -> module references, first touch wins, module order.
    for net in &pcb.nets {
        if net.name.is_empty() {
            continue;
        }
        let mut touched: Vec<&str> = Vec::new();
        for module in &pcb.modules {
            if module.pads.iter().any(|p| p.net.as_deref() == Some(&net.name))
                && !touched.contains(&module.reference.as_str())
            {
                touched.push(&module.reference);
            }
        }
        for pair in touched.windows(2) {
            out.push_str(&format!(
                "    {} -- {} --> {}\n",
                node_id(pair[0]),
                net.name,
                node_id(pair[1])
            ));
        }
    }
    out
}
