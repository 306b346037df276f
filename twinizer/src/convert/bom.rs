//! Bill of materials projection.
//!
//! Groups schematic components by a configurable key tuple (value + footprint
//! by default) and renders the grouped rows as CSV, JSON, Markdown or plain
//! text. Pure function of the schematic: fixed input and fixed options give
//! byte-identical output.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::TwinizerError;
use crate::parser::schema::{Component, Schematic};

/// One element of the grouping key tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupField {
    Value,
    Footprint,
    LibId,
    /// A named user field; components without it contribute an empty key part.
    Field(String),
}

impl GroupField {
    fn extract(&self, component: &Component) -> String {
        match self {
            GroupField::Value => component.value.clone(),
            GroupField::Footprint => component.footprint.clone().unwrap_or_default(),
            GroupField::LibId => component.lib_id.clone(),
            GroupField::Field(name) => component.field(name).unwrap_or_default().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BomSort {
    /// Lexicographic on the grouping key tuple.
    GroupKey,
    /// Largest groups first.
    Quantity,
    /// First member reference of each group.
    Reference,
}

#[derive(Debug, Clone)]
pub struct BomOptions {
    pub group_by: Vec<GroupField>,
    /// Components whose reference matches are dropped before grouping
    /// (test points, mounting holes).
    pub exclude_references: Option<Regex>,
    /// Extra per-row columns pulled from component fields, in this order.
    pub include_fields: Vec<String>,
    pub sort: BomSort,
}

impl Default for BomOptions {
    fn default() -> Self {
        BomOptions {
            group_by: vec![GroupField::Value, GroupField::Footprint],
            exclude_references: None,
            include_fields: Vec::new(),
            sort: BomSort::GroupKey,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomRow {
    pub item: usize,
    pub quantity: usize,
    /// Member references in first-encounter order.
    pub references: Vec<String>,
    pub value: String,
    pub footprint: String,
    pub datasheet: String,
    /// Values for the configured `include_fields`, same order.
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bom {
    pub rows: Vec<BomRow>,
    /// Column names for the `fields` entries of every row.
    pub field_columns: Vec<String>,
}

impl Bom {
    pub fn from_schematic(schematic: &Schematic, options: &BomOptions) -> Self {
        // Groups keep insertion order; a stable sort afterwards means ties
        // stay in first-encounter order.
        let mut groups: Vec<(Vec<String>, Vec<&Component>)> = Vec::new();

        for component in &schematic.components {
            if component.is_power_symbol() {
                continue;
            }
            if let Some(exclude) = &options.exclude_references {
                if exclude.is_match(&component.reference) {
                    continue;
                }
            }
            let key: Vec<String> = options
                .group_by
                .iter()
                .map(|f| f.extract(component))
                .collect();
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(component),
                None => groups.push((key, vec![component])),
            }
        }

        match options.sort {
            BomSort::GroupKey => groups.sort_by(|a, b| a.0.cmp(&b.0)),
            BomSort::Quantity => groups.sort_by(|a, b| b.1.len().cmp(&a.1.len())),
            BomSort::Reference => {
                groups.sort_by(|a, b| a.1[0].reference.cmp(&b.1[0].reference))
            }
        }

        let rows = groups
            .into_iter()
            .enumerate()
            .map(|(i, (_, members))| {
                let first = members[0];
                let fields = options
                    .include_fields
                    .iter()
                    .map(|name| {
                        members
                            .iter()
                            .find_map(|c| c.field(name))
                            .unwrap_or_default()
                            .to_string()
                    })
                    .collect();
                BomRow {
                    item: i + 1,
                    quantity: members.len(),
                    references: members.iter().map(|c| c.reference.clone()).collect(),
                    value: first.value.clone(),
                    footprint: first.footprint.clone().unwrap_or_default(),
                    datasheet: first.datasheet.clone().unwrap_or_default(),
                    fields,
                }
            })
            .collect();

        Bom {
            rows,
            field_columns: options.include_fields.clone(),
        }
    }

    pub fn total_components(&self) -> usize {
        self.rows.iter().map(|r| r.quantity).sum()
    }

    fn header(&self) -> Vec<String> {
        let mut columns = vec![
            "Item".to_string(),
            "Quantity".to_string(),
            "References".to_string(),
            "Value".to_string(),
            "Footprint".to_string(),
            "Datasheet".to_string(),
        ];
        columns.extend(self.field_columns.iter().cloned());
        columns
    }

    fn cells(row: &BomRow) -> Vec<String> {
        let mut cells = vec![
            row.item.to_string(),
            row.quantity.to_string(),
            row.references.join(", "),
            row.value.clone(),
            row.footprint.clone(),
            row.datasheet.clone(),
        ];
        cells.extend(row.fields.iter().cloned());
        cells
    }

    /// RFC 4180 CSV, header row first.
    pub fn to_csv(&self) -> Result<String, TwinizerError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(self.header())
            .map_err(|e| TwinizerError::Other(e.to_string()))?;
        for row in &self.rows {
            writer
                .write_record(Self::cells(row))
                .map_err(|e| TwinizerError::Other(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| TwinizerError::Other(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| TwinizerError::Other(e.to_string()))
    }

    /// JSON array of row objects.
    pub fn to_json(&self) -> Result<String, TwinizerError> {
        serde_json::to_string_pretty(&self.rows).map_err(|e| TwinizerError::Other(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Vec<BomRow>, TwinizerError> {
        serde_json::from_str(json).map_err(|e| TwinizerError::Other(e.to_string()))
    }

    pub fn to_markdown(&self) -> String {
        let header = self.header();
        let mut out = String::new();
        out.push_str(&format!("| {} |\n", header.join(" | ")));
        out.push_str(&format!(
            "|{}\n",
            header.iter().map(|_| "---|").collect::<String>()
        ));
        for row in &self.rows {
            out.push_str(&format!("| {} |\n", Self::cells(row).join(" | ")));
        }
        out
    }

    /// Column-aligned plain text table.
    pub fn to_text(&self) -> String {
        let header = self.header();
        let mut widths: Vec<usize> = header.iter().map(String::len).collect();
        let all_cells: Vec<Vec<String>> = self.rows.iter().map(Self::cells).collect();
        for cells in &all_cells {
            for (i, cell) in cells.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.len());
                }
            }
        }
        let render = |cells: &[String]| -> String {
            cells
                .iter()
                .enumerate()
                .map(|(i, c)| format!("{:<width$}", c, width = widths[i]))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };
        let mut out = render(&header);
        out.push('\n');
        out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1)));
        out.push('\n');
        for cells in &all_cells {
            out.push_str(&render(cells));
            out.push('\n');
        }
        out
    }
}
