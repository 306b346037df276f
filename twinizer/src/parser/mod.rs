//! Design-file parsing: tokenizers, data models and model builders.

pub mod format;
pub mod hierarchy;
pub mod legacy;
pub mod pcb;
pub mod pcb_schema;
pub mod schema;
pub mod schematic;
pub mod sexp;

pub use format::{parse_content, parse_file, Design, FormatTag, ParseOutcome};
pub use pcb::PcbParser;
pub use schematic::SchematicParser;
