//! Twinizer core: KiCad design-file parsing and derived-artifact generation.
//!
//! Data flows one direction: file bytes → tokens → structured model →
//! projection output.
//!
//! - [`parser`] turns `.sch`, `.kicad_sch` and `.kicad_pcb` files into
//!   [`Schematic`](parser::schema::Schematic) and
//!   [`Pcb`](parser::pcb_schema::Pcb) models, collecting recoverable problems
//!   in a [`ParseReport`](report::ParseReport).
//! - [`convert`] holds the pure projections: BOM, Mermaid diagrams, 3D board
//!   model.
//! - [`batch`] fans the parse + project pipeline out over a directory tree on
//!   a bounded worker pool.
//!
//! ```no_run
//! use std::path::Path;
//! use twinizer::parser::{parse_file, Design};
//! use twinizer::convert::{Bom, BomOptions};
//! use twinizer::ParseOptions;
//!
//! # fn main() -> Result<(), twinizer::TwinizerError> {
//! let outcome = parse_file(Path::new("board.kicad_sch"), ParseOptions::default())?;
//! if let Design::Schematic(sch) = &outcome.design {
//!     let bom = Bom::from_schematic(sch, &BomOptions::default());
//!     println!("{}", bom.to_csv()?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod convert;
pub mod core;
pub mod parser;
pub mod report;

pub use crate::core::{
    discover_design_files, FileTypeFilter, ParseOptions, TwinizerError,
};
pub use crate::parser::{parse_content, parse_file, Design, FormatTag, ParseOutcome};
pub use crate::report::{Diagnostic, ParseReport, Severity};

/// Common imports for library consumers.
pub mod prelude {
    pub use crate::batch::{run_batch, BatchOptions, BatchSummary, Projection};
    pub use crate::convert::bom::{Bom, BomOptions};
    pub use crate::convert::mermaid::{self, Direction};
    pub use crate::convert::model3d::BoardModel;
    pub use crate::core::{FileTypeFilter, ParseOptions, TwinizerError};
    pub use crate::parser::{parse_content, parse_file, Design, FormatTag, ParseOutcome};
    pub use crate::report::{Diagnostic, ParseReport, Severity};
}
