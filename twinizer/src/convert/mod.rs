//! Projections: pure transformations from a parsed design to a derived
//! artifact. Safe to call concurrently on shared read-only designs.

pub mod bom;
pub mod mermaid;
pub mod model3d;

pub use bom::{Bom, BomOptions, BomRow, BomSort, GroupField};
pub use mermaid::Direction;
pub use model3d::BoardModel;
