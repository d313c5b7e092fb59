//! Canonical, type-safe representations of the column metadata used throughout
//! the export pipeline.

mod column;

pub use column::{CharSet, CoarseType, ColumnDescriptor, ColumnKind, WireColumn, WireSchema};
