pub mod projection_builder;
pub mod table;

pub use projection_builder::{build_dimension_table, DimensionBuild, DimensionRole};
pub use table::{DimensionRecord, DimensionTable};
