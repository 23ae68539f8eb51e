pub mod projection_builder;
pub mod table;

pub use projection_builder::normalize_source;
pub use table::{CanonicalTable, DailyKey};
