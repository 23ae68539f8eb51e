pub mod aggregator;
pub mod derived;
pub mod finalizer;
pub mod settlement;
pub mod tier_normalizer;
pub mod windows;

pub use aggregator::{settle, with_composites};
pub use derived::{compute_derived, safe_div};
pub use finalizer::{finalize, flatten_row, FinalizedReport, OutputPlan};
pub use settlement::{AggregatedSettlement, DerivedSettlement, FinalSettlement, SettlementRow};
pub use tier_normalizer::normalize_tiers;
pub use windows::{Dimension, ReportWindows};
