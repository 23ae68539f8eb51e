pub mod joiner;
pub mod key_union;
pub mod table;

pub use joiner::build_wide_table;
pub use key_union::union_keys;
pub use table::{WideRow, WideTable};
