pub mod cells;
pub mod raw_table;
