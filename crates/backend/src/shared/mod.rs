pub mod catalog;
pub mod config;
pub mod data;
pub mod dates;
pub mod errors;
