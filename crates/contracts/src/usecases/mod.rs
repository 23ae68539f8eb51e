pub mod common;
pub mod u601_settlement_report;
