// Usecase handlers
pub mod u601_settlement_report;
