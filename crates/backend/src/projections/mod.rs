pub mod p101_daily_metrics;
pub mod p102_dealer_dimension;
pub mod p103_wide_table;
