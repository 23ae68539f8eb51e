pub mod report_value;
