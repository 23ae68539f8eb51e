pub mod executor;

pub use executor::ReportExecutor;
