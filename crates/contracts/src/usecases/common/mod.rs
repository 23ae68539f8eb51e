//! Common types and traits for all UseCases

pub mod usecase_metadata;
pub mod usecase_result;

pub use usecase_metadata::{UseCaseInfo, UseCaseMetadata};
pub use usecase_result::UseCaseError;
