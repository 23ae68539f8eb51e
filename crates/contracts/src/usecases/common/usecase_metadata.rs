use serde::{Deserialize, Serialize};

/// Описание UseCase в ответах API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UseCaseInfo {
    pub full_name: String,
    pub display_name: String,
    pub description: String,
}

/// Identity of a use case: names its routes, log spans and catalog entry
pub trait UseCaseMetadata {
    /// "u601"
    fn usecase_index() -> &'static str;

    /// "settlement_report"
    fn usecase_name() -> &'static str;

    fn display_name() -> &'static str;

    fn description() -> &'static str {
        ""
    }

    /// "u601_settlement_report"
    fn full_name() -> String {
        format!("{}_{}", Self::usecase_index(), Self::usecase_name())
    }

    /// Путь endpoint'а внутри `/api/<index>/`
    fn api_path(endpoint: &str) -> String {
        format!("/api/{}/{}", Self::usecase_index(), endpoint)
    }

    fn info() -> UseCaseInfo {
        UseCaseInfo {
            full_name: Self::full_name(),
            display_name: Self::display_name().to_string(),
            description: Self::description().to_string(),
        }
    }
}
