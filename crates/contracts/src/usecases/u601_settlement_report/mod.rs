pub mod request;
pub mod response;

pub use request::{DateWindow, SettlementReportRequest, SheetUpload, SourceUpload};
pub use response::{
    CatalogResponse, DimensionStatus, RoleResolution, SettlementReportResponse,
};

use crate::usecases::common::UseCaseMetadata;

pub struct SettlementReport;

impl UseCaseMetadata for SettlementReport {
    fn usecase_index() -> &'static str {
        "u601"
    }

    fn usecase_name() -> &'static str {
        "settlement_report"
    }

    fn display_name() -> &'static str {
        "Сводный отчёт по дилерам"
    }

    fn description() -> &'static str {
        "Сведение лидов, затрат, эфиров, личных сообщений и видео в единый отчёт по дилерам или уровням"
    }
}
