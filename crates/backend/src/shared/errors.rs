use contracts::usecases::common::UseCaseError;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors that abort a report run. Safe division is the only arithmetic
/// failure recovered locally; everything here propagates to the caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("[{source_kind}] column '{column}': {reason}")]
    SchemaMismatch {
        source_kind: String,
        column: String,
        reason: String,
    },

    #[error("[{source_kind}] cannot parse date '{value}' at {location}")]
    DateParseError {
        source_kind: String,
        location: String,
        value: String,
    },

    #[error("dimension role '{role}' matched {} sheet(s): {matches:?}", .matches.len())]
    AmbiguousClassification { role: String, matches: Vec<String> },

    #[error("uniqueness violated in {context}: key '{key}'")]
    UniquenessViolation { context: String, key: String },

    #[error("display name '{display_name}' is claimed by several keys: {keys:?}")]
    DuplicateDisplayName {
        display_name: String,
        keys: Vec<String>,
    },

    #[error("[{source_kind}] multi-sheet source requires a non-empty sheet list")]
    MissingSheets { source_kind: String },

    #[error("[{source_kind}] sheet '{sheet}' not found in upload")]
    SheetNotFound { source_kind: String, sheet: String },

    #[error("[{source_kind}] sheet '{sheet}' is not valid CSV: {message}")]
    Decode {
        source_kind: String,
        sheet: String,
        message: String,
    },

    #[error("invalid dimension: {0}")]
    InvalidDimension(String),

    #[error("invalid window: {0}")]
    InvalidWindow(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid metric catalog: {0}")]
    InvalidCatalog(String),

    #[error("report run exceeded {0}s")]
    Timeout(u64),

    #[error("[{source_kind}] normalization cancelled")]
    Cancelled { source_kind: String },

    #[error("normalization worker failed: {0}")]
    Worker(String),
}

impl PipelineError {
    /// Stable machine-readable code used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            PipelineError::DateParseError { .. } => "DATE_PARSE_ERROR",
            PipelineError::AmbiguousClassification { .. } => "AMBIGUOUS_CLASSIFICATION",
            PipelineError::UniquenessViolation { .. } => "UNIQUENESS_VIOLATION",
            PipelineError::DuplicateDisplayName { .. } => "DUPLICATE_DISPLAY_NAME",
            PipelineError::MissingSheets { .. } => "MISSING_SHEETS",
            PipelineError::SheetNotFound { .. } => "SHEET_NOT_FOUND",
            PipelineError::Decode { .. } => "DECODE_ERROR",
            PipelineError::InvalidDimension(_) => "INVALID_DIMENSION",
            PipelineError::InvalidWindow(_) => "INVALID_WINDOW",
            PipelineError::InvalidRequest(_) => "INVALID_REQUEST",
            PipelineError::InvalidCatalog(_) => "INVALID_CATALOG",
            PipelineError::Timeout(_) => "TIMEOUT",
            PipelineError::Cancelled { .. } => "CANCELLED",
            PipelineError::Worker(_) => "WORKER_FAILED",
        }
    }

    /// Error body for API responses
    pub fn to_usecase_error(&self) -> UseCaseError {
        let error = UseCaseError::new(self.code(), self.to_string());
        match self {
            PipelineError::AmbiguousClassification { matches, .. } => {
                error.with_details(format!("matched sheets: {}", matches.join(", ")))
            }
            PipelineError::DuplicateDisplayName { keys, .. } => {
                error.with_details(format!("internal keys: {}", keys.join(", ")))
            }
            _ => error,
        }
    }

    /// Stop point for long loops of a worker whose run was aborted
    pub(crate) fn check_cancelled(
        cancel: &CancellationToken,
        source_kind: &str,
    ) -> Result<(), PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled {
                source_kind: source_kind.to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn missing_column(source_kind: &str, column: &str) -> Self {
        PipelineError::SchemaMismatch {
            source_kind: source_kind.to_string(),
            column: column.to_string(),
            reason: "required column absent".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = PipelineError::missing_column("video", "日期");
        assert_eq!(err.to_string(), "[video] column '日期': required column absent");
        assert_eq!(err.code(), "SCHEMA_MISMATCH");

        let err = PipelineError::AmbiguousClassification {
            role: "tier".into(),
            matches: vec!["A".into(), "B".into()],
        };
        assert!(err.to_string().contains("matched 2 sheet(s)"));

        let body = PipelineError::Timeout(120).to_usecase_error();
        assert_eq!(body.code, "TIMEOUT");
        assert_eq!(body.message, "report run exceeded 120s");
        assert_eq!(body.details, None);

        let body = PipelineError::DuplicateDisplayName {
            display_name: "X".into(),
            keys: vec!["a".into(), "b".into()],
        }
        .to_usecase_error();
        assert_eq!(body.details.as_deref(), Some("internal keys: a, b"));
    }

    #[test]
    fn test_check_cancelled() {
        let cancel = CancellationToken::new();
        assert!(PipelineError::check_cancelled(&cancel, "dr").is_ok());

        cancel.cancel();
        let err = PipelineError::check_cancelled(&cancel, "dr").unwrap_err();
        assert_eq!(err.code(), "CANCELLED");
        assert_eq!(err.to_string(), "[dr] normalization cancelled");
    }
}
