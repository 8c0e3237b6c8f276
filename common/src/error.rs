use sea_orm::DbErr;
use thiserror::Error;

/// Unified error type threaded through db/services/api.
///
/// Variants split along the taxonomy in SPEC_FULL.md §7: domain outcomes that
/// are not really "errors" (handled as typed results further up, not through
/// this enum), input errors, transient infrastructure errors, and fatal
/// startup errors. `AppError` itself only carries the latter two plus the
/// handful of domain checks (`SessionClosed`, `EnrollmentConflict`, ...) that
/// are naturally discovered as a side effect of a store call rather than a
/// pipeline step with its own typed outcome.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("invalid id format: {0}")]
    InvalidIdFormat(String),

    #[error("duplicate student external id: {0}")]
    DuplicateStudentId(String),

    #[error("enrollment conflict: student already enrolled in this course")]
    EnrollmentConflict,

    #[error("session is no longer active")]
    SessionClosed,

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("recognition request timed out")]
    Timeout,

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("validation failed: {0}")]
    Validation(String),
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        if let DbErr::RecordNotFound(msg) = &err {
            return AppError::NotFound(msg.clone());
        }

        let text = err.to_string();
        if text.contains("UNIQUE constraint failed") {
            if text.contains("enrollments") {
                AppError::EnrollmentConflict
            } else if text.contains("attendance") {
                AppError::SessionClosed
            } else if text.contains("students") {
                AppError::DuplicateStudentId(text)
            } else {
                AppError::Validation(text)
            }
        } else {
            AppError::StoreUnavailable(text)
        }
    }
}
