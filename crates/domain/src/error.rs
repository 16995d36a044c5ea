//! Error taxonomy shared by every scheduling operation.

use serde::Serialize;
use thiserror::Error;

/// Failure reported by a store port (profile store, ledger, QnA store, cache).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness rule of the store was violated.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// The store could not be reached or timed out; retrying may succeed.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Any other store failure.
    #[error("Store failure: {0}")]
    Backend(String),
}

/// Errors returned by the scheduling core.
///
/// Each variant carries the user-facing message and maps to a fixed negative
/// status code; the transport layer decides how to present it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Payload error: {0}")]
    Payload(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized access: {0}")]
    Unauthorized(String),

    #[error("Data not found: {0}")]
    NotFound(String),

    #[error("Occupied: {0}")]
    Occupied(String),

    #[error("Duplicate operation: {0}")]
    Duplicate(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Wire shape of a failed operation: `{status, msg}`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub status: i32,
    pub msg: String,
}

impl SchedulingError {
    /// Negative status code of this error class.
    pub fn status(&self) -> i32 {
        match self {
            SchedulingError::Payload(_) => -1,
            SchedulingError::AccessDenied(_) => -2,
            SchedulingError::Unauthorized(_) => -3,
            SchedulingError::NotFound(_) => -4,
            SchedulingError::Occupied(_) => -5,
            SchedulingError::Duplicate(_) => -6,
            SchedulingError::ServiceUnavailable(_) => -7,
            SchedulingError::Unknown(_) => -99,
        }
    }

    /// Stable name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            SchedulingError::Payload(_) => "PayloadError",
            SchedulingError::AccessDenied(_) => "AccessDenied",
            SchedulingError::Unauthorized(_) => "UnauthorizedAccess",
            SchedulingError::NotFound(_) => "DataNotFound",
            SchedulingError::Occupied(_) => "Occupied",
            SchedulingError::Duplicate(_) => "DuplicateOperation",
            SchedulingError::ServiceUnavailable(_) => "ServiceUnavailable",
            SchedulingError::Unknown(_) => "UnknownError",
        }
    }

    /// The message without the class prefix.
    pub fn message(&self) -> &str {
        match self {
            SchedulingError::Payload(msg)
            | SchedulingError::AccessDenied(msg)
            | SchedulingError::Unauthorized(msg)
            | SchedulingError::NotFound(msg)
            | SchedulingError::Occupied(msg)
            | SchedulingError::Duplicate(msg)
            | SchedulingError::ServiceUnavailable(msg)
            | SchedulingError::Unknown(msg) => msg,
        }
    }

    /// Whether the caller may retry the same operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchedulingError::ServiceUnavailable(_))
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            status: self.status(),
            msg: self.message().to_string(),
        }
    }
}

impl From<StoreError> for SchedulingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey(msg) => SchedulingError::Duplicate(msg),
            StoreError::Unavailable(msg) => {
                tracing::warn!(error = %msg, "Store unavailable");
                SchedulingError::ServiceUnavailable(msg)
            }
            StoreError::Backend(msg) => {
                tracing::error!(error = %msg, "Store failure");
                SchedulingError::Unknown("An unexpected store error occurred".to_string())
            }
        }
    }
}

/// Flattens field, nested struct and list errors into `path: message` lines.
fn collect_validation_messages(
    prefix: &str,
    errors: &validator::ValidationErrors,
    out: &mut Vec<String>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| match &e.message {
                    Some(m) => format!("{path}: {m}"),
                    None => format!("{path}: invalid value"),
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect_validation_messages(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_validation_messages(&format!("{path}[{index}]"), inner, out);
                }
            }
        }
    }
}

impl From<validator::ValidationErrors> for SchedulingError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages = Vec::new();
        collect_validation_messages("", &errors, &mut messages);
        messages.sort();

        SchedulingError::Payload(messages.join(", "))
    }
}

impl From<shared::pagination::PageError> for SchedulingError {
    fn from(err: shared::pagination::PageError) -> Self {
        SchedulingError::Payload(err.to_string())
    }
}
