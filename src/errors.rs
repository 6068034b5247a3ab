use serde::{Deserialize, Serialize};

use crate::services::validator::ViolationReport;

/// Error envelope returned by the order-management API.
///
/// Every response is wrapped as `{ success, message, data }`; on failure the
/// `message` is what the operator should see.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorResponse {
    /// Extracts a non-empty `message` from a raw response body, if there is one.
    pub fn message_from_body(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|response| response.message)
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty())
    }
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Loading the chosen parent order failed, returned no lines, or the
    /// order is not eligible. The selection has been reset.
    #[error("{0}")]
    SelectionLoad(String),

    /// One or more lines ask for more than is in stock.
    #[error("Stock validation failed:\n{0}")]
    StockViolation(ViolationReport),

    /// The API refused the submission; the message is the server's, verbatim.
    #[error("{0}")]
    Submission(String),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("HTTP error: {0}")]
    HttpError(
        #[from]
        #[serde(skip)]
        reqwest::Error,
    ),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    /// Whether the draft is still editable after this error.
    ///
    /// Only transport and internal failures leave the outcome unknown; every
    /// other error returns the draft to a consistent state the operator can
    /// correct and retry from.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ServiceError::HttpError(_) | ServiceError::InternalError(_)
        )
    }

    /// Machine-readable code, used for JSON output from the CLI.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::ValidationError(_) => "validation_error",
            ServiceError::InvalidOperation(_) => "invalid_operation",
            ServiceError::SelectionLoad(_) => "selection_load_error",
            ServiceError::StockViolation(_) => "stock_violation",
            ServiceError::Submission(_) => "submission_error",
            ServiceError::ExternalApiError(_) => "external_api_error",
            ServiceError::HttpError(_) => "http_error",
            ServiceError::SerializationError(_) => "serialization_error",
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::InternalError(_) => "internal_error",
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}
