//! Error types and codes for the picker host.

use agentic_locator::LocatorError;

/// Codes shared with JSON-RPC.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Picker-specific error codes.
pub mod picker_error_codes {
    pub const NO_DOCUMENT: i32 = -32860;
    pub const INVALID_SELECTOR: i32 = -32861;
    pub const TARGET_NOT_FOUND: i32 = -32862;
    pub const DOCUMENT_UNREADABLE: i32 = -32863;
}

/// All errors that can occur in the picker host.
#[derive(thiserror::Error, Debug)]
pub enum PickerError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("No document loaded")]
    NoDocument,

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("Cannot read document {path}: {reason}")]
    DocumentUnreadable { path: String, reason: String },

    #[error("Locator error: {0}")]
    Locator(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PickerError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use picker_error_codes::*;
        match self {
            PickerError::ParseError(_) | PickerError::Json(_) => PARSE_ERROR,
            PickerError::InvalidParams(_) => INVALID_PARAMS,
            PickerError::NoDocument => NO_DOCUMENT,
            PickerError::InvalidSelector(_) => INVALID_SELECTOR,
            PickerError::TargetNotFound(_) => TARGET_NOT_FOUND,
            PickerError::DocumentUnreadable { .. } => DOCUMENT_UNREADABLE,
            PickerError::Locator(_) | PickerError::Transport(_) | PickerError::Io(_) => {
                INTERNAL_ERROR
            }
        }
    }
}

impl From<LocatorError> for PickerError {
    fn from(e: LocatorError) -> Self {
        match e {
            LocatorError::InvalidSelector(s) => PickerError::InvalidSelector(s),
            LocatorError::TargetNotFound(s) => PickerError::TargetNotFound(s),
            other => PickerError::Locator(other.to_string()),
        }
    }
}

pub type PickerResult<T> = Result<T, PickerError>;
