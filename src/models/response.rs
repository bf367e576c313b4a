//! Response Types
//!
//! JSON envelope printed by every command under `--json`.

use serde::{Deserialize, Serialize};

use crate::utils::error::AppError;

/// A failure as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

impl From<&AppError> for ErrorBody {
    fn from(err: &AppError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Generic command response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorBody>,
}

impl<T> CommandResponse<T> {
    /// Create a successful response with data
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// Create an error response
    pub fn err(err: &AppError) -> Self {
        Self {
            success: false,
            data: None,
            errors: vec![err.into()],
        }
    }

    /// Data plus the failures of a partially successful batch.
    pub fn partial(data: T, failures: &[AppError]) -> Self {
        Self {
            success: failures.is_empty(),
            data: Some(data),
            errors: failures.iter().map(ErrorBody::from).collect(),
        }
    }
}

impl<T> From<Result<T, AppError>> for CommandResponse<T> {
    fn from(result: Result<T, AppError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(&e),
        }
    }
}
