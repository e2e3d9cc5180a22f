//! Facade error taxonomy

use thiserror::Error;

use crate::ffi::FfiError;

/// Errors surfaced by facade construction and operations
#[derive(Debug, Clone, Error)]
pub enum CalcError {
    /// Library missing, unloadable, or a signature failed to bind
    #[error("failed to construct facade: {0}")]
    Construction(#[from] FfiError),

    /// Rejected by the facade before any native call
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Division or modulo by zero
    #[error("division by zero")]
    DivisionByZero,

    /// A native error that does not map to a known kind, passed through unchanged
    #[error("native error {code}: {message}")]
    Native { code: i32, message: String },
}

impl CalcError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        CalcError::InvalidArgument(message.into())
    }

    /// True for errors raised by input validation
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, CalcError::InvalidArgument(_))
    }
}

/// Result type for facade operations.
pub type CalcResult<T> = Result<T, CalcError>;
