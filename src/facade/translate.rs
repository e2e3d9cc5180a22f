//! Native calculator error translation
//!
//! The calculator's C ABI reports failures as `CalculatorError` codes. Known
//! codes map through [`CODE_TABLE`]. Anything else falls back to
//! [`MESSAGE_TABLE`], a fixed-substring match over the native message text;
//! this is the only place message text is inspected. A message matching
//! nothing is passed through unchanged as [`CalcError::Native`].

use crate::error::CalcError;

/// `CALC_SUCCESS`
pub const CALC_SUCCESS: i32 = 0;

/// Kinds a native failure can be translated into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DivisionByZero,
    InvalidArgument,
}

/// `CalculatorError` values from `c_wrapper.h`
pub const CODE_TABLE: &[(i32, ErrorKind)] = &[
    (1, ErrorKind::DivisionByZero),  // CALC_ERROR_DIVISION_BY_ZERO
    (2, ErrorKind::InvalidArgument), // CALC_ERROR_INVALID_ARGUMENT
    (4, ErrorKind::InvalidArgument), // CALC_ERROR_SQUARE_ROOT_NEGATIVE
    (5, ErrorKind::InvalidArgument), // CALC_ERROR_FACTORIAL_NEGATIVE
    (6, ErrorKind::InvalidArgument), // CALC_ERROR_ARRAY_EMPTY
];

/// Fixed substrings of native exception messages
pub const MESSAGE_TABLE: &[(&str, ErrorKind)] = &[
    ("Division by zero", ErrorKind::DivisionByZero),
    ("negative number", ErrorKind::InvalidArgument),
    ("undefined", ErrorKind::InvalidArgument),
    ("empty", ErrorKind::InvalidArgument),
];

/// Classify a native code, consulting the message only for unknown codes
pub fn classify(code: i32, message: &str) -> Option<ErrorKind> {
    CODE_TABLE
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, kind)| *kind)
        .or_else(|| {
            MESSAGE_TABLE
                .iter()
                .find(|(needle, _)| message.contains(needle))
                .map(|(_, kind)| *kind)
        })
}

/// Build the error surfaced to callers for a failed native call
pub fn translate(code: i32, message: &str) -> CalcError {
    match classify(code, message) {
        Some(ErrorKind::DivisionByZero) => CalcError::DivisionByZero,
        Some(ErrorKind::InvalidArgument) => CalcError::InvalidArgument(message.to_string()),
        None => CalcError::Native {
            code,
            message: message.to_string(),
        },
    }
}
