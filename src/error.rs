use std::fmt;

use thiserror::Error;

pub type VectorResult<T> = std::result::Result<T, VectorError>;

/// Why a swizzle key was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwizzleFault {
    /// Keys must be between 1 and 6 characters long.
    Length(usize),
    /// The character is not an alias for any component of the receiver.
    Character(char),
}

impl fmt::Display for SwizzleFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwizzleFault::Length(len) => write!(f, "length {len} is outside 1..=6"),
            SwizzleFault::Character(ch) => write!(f, "invalid swizzle character '{ch}'"),
        }
    }
}

/// Every failure a guest call into the vector API can produce.
///
/// None of these are fatal to the host: the binding layer turns them into
/// script runtime errors that abort the current guest call only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VectorError {
    #[error("invalid types to {operation}: {}", .found.join(", "))]
    TypeMismatch { operation: &'static str, found: Vec<String> },

    #[error("invalid key {key:?} to vector index: {fault}")]
    InvalidSwizzleKey { key: String, fault: SwizzleFault },

    #[error("vector swizzle {key:?} expects {expected} component(s), got {found}")]
    SwizzleLengthMismatch { key: String, expected: usize, found: usize },

    #[error("attempt to divide vector by 0")]
    DivisionByZero,

    #[error("attempt to reduce vector by 0")]
    ModuloByZero,
}

impl VectorError {
    pub fn type_mismatch(operation: &'static str, found: impl Into<String>) -> Self {
        VectorError::TypeMismatch { operation, found: vec![found.into()] }
    }

    pub fn operand_mismatch(operation: &'static str, lhs: impl Into<String>, rhs: impl Into<String>) -> Self {
        VectorError::TypeMismatch { operation, found: vec![lhs.into(), rhs.into()] }
    }
}
