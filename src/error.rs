//! Error type shared by the tabulation engine.
use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// Failure of an engine operation.
///
/// Every fallible operation either succeeds and writes its full output, or fails with one of
/// these kinds and leaves the output in an unspecified state.
#[derive(Debug, Clone, PartialEq)]
pub enum FormError {
    /// A caller-supplied argument violates the contract: wrong buffer length, out-of-range
    /// derivative order, entity or subdomain index, or a point outside the reference domain.
    InvalidArgument(String),
    /// The inverse coordinate map failed to converge.
    NonConvergence {
        /// Number of Newton iterations performed.
        iterations: usize,
        /// Last residual norm, or NaN if none was available.
        residual: f64,
    },
    /// Version incompatibility, or a factory/sub-object index out of bounds.
    ContractMismatch(String),
}

impl FormError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn contract_mismatch(message: impl Into<String>) -> Self {
        Self::ContractMismatch(message.into())
    }

    /// The non-zero status integer reported for this error at the raw boundary.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) => 1,
            Self::NonConvergence { .. } => 2,
            Self::ContractMismatch(_) => 3,
        }
    }
}

impl Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "Invalid argument: {}", message),
            Self::NonConvergence { iterations, residual } => write!(
                f,
                "Inverse coordinate map failed to converge after {} iterations (residual {:e}).",
                iterations, residual
            ),
            Self::ContractMismatch(message) => write!(f, "Contract mismatch: {}", message),
        }
    }
}

impl Error for FormError {}

/// Raw status of a result: `0` on success, otherwise [`FormError::status_code`].
pub fn status_code<R>(result: &Result<R, FormError>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) => err.status_code(),
    }
}

/// Checks that a caller-provided buffer has exactly the expected length.
pub(crate) fn check_len(name: &str, actual: usize, expected: usize) -> Result<(), FormError> {
    if actual == expected {
        Ok(())
    } else {
        Err(FormError::invalid_argument(format!(
            "buffer `{}` has length {}, expected {}",
            name, actual, expected
        )))
    }
}
