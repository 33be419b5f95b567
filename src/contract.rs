//! Versioning of the form-assembly contract and checked access to raw boundary fields.
use crate::error::FormError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Display;

/// A three-part contract version.
///
/// Generated forms and the consuming assembler must agree on `major.minor`; the maintenance
/// number is informational.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContractVersion {
    pub major: u32,
    pub minor: u32,
    pub maintenance: u32,
}

/// The contract version implemented by this crate.
pub const CONTRACT_VERSION: ContractVersion = ContractVersion::new(2018, 1, 0);

/// Full version string, including the development suffix.
pub const CONTRACT_VERSION_STRING: &str = "2018.1.0.dev0";

impl ContractVersion {
    pub const fn new(major: u32, minor: u32, maintenance: u32) -> Self {
        Self {
            major,
            minor,
            maintenance,
        }
    }

    pub fn is_compatible_with(&self, other: &ContractVersion) -> bool {
        self.major == other.major && self.minor == other.minor
    }

    /// Rejects an incompatible counterpart with [`FormError::ContractMismatch`].
    pub fn check_compatible(&self, other: &ContractVersion) -> Result<(), FormError> {
        if self.is_compatible_with(other) {
            Ok(())
        } else {
            Err(FormError::contract_mismatch(format!(
                "version {} is incompatible with version {}",
                self, other
            )))
        }
    }

    /// Parses `major.minor.maintenance`, optionally followed by a suffix such as `.dev0`.
    pub fn parse(version: &str) -> Result<Self, FormError> {
        let mut parts = version.split('.');
        let mut next = || -> Result<u32, FormError> {
            parts
                .next()
                .and_then(|part| part.parse().ok())
                .ok_or_else(|| FormError::invalid_argument(format!("malformed version string `{}`", version)))
        };
        Ok(Self::new(next()?, next()?, next()?))
    }
}

impl Display for ContractVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.maintenance)
    }
}

/// Sentinel used by raw dimension and shape fields that have not been set.
pub const UNSET: i64 = -1;

/// Converts a raw signed dimension or count field into a `usize`.
///
/// Reading an unset field ([`UNSET`]) or any other negative value is a contract violation.
pub fn raw_dimension(name: &str, value: i64) -> Result<usize, FormError> {
    if value == UNSET {
        Err(FormError::contract_mismatch(format!("field `{}` is unset", name)))
    } else {
        usize::try_from(value)
            .map_err(|_| FormError::contract_mismatch(format!("field `{}` has invalid value {}", name, value)))
    }
}
