//! Postal code type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ZipCode`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum ZipCodeError {
    /// The input string is empty.
    #[error("postal code cannot be empty")]
    Empty,
    /// The input is not exactly five digits.
    #[error("postal code must be exactly 5 digits")]
    NotFiveDigits,
}

/// A five-digit postal code.
///
/// ```
/// use roastery_core::ZipCode;
///
/// assert!(ZipCode::parse("04524").is_ok());
/// assert!(ZipCode::parse("4524").is_err());
/// assert!(ZipCode::parse("04524-1").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ZipCode(String);

impl ZipCode {
    /// Parse a `ZipCode` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or is not exactly five ASCII
    /// digits.
    pub fn parse(s: &str) -> Result<Self, ZipCodeError> {
        if s.is_empty() {
            return Err(ZipCodeError::Empty);
        }
        if s.len() != 5 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ZipCodeError::NotFiveDigits);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the postal code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZipCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ZipCode {
    type Err = ZipCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ZipCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
