//! Checkout input collection and validation.
//!
//! Validation gates the terminal payment action and short-circuits on the
//! first failure, in a fixed order the session enforces: non-empty cart,
//! email shape, address, postal code. Each failure carries its own
//! user-facing message. The call sequence itself lives on
//! [`crate::session::CartSession::submit_checkout`].

use roastery_core::{Email, EmailError, ZipCode, ZipCodeError};
use thiserror::Error;

use crate::session::CartError;

/// A client-side input-shape violation.
///
/// Display strings double as the user-facing diagnostics.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The cart has no lines; nothing to check out.
    #[error("your cart is empty")]
    EmptyCart,

    /// The email does not have the `local@domain.tld` shape.
    #[error("enter a valid email address")]
    Email(#[from] EmailError),

    /// The address is empty after trimming.
    #[error("enter a delivery address")]
    EmptyAddress,

    /// The postal code is not exactly five digits.
    #[error("enter a 5-digit postal code")]
    ZipCode(#[from] ZipCodeError),
}

/// Errors from the checkout gate.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Input failed client-side validation; no network call was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Another checkout submission is still outstanding.
    #[error("a checkout is already in progress")]
    InFlight,

    /// A cart or backend operation failed during the call sequence.
    #[error(transparent)]
    Cart(#[from] CartError),
}

/// Raw checkout fields as collected from the user.
///
/// Held only transiently; cleared by the caller once checkout succeeds.
#[derive(Debug, Clone, Default)]
pub struct CheckoutForm {
    pub email: String,
    pub address: String,
    pub zip_code: String,
}

/// Checkout fields that passed validation.
#[derive(Debug, Clone)]
pub struct CheckoutInfo {
    pub email: Email,
    pub address: String,
    pub zip_code: ZipCode,
}

impl CheckoutForm {
    /// Validate field shapes, short-circuiting on the first failure.
    ///
    /// Order: email, then address, then postal code. (The non-empty-cart
    /// check comes first and is the session's, since the form cannot see
    /// the summary.)
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(&self) -> Result<CheckoutInfo, ValidationError> {
        let email = Email::parse(self.email.trim())?;

        let address = self.address.trim();
        if address.is_empty() {
            return Err(ValidationError::EmptyAddress);
        }

        let zip_code = ZipCode::parse(self.zip_code.trim())?;

        Ok(CheckoutInfo {
            email,
            address: address.to_owned(),
            zip_code,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(email: &str, address: &str, zip: &str) -> CheckoutForm {
        CheckoutForm {
            email: email.to_string(),
            address: address.to_string(),
            zip_code: zip.to_string(),
        }
    }

    #[test]
    fn test_valid_form_passes() {
        let info = form("jo@example.com", " 12 Bean St ", "04524")
            .validate()
            .unwrap();
        assert_eq!(info.email.as_str(), "jo@example.com");
        assert_eq!(info.address, "12 Bean St");
        assert_eq!(info.zip_code.as_str(), "04524");
    }

    #[test]
    fn test_email_checked_before_address_and_zip() {
        // Everything is wrong; the email failure wins.
        let err = form("bad-email", "", "1").validate().unwrap_err();
        assert!(matches!(err, ValidationError::Email(_)));
    }

    #[test]
    fn test_address_checked_before_zip() {
        let err = form("jo@example.com", "   ", "1").validate().unwrap_err();
        assert!(matches!(err, ValidationError::EmptyAddress));
    }

    #[test]
    fn test_zip_checked_last() {
        let err = form("jo@example.com", "12 Bean St", "123456")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::ZipCode(_)));
    }

    #[test]
    fn test_validation_messages_are_user_facing() {
        assert_eq!(ValidationError::EmptyCart.to_string(), "your cart is empty");
        assert_eq!(
            ValidationError::EmptyAddress.to_string(),
            "enter a delivery address"
        );
    }
}
