//! Core types for Roastery.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod zip;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::Price;
pub use zip::{ZipCode, ZipCodeError};
