//! Roastery Core - Shared types library.
//!
//! This crate provides common types used across all Roastery components:
//! - `storefront` - Client library for the coffee-shop ordering backend
//! - `cli` - Command-line front end driving the storefront client
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and
//!   postal codes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
