//! Roastery Storefront library.
//!
//! Client for the coffee-shop ordering backend. The backend owns all cart
//! state; this crate obtains and persists a cart identity, keeps a
//! server-authoritative cart summary in sync with user actions, and gates
//! checkout behind client-side validation.
//!
//! # Architecture
//!
//! - Backend is source of truth - the summary is re-fetched after every
//!   mutation, never recomputed locally
//! - The REST contract is abstracted behind [`api::OrderingBackend`] so the
//!   session logic is testable without a network
//! - Cart identity persistence, confirmation prompts, and user-facing
//!   diagnostics are injected seams ([`store::IdentityStore`],
//!   [`ports::ConfirmationPort`], [`ports::NotificationPort`])
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use roastery_storefront::{api::ApiClient, config::StorefrontConfig};
//! use roastery_storefront::session::CartSession;
//! use roastery_storefront::store::FileIdentityStore;
//! use roastery_storefront::ports::{AlwaysConfirm, LogNotifier};
//!
//! let config = StorefrontConfig::from_env()?;
//! let client = Arc::new(ApiClient::new(&config)?);
//! let store = Arc::new(FileIdentityStore::new(config.cart_state_path.clone()));
//! let session = CartSession::new(
//!     client,
//!     store,
//!     Arc::new(AlwaysConfirm),
//!     Arc::new(LogNotifier),
//!     config.cart_creation,
//! );
//!
//! session.start().await?;
//! session.toggle_add(product.id).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod ports;
pub mod session;
pub mod store;

pub use api::{ApiClient, ApiError, OrderingBackend};
pub use catalog::Catalog;
pub use checkout::{CheckoutError, CheckoutForm, CheckoutInfo, ValidationError};
pub use config::{ConfigError, StorefrontConfig};
pub use ports::{ConfirmationPort, NotificationPort};
pub use session::{CartCreation, CartError, CartSession, MutationOutcome};
pub use store::{FileIdentityStore, IdentityStore, MemoryIdentityStore, StoreError};
