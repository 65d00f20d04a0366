//! CLI command implementations.

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod checkout;

use std::sync::Arc;

use roastery_storefront::api::OrderingBackend;
use roastery_storefront::ports::AlwaysConfirm;
use roastery_storefront::{
    ApiClient, CartSession, Catalog, ConfirmationPort, FileIdentityStore, StorefrontConfig,
};

use crate::console::{ConsoleNotifier, StdinConfirmation};

/// Shared wiring for every command: configuration, the REST client, and
/// the cart session over it.
pub struct Context {
    pub config: StorefrontConfig,
    pub client: ApiClient,
    pub session: CartSession,
    pub catalog: Catalog,
}

impl Context {
    /// Build the command context from the environment.
    ///
    /// `assume_yes` swaps the interactive confirmation prompt for one that
    /// accepts everything, for scripted use.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is missing/invalid or the HTTP
    /// client cannot be built.
    pub fn build(assume_yes: bool) -> Result<Self, Box<dyn std::error::Error>> {
        let config = StorefrontConfig::from_env()?;
        let client = ApiClient::new(&config)?;

        let backend: Arc<dyn OrderingBackend> = Arc::new(client.clone());
        let store = Arc::new(FileIdentityStore::new(config.cart_state_path.clone()));
        let confirm: Arc<dyn ConfirmationPort> = if assume_yes {
            Arc::new(AlwaysConfirm)
        } else {
            Arc::new(StdinConfirmation)
        };

        let session = CartSession::new(
            Arc::clone(&backend),
            store,
            confirm,
            Arc::new(ConsoleNotifier),
            config.cart_creation,
        );
        let catalog = Catalog::new(backend, config.image_base_url.clone());

        Ok(Self {
            config,
            client,
            session,
            catalog,
        })
    }
}
