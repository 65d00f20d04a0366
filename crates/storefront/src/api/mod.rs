//! REST client for the coffee-shop ordering backend.
//!
//! # Architecture
//!
//! - One shared `reqwest::Client` behind an `Arc`; cloning the client is
//!   cheap
//! - Every response is decoded strictly from the `{ resultCode, msg, data }`
//!   envelope ([`types::Envelope`])
//! - Summary and catalog reads are cache-busted: the backend must reflect
//!   live stock, price, and cart state
//! - No retry or backoff anywhere; a failed call is reported and the user
//!   repeats the action

mod admin;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use roastery_core::{CartId, Email, ProductId};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;

use crate::checkout::CheckoutInfo;
use crate::config::StorefrontConfig;

pub use types::{AdminOrder, CartLine, CartSummary, DailyBatchRow, Envelope, NewCart, Product};

/// Errors that can occur when talking to the ordering backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never completed (connect failure, timeout, ...).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("server returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The envelope carried a failure result code.
    #[error("backend rejected request ({code}): {msg}")]
    Backend { code: String, msg: String },

    /// The response body did not decode as the expected envelope shape.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A successful envelope arrived without the payload the call requires.
    #[error("response envelope carried no data")]
    MissingData,
}

/// The ordering backend's cart-facing contract.
///
/// [`ApiClient`] is the production implementation; tests substitute
/// in-memory fakes so session logic runs without a network.
#[async_trait]
pub trait OrderingBackend: Send + Sync {
    /// `POST /carts` - create a cart, returning its identifier.
    async fn create_cart(&self) -> Result<CartId, ApiError>;

    /// `GET /products` - fetch the full catalog.
    async fn products(&self) -> Result<Vec<Product>, ApiError>;

    /// `GET /coffee/{id}` - fetch one product for detail display.
    async fn product_detail(&self, product_id: ProductId) -> Result<Product, ApiError>;

    /// `GET /carts/{id}/summary` - fetch the authoritative summary.
    async fn cart_summary(&self, cart_id: CartId) -> Result<CartSummary, ApiError>;

    /// `POST /carts/items` - add a product line.
    async fn add_item(&self, cart_id: CartId, product_id: ProductId) -> Result<(), ApiError>;

    /// `DELETE /carts/{id}/items/{productId}` - remove a product line.
    async fn remove_item(&self, cart_id: CartId, product_id: ProductId) -> Result<(), ApiError>;

    /// `POST /carts/{id}/items/{productId}/increase` - bump quantity by one.
    async fn increase_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<(), ApiError>;

    /// `POST /carts/{id}/items/{productId}/decrease` - drop quantity by one.
    ///
    /// Whether a decrease below one removes the line is the server's
    /// decision; the client performs no bound-checking.
    async fn decrease_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<(), ApiError>;

    /// `POST /carts/{id}/email` - persist the customer email.
    async fn set_email(&self, cart_id: CartId, email: &Email) -> Result<(), ApiError>;

    /// `POST /carts/{id}/date` - persist the order timestamp.
    async fn set_order_date(&self, cart_id: CartId, order_date: &str) -> Result<(), ApiError>;

    /// `POST /carts/{id}/customer` - persist full customer/shipping info.
    async fn set_customer(&self, cart_id: CartId, info: &CheckoutInfo) -> Result<(), ApiError>;
}

// =============================================================================
// ApiClient
// =============================================================================

/// REST client for the ordering backend.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    /// Base URL with any trailing slash trimmed.
    base: String,
}

impl ApiClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base: config.api_base_url.as_str().trim_end_matches('/').to_owned(),
            }),
        })
    }

    /// Create a client for a known base URL, mainly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base: base_url.trim_end_matches('/').to_owned(),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base)
    }

    /// Issue a GET whose response must not come from any HTTP cache.
    async fn get_fresh<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .inner
            .client
            .get(self.endpoint(path))
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::PRAGMA, "no-cache")
            .query(&[("t", rand::random::<u64>().to_string())])
            .send()
            .await?;
        Self::decode_data(response).await
    }

    async fn post_ack<B: Serialize + Sync>(&self, path: &str, body: Option<&B>) -> Result<(), ApiError> {
        let mut request = self.inner.client.post(self.endpoint(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        Self::decode_ack(response).await
    }

    async fn post_data<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let mut request = self.inner.client.post(self.endpoint(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        Self::decode_data(response).await
    }

    async fn delete_ack(&self, path: &str) -> Result<(), ApiError> {
        let response = self.inner.client.delete(self.endpoint(path)).send().await?;
        Self::decode_ack(response).await
    }

    /// Read the body, check the HTTP status, and decode the envelope.
    async fn envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Envelope<T>, ApiError> {
        let status = response.status();

        // Body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %excerpt(&body),
                "ordering backend returned non-success status"
            );
            return Err(ApiError::Status {
                status,
                body: excerpt(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %excerpt(&body),
                "failed to parse ordering backend response"
            );
            ApiError::Decode(e)
        })
    }

    async fn decode_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        Self::envelope::<T>(response).await?.into_data()
    }

    async fn decode_ack(response: reqwest::Response) -> Result<(), ApiError> {
        Self::envelope::<serde_json::Value>(response)
            .await?
            .into_ack()
    }
}

/// Truncate a response body for logs and error values.
fn excerpt(body: &str) -> String {
    body.chars().take(200).collect()
}

#[async_trait]
impl OrderingBackend for ApiClient {
    #[instrument(skip(self))]
    async fn create_cart(&self) -> Result<CartId, ApiError> {
        let cart: NewCart = self.post_data::<(), _>("/carts", None).await?;
        Ok(cart.cart_id)
    }

    #[instrument(skip(self))]
    async fn products(&self) -> Result<Vec<Product>, ApiError> {
        self.get_fresh("/products").await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn product_detail(&self, product_id: ProductId) -> Result<Product, ApiError> {
        self.get_fresh(&format!("/coffee/{product_id}")).await
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn cart_summary(&self, cart_id: CartId) -> Result<CartSummary, ApiError> {
        self.get_fresh(&format!("/carts/{cart_id}/summary")).await
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    async fn add_item(&self, cart_id: CartId, product_id: ProductId) -> Result<(), ApiError> {
        let body = types::AddItemRequest {
            cart_id,
            product_id,
        };
        self.post_ack("/carts/items", Some(&body)).await
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    async fn remove_item(&self, cart_id: CartId, product_id: ProductId) -> Result<(), ApiError> {
        self.delete_ack(&format!("/carts/{cart_id}/items/{product_id}"))
            .await
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    async fn increase_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<(), ApiError> {
        self.post_ack::<()>(
            &format!("/carts/{cart_id}/items/{product_id}/increase"),
            None,
        )
        .await
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    async fn decrease_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<(), ApiError> {
        self.post_ack::<()>(
            &format!("/carts/{cart_id}/items/{product_id}/decrease"),
            None,
        )
        .await
    }

    #[instrument(skip(self, email), fields(cart_id = %cart_id))]
    async fn set_email(&self, cart_id: CartId, email: &Email) -> Result<(), ApiError> {
        let body = types::EmailRequest {
            email: email.as_str().to_owned(),
        };
        self.post_ack(&format!("/carts/{cart_id}/email"), Some(&body))
            .await
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn set_order_date(&self, cart_id: CartId, order_date: &str) -> Result<(), ApiError> {
        let body = types::OrderDateRequest {
            order_date: order_date.to_owned(),
        };
        self.post_ack(&format!("/carts/{cart_id}/date"), Some(&body))
            .await
    }

    #[instrument(skip(self, info), fields(cart_id = %cart_id))]
    async fn set_customer(&self, cart_id: CartId, info: &CheckoutInfo) -> Result<(), ApiError> {
        let body = types::CustomerRequest {
            email: info.email.as_str().to_owned(),
            address: info.address.clone(),
            zip_code: info.zip_code.as_str().to_owned(),
        };
        self.post_ack(&format!("/carts/{cart_id}/customer"), Some(&body))
            .await
    }
}
