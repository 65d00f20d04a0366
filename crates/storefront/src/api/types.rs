//! Wire types for the ordering backend's REST contract.
//!
//! Every response arrives in a `{ resultCode, msg, data }` envelope. The
//! decode step is strict: a non-success `resultCode` or a missing `data`
//! payload where one is required is an error, never a silent fallback.

use roastery_core::{CartId, LineId, Price, ProductId};
use serde::{Deserialize, Serialize};

use super::ApiError;

/// The `resultCode` value the backend uses to signal success.
pub const SUCCESS_CODE: &str = "SUCCESS";

/// Response envelope wrapping every backend payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    /// Success/failure indicator.
    pub result_code: String,
    /// Human-readable diagnostic accompanying the result code.
    #[serde(default)]
    pub msg: Option<String>,
    /// The payload; absent on failures and on ack-only endpoints.
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Check the result code, returning the payload if the call succeeded.
    fn check(self) -> Result<Option<T>, ApiError> {
        if self.result_code == SUCCESS_CODE {
            Ok(self.data)
        } else {
            Err(ApiError::Backend {
                code: self.result_code,
                msg: self.msg.unwrap_or_default(),
            })
        }
    }

    /// Unwrap a data-bearing response.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Backend` on a failure result code and
    /// `ApiError::MissingData` if a successful envelope carried no payload.
    pub fn into_data(self) -> Result<T, ApiError> {
        self.check()?.ok_or(ApiError::MissingData)
    }

    /// Unwrap an ack-only response, discarding any payload.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Backend` on a failure result code.
    pub fn into_ack(self) -> Result<(), ApiError> {
        self.check().map(|_| ())
    }
}

/// Payload of `POST /carts`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCart {
    /// Identifier of the freshly created cart.
    pub cart_id: CartId,
}

/// A catalog product.
///
/// Immutable once fetched; the catalog is re-fetched on demand, never
/// mutated locally.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit price in integer currency units, quoted by the backend.
    pub price: Price,
    /// Image reference; may be a bare filename or a full URL on the wire.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Description of what the product contains.
    #[serde(default)]
    pub contents: Option<String>,
}

/// One line of a cart summary.
///
/// Never constructed or mutated client-side; always replaced wholesale by
/// server responses, including `line_total`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub line_id: LineId,
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Price,
    pub quantity: u32,
    pub line_total: Price,
}

/// Server-computed, authoritative view of a cart.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    #[serde(default)]
    pub lines: Vec<CartLine>,
    /// Total across all lines, trusted verbatim from the server.
    #[serde(default)]
    pub total_amount: Price,
}

impl CartSummary {
    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether a product is currently a member of the cart.
    ///
    /// Membership drives the add/remove toggle behavior.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.lines.iter().any(|l| l.product_id == product_id)
    }

    /// The line holding a product, if it is a member.
    #[must_use]
    pub fn line_for(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }
}

/// Request body of `POST /carts/items`.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub cart_id: CartId,
    pub product_id: ProductId,
}

/// Request body of `POST /carts/{id}/email`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    pub email: String,
}

/// Request body of `POST /carts/{id}/date`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDateRequest {
    pub order_date: String,
}

/// Request body of `POST /carts/{id}/customer`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    pub email: String,
    pub address: String,
    pub zip_code: String,
}

/// Request body of `POST /admin/login`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

/// One order row from `GET /admin/orders`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrder {
    pub cart_id: CartId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub order_date: Option<String>,
    #[serde(default)]
    pub lines: Vec<CartLine>,
}

/// Per-product aggregate from `GET /admin/orders/dailyBatch`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBatchRow {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
}
