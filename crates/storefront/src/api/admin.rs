//! Admin surface of the ordering backend.
//!
//! These calls back the admin console pages: login, the full order list,
//! and the per-product daily batch. They are raw pass-throughs - no session
//! or token handling beyond the envelope's success indicator, no caching,
//! no local state.

use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use super::types::{AdminLoginRequest, AdminOrder, DailyBatchRow};
use super::{ApiClient, ApiError};

impl ApiClient {
    /// `POST /admin/login` - verify admin credentials.
    ///
    /// Success or failure is carried solely by the envelope result code.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Backend` on rejected credentials, alongside the
    /// usual transport/decode failures.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn admin_login(&self, email: &str, password: &SecretString) -> Result<(), ApiError> {
        let body = AdminLoginRequest {
            email: email.to_owned(),
            password: password.expose_secret().to_owned(),
        };
        self.post_ack("/admin/login", Some(&body)).await
    }

    /// `GET /admin/orders` - list all orders with their line items.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or the envelope decode fails.
    #[instrument(skip(self))]
    pub async fn admin_orders(&self) -> Result<Vec<AdminOrder>, ApiError> {
        self.get_fresh("/admin/orders").await
    }

    /// `GET /admin/orders/dailyBatch` - per-product aggregate quantities
    /// for the day.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or the envelope decode fails.
    #[instrument(skip(self))]
    pub async fn admin_daily_batch(&self) -> Result<Vec<DailyBatchRow>, ApiError> {
        self.get_fresh("/admin/orders/dailyBatch").await
    }
}
