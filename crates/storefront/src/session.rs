//! Cart session: identity lifecycle, summary synchronization, mutation
//! operations, and the checkout gate.
//!
//! The backend owns the cart. The session never computes cart state
//! locally: every successful mutation is followed by a summary re-fetch,
//! and the fetched summary replaces the held one wholesale. A cart session
//! moves through `no cart -> active (empty) -> active (non-empty) ->
//! checked out -> no cart`; checkout success immediately resets identity,
//! so "checked out" is never a retained state.
//!
//! Two protective invariants live here:
//!
//! - **Single-flight per target**: a second mutation on a product whose
//!   request is still outstanding is rejected. The reservation is an RAII
//!   guard, so it is released on every exit path.
//! - **Stale refresh discard**: summary refreshes carry a monotonic
//!   sequence number; a response that lost the race to a newer one is
//!   dropped instead of overwriting fresher state.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use roastery_core::{CartId, ProductId};
use thiserror::Error;
use tracing::instrument;

use crate::api::{ApiError, CartSummary, OrderingBackend};
use crate::checkout::{CheckoutError, CheckoutForm, ValidationError};
use crate::ports::{ConfirmationPort, NotificationPort};
use crate::store::{IdentityStore, StoreError};

/// When the session mints a cart identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartCreation {
    /// Create a cart as soon as the session starts.
    Eager,
    /// Defer creation until the first add-to-cart action needs it.
    #[default]
    Lazy,
}

/// Errors from cart session operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// A quantity mutation was attempted with no active cart.
    #[error("no active cart")]
    NoCart,

    /// The backend failed to create a cart; session state is unchanged.
    #[error("cart could not be created: {0}")]
    Creation(#[source] ApiError),

    /// A backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The identity store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a mutation operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The backend accepted the mutation and the summary was refreshed.
    Applied,
    /// The product was already in the cart; no request was issued.
    AlreadyInCart,
    /// The product was not in the cart; no request was issued.
    NotInCart,
    /// The user declined the confirmation prompt; no request was issued.
    Declined,
    /// A mutation for the same product is still outstanding.
    InFlight,
}

impl MutationOutcome {
    /// Whether the backend state changed.
    #[must_use]
    pub const fn applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

#[derive(Debug, Clone, Copy)]
enum MutationOp {
    Add,
    Remove,
    Increase,
    Decrease,
}

// =============================================================================
// CartSession
// =============================================================================

/// The cart lifecycle orchestrator.
///
/// Cheaply cloneable via `Arc`; all mutable state sits behind one mutex
/// that is never held across an await point.
#[derive(Clone)]
pub struct CartSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    backend: Arc<dyn OrderingBackend>,
    store: Arc<dyn IdentityStore>,
    confirm: Arc<dyn ConfirmationPort>,
    notify: Arc<dyn NotificationPort>,
    creation: CartCreation,
    state: Mutex<SessionState>,
}

#[derive(Default)]
struct SessionState {
    cart_id: Option<CartId>,
    summary: CartSummary,
    in_flight: HashSet<ProductId>,
    checkout_in_flight: bool,
    refresh_issued: u64,
    refresh_applied: u64,
}

impl SessionInner {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CartSession {
    /// Create a session over the given backend, identity store, and ports.
    #[must_use]
    pub fn new(
        backend: Arc<dyn OrderingBackend>,
        store: Arc<dyn IdentityStore>,
        confirm: Arc<dyn ConfirmationPort>,
        notify: Arc<dyn NotificationPort>,
        creation: CartCreation,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                backend,
                store,
                confirm,
                notify,
                creation,
                state: Mutex::new(SessionState::default()),
            }),
        }
    }

    /// Restore persisted identity and bring the summary up to date.
    ///
    /// For the eager variant a cart is minted immediately; the lazy variant
    /// only adopts an identity that was already persisted. Once an identity
    /// is held the summary is fetched; a summary-fetch failure is surfaced
    /// as a diagnostic and does not fail the start.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted identity cannot be read or if
    /// eager cart creation fails.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<(), CartError> {
        if let Some(id) = self.inner.store.load()? {
            self.inner.state().cart_id = Some(id);
        }

        if self.inner.creation == CartCreation::Eager {
            self.ensure_cart_id().await?;
        }

        if let Some(cart_id) = self.cart_id()
            && let Err(e) = self.refresh_summary_for(cart_id).await
        {
            tracing::warn!(error = %e, %cart_id, "could not load cart summary at session start");
            self.inner
                .notify
                .notify("Your cart could not be loaded; showing it as empty.");
        }
        Ok(())
    }

    /// The currently held cart identity, if any.
    #[must_use]
    pub fn cart_id(&self) -> Option<CartId> {
        self.inner.state().cart_id
    }

    /// A snapshot of the last summary the server sent.
    #[must_use]
    pub fn summary(&self) -> CartSummary {
        self.inner.state().summary.clone()
    }

    /// Whether a product is a member of the current summary.
    #[must_use]
    pub fn is_in_cart(&self, product_id: ProductId) -> bool {
        self.inner.state().summary.contains(product_id)
    }

    /// Return the held cart identity, minting one if necessary.
    ///
    /// Idempotent fast path: while an identity is held, no network call is
    /// made. Otherwise a cart is created, persisted, and adopted, in that
    /// order - a failure at any step leaves the session without an
    /// identity, and the caller must not proceed to mutate a cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Creation`] if the backend refuses to mint a
    /// cart, or a store error if the fresh identity cannot be persisted.
    #[instrument(skip(self))]
    pub async fn ensure_cart_id(&self) -> Result<CartId, CartError> {
        if let Some(id) = self.inner.state().cart_id {
            return Ok(id);
        }

        let id = self
            .inner
            .backend
            .create_cart()
            .await
            .map_err(CartError::Creation)?;
        self.inner.store.save(id)?;
        self.inner.state().cart_id = Some(id);
        tracing::debug!(cart_id = %id, "adopted fresh cart identity");
        Ok(id)
    }

    /// Clear the persisted and in-memory identity unconditionally, along
    /// with the held summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted identity cannot be cleared.
    pub fn reset_identity(&self) -> Result<(), StoreError> {
        self.inner.store.clear()?;
        let mut state = self.inner.state();
        state.cart_id = None;
        state.summary = CartSummary::default();
        Ok(())
    }

    /// Re-fetch the authoritative summary for the current cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NoCart`] when no identity is held, or the
    /// fetch error. On failure the previously held summary stays in place -
    /// stale-but-visible beats blanking the view.
    #[instrument(skip(self))]
    pub async fn refresh_summary(&self) -> Result<CartSummary, CartError> {
        let cart_id = self.cart_id().ok_or(CartError::NoCart)?;
        Ok(self.refresh_summary_for(cart_id).await?)
    }

    /// Sequenced refresh: fetch, then apply only if no newer refresh has
    /// already been applied. Returns the summary the session now holds.
    async fn refresh_summary_for(&self, cart_id: CartId) -> Result<CartSummary, ApiError> {
        let seq = {
            let mut state = self.inner.state();
            state.refresh_issued += 1;
            state.refresh_issued
        };

        let summary = self.inner.backend.cart_summary(cart_id).await?;

        let mut state = self.inner.state();
        if seq > state.refresh_applied {
            state.refresh_applied = seq;
            state.summary = summary;
        } else {
            tracing::debug!(
                seq,
                applied = state.refresh_applied,
                "discarding summary response superseded by a newer refresh"
            );
        }
        Ok(state.summary.clone())
    }

    /// Add a product to the cart if it is not already a member.
    ///
    /// Membership makes this idempotent: a product already in the cart is
    /// a no-op with no request issued. The cart identity is ensured first,
    /// minting one lazily if this session defers creation.
    ///
    /// # Errors
    ///
    /// Returns an error if identity creation, the add request, or the
    /// follow-up summary refresh fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn toggle_add(&self, product_id: ProductId) -> Result<MutationOutcome, CartError> {
        if self.is_in_cart(product_id) {
            return Ok(MutationOutcome::AlreadyInCart);
        }

        let Some(_guard) = FlightGuard::acquire(&self.inner, product_id) else {
            return Ok(MutationOutcome::InFlight);
        };

        let cart_id = self.ensure_cart_id().await?;
        self.mutate(MutationOp::Add, cart_id, product_id).await?;
        Ok(MutationOutcome::Applied)
    }

    /// Remove a product from the cart if it is a member.
    ///
    /// A non-member is a no-op with no request issued. Removal is
    /// destructive, so the confirmation port is consulted first; declining
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the remove request or the follow-up summary
    /// refresh fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn toggle_remove(&self, product_id: ProductId) -> Result<MutationOutcome, CartError> {
        let (cart_id, line_name) = {
            let state = self.inner.state();
            let Some(cart_id) = state.cart_id else {
                return Ok(MutationOutcome::NotInCart);
            };
            let Some(line) = state.summary.line_for(product_id) else {
                return Ok(MutationOutcome::NotInCart);
            };
            (cart_id, line.name.clone())
        };

        let Some(_guard) = FlightGuard::acquire(&self.inner, product_id) else {
            return Ok(MutationOutcome::InFlight);
        };

        if !self
            .inner
            .confirm
            .confirm(&format!("Remove {line_name} from your cart?"))
        {
            return Ok(MutationOutcome::Declined);
        }

        self.mutate(MutationOp::Remove, cart_id, product_id).await?;
        Ok(MutationOutcome::Applied)
    }

    /// Increase the quantity of a cart line by one.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NoCart`] when no identity is held - a quantity
    /// mutation implies the cart already exists, so nothing is created
    /// lazily here - or the request/refresh error.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn increase_quantity(
        &self,
        product_id: ProductId,
    ) -> Result<MutationOutcome, CartError> {
        self.adjust_quantity(MutationOp::Increase, product_id).await
    }

    /// Decrease the quantity of a cart line by one.
    ///
    /// The server alone decides floor semantics; if it removes the line at
    /// zero, the refreshed summary reflects that.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::increase_quantity`].
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn decrease_quantity(
        &self,
        product_id: ProductId,
    ) -> Result<MutationOutcome, CartError> {
        self.adjust_quantity(MutationOp::Decrease, product_id).await
    }

    async fn adjust_quantity(
        &self,
        op: MutationOp,
        product_id: ProductId,
    ) -> Result<MutationOutcome, CartError> {
        let cart_id = self.cart_id().ok_or(CartError::NoCart)?;

        let Some(_guard) = FlightGuard::acquire(&self.inner, product_id) else {
            return Ok(MutationOutcome::InFlight);
        };

        self.mutate(op, cart_id, product_id).await?;
        Ok(MutationOutcome::Applied)
    }

    /// Issue one mutation request and, on success, re-fetch the summary.
    ///
    /// A non-success response aborts before the refresh; the view keeps
    /// showing the last server state.
    async fn mutate(
        &self,
        op: MutationOp,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<(), CartError> {
        let backend = &self.inner.backend;
        match op {
            MutationOp::Add => backend.add_item(cart_id, product_id).await?,
            MutationOp::Remove => backend.remove_item(cart_id, product_id).await?,
            MutationOp::Increase => backend.increase_quantity(cart_id, product_id).await?,
            MutationOp::Decrease => backend.decrease_quantity(cart_id, product_id).await?,
        }
        self.refresh_summary_for(cart_id).await?;
        Ok(())
    }

    // =========================================================================
    // Checkout gate
    // =========================================================================

    /// Validate checkout input and, if it passes, run the checkout call
    /// sequence.
    ///
    /// Validation short-circuits in a fixed order: non-empty cart, email
    /// shape, address, postal code. On success the sequence is: persist
    /// customer email (failure logged, non-fatal), persist the order
    /// timestamp (failure tolerated), persist full customer info (failure
    /// fatal - cart state stays intact for retry). Only after the customer
    /// step succeeds is the identity reset and the summary cleared. The
    /// earlier steps are not rolled back when a later one fails; this is an
    /// accepted at-least-once sequence.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] before any network call, an
    /// [`CheckoutError::InFlight`] while another submission is
    /// outstanding, or the failure of the fatal customer step.
    #[instrument(skip(self, form))]
    pub async fn submit_checkout(&self, form: &CheckoutForm) -> Result<(), CheckoutError> {
        if self.inner.state().summary.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }
        let info = form.validate()?;

        let Some(_guard) = CheckoutGuard::acquire(&self.inner) else {
            return Err(CheckoutError::InFlight);
        };

        let cart_id = self.ensure_cart_id().await.map_err(CheckoutError::Cart)?;

        if let Err(e) = self.inner.backend.set_email(cart_id, &info.email).await {
            tracing::warn!(error = %e, %cart_id, "could not persist customer email; continuing checkout");
        }

        let stamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        if let Err(e) = self.inner.backend.set_order_date(cart_id, &stamp).await {
            tracing::debug!(error = %e, %cart_id, "order timestamp not recorded");
        }

        self.inner
            .backend
            .set_customer(cart_id, &info)
            .await
            .map_err(|e| CheckoutError::Cart(CartError::Api(e)))?;

        self.reset_identity()
            .map_err(|e| CheckoutError::Cart(CartError::Store(e)))?;
        tracing::info!(%cart_id, "checkout complete; cart identity reset");
        Ok(())
    }
}

// =============================================================================
// Single-flight guards
// =============================================================================

/// Per-product reservation. Dropping the guard releases the reservation,
/// so release happens on every exit path.
struct FlightGuard {
    inner: Arc<SessionInner>,
    product_id: ProductId,
}

impl FlightGuard {
    fn acquire(inner: &Arc<SessionInner>, product_id: ProductId) -> Option<Self> {
        if !inner.state().in_flight.insert(product_id) {
            tracing::debug!(%product_id, "mutation already in flight for this product");
            return None;
        }
        Some(Self {
            inner: Arc::clone(inner),
            product_id,
        })
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.inner.state().in_flight.remove(&self.product_id);
    }
}

/// Whole-session checkout reservation, same shape as [`FlightGuard`].
struct CheckoutGuard {
    inner: Arc<SessionInner>,
}

impl CheckoutGuard {
    fn acquire(inner: &Arc<SessionInner>) -> Option<Self> {
        let mut state = inner.state();
        if state.checkout_in_flight {
            tracing::debug!("checkout already in flight");
            return None;
        }
        state.checkout_in_flight = true;
        drop(state);
        Some(Self {
            inner: Arc::clone(inner),
        })
    }
}

impl Drop for CheckoutGuard {
    fn drop(&mut self) {
        self.inner.state().checkout_in_flight = false;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use roastery_core::{Email, LineId, Price};
    use tokio::sync::Notify;

    use super::*;
    use crate::api::{CartLine, Product};
    use crate::checkout::CheckoutInfo;
    use crate::ports::{AlwaysConfirm, NeverConfirm};
    use crate::store::MemoryIdentityStore;

    fn line(product_id: i64, name: &str, unit: i64, quantity: u32) -> CartLine {
        CartLine {
            line_id: LineId::new(product_id * 100),
            product_id: ProductId::new(product_id),
            name: name.to_string(),
            unit_price: Price::new(unit),
            quantity,
            line_total: Price::new(unit * i64::from(quantity)),
        }
    }

    fn summary(lines: Vec<CartLine>) -> CartSummary {
        let total_amount = Price::new(lines.iter().map(|l| l.line_total.as_i64()).sum());
        CartSummary {
            lines,
            total_amount,
        }
    }

    /// Scriptable in-memory backend recording every call it receives.
    #[derive(Default)]
    struct FakeBackend {
        calls: Mutex<Vec<String>>,
        cart_ids: Mutex<VecDeque<CartId>>,
        summaries: Mutex<VecDeque<CartSummary>>,
        failing_ops: Mutex<HashSet<&'static str>>,
        /// Summary-call indexes to park until released.
        summary_holds: Mutex<std::collections::HashMap<usize, Arc<Notify>>>,
        summary_call_count: AtomicUsize,
        /// When set, every add_item call parks until released.
        add_hold: Mutex<Option<Arc<Notify>>>,
    }

    impl FakeBackend {
        fn new() -> Arc<Self> {
            let backend = Self::default();
            backend.cart_ids.lock().unwrap().push_back(CartId::new(42));
            Arc::new(backend)
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn count_of(&self, prefix: &str) -> usize {
            self.calls()
                .iter()
                .filter(|c| c.starts_with(prefix))
                .count()
        }

        fn push_summary(&self, s: CartSummary) {
            self.summaries.lock().unwrap().push_back(s);
        }

        fn fail(&self, op: &'static str) {
            self.failing_ops.lock().unwrap().insert(op);
        }

        fn check_failure(&self, op: &'static str) -> Result<(), ApiError> {
            if self.failing_ops.lock().unwrap().contains(op) {
                return Err(ApiError::Backend {
                    code: "FAIL".to_string(),
                    msg: format!("{op} scripted to fail"),
                });
            }
            Ok(())
        }

        fn hold_summary_call(&self, index: usize) -> Arc<Notify> {
            let notify = Arc::new(Notify::new());
            self.summary_holds
                .lock()
                .unwrap()
                .insert(index, Arc::clone(&notify));
            notify
        }

        fn hold_adds(&self) -> Arc<Notify> {
            let notify = Arc::new(Notify::new());
            *self.add_hold.lock().unwrap() = Some(Arc::clone(&notify));
            notify
        }
    }

    #[async_trait]
    impl OrderingBackend for FakeBackend {
        async fn create_cart(&self) -> Result<CartId, ApiError> {
            self.record("create_cart");
            self.check_failure("create_cart")?;
            Ok(self
                .cart_ids
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(CartId::new(99)))
        }

        async fn products(&self) -> Result<Vec<Product>, ApiError> {
            self.record("products");
            self.check_failure("products")?;
            Ok(Vec::new())
        }

        async fn product_detail(&self, product_id: ProductId) -> Result<Product, ApiError> {
            self.record(format!("product_detail {product_id}"));
            Err(ApiError::MissingData)
        }

        async fn cart_summary(&self, cart_id: CartId) -> Result<CartSummary, ApiError> {
            let index = self.summary_call_count.fetch_add(1, Ordering::SeqCst);
            self.record(format!("cart_summary {cart_id}"));
            self.check_failure("cart_summary")?;
            // Pop the scripted response before parking so responses map to
            // call order, not release order.
            let response = self.summaries.lock().unwrap().pop_front();
            let hold = self.summary_holds.lock().unwrap().remove(&index);
            if let Some(notify) = hold {
                notify.notified().await;
            }
            Ok(response.unwrap_or_default())
        }

        async fn add_item(&self, cart_id: CartId, product_id: ProductId) -> Result<(), ApiError> {
            self.record(format!("add_item {cart_id} {product_id}"));
            let hold = self.add_hold.lock().unwrap().clone();
            if let Some(notify) = hold {
                notify.notified().await;
            }
            self.check_failure("add_item")
        }

        async fn remove_item(
            &self,
            cart_id: CartId,
            product_id: ProductId,
        ) -> Result<(), ApiError> {
            self.record(format!("remove_item {cart_id} {product_id}"));
            self.check_failure("remove_item")
        }

        async fn increase_quantity(
            &self,
            cart_id: CartId,
            product_id: ProductId,
        ) -> Result<(), ApiError> {
            self.record(format!("increase {cart_id} {product_id}"));
            self.check_failure("increase")
        }

        async fn decrease_quantity(
            &self,
            cart_id: CartId,
            product_id: ProductId,
        ) -> Result<(), ApiError> {
            self.record(format!("decrease {cart_id} {product_id}"));
            self.check_failure("decrease")
        }

        async fn set_email(&self, cart_id: CartId, email: &Email) -> Result<(), ApiError> {
            self.record(format!("set_email {cart_id} {email}"));
            self.check_failure("set_email")
        }

        async fn set_order_date(&self, cart_id: CartId, order_date: &str) -> Result<(), ApiError> {
            self.record(format!("set_order_date {cart_id} {order_date}"));
            self.check_failure("set_order_date")
        }

        async fn set_customer(
            &self,
            cart_id: CartId,
            info: &CheckoutInfo,
        ) -> Result<(), ApiError> {
            self.record(format!("set_customer {cart_id} {}", info.email));
            self.check_failure("set_customer")
        }
    }

    fn lazy_session(backend: &Arc<FakeBackend>) -> CartSession {
        CartSession::new(
            Arc::clone(backend) as Arc<dyn OrderingBackend>,
            Arc::new(MemoryIdentityStore::new()),
            Arc::new(AlwaysConfirm),
            Arc::new(crate::ports::LogNotifier),
            CartCreation::Lazy,
        )
    }

    fn valid_form() -> CheckoutForm {
        CheckoutForm {
            email: "jo@example.com".to_string(),
            address: "12 Bean St".to_string(),
            zip_code: "04524".to_string(),
        }
    }

    #[tokio::test]
    async fn test_ensure_cart_id_is_idempotent() {
        let backend = FakeBackend::new();
        let session = lazy_session(&backend);

        assert_eq!(session.ensure_cart_id().await.unwrap(), CartId::new(42));
        assert_eq!(session.ensure_cart_id().await.unwrap(), CartId::new(42));
        assert_eq!(session.ensure_cart_id().await.unwrap(), CartId::new(42));

        assert_eq!(backend.count_of("create_cart"), 1);
    }

    #[tokio::test]
    async fn test_creation_failure_leaves_state_unchanged() {
        let backend = FakeBackend::new();
        backend.fail("create_cart");
        let session = lazy_session(&backend);

        let err = session.ensure_cart_id().await.unwrap_err();
        assert!(matches!(err, CartError::Creation(_)));
        assert!(session.cart_id().is_none());
    }

    #[tokio::test]
    async fn test_eager_start_mints_cart_and_loads_summary() {
        let backend = FakeBackend::new();
        backend.push_summary(summary(vec![]));
        let session = CartSession::new(
            Arc::clone(&backend) as Arc<dyn OrderingBackend>,
            Arc::new(MemoryIdentityStore::new()),
            Arc::new(AlwaysConfirm),
            Arc::new(crate::ports::LogNotifier),
            CartCreation::Eager,
        );

        session.start().await.unwrap();
        assert_eq!(session.cart_id(), Some(CartId::new(42)));
        assert_eq!(backend.count_of("create_cart"), 1);
        assert_eq!(backend.count_of("cart_summary"), 1);
    }

    #[tokio::test]
    async fn test_lazy_start_adopts_persisted_identity() {
        let backend = FakeBackend::new();
        backend.push_summary(summary(vec![line(7, "Mocha", 4500, 1)]));
        let session = CartSession::new(
            Arc::clone(&backend) as Arc<dyn OrderingBackend>,
            Arc::new(MemoryIdentityStore::holding(CartId::new(17))),
            Arc::new(AlwaysConfirm),
            Arc::new(crate::ports::LogNotifier),
            CartCreation::Lazy,
        );

        session.start().await.unwrap();
        assert_eq!(session.cart_id(), Some(CartId::new(17)));
        assert_eq!(backend.count_of("create_cart"), 0);
        assert!(session.is_in_cart(ProductId::new(7)));
    }

    #[tokio::test]
    async fn test_lazy_start_without_identity_stays_cartless() {
        let backend = FakeBackend::new();
        let session = lazy_session(&backend);

        session.start().await.unwrap();
        assert!(session.cart_id().is_none());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_start_survives_summary_failure() {
        let backend = FakeBackend::new();
        backend.fail("cart_summary");
        let session = CartSession::new(
            Arc::clone(&backend) as Arc<dyn OrderingBackend>,
            Arc::new(MemoryIdentityStore::holding(CartId::new(17))),
            Arc::new(AlwaysConfirm),
            Arc::new(crate::ports::LogNotifier),
            CartCreation::Lazy,
        );

        session.start().await.unwrap();
        assert_eq!(session.cart_id(), Some(CartId::new(17)));
        assert!(session.summary().is_empty());
    }

    #[tokio::test]
    async fn test_scenario_a_fresh_session_add_first_product() {
        let backend = FakeBackend::new();
        backend.push_summary(summary(vec![line(7, "Mocha", 4500, 1)]));
        let session = lazy_session(&backend);

        let outcome = session.toggle_add(ProductId::new(7)).await.unwrap();
        assert_eq!(outcome, MutationOutcome::Applied);
        assert_eq!(session.cart_id(), Some(CartId::new(42)));

        let view = session.summary();
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.total_amount, Price::new(4500));
        assert_eq!(
            backend.calls(),
            vec!["create_cart", "add_item 42 7", "cart_summary 42"]
        );
    }

    #[tokio::test]
    async fn test_toggle_add_is_idempotent_for_members() {
        let backend = FakeBackend::new();
        backend.push_summary(summary(vec![line(7, "Mocha", 4500, 1)]));
        let session = lazy_session(&backend);

        assert!(session.toggle_add(ProductId::new(7)).await.unwrap().applied());
        let second = session.toggle_add(ProductId::new(7)).await.unwrap();
        assert_eq!(second, MutationOutcome::AlreadyInCart);

        // One add request total.
        assert_eq!(backend.count_of("add_item"), 1);
    }

    #[tokio::test]
    async fn test_toggle_remove_nonmember_is_noop() {
        let backend = FakeBackend::new();
        let session = lazy_session(&backend);

        let outcome = session.toggle_remove(ProductId::new(9)).await.unwrap();
        assert_eq!(outcome, MutationOutcome::NotInCart);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_remove_declined_is_noop() {
        let backend = FakeBackend::new();
        backend.push_summary(summary(vec![line(7, "Mocha", 4500, 1)]));
        let session = CartSession::new(
            Arc::clone(&backend) as Arc<dyn OrderingBackend>,
            Arc::new(MemoryIdentityStore::new()),
            Arc::new(NeverConfirm),
            Arc::new(crate::ports::LogNotifier),
            CartCreation::Lazy,
        );

        assert!(session.toggle_add(ProductId::new(7)).await.unwrap().applied());
        let outcome = session.toggle_remove(ProductId::new(7)).await.unwrap();
        assert_eq!(outcome, MutationOutcome::Declined);
        assert_eq!(backend.count_of("remove_item"), 0);
    }

    #[tokio::test]
    async fn test_toggle_remove_member_removes_and_refreshes() {
        let backend = FakeBackend::new();
        backend.push_summary(summary(vec![line(7, "Mocha", 4500, 1)]));
        backend.push_summary(summary(vec![]));
        let session = lazy_session(&backend);

        assert!(session.toggle_add(ProductId::new(7)).await.unwrap().applied());
        let outcome = session.toggle_remove(ProductId::new(7)).await.unwrap();
        assert_eq!(outcome, MutationOutcome::Applied);
        assert!(session.summary().is_empty());
        assert_eq!(backend.count_of("remove_item"), 1);
        assert_eq!(backend.count_of("cart_summary"), 2);
    }

    #[tokio::test]
    async fn test_quantity_mutation_without_cart_is_state_error() {
        let backend = FakeBackend::new();
        let session = lazy_session(&backend);

        let err = session.increase_quantity(ProductId::new(7)).await.unwrap_err();
        assert!(matches!(err, CartError::NoCart));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_scenario_b_decrease_to_zero_empties_cart() {
        let backend = FakeBackend::new();
        backend.push_summary(summary(vec![line(7, "Mocha", 4500, 1)]));
        // Server decides a decrease below one removes the line.
        backend.push_summary(summary(vec![]));
        let session = lazy_session(&backend);

        assert!(session.toggle_add(ProductId::new(7)).await.unwrap().applied());
        let outcome = session.decrease_quantity(ProductId::new(7)).await.unwrap();
        assert_eq!(outcome, MutationOutcome::Applied);
        assert!(session.summary().is_empty());
        assert_eq!(session.summary().total_amount, Price::ZERO);
    }

    #[tokio::test]
    async fn test_failed_mutation_aborts_before_refresh() {
        let backend = FakeBackend::new();
        backend.push_summary(summary(vec![line(7, "Mocha", 4500, 1)]));
        let session = lazy_session(&backend);
        assert!(session.toggle_add(ProductId::new(7)).await.unwrap().applied());

        backend.fail("increase");
        let err = session.increase_quantity(ProductId::new(7)).await.unwrap_err();
        assert!(matches!(err, CartError::Api(ApiError::Backend { .. })));

        // No refresh was issued after the failed mutation, and the held
        // summary still shows the last server state.
        assert_eq!(backend.count_of("cart_summary"), 1);
        assert!(session.is_in_cart(ProductId::new(7)));
    }

    #[tokio::test]
    async fn test_single_flight_rejects_second_mutation_on_same_product() {
        let backend = FakeBackend::new();
        backend.push_summary(summary(vec![line(7, "Mocha", 4500, 1)]));
        let release = backend.hold_adds();
        let session = lazy_session(&backend);

        let racing = {
            let session = session.clone();
            tokio::spawn(async move { session.toggle_add(ProductId::new(7)).await })
        };

        // Wait for the first mutation to reach the backend and park there.
        while backend.count_of("add_item") == 0 {
            tokio::task::yield_now().await;
        }

        let second = session.toggle_add(ProductId::new(7)).await.unwrap();
        assert_eq!(second, MutationOutcome::InFlight);

        release.notify_one();
        let first = racing.await.unwrap().unwrap();
        assert_eq!(first, MutationOutcome::Applied);

        // The reservation is released once the first mutation lands;
        // membership now makes a third call a no-op, not a rejection.
        let third = session.toggle_add(ProductId::new(7)).await.unwrap();
        assert_eq!(third, MutationOutcome::AlreadyInCart);
        assert_eq!(backend.count_of("add_item"), 1);
    }

    #[tokio::test]
    async fn test_flight_reservation_released_after_failure() {
        let backend = FakeBackend::new();
        backend.fail("add_item");
        let session = lazy_session(&backend);

        assert!(session.toggle_add(ProductId::new(7)).await.is_err());

        // The guard must have been released; the retry reaches the backend.
        backend.failing_ops.lock().unwrap().clear();
        backend.push_summary(summary(vec![line(7, "Mocha", 4500, 1)]));
        assert!(session.toggle_add(ProductId::new(7)).await.unwrap().applied());
        assert_eq!(backend.count_of("add_item"), 2);
    }

    #[tokio::test]
    async fn test_stale_summary_response_is_discarded() {
        let backend = FakeBackend::new();
        let stale = summary(vec![line(7, "Mocha", 4500, 1)]);
        let fresh = summary(vec![line(7, "Mocha", 4500, 3)]);
        backend.push_summary(stale);
        backend.push_summary(fresh.clone());

        let session = lazy_session(&backend);
        session.ensure_cart_id().await.unwrap();

        let release = backend.hold_summary_call(0);
        let slow = {
            let session = session.clone();
            tokio::spawn(async move { session.refresh_summary().await })
        };
        while backend.count_of("cart_summary") == 0 {
            tokio::task::yield_now().await;
        }

        // A newer refresh completes while the first is still parked.
        let applied = session.refresh_summary().await.unwrap();
        assert_eq!(applied.line_for(ProductId::new(7)).unwrap().quantity, 3);

        release.notify_one();
        let resolved = slow.await.unwrap().unwrap();

        // The slow response lost the race: both the returned view and the
        // held summary reflect the newer state.
        assert_eq!(resolved.line_for(ProductId::new(7)).unwrap().quantity, 3);
        assert_eq!(
            session.summary().line_for(ProductId::new(7)).unwrap().quantity,
            3
        );
    }

    #[tokio::test]
    async fn test_refresh_without_cart_is_state_error() {
        let backend = FakeBackend::new();
        let session = lazy_session(&backend);
        assert!(matches!(
            session.refresh_summary().await.unwrap_err(),
            CartError::NoCart
        ));
    }

    #[tokio::test]
    async fn test_checkout_rejects_empty_cart_before_field_checks() {
        let backend = FakeBackend::new();
        let session = lazy_session(&backend);

        // Even with a malformed email, the empty cart is reported first.
        let form = CheckoutForm {
            email: "bad-email".to_string(),
            ..valid_form()
        };
        let err = session.submit_checkout(&form).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Validation(ValidationError::EmptyCart)
        ));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_scenario_c_bad_email_fails_before_any_network_call() {
        let backend = FakeBackend::new();
        backend.push_summary(summary(vec![line(7, "Mocha", 4500, 1)]));
        let session = lazy_session(&backend);
        assert!(session.toggle_add(ProductId::new(7)).await.unwrap().applied());
        let calls_before = backend.calls().len();

        let form = CheckoutForm {
            email: "bad-email".to_string(),
            ..valid_form()
        };
        let err = session.submit_checkout(&form).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Validation(ValidationError::Email(_))
        ));
        assert_eq!(backend.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn test_scenario_d_full_checkout_resets_identity_and_summary() {
        let backend = FakeBackend::new();
        backend.push_summary(summary(vec![line(7, "Mocha", 4500, 1)]));
        let store = Arc::new(MemoryIdentityStore::new());
        let session = CartSession::new(
            Arc::clone(&backend) as Arc<dyn OrderingBackend>,
            Arc::clone(&store) as Arc<dyn IdentityStore>,
            Arc::new(AlwaysConfirm),
            Arc::new(crate::ports::LogNotifier),
            CartCreation::Lazy,
        );
        assert!(session.toggle_add(ProductId::new(7)).await.unwrap().applied());

        session.submit_checkout(&valid_form()).await.unwrap();

        assert!(session.cart_id().is_none());
        assert!(session.summary().is_empty());
        assert_eq!(store.load().unwrap(), None);
        assert_eq!(backend.count_of("set_email"), 1);
        assert_eq!(backend.count_of("set_order_date"), 1);
        assert_eq!(backend.count_of("set_customer"), 1);
    }

    #[tokio::test]
    async fn test_checkout_email_failure_is_not_fatal() {
        let backend = FakeBackend::new();
        backend.push_summary(summary(vec![line(7, "Mocha", 4500, 1)]));
        backend.fail("set_email");
        backend.fail("set_order_date");
        let session = lazy_session(&backend);
        assert!(session.toggle_add(ProductId::new(7)).await.unwrap().applied());

        session.submit_checkout(&valid_form()).await.unwrap();
        assert!(session.cart_id().is_none());
        assert_eq!(backend.count_of("set_customer"), 1);
    }

    #[tokio::test]
    async fn test_checkout_customer_failure_keeps_cart_for_retry() {
        let backend = FakeBackend::new();
        backend.push_summary(summary(vec![line(7, "Mocha", 4500, 1)]));
        backend.fail("set_customer");
        let session = lazy_session(&backend);
        assert!(session.toggle_add(ProductId::new(7)).await.unwrap().applied());

        let err = session.submit_checkout(&valid_form()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Cart(CartError::Api(_))));

        // Identity and summary stay intact so the user can retry.
        assert_eq!(session.cart_id(), Some(CartId::new(42)));
        assert!(session.is_in_cart(ProductId::new(7)));

        // And the retry goes through once the backend recovers, even though
        // email/date already ran once (accepted at-least-once sequence).
        backend.failing_ops.lock().unwrap().clear();
        session.submit_checkout(&valid_form()).await.unwrap();
        assert!(session.cart_id().is_none());
        assert_eq!(backend.count_of("set_email"), 2);
    }
}
