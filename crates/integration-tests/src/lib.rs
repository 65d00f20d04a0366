//! Integration test harness for Roastery.
//!
//! Hosts an in-process fake ordering backend: an axum router over
//! in-memory state implementing the full REST contract, bound to an
//! ephemeral local port. Tests drive the real `ApiClient`/`CartSession`
//! against it over TCP, so the wire format, envelope handling, and
//! cache-busting behavior are exercised end to end.
//!
//! The fake is deliberately simple server-side: it computes line and cart
//! totals itself (the client must trust them verbatim), removes a line
//! when its quantity is decreased below one, and wraps every response in
//! the `{ resultCode, msg, data }` envelope.
//!
//! # Example
//!
//! ```rust,ignore
//! let backend = TestBackend::spawn().await;
//! let client = backend.client();
//! let cart_id = client.create_cart().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use roastery_storefront::ApiClient;

/// Email the fake backend accepts for admin login.
pub const ADMIN_EMAIL: &str = "admin@roastery.coffee";
/// Password the fake backend accepts for admin login.
pub const ADMIN_PASSWORD: &str = "espresso-machine-9000";

/// One seeded catalog product.
#[derive(Debug, Clone)]
pub struct SeedProduct {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub image_url: Option<String>,
    pub contents: Option<String>,
}

/// One cart line: product id and quantity.
#[derive(Debug, Clone, Copy)]
pub struct SeedLine {
    pub line_id: i64,
    pub product_id: i64,
    pub quantity: u32,
}

/// Server-side record of a cart.
#[derive(Debug, Clone, Default)]
pub struct CartRecord {
    pub lines: Vec<SeedLine>,
    pub email: Option<String>,
    pub order_date: Option<String>,
    pub customer: Option<CustomerRecord>,
}

/// Customer info captured at checkout.
#[derive(Debug, Clone)]
pub struct CustomerRecord {
    pub email: String,
    pub address: String,
    pub zip_code: String,
}

/// The fake shop's entire state.
#[derive(Debug)]
pub struct ShopState {
    pub products: Vec<SeedProduct>,
    pub carts: HashMap<i64, CartRecord>,
    next_cart_id: i64,
    next_line_id: i64,
}

impl ShopState {
    /// A small seeded catalog: two espresso drinks and one with a CDN
    /// image reference.
    #[must_use]
    pub fn seeded() -> Self {
        Self {
            products: vec![
                SeedProduct {
                    id: 3,
                    name: "Americano".to_string(),
                    price: 3000,
                    image_url: Some("americano.png".to_string()),
                    contents: Some("Espresso and hot water".to_string()),
                },
                SeedProduct {
                    id: 7,
                    name: "Mocha".to_string(),
                    price: 4500,
                    image_url: Some("mocha.png".to_string()),
                    contents: Some("Espresso, chocolate, steamed milk".to_string()),
                },
                SeedProduct {
                    id: 5,
                    name: "Latte".to_string(),
                    price: 4000,
                    image_url: Some("https://cdn.roastery.coffee/latte.jpg".to_string()),
                    contents: None,
                },
            ],
            carts: HashMap::new(),
            next_cart_id: 42,
            next_line_id: 1,
        }
    }

    fn product(&self, id: i64) -> Option<&SeedProduct> {
        self.products.iter().find(|p| p.id == id)
    }

    fn summary_json(&self, cart: &CartRecord) -> Value {
        let mut lines = Vec::new();
        let mut total = 0_i64;
        for line in &cart.lines {
            let Some(product) = self.product(line.product_id) else {
                continue;
            };
            let line_total = product.price * i64::from(line.quantity);
            total += line_total;
            lines.push(json!({
                "lineId": line.line_id,
                "productId": line.product_id,
                "name": product.name,
                "unitPrice": product.price,
                "quantity": line.quantity,
                "lineTotal": line_total,
            }));
        }
        json!({ "lines": lines, "totalAmount": total })
    }
}

#[derive(Clone)]
struct AppState(Arc<Mutex<ShopState>>);

impl AppState {
    fn shop(&self) -> MutexGuard<'_, ShopState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn success(data: Value) -> Json<Value> {
    Json(json!({ "resultCode": "SUCCESS", "msg": "ok", "data": data }))
}

fn success_ack() -> Json<Value> {
    Json(json!({ "resultCode": "SUCCESS", "msg": "ok" }))
}

fn failure(code: &str, msg: &str) -> Json<Value> {
    Json(json!({ "resultCode": code, "msg": msg, "data": null }))
}

// =============================================================================
// Handlers
// =============================================================================

async fn create_cart(State(state): State<AppState>) -> Json<Value> {
    let mut shop = state.shop();
    let id = shop.next_cart_id;
    shop.next_cart_id += 1;
    shop.carts.insert(id, CartRecord::default());
    success(json!({ "cartId": id }))
}

async fn products(State(state): State<AppState>) -> Json<Value> {
    let shop = state.shop();
    let rows: Vec<Value> = shop
        .products
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "name": p.name,
                "price": p.price,
                "imageUrl": p.image_url,
                "contents": p.contents,
            })
        })
        .collect();
    success(Value::Array(rows))
}

async fn product_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Json<Value> {
    let shop = state.shop();
    shop.product(id).map_or_else(
        || failure("PRODUCT_NOT_FOUND", "no such product"),
        |p| {
            success(json!({
                "id": p.id,
                "name": p.name,
                "price": p.price,
                "imageUrl": p.image_url,
                "contents": p.contents,
            }))
        },
    )
}

async fn cart_summary(
    State(state): State<AppState>,
    Path(cart_id): Path<i64>,
) -> Json<Value> {
    let shop = state.shop();
    shop.carts.get(&cart_id).map_or_else(
        || failure("CART_NOT_FOUND", "no such cart"),
        |cart| success(shop.summary_json(cart)),
    )
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddItemBody {
    cart_id: i64,
    product_id: i64,
}

async fn add_item(
    State(state): State<AppState>,
    Json(body): Json<AddItemBody>,
) -> Json<Value> {
    let mut shop = state.shop();
    if shop.product(body.product_id).is_none() {
        return failure("PRODUCT_NOT_FOUND", "no such product");
    }

    let line_id = shop.next_line_id;
    shop.next_line_id += 1;

    let Some(cart) = shop.carts.get_mut(&body.cart_id) else {
        return failure("CART_NOT_FOUND", "no such cart");
    };
    if let Some(line) = cart.lines.iter_mut().find(|l| l.product_id == body.product_id) {
        line.quantity += 1;
    } else {
        cart.lines.push(SeedLine {
            line_id,
            product_id: body.product_id,
            quantity: 1,
        });
    }
    success_ack()
}

async fn remove_item(
    State(state): State<AppState>,
    Path((cart_id, product_id)): Path<(i64, i64)>,
) -> Json<Value> {
    let mut shop = state.shop();
    let Some(cart) = shop.carts.get_mut(&cart_id) else {
        return failure("CART_NOT_FOUND", "no such cart");
    };
    let before = cart.lines.len();
    cart.lines.retain(|l| l.product_id != product_id);
    if cart.lines.len() == before {
        return failure("ITEM_NOT_FOUND", "product not in cart");
    }
    success_ack()
}

async fn increase_quantity(
    State(state): State<AppState>,
    Path((cart_id, product_id)): Path<(i64, i64)>,
) -> Json<Value> {
    let mut shop = state.shop();
    let Some(cart) = shop.carts.get_mut(&cart_id) else {
        return failure("CART_NOT_FOUND", "no such cart");
    };
    let Some(line) = cart.lines.iter_mut().find(|l| l.product_id == product_id) else {
        return failure("ITEM_NOT_FOUND", "product not in cart");
    };
    line.quantity += 1;
    success_ack()
}

async fn decrease_quantity(
    State(state): State<AppState>,
    Path((cart_id, product_id)): Path<(i64, i64)>,
) -> Json<Value> {
    let mut shop = state.shop();
    let Some(cart) = shop.carts.get_mut(&cart_id) else {
        return failure("CART_NOT_FOUND", "no such cart");
    };
    let Some(line) = cart.lines.iter_mut().find(|l| l.product_id == product_id) else {
        return failure("ITEM_NOT_FOUND", "product not in cart");
    };
    // The server owns floor semantics: decreasing below one drops the line.
    if line.quantity <= 1 {
        cart.lines.retain(|l| l.product_id != product_id);
    } else {
        line.quantity -= 1;
    }
    success_ack()
}

#[derive(serde::Deserialize)]
struct EmailBody {
    email: String,
}

async fn set_email(
    State(state): State<AppState>,
    Path(cart_id): Path<i64>,
    Json(body): Json<EmailBody>,
) -> Json<Value> {
    let mut shop = state.shop();
    let Some(cart) = shop.carts.get_mut(&cart_id) else {
        return failure("CART_NOT_FOUND", "no such cart");
    };
    cart.email = Some(body.email);
    success_ack()
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderDateBody {
    order_date: String,
}

async fn set_order_date(
    State(state): State<AppState>,
    Path(cart_id): Path<i64>,
    Json(body): Json<OrderDateBody>,
) -> Json<Value> {
    let mut shop = state.shop();
    let Some(cart) = shop.carts.get_mut(&cart_id) else {
        return failure("CART_NOT_FOUND", "no such cart");
    };
    cart.order_date = Some(body.order_date);
    success_ack()
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerBody {
    email: String,
    address: String,
    zip_code: String,
}

async fn set_customer(
    State(state): State<AppState>,
    Path(cart_id): Path<i64>,
    Json(body): Json<CustomerBody>,
) -> Json<Value> {
    let mut shop = state.shop();
    let Some(cart) = shop.carts.get_mut(&cart_id) else {
        return failure("CART_NOT_FOUND", "no such cart");
    };
    cart.customer = Some(CustomerRecord {
        email: body.email,
        address: body.address,
        zip_code: body.zip_code,
    });
    success_ack()
}

#[derive(serde::Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn admin_login(Json(body): Json<LoginBody>) -> Json<Value> {
    if body.email == ADMIN_EMAIL && body.password == ADMIN_PASSWORD {
        success_ack()
    } else {
        failure("LOGIN_FAILED", "bad credentials")
    }
}

async fn admin_orders(State(state): State<AppState>) -> Json<Value> {
    let shop = state.shop();
    let mut rows = Vec::new();
    for (cart_id, cart) in &shop.carts {
        let Some(customer) = &cart.customer else {
            continue;
        };
        let summary = shop.summary_json(cart);
        rows.push(json!({
            "cartId": cart_id,
            "email": customer.email,
            "address": customer.address,
            "zipCode": customer.zip_code,
            "orderDate": cart.order_date,
            "lines": summary["lines"],
        }));
    }
    success(Value::Array(rows))
}

async fn admin_daily_batch(State(state): State<AppState>) -> Json<Value> {
    let shop = state.shop();
    let mut totals: HashMap<i64, u32> = HashMap::new();
    for cart in shop.carts.values() {
        if cart.customer.is_none() {
            continue;
        }
        for line in &cart.lines {
            *totals.entry(line.product_id).or_default() += line.quantity;
        }
    }

    let mut rows: Vec<Value> = Vec::new();
    for (product_id, quantity) in totals {
        let Some(product) = shop.product(product_id) else {
            continue;
        };
        rows.push(json!({
            "productId": product_id,
            "name": product.name,
            "quantity": quantity,
        }));
    }
    success(Value::Array(rows))
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/carts", post(create_cart))
        .route("/products", get(products))
        .route("/coffee/{id}", get(product_detail))
        .route("/carts/{id}/summary", get(cart_summary))
        .route("/carts/items", post(add_item))
        .route("/carts/{id}/items/{product_id}", delete(remove_item))
        .route(
            "/carts/{id}/items/{product_id}/increase",
            post(increase_quantity),
        )
        .route(
            "/carts/{id}/items/{product_id}/decrease",
            post(decrease_quantity),
        )
        .route("/carts/{id}/email", post(set_email))
        .route("/carts/{id}/date", post(set_order_date))
        .route("/carts/{id}/customer", post(set_customer))
        .route("/admin/login", post(admin_login))
        .route("/admin/orders", get(admin_orders))
        .route("/admin/orders/dailyBatch", get(admin_daily_batch))
        .with_state(state)
}

// =============================================================================
// TestBackend
// =============================================================================

/// A running fake backend bound to an ephemeral local port.
pub struct TestBackend {
    pub base_url: String,
    state: Arc<Mutex<ShopState>>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestBackend {
    /// Bind the fake backend and start serving it.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound; tests cannot proceed without
    /// one.
    pub async fn spawn() -> Self {
        let state = Arc::new(Mutex::new(ShopState::seeded()));
        let app = router(AppState(Arc::clone(&state)));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral test port");
        let addr = listener.local_addr().expect("listener local addr");

        let handle = tokio::spawn(async move {
            // The listener lives until the TestBackend aborts this task.
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            handle,
        }
    }

    /// A real REST client pointed at this backend.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be constructed.
    #[must_use]
    pub fn client(&self) -> ApiClient {
        ApiClient::with_base_url(&self.base_url, Duration::from_secs(5))
            .expect("build test api client")
    }

    /// Inspect the server-side state.
    pub fn shop(&self) -> MutexGuard<'_, ShopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TestBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
