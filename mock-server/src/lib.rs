use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_SECRET_KEY: &str = "sk_test_mock";
pub const DEFAULT_LIST_LIMIT: usize = 10;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Charge {
    pub id: String,
    pub object: String,
    pub livemode: bool,
    pub created: i64,
    pub paid: bool,
    pub captured: bool,
    pub amount: u64,
    pub currency: String,
    pub refunded: bool,
    pub amount_refunded: u64,
    pub refunds: Vec<Refund>,
    pub source: String,
    pub products: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Refund {
    pub object: String,
    pub created: i64,
    pub amount: u64,
    pub currency: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    pub object: String,
    pub livemode: bool,
    pub created: i64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub card: Card,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Card {
    pub object: String,
    pub last4: String,
    pub brand: String,
    pub exp_month: u32,
    pub exp_year: u32,
    pub name: String,
}

#[derive(Default)]
pub struct Store {
    charges: Vec<Charge>,
    tokens: HashMap<String, Token>,
}

/// Method, path and headers of a request as it arrived on the wire.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Lowercase header names in arrival order.
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Clone)]
pub struct AppState {
    secret_key: Arc<str>,
    store: Arc<RwLock<Store>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl AppState {
    pub fn new(secret_key: &str) -> Self {
        Self {
            secret_key: Arc::from(secret_key),
            store: Arc::default(),
            requests: Arc::default(),
        }
    }

    /// Every request received so far, including rejected ones.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, request: &Request) {
        let headers = request
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let recorded = RecordedRequest {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            headers,
        };
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(recorded);
    }
}

/// Error payload in the shape SPIKE returns.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiFailure {
    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_request_error",
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind: "invalid_request_error",
            message: message.into(),
        }
    }

    fn card(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            kind: "card_error",
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = json!({"error": {"type": self.kind, "message": self.message}});
        (self.status, Json(body)).into_response()
    }
}

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

pub fn app(secret_key: &str) -> Router {
    app_with_state(AppState::new(secret_key))
}

/// Build the router around caller-held state, so tests can inspect what
/// the server received.
pub fn app_with_state(state: AppState) -> Router {
    let api = Router::new()
        .route("/charges", get(list_charges).post(create_charge))
        .route("/charges/{id}", get(get_charge))
        .route("/charges/{id}/capture", post(capture_charge))
        .route("/charges/{id}/refund", post(refund_charge))
        .route("/tokens", post(create_token))
        .route("/tokens/{id}", get(get_token))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());
    Router::new()
        .nest("/v1", api)
        .layer(middleware::from_fn_with_state(state, record_request))
}

pub async fn run(listener: TcpListener, secret_key: &str) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::new(secret_key)).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

async fn record_request(State(state): State<AppState>, request: Request, next: Next) -> Response {
    state.record(&request);
    next.run(request).await
}

/// Basic auth with the secret key as username; the password is ignored.
async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
        .and_then(|encoded| STANDARD.decode(encoded).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .and_then(|credentials| {
            credentials
                .split_once(':')
                .map(|(user, _)| user == &*state.secret_key)
        })
        .unwrap_or(false);
    if !authorized {
        tracing::debug!(path = %request.uri().path(), "rejecting request with bad credentials");
        return StatusCode::UNAUTHORIZED.into_response();
    }
    next.run(request).await
}

async fn create_charge(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<(StatusCode, Json<Charge>), ApiFailure> {
    let amount = form
        .get("amount")
        .and_then(|raw| raw.parse::<u64>().ok())
        .filter(|amount| *amount > 0)
        .ok_or_else(|| ApiFailure::invalid_request("Invalid amount"))?;
    let currency = form
        .get("currency")
        .filter(|currency| !currency.is_empty())
        .cloned()
        .ok_or_else(|| ApiFailure::invalid_request("Missing currency"))?;
    let card = form.get("card").cloned().unwrap_or_default();
    if !card.starts_with("tok_") {
        return Err(ApiFailure::invalid_request(format!("No such token: {card}")));
    }
    if card == "tok_declined" {
        return Err(ApiFailure::card(StatusCode::PAYMENT_REQUIRED, "Your card was declined"));
    }
    let capture = match form.get("capture").map(String::as_str) {
        None | Some("true") => true,
        Some("false") => false,
        Some(other) => return Err(ApiFailure::invalid_request(format!("Invalid capture: {other}"))),
    };
    let products = match form.get("products") {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|_| ApiFailure::invalid_request("products must be a JSON array"))?,
        None => json!([]),
    };

    let charge = Charge {
        id: format!("ch_{}", Uuid::new_v4().simple()),
        object: "charge".to_string(),
        livemode: false,
        created: now(),
        paid: true,
        captured: capture,
        amount,
        currency,
        refunded: false,
        amount_refunded: 0,
        refunds: Vec::new(),
        source: card,
        products,
    };
    state.store.write().await.charges.push(charge.clone());
    Ok((StatusCode::CREATED, Json(charge)))
}

async fn list_charges(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Value> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let store = state.store.read().await;
    let data: Vec<&Charge> = store.charges.iter().rev().take(limit).collect();
    Json(json!({
        "object": "list",
        "url": "/v1/charges",
        "has_more": store.charges.len() > data.len(),
        "data": data,
    }))
}

async fn get_charge(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Charge>, ApiFailure> {
    let store = state.store.read().await;
    store
        .charges
        .iter()
        .find(|charge| charge.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found(format!("No such charge: {id}")))
}

async fn capture_charge(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Charge>, ApiFailure> {
    let mut store = state.store.write().await;
    let charge = find_charge_mut(&mut store, &id)?;
    if charge.captured {
        return Err(ApiFailure::invalid_request(format!("Charge {id} has already been captured")));
    }
    charge.captured = true;
    Ok(Json(charge.clone()))
}

async fn refund_charge(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Charge>, ApiFailure> {
    let mut store = state.store.write().await;
    let charge = find_charge_mut(&mut store, &id)?;
    if charge.refunded {
        return Err(ApiFailure::invalid_request(format!("Charge {id} has already been refunded")));
    }
    charge.refunds.push(Refund {
        object: "refund".to_string(),
        created: now(),
        amount: charge.amount,
        currency: charge.currency.clone(),
    });
    charge.refunded = true;
    charge.amount_refunded = charge.amount;
    Ok(Json(charge.clone()))
}

async fn create_token(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<(StatusCode, Json<Token>), ApiFailure> {
    let number = form.get("card[number]").cloned().unwrap_or_default();
    if !(12..=19).contains(&number.len()) || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiFailure::card(StatusCode::BAD_REQUEST, "Invalid card number"));
    }
    let exp_month = form
        .get("card[exp_month]")
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|month| (1..=12).contains(month))
        .ok_or_else(|| ApiFailure::card(StatusCode::BAD_REQUEST, "Invalid expiry month"))?;
    let exp_year = form
        .get("card[exp_year]")
        .and_then(|raw| raw.parse::<u32>().ok())
        .ok_or_else(|| ApiFailure::card(StatusCode::BAD_REQUEST, "Invalid expiry year"))?;
    let cvc = form.get("card[cvc]").cloned().unwrap_or_default();
    if !(3..=4).contains(&cvc.len()) {
        return Err(ApiFailure::card(StatusCode::BAD_REQUEST, "Invalid cvc"));
    }

    let token = Token {
        id: format!("tok_{}", Uuid::new_v4().simple()),
        object: "token".to_string(),
        livemode: false,
        created: now(),
        currency: form.get("currency").cloned().unwrap_or_else(|| "JPY".to_string()),
        email: form.get("email").cloned(),
        card: Card {
            object: "card".to_string(),
            last4: number[number.len() - 4..].to_string(),
            brand: card_brand(&number).to_string(),
            exp_month,
            exp_year,
            name: form.get("card[name]").cloned().unwrap_or_default(),
        },
    };
    state
        .store
        .write()
        .await
        .tokens
        .insert(token.id.clone(), token.clone());
    Ok((StatusCode::CREATED, Json(token)))
}

async fn get_token(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Token>, ApiFailure> {
    let store = state.store.read().await;
    store
        .tokens
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found(format!("No such token: {id}")))
}

fn find_charge_mut<'a>(store: &'a mut Store, id: &str) -> Result<&'a mut Charge, ApiFailure> {
    store
        .charges
        .iter_mut()
        .find(|charge| charge.id == id)
        .ok_or_else(|| ApiFailure::not_found(format!("No such charge: {id}")))
}

fn card_brand(number: &str) -> &'static str {
    match number.as_bytes() {
        [b'4', ..] => "Visa",
        [b'5', ..] => "MasterCard",
        [b'3', b'5', ..] => "JCB",
        [b'3', b'4' | b'7', ..] => "American Express",
        _ => "Unknown",
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}
