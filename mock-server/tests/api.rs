use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, app_with_state, AppState, Charge, Token, DEFAULT_SECRET_KEY};
use serde_json::Value;
use tower::ServiceExt;

// base64("sk_test_mock:")
const AUTH: &str = "Basic c2tfdGVzdF9tb2NrOg==";

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header(http::header::AUTHORIZATION, AUTH)
        .body(String::new())
        .unwrap()
}

fn post(uri: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::AUTHORIZATION, AUTH)
        .body(String::new())
        .unwrap()
}

fn form_post(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::AUTHORIZATION, AUTH)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body.to_string())
        .unwrap()
}

async fn create_charge(app: &Router, amount: u64) -> Charge {
    let resp = app
        .clone()
        .oneshot(form_post(
            "/v1/charges",
            &format!("amount={amount}&currency=JPY&card=tok_x&capture=true&products=%5B%5D"),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

// --- auth ---

#[tokio::test]
async fn missing_credentials_return_401_with_empty_body() {
    let resp = app(DEFAULT_SECRET_KEY)
        .oneshot(Request::builder().uri("/v1/charges").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn wrong_secret_key_returns_401() {
    let resp = app("sk_test_other").oneshot(get("/v1/charges")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- request log ---

#[tokio::test]
async fn requests_are_recorded_with_headers() {
    let state = AppState::new(DEFAULT_SECRET_KEY);
    let app = app_with_state(state.clone());

    let request = Request::builder()
        .uri("/v1/charges/ch_missing")
        .header(http::header::AUTHORIZATION, AUTH)
        .header(http::header::USER_AGENT, "spike-api-rs/0.1.0")
        .body(String::new())
        .unwrap();
    app.clone().oneshot(request).await.unwrap();
    // rejected requests are recorded too
    app.oneshot(Request::builder().uri("/v1/tokens/tok_1").body(String::new()).unwrap())
        .await
        .unwrap();

    let seen = state.requests();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].method, "GET");
    assert_eq!(seen[0].path, "/v1/charges/ch_missing");
    assert_eq!(seen[0].header("User-Agent"), Some("spike-api-rs/0.1.0"));
    assert_eq!(seen[0].header("authorization"), Some(AUTH));
    assert_eq!(seen[1].path, "/v1/tokens/tok_1");
    assert!(seen[1].header("authorization").is_none());
}

// --- charges ---

#[tokio::test]
async fn create_charge_returns_201() {
    let app = app(DEFAULT_SECRET_KEY);
    let charge = create_charge(&app, 1080).await;

    assert!(charge.id.starts_with("ch_"));
    assert_eq!(charge.amount, 1080);
    assert_eq!(charge.currency, "JPY");
    assert!(charge.captured);
    assert!(!charge.refunded);
}

#[tokio::test]
async fn create_charge_with_unknown_card_returns_error_payload() {
    let resp = app(DEFAULT_SECRET_KEY)
        .oneshot(form_post("/v1/charges", "amount=1080&currency=JPY&card=card_x"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn declined_card_returns_402() {
    let resp = app(DEFAULT_SECRET_KEY)
        .oneshot(form_post("/v1/charges", "amount=1080&currency=JPY&card=tok_declined"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"]["type"], "card_error");
}

#[tokio::test]
async fn get_charge_not_found() {
    let resp = app(DEFAULT_SECRET_KEY).oneshot(get("/v1/charges/ch_missing")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_charges_defaults_to_ten_newest() {
    let app = app(DEFAULT_SECRET_KEY);
    for amount in 1..=12 {
        create_charge(&app, amount).await;
    }

    let resp = app.clone().oneshot(get("/v1/charges")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let page: Value = body_json(resp).await;
    let data = page["data"].as_array().unwrap();
    assert_eq!(data.len(), 10);
    assert_eq!(data[0]["amount"], 12);
    assert_eq!(page["has_more"], true);

    let resp = app.oneshot(get("/v1/charges?limit=3")).await.unwrap();
    let page: Value = body_json(resp).await;
    assert_eq!(page["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn capture_only_once() {
    let app = app(DEFAULT_SECRET_KEY);
    let resp = app
        .clone()
        .oneshot(form_post("/v1/charges", "amount=500&currency=JPY&card=tok_x&capture=false"))
        .await
        .unwrap();
    let charge: Charge = body_json(resp).await;
    assert!(!charge.captured);

    let uri = format!("/v1/charges/{}/capture", charge.id);
    let resp = app.clone().oneshot(post(&uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let captured: Charge = body_json(resp).await;
    assert!(captured.captured);

    let resp = app.oneshot(post(&uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn refund_records_full_amount() {
    let app = app(DEFAULT_SECRET_KEY);
    let charge = create_charge(&app, 1080).await;

    let uri = format!("/v1/charges/{}/refund", charge.id);
    let resp = app.clone().oneshot(post(&uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let refunded: Charge = body_json(resp).await;
    assert!(refunded.refunded);
    assert_eq!(refunded.amount_refunded, 1080);
    assert_eq!(refunded.refunds[0].amount, 1080);

    let resp = app.oneshot(post(&uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- tokens ---

#[tokio::test]
async fn token_lifecycle() {
    let app = app(DEFAULT_SECRET_KEY);
    let resp = app
        .clone()
        .oneshot(form_post(
            "/v1/tokens",
            "card%5Bnumber%5D=4444333322221111&card%5Bexp_month%5D=1&card%5Bexp_year%5D=2030\
             &card%5Bcvc%5D=012&card%5Bname%5D=Taro&currency=JPY&email=taro%40example.com",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let token: Token = body_json(resp).await;
    assert!(token.id.starts_with("tok_"));
    assert_eq!(token.card.last4, "1111");
    assert_eq!(token.card.brand, "Visa");
    assert_eq!(token.email.as_deref(), Some("taro@example.com"));

    let resp = app.oneshot(get(&format!("/v1/tokens/{}", token.id))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Token = body_json(resp).await;
    assert_eq!(fetched.id, token.id);
}

#[tokio::test]
async fn token_with_bad_number_is_card_error() {
    let resp = app(DEFAULT_SECRET_KEY)
        .oneshot(form_post(
            "/v1/tokens",
            "card%5Bnumber%5D=12&card%5Bexp_month%5D=1&card%5Bexp_year%5D=2030&card%5Bcvc%5D=123",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"]["type"], "card_error");
}
