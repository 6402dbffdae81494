mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use tower::ServiceExt;

use ferremas_api::{dto::auth::Claims, models::Role, routes::create_api_router, state::AppState};

use common::{
    ADMIN, CLIENT, CLIENT_PASSWORD, JWT_SECRET, MANTENEDOR, bearer, test_state,
};

fn app(state: AppState) -> Router {
    create_api_router().with_state(state)
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, auth: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, auth)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn new_product(code: &str) -> Value {
    serde_json::json!({
        "name": "Taladro Inalámbrico",
        "price": "59990",
        "code": code,
        "stock": 10
    })
}

#[tokio::test]
async fn client_token_on_mantenedor_endpoint_is_forbidden() {
    let state = test_state();
    let auth = bearer(&state, CLIENT);

    let response = app(state)
        .oneshot(post_json("/products", &auth, new_product("TAL100")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["data"]["kind"], "forbidden");
}

fn client_token_expiring_at(offset_secs: i64) -> String {
    let claims = Claims {
        sub: CLIENT.to_string(),
        role: Role::Client,
        exp: (chrono::Utc::now().timestamp() + offset_secs) as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {token}")
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let state = test_state();

    let response = app(state)
        .oneshot(get("/orders", Some(&client_token_expiring_at(-3600))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_expired_seconds_ago_is_unauthorized() {
    let state = test_state();

    let response = app(state.clone())
        .oneshot(get("/orders", Some(&client_token_expiring_at(-30))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app(state)
        .oneshot(get("/orders", Some(&client_token_expiring_at(300))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_or_foreign_token_is_unauthorized() {
    let state = test_state();

    let response = app(state.clone()).oneshot(get("/auth/me", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let claims = Claims {
        sub: CLIENT.to_string(),
        role: Role::Client,
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    let forged = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"some-other-secret"),
    )
    .unwrap();
    let response = app(state)
        .oneshot(get("/auth/me", Some(&format!("Bearer {forged}"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn form_login_issues_a_usable_token() {
    let state = test_state();

    let login = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "username={CLIENT}&password={CLIENT_PASSWORD}"
        )))
        .unwrap();
    let response = app(state.clone()).oneshot(login).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["token_type"], "bearer");
    let token = body["access_token"].as_str().unwrap().to_string();

    let response = app(state)
        .oneshot(get("/auth/me", Some(&format!("Bearer {token}"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["username"], CLIENT);
    assert_eq!(body["data"]["role"], "client");
}

#[tokio::test]
async fn login_reports_which_credential_is_wrong() {
    let state = test_state();

    for (form, expected) in [
        ("username=nadie&password=x", "Incorrect username"),
        (
            "username=ignacio_tapia&password=wrong",
            "Incorrect password",
        ),
    ] {
        let request = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap();
        let response = app(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["message"], expected);
    }
}

#[tokio::test]
async fn duplicate_product_code_conflicts_and_leaves_catalog_unchanged() {
    let state = test_state();
    let auth = bearer(&state, MANTENEDOR);

    let response = app(state.clone())
        .oneshot(post_json("/products", &auth, new_product("TAL045")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["data"]["kind"], "conflict");

    let response = app(state.clone()).oneshot(get("/products", None)).await.unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 4);

    let response = app(state.clone())
        .oneshot(post_json("/products", &auth, new_product("TAL100")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["data"]["id"], 5);
}

#[tokio::test]
async fn client_places_order_over_http() {
    let state = test_state();
    let auth = bearer(&state, CLIENT);

    let response = app(state.clone())
        .oneshot(post_json(
            "/orders",
            &auth,
            serde_json::json!({ "items": [{ "product_id": 2, "quantity": 1 }] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["total_amount"], "45200");

    let response = app(state)
        .oneshot(post_json(
            "/orders",
            &auth,
            serde_json::json!({ "items": [{ "product_id": 2, "quantity": 100 }] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["data"]["kind"], "insufficient_stock");
}

#[tokio::test]
async fn low_stock_report_is_staff_only() {
    let state = test_state();

    let response = app(state.clone())
        .oneshot(get(
            "/admin/inventory/low-stock?threshold=60",
            Some(&bearer(&state, ADMIN)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let codes: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, ["TAL045", "LIJ020"]);

    let response = app(state.clone())
        .oneshot(get(
            "/admin/inventory/low-stock",
            Some(&bearer(&state, CLIENT)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
