mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router as AxumRouter;
use common::*;
use exchange_router::control::Credentials;
use exchange_router::router::api::{create_api_router, ApiState};
use serde_json::{json, Value};
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "ops-token";
const ALICE_TOKEN: &str = "alice-token";
const BOB_TOKEN: &str = "bob-token";

async fn state() -> ApiState {
    let fx = fixture().await;
    let credentials = Credentials::new([
        (ADMIN_TOKEN, ADMIN),
        (ALICE_TOKEN, ALICE),
        (BOB_TOKEN, "bob"),
    ]);
    ApiState::new(fx.router, fx.dir, credentials)
}

async fn app() -> AxumRouter {
    create_api_router(state().await)
}

async fn send(app: &AxumRouter, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn health_and_metrics() {
    let app = app().await;
    let (status, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("router_admin_operations_total"));
}

#[tokio::test]
async fn route_query_uses_labels() {
    let app = app().await;
    let (status, body) = send(&app, get("/api/v1/route?from=SHIB&to=CRV")).await;
    assert_eq!(status, StatusCode::OK);

    let hops = body.as_array().unwrap();
    assert_eq!(hops.len(), 4);
    assert_eq!(hops[0]["venue"], "shib-pool");
    assert_eq!(hops[0]["from"], "SHIB");
    assert_eq!(hops[3]["from"], "WETH");
    assert_eq!(hops[3]["to"], "CRV");

    let (status, body) = send(&app, get("/api/v1/route?from=CVX&to=NOPE")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "resolution");
    assert_eq!(body["error"], "4!path from output asset");
}

#[tokio::test]
async fn exchange_endpoint_settles_and_maps_errors() {
    let app = app().await;

    let (status, body) = send(
        &app,
        post(
            "/api/v1/exchange",
            Some(ALICE_TOKEN),
            json!({"from": "DAI", "to": "DAI", "amount_in": 10, "min_amount_out": 1}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "native_asset");

    let (status, body) = send(
        &app,
        post(
            "/api/v1/exchange",
            Some(ALICE_TOKEN),
            json!({"from": "DAI", "to": "USDT", "amount_in": 100, "min_amount_out": 101}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "slippage");

    let (status, body) = send(
        &app,
        post(
            "/api/v1/exchange",
            Some(ALICE_TOKEN),
            json!({"from": "DAI", "to": "USDT", "amount_in": 100, "min_amount_out": 100}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount_out"], 100);
    assert_eq!(body["steps"][0]["step"], "swap");
    assert_eq!(body["steps"][0]["venue"], "3pool");

    let (_, body) = send(&app, get("/api/v1/balance?account=alice&asset=USDT")).await;
    assert_eq!(body["balance"], 100);
}

#[tokio::test]
async fn admin_routes_require_an_admin_token() {
    let state = state().await;
    let app = create_api_router(state.clone());
    let edge = json!({"edges": [{"protocol": 1, "venue": "new-pool", "from": "FOO", "to": "WETH"}]});

    let (status, body) = send(&app, post("/api/v1/admin/minor-edges", None, edge.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "authorization");

    // an authenticated non-admin is refused before any label is interned
    let (status, body) =
        send(&app, post("/api/v1/admin/minor-edges", Some(ALICE_TOKEN), edge.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "actor alice is not authorized");
    assert!(state.directory.read().await.find_asset("FOO").is_none());

    let (status, body) = send(&app, post("/api/v1/admin/minor-edges", Some(ADMIN_TOKEN), edge)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], 1);

    let (_, body) = send(&app, get("/api/v1/allowance?venue=new-pool&asset=FOO")).await;
    assert_eq!(body["granted"], true);

    let (_, body) = send(&app, get("/api/v1/assets/FOO")).await;
    assert_eq!(body["major"], false);
    assert_eq!(body["minor_edge"]["to"], "WETH");
}

#[tokio::test]
async fn invalid_batches_are_bad_requests() {
    let app = app().await;
    let broken = json!({"routes": [[
        {"protocol": 1, "venue": "renbtc", "from": "WETH", "to": "USDT"},
        {"protocol": 2, "venue": "3pool", "from": "USDC", "to": "DAI"}
    ]]});
    let (status, body) = send(&app, post("/api/v1/admin/major-routes", Some(ADMIN_TOKEN), broken)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "route broken");
}

#[tokio::test]
async fn adapters_register_from_declarations() {
    let app = app().await;
    let body = json!({"protocols": [7], "adapters": [{"kind": "stable_pool", "fee_bps": 0}]});
    let (status, _) = send(&app, post("/api/v1/admin/adapters", Some(ADMIN_TOKEN), body)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get("/api/v1/adapters/7")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "stable_pool");

    let (status, _) = send(&app, get("/api/v1/adapters/8")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn asset_view_reports_native_and_lp() {
    let app = app().await;
    let (_, body) = send(&app, get(&format!("/api/v1/assets/{EEEE}"))).await;
    assert_eq!(body["native"], true);

    let (_, body) = send(&app, get("/api/v1/assets/3CRV")).await;
    assert_eq!(body["lp_entry"]["venue"], "3pool");
    assert_eq!(body["lp_entry"]["underlying"], json!(["DAI", "USDC", "USDT"]));
}

#[tokio::test]
async fn actor_header_is_not_a_credential() {
    let app = app().await;
    let forged = Request::builder()
        .method("POST")
        .uri("/api/v1/admin/minor-edges/delete")
        .header("content-type", "application/json")
        .header("x-actor", ADMIN)
        .body(Body::from(json!({"assets": ["CRV"]}).to_string()))
        .unwrap();
    let (status, body) = send(&app, forged).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "authorization");

    let (status, _) = send(
        &app,
        post("/api/v1/admin/minor-edges/delete", Some("guessed"), json!({"assets": ["CRV"]})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, get("/api/v1/route?from=CRV&to=DAI")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn exchange_debits_only_the_token_holder() {
    let app = app().await;
    let order = json!({"caller": ALICE, "from": "DAI", "to": "USDT", "amount_in": 999_000, "min_amount_out": 1});

    let (status, body) = send(&app, post("/api/v1/exchange", None, order.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "authorization");

    // the body's caller field is ignored; bob holds no DAI
    let (status, body) = send(&app, post("/api/v1/exchange", Some(BOB_TOKEN), order)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "ledger");

    let (_, body) = send(&app, get("/api/v1/balance?account=alice&asset=DAI")).await;
    assert_eq!(body["balance"], 1_000_000);
}

#[tokio::test]
async fn queries_do_not_intern_labels() {
    let state = state().await;
    let app = create_api_router(state.clone());

    let (status, body) = send(&app, get("/api/v1/route?from=junk-1&to=junk-2")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "4!path from input asset");

    let (status, body) = send(&app, get("/api/v1/route?from=WETH&to=junk-3")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "3!path from input asset");

    let (status, body) = send(
        &app,
        post(
            "/api/v1/exchange",
            Some(ALICE_TOKEN),
            json!({"from": "DAI", "to": "junk-4", "amount_in": 10, "min_amount_out": 1}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "3!path from input asset");

    let (_, body) = send(&app, get("/api/v1/balance?account=venue:junk-pool&asset=junk-5")).await;
    assert_eq!(body["balance"], 0);

    let dir = state.directory.read().await;
    for label in ["junk-1", "junk-2", "junk-3", "junk-4", "junk-5"] {
        assert!(dir.find_asset(label).is_none(), "{label} was interned");
    }
    assert!(dir.find_venue("junk-pool").is_none());
}
