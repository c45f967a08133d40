use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use base64::Engine as _;
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::Engine;
use server::{ServerState, router};

async fn insert_user(db: &DatabaseConnection, username: &str, role: &str, shop_id: Option<&str>) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, password, role, shop_id) VALUES (?, ?, ?, ?)",
        vec![
            username.into(),
            "secret".into(),
            role.into(),
            shop_id.map(str::to_string).into(),
        ],
    ))
    .await
    .unwrap();
}

async fn app() -> (Router, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    insert_user(&db, "alice", "admin", None).await;
    insert_user(&db, "bob", "admin", None).await;

    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    let state = ServerState {
        engine: Arc::new(engine),
        db: db.clone(),
    };
    (router(state), db)
}

fn basic(username: &str, password: &str) -> String {
    let token = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {token}")
}

async fn call(
    app: &Router,
    user: &str,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic(user, "secret"));
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Shop `MAIN` owned by alice, with a default cash (1000.00) and customer
/// account. Returns `(shop_id, cash_id, customer_id)`.
async fn shop(app: &Router) -> (String, String, String) {
    let (status, shop) = call(
        app,
        "alice",
        Method::POST,
        "/shops",
        Some(json!({"name": "Main street", "code": "MAIN"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let shop_id = shop["id"].as_str().unwrap().to_string();

    let (status, cash) = call(
        app,
        "alice",
        Method::POST,
        &format!("/shops/{shop_id}/accounts"),
        Some(json!({"category": "cash", "name": "Drawer", "opening_balance": "1000"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(cash["is_default"], true);

    let (_, customer) = call(
        app,
        "alice",
        Method::POST,
        &format!("/shops/{shop_id}/accounts"),
        Some(json!({"category": "customer", "name": "Walk-in"})),
    )
    .await;

    (
        shop_id,
        cash["id"].as_str().unwrap().to_string(),
        customer["id"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let (app, _db) = app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/shops")
                .header(header::AUTHORIZATION, basic("alice", "nope"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sale_moves_both_balances() {
    let (app, _db) = app().await;
    let (shop_id, cash, customer) = shop(&app).await;

    let (status, tx) = call(
        &app,
        "alice",
        Method::POST,
        &format!("/shops/{shop_id}/transactions"),
        Some(json!({
            "kind": "sale",
            "amount": "150.00",
            "debit": {"default": "cash"},
            "credit": {"id": customer},
            "description": "two crates",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tx["amount_minor"], 15_000);
    assert_eq!(tx["debit_account_id"], cash.as_str());

    let (_, cash_view) = call(&app, "alice", Method::GET, &format!("/accounts/{cash}"), None).await;
    assert_eq!(cash_view["current_balance_minor"], 115_000);
    let (_, customer_view) =
        call(&app, "alice", Method::GET, &format!("/accounts/{customer}"), None).await;
    assert_eq!(customer_view["current_balance_minor"], -15_000);

    let (status, dashboard) = call(
        &app,
        "alice",
        Method::GET,
        &format!("/shops/{shop_id}/dashboard"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["cash_balance_minor"], 115_000);
    assert_eq!(dashboard["today_stats"]["sales_minor"], 15_000);
    assert_eq!(dashboard["pending_sync_count"], 0);
}

#[tokio::test]
async fn engine_errors_carry_a_code() {
    let (app, _db) = app().await;
    let (shop_id, cash, _) = shop(&app).await;

    let (status, body) = call(
        &app,
        "alice",
        Method::POST,
        &format!("/shops/{shop_id}/transactions"),
        Some(json!({
            "kind": "transfer",
            "amount": "10",
            "debit": {"id": cash},
            "credit": {"id": cash},
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "SAME_ACCOUNT");

    let (status, body) = call(
        &app,
        "alice",
        Method::POST,
        &format!("/shops/{shop_id}/transactions"),
        Some(json!({
            "kind": "sale",
            "amount": "1.005",
            "debit": {"default": "cash"},
            "credit": {"default": "customer"},
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INVALID_AMOUNT");

    let (status, body) = call(
        &app,
        "alice",
        Method::POST,
        &format!("/accounts/{cash}/deactivate"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NON_ZERO_BALANCE");
}

#[tokio::test]
async fn foreign_shop_is_not_found() {
    let (app, _db) = app().await;
    let (shop_id, cash, _) = shop(&app).await;

    let (status, body) = call(
        &app,
        "bob",
        Method::GET,
        &format!("/shops/{shop_id}/dashboard"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "DENIED");

    let (status, foreign) = call(&app, "bob", Method::GET, &format!("/accounts/{cash}"), None).await;
    let (_, missing) = call(
        &app,
        "bob",
        Method::GET,
        &format!("/accounts/{}", uuid::Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(foreign, missing);
}

#[tokio::test]
async fn staff_works_in_the_assigned_shop() {
    let (app, db) = app().await;
    let (shop_id, _, _) = shop(&app).await;
    insert_user(&db, "carol", "staff", Some(&shop_id)).await;

    let (status, shops) = call(&app, "carol", Method::GET, "/shops", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shops["shops"].as_array().unwrap().len(), 1);

    let (status, _) = call(
        &app,
        "carol",
        Method::POST,
        &format!("/shops/{shop_id}/transactions"),
        Some(json!({
            "kind": "sale",
            "amount": "5",
            "debit": {"default": "cash"},
            "credit": {"default": "customer"},
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        &app,
        "carol",
        Method::POST,
        "/shops",
        Some(json!({"name": "Kiosk", "code": "KIOSK"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "DENIED");
}

#[tokio::test]
async fn adjustment_history_and_reversal() {
    let (app, _db) = app().await;
    let (shop_id, cash, _) = shop(&app).await;

    let (status, entry) = call(
        &app,
        "alice",
        Method::POST,
        &format!("/accounts/{cash}/adjust"),
        Some(json!({"new_balance": "1200", "change_reason": "counted drawer"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["previous_balance_minor"], 100_000);
    assert_eq!(entry["change_amount_minor"], 20_000);

    let (status, history) = call(
        &app,
        "alice",
        Method::GET,
        &format!("/accounts/{cash}/history?limit=10"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["entries"].as_array().unwrap().len(), 1);
    assert_eq!(history["next_cursor"], Value::Null);

    let (_, sale) = call(
        &app,
        "alice",
        Method::POST,
        &format!("/shops/{shop_id}/transactions"),
        Some(json!({
            "kind": "sale",
            "amount": "20",
            "debit": {"default": "cash"},
            "credit": {"default": "customer"},
        })),
    )
    .await;
    let sale_id = sale["id"].as_str().unwrap();

    let (status, reversal) = call(
        &app,
        "alice",
        Method::POST,
        &format!("/transactions/{sale_id}/reverse"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reversal["reversal_of"], sale_id);

    let (status, body) = call(
        &app,
        "alice",
        Method::POST,
        &format!("/transactions/{sale_id}/reverse"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_REVERSED");

    let (_, audit) = call(
        &app,
        "alice",
        Method::GET,
        &format!("/shops/{shop_id}/audit"),
        None,
    )
    .await;
    for account in audit["accounts"].as_array().unwrap() {
        assert_eq!(account["drift_minor"], 0);
    }
}
