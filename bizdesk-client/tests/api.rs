//! Client behaviour against a mock API server

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use bizdesk_client::{BooksClient, ClientError, TokenPair};
use bizdesk_core::domain::books::{BillStatus, ItemDraft, TransactionKind};
use chrono::NaiveDate;
use serde_json::{Value, json};

#[derive(Default)]
struct MockState {
    base_url: String,
    valid_access: String,
    refresh_ok: bool,
    refresh_outage: bool,
    refresh_calls: usize,
    item_posts: usize,
    transaction_queries: Vec<Option<String>>,
}

type Shared = Arc<Mutex<MockState>>;

fn authorized(state: &Shared, headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {}", state.lock().unwrap().valid_access);
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected)
}

async fn token(Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
    if body["password"] == "secret" {
        Ok(Json(json!({ "access": "a1", "refresh": "r1" })))
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

async fn refresh(
    State(state): State<Shared>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let mut s = state.lock().unwrap();
    s.refresh_calls += 1;
    if s.refresh_outage {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    if !s.refresh_ok || body["refresh"] != "r1" {
        return Err(StatusCode::UNAUTHORIZED);
    }
    s.valid_access = format!("a{}", s.refresh_calls + 1);
    Ok(Json(json!({ "access": s.valid_access })))
}

async fn vendors(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&state, &headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let base = state.lock().unwrap().base_url.clone();
    let page = match query.get("page").map(String::as_str) {
        Some("2") => json!({
            "count": 3,
            "next": null,
            "previous": format!("{}/api/vendors/", base),
            "results": [{ "id": 3, "name": "Cobalt Traders" }]
        }),
        _ => json!({
            "count": 3,
            "next": format!("{}/api/vendors/?page=2", base),
            "previous": null,
            "results": [
                { "id": 1, "name": "Acme Supply", "email": "ap@acme.test" },
                { "id": 2, "name": "Bolt Works" }
            ]
        }),
    };
    Ok(Json(page))
}

async fn bills(State(state): State<Shared>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    if !authorized(&state, &headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({
        "next": null,
        "previous": null,
        "results": [
            {
                "id": 10,
                "bill_number": "B-10",
                "vendor": { "id": 1, "name": "Acme Supply" },
                "bill_date": "2026-03-01",
                "due_date": "2026-03-31",
                "total": "1,250.50",
                "status": "paid"
            },
            {
                "id": 11,
                "billNumber": "B-11",
                "vendorId": 2,
                "dueDate": "2026-04-15",
                "amount": 99
            }
        ]
    })))
}

async fn create_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&state, &headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    state.lock().unwrap().item_posts += 1;
    Ok(Json(json!({ "id": 7, "name": body["name"], "price": body["price"] })))
}

async fn transactions(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&state, &headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    state
        .lock()
        .unwrap()
        .transaction_queries
        .push(query.get("account").cloned());
    Ok(Json(json!({
        "next": null,
        "previous": null,
        "results": [
            { "id": 1, "account": 4, "date": "2026-02-01", "memo": "Fee", "withdrawal": "15.00" },
            { "id": 2, "accountId": 4, "transactionDate": "2026-02-02", "amount": 300, "type": "deposit" }
        ]
    })))
}

async fn spawn_server(refresh_ok: bool) -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(MockState {
        valid_access: "a1".to_string(),
        refresh_ok,
        ..Default::default()
    }));

    let app = Router::new()
        .route("/api/token/", post(token))
        .route("/api/token/refresh/", post(refresh))
        .route("/api/vendors/", get(vendors))
        .route("/api/bills/", get(bills))
        .route("/api/items/", post(create_item))
        .route("/api/bank-transactions/", get(transactions))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    state.lock().unwrap().base_url = base_url.clone();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (base_url, state)
}

fn stale_tokens() -> TokenPair {
    TokenPair {
        access: "expired".to_string(),
        refresh: "r1".to_string(),
    }
}

#[tokio::test]
async fn login_stores_tokens() {
    let (url, _) = spawn_server(true).await;
    let client = BooksClient::new(url);

    let tokens = client.login("sam", "secret").await.unwrap();

    assert_eq!(tokens.access, "a1");
    assert_eq!(client.tokens().await, Some(tokens));
}

#[tokio::test]
async fn login_with_bad_password_is_unauthorized() {
    let (url, _) = spawn_server(true).await;
    let client = BooksClient::new(url);

    let err = client.login("sam", "wrong").await.unwrap_err();

    assert!(matches!(err, ClientError::Unauthorized(_)));
    assert_eq!(client.tokens().await, None);
}

#[tokio::test]
async fn list_follows_next_links() {
    let (url, _) = spawn_server(true).await;
    let client = BooksClient::new(url);
    client.login("sam", "secret").await.unwrap();

    let vendors = client.list_vendors().await.unwrap();

    let names: Vec<_> = vendors.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["Acme Supply", "Bolt Works", "Cobalt Traders"]);
}

#[tokio::test]
async fn expired_token_is_refreshed_once_and_retried() {
    let (url, state) = spawn_server(true).await;
    let client = BooksClient::new(url).with_tokens(stale_tokens());

    let vendors = client.list_vendors().await.unwrap();

    assert_eq!(vendors.len(), 3);
    assert_eq!(state.lock().unwrap().refresh_calls, 1);
    let tokens = client.tokens().await.unwrap();
    assert_eq!(tokens.access, "a2");
    assert_eq!(tokens.refresh, "r1");
}

#[tokio::test]
async fn rejected_refresh_invalidates_session() {
    let (url, state) = spawn_server(false).await;
    let client = BooksClient::new(url).with_tokens(stale_tokens());

    let err = client.list_vendors().await.unwrap_err();

    assert!(matches!(err, ClientError::SessionInvalid(_)));
    assert!(err.is_auth_failure());
    assert_eq!(client.tokens().await, None);
    assert_eq!(state.lock().unwrap().refresh_calls, 1);
}

#[tokio::test]
async fn failed_refresh_invalidates_session() {
    let (url, state) = spawn_server(true).await;
    state.lock().unwrap().refresh_outage = true;
    let client = BooksClient::new(url).with_tokens(stale_tokens());

    let err = client.refresh().await.unwrap_err();

    assert!(matches!(err, ClientError::SessionInvalid(_)));
    assert_eq!(client.tokens().await, None);

    let client = BooksClient::new(state.lock().unwrap().base_url.clone())
        .with_tokens(stale_tokens());
    let err = client.list_vendors().await.unwrap_err();

    assert!(matches!(err, ClientError::SessionInvalid(_)));
    assert_eq!(client.tokens().await, None);
    assert_eq!(state.lock().unwrap().refresh_calls, 2);
}

#[tokio::test]
async fn bills_are_normalized() {
    let (url, _) = spawn_server(true).await;
    let client = BooksClient::new(url);
    client.login("sam", "secret").await.unwrap();

    let bills = client.list_bills().await.unwrap();

    assert_eq!(bills.len(), 2);
    assert_eq!(bills[0].bill_number, "B-10");
    assert_eq!(bills[0].vendor_name.as_deref(), Some("Acme Supply"));
    assert_eq!(bills[0].total, 1250.5);
    assert_eq!(bills[0].status, BillStatus::Paid);
    assert_eq!(bills[1].bill_number, "B-11");
    assert_eq!(bills[1].vendor_id, Some(2));
    assert_eq!(bills[1].due_date, NaiveDate::from_ymd_opt(2026, 4, 15));
    assert_eq!(bills[1].status, BillStatus::Open);
}

#[tokio::test]
async fn transactions_are_filtered_and_normalized() {
    let (url, state) = spawn_server(true).await;
    let client = BooksClient::new(url);
    client.login("sam", "secret").await.unwrap();

    let txns = client.list_transactions(Some(4)).await.unwrap();

    assert_eq!(
        state.lock().unwrap().transaction_queries,
        vec![Some("4".to_string())]
    );
    assert_eq!(txns[0].kind, TransactionKind::Withdrawal);
    assert_eq!(txns[0].amount, 15.0);
    assert_eq!(txns[0].description, "Fee");
    assert_eq!(txns[1].kind, TransactionKind::Deposit);
    assert_eq!(txns[1].account_id, Some(4));
}

#[tokio::test]
async fn invalid_item_is_never_sent() {
    let (url, state) = spawn_server(true).await;
    let client = BooksClient::new(url);
    client.login("sam", "secret").await.unwrap();

    let draft = ItemDraft {
        name: "Steel plate".to_string(),
        price: Some(120.0),
        currency: Some("USD".to_string()),
        ..Default::default()
    };
    let err = client.create_item(&draft).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(ref v) if v.has_field("sf_number")));
    assert_eq!(state.lock().unwrap().item_posts, 0);

    let draft = ItemDraft {
        currency: Some("NPR".to_string()),
        ..draft
    };
    let item = client.create_item(&draft).await.unwrap();
    assert_eq!(item.id, 7);
    assert_eq!(state.lock().unwrap().item_posts, 1);
}
