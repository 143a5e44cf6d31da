use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde::de::DeserializeOwned;
use tower::ServiceExt;

use points_ledger::http::{HealthCheck, STATUS_IDLE, STATUS_NOT_RUNNING, router};
use points_ledger::{Ledger, LedgerHandle, PayerBalance, Transaction};

fn app() -> (Router, LedgerHandle) {
    let (ledger, _task) = LedgerHandle::spawn(Ledger::new());
    (router(ledger.clone()), ledger)
}

async fn post(app: &Router, uri: &str, body: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn json<T: DeserializeOwned>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap()
}

async fn award(app: &Router, payer: &str, points: i64, timestamp: &str) {
    let body = format!(r#"{{ "payer": "{payer}", "points": {points}, "timestamp": "{timestamp}" }}"#);
    let (status, _) = post(app, "/transaction", &body).await;
    assert_eq!(status, StatusCode::CREATED, "award {payer} {points}");
}

#[tokio::test]
async fn health_check_reports_idle() {
    let (app, _) = app();
    let (status, body) = get(&app, "/health-check").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json::<HealthCheck>(&body), HealthCheck { status: STATUS_IDLE });
}

#[tokio::test]
async fn health_check_reports_stopped_ledger() {
    let (ledger, task) = LedgerHandle::spawn(Ledger::new());
    task.abort();
    let _ = task.await;

    let app = router(ledger);
    let (status, body) = get(&app, "/health-check").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json::<HealthCheck>(&body),
        HealthCheck {
            status: STATUS_NOT_RUNNING
        }
    );

    let (status, _) = get(&app, "/payer-points").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn add_transaction_returns_created_transaction() {
    let (app, _) = app();
    let (status, body) = post(
        &app,
        "/transaction",
        r#"{ "payer": "DANNON", "points": 500, "timestamp": "2020-11-02T14:00:00Z" }"#,
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let tx: Transaction = json(&body);
    assert_eq!(tx.payer(), "DANNON");
    assert_eq!(tx.points(), 500);
    assert!(!tx.is_spend_record());
}

#[tokio::test]
async fn add_transaction_rejects_invalid_input() {
    let (app, ledger) = app();
    let cases = [
        ("missing payer", r#"{ "points": 500, "timestamp": "2020-11-02T14:00:00Z" }"#),
        ("missing points", r#"{ "payer": "PFIZER", "timestamp": "2020-11-02T14:00:00Z" }"#),
        ("missing timestamp", r#"{ "payer": "PFIZER", "points": 500 }"#),
        ("missing all", r#"{  }"#),
        ("payer empty", r#"{ "payer": "", "points": 500, "timestamp": "2020-11-02T14:00:00Z" }"#),
        ("payer int", r#"{ "payer": 10, "points": 500, "timestamp": "2020-11-02T14:00:00Z" }"#),
        ("payer object", r#"{ "payer": {}, "points": 500, "timestamp": "2020-11-02T14:00:00Z" }"#),
        ("payer array", r#"{ "payer": [1,2,3,4], "points": 500, "timestamp": "2020-11-02T14:00:00Z" }"#),
        ("points string", r#"{ "payer": "DANNON", "points": "MANY", "timestamp": "2020-11-02T14:00:00Z" }"#),
        ("points array", r#"{ "payer": "DANNON", "points": [1,2,3,4], "timestamp": "2020-11-02T14:00:00Z" }"#),
        ("points null", r#"{ "payer": "DANNON", "points": null, "timestamp": "2020-11-02T14:00:00Z" }"#),
        ("points object", r#"{ "payer": "DANNON", "points": {}, "timestamp": "2020-11-02T14:00:00Z" }"#),
        ("points zero", r#"{ "payer": "DANNON", "points": 0, "timestamp": "2020-11-02T14:00:00Z" }"#),
        ("timestamp short format", r#"{ "payer": "DANNON", "points": 500, "timestamp": "Mar 14, 2019" }"#),
        ("timestamp human name", r#"{ "payer": "DANNON", "points": 500, "timestamp": "Mark" }"#),
        ("timestamp array", r#"{ "payer": "DANNON", "points": 500, "timestamp": [1,2,3,4] }"#),
        ("timestamp int", r#"{ "payer": "DANNON", "points": 500, "timestamp": 42 }"#),
        ("not json", "payer=DANNON"),
        ("negative balance", r#"{ "payer": "DANNON", "points": -1, "timestamp": "2020-11-02T14:00:00Z" }"#),
    ];

    for (name, body) in cases {
        let (status, body) = post(&app, "/transaction", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{name}");
        let error: serde_json::Value = json(&body);
        assert!(error["errors"].is_string(), "{name}");
    }

    assert!(ledger.transactions().await.unwrap().is_empty());
}

#[tokio::test]
async fn overflowing_award_is_rejected_and_ledger_keeps_serving() {
    let (app, _) = app();
    award(&app, "DANNON", i64::MAX, "2020-11-02T14:00:00Z").await;

    for payer in ["DANNON", "UNILEVER"] {
        let body = format!(
            r#"{{ "payer": "{payer}", "points": {}, "timestamp": "2020-11-03T14:00:00Z" }}"#,
            i64::MAX
        );
        let (status, _) = post(&app, "/transaction", &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payer}");
    }

    let (status, body) = get(&app, "/health-check").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json::<HealthCheck>(&body), HealthCheck { status: STATUS_IDLE });

    let (status, body) = get(&app, "/payer-points").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json::<Vec<PayerBalance>>(&body),
        vec![PayerBalance::new("DANNON", i64::MAX)]
    );
}

#[tokio::test]
async fn wrong_method_is_not_allowed() {
    let (app, _) = app();
    let (status, _) = get(&app, "/transaction").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    let (status, _) = post(&app, "/payer-points", "{}").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn reference_spend() {
    let (app, _) = app();
    award(&app, "DANNON", 1000, "2020-11-02T14:00:00Z").await;
    award(&app, "UNILEVER", 200, "2020-10-31T11:00:00Z").await;
    award(&app, "DANNON", -200, "2020-10-31T15:00:00Z").await;
    award(&app, "MILLER COORS", 10000, "2020-11-01T14:00:00Z").await;
    award(&app, "DANNON", 300, "2020-10-31T10:00:00Z").await;

    let (status, body) = post(&app, "/spend", r#"{ "points": 5000 }"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json::<Vec<PayerBalance>>(&body),
        vec![
            PayerBalance::new("DANNON", -100),
            PayerBalance::new("UNILEVER", -200),
            PayerBalance::new("MILLER COORS", -4700),
        ]
    );

    let (status, body) = get(&app, "/payer-points").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json::<Vec<PayerBalance>>(&body),
        vec![
            PayerBalance::new("DANNON", 1000),
            PayerBalance::new("MILLER COORS", 5300),
        ]
    );

    let (status, body) = get(&app, "/transactions").await;
    assert_eq!(status, StatusCode::OK);
    let transactions: Vec<Transaction> = json(&body);
    assert_eq!(transactions.len(), 8);
    assert!(transactions[5..].iter().all(Transaction::is_spend_record));
}

#[tokio::test]
async fn spend_more_than_available_is_rejected() {
    let (app, _) = app();
    award(&app, "DANNON", 100, "2020-11-02T14:00:00Z").await;

    let (status, body) = post(&app, "/spend", r#"{ "points": 200 }"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: serde_json::Value = json(&body);
    assert!(error["errors"].as_str().unwrap().contains("insufficient points"));

    let (_, body) = get(&app, "/payer-points").await;
    assert_eq!(
        json::<Vec<PayerBalance>>(&body),
        vec![PayerBalance::new("DANNON", 100)]
    );
}

#[tokio::test]
async fn spend_rejects_invalid_requests() {
    let (app, _) = app();
    award(&app, "DANNON", 100, "2020-11-02T14:00:00Z").await;

    for body in [r#"{ "points": 0 }"#, r#"{ "points": -5 }"#, r#"{ "points": "MANY" }"#, "{}"] {
        let (status, _) = post(&app, "/spend", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }
}
