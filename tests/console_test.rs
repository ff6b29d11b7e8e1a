//! Console orchestration tests: lifecycle, refresh policy and form side effects

use chrono::{DateTime, Local, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use signals_console::client::api::*;
use signals_console::client::{ApiClient, MockReply, MockTransport};
use signals_console::config::Config;
use signals_console::error::OperationError;
use signals_console::services::validation::parse_local_datetime;
use signals_console::services::Console;
use signals_console::types::*;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_test::{assert_pending, assert_ready};

fn console(transport: MockTransport) -> Console<MockTransport> {
    Console::new(ApiClient::new(&Config::default(), transport))
}

fn instrument_json(symbol: &str) -> Value {
    json!({
        "symbol": symbol,
        "exchange": "NSE",
        "segment": "EQ",
        "lot_size": null,
        "tick_size": 0.05
    })
}

fn account_json() -> Value {
    json!({"cash_balance": 100000.0, "margin_used": 0.0, "positions": []})
}

fn order_json() -> Value {
    json!({
        "order_id": "ord-1",
        "status": "FILLED",
        "filled_quantity": 1,
        "avg_fill_price": 2850.0,
        "timestamp": "2024-05-01T10:00:00Z"
    })
}

fn summary_json() -> Value {
    json!({
        "api_key": "key-123",
        "client_code": "AB123",
        "has_auth_token": true,
        "has_totp_secret": true,
        "updated_at": "2024-05-01T10:00:00Z"
    })
}

fn sent_json(console: &Console<MockTransport>, method: Method, path: &str) -> Value {
    let request = console
        .client()
        .transport()
        .last_request(method, path)
        .expect("request was sent");
    serde_json::from_str(request.body.as_deref().unwrap_or("null")).unwrap()
}

// =========================================================================
// Lifecycle
// =========================================================================

#[tokio::test]
async fn test_operations_start_idle() {
    let console = console(MockTransport::new());

    assert_eq!(console.account().snapshot(), OperationState::Idle);
    assert_eq!(console.order_submit().snapshot(), OperationState::Idle);
    assert!(console.catalogue().is_empty());
    assert!(console.client().transport().requests().is_empty());
}

#[tokio::test]
async fn test_backtest_accepted_with_pending_phase() {
    let gate = Arc::new(Notify::new());
    let console = console(MockTransport::new().gated_route(
        Method::POST,
        BACKTESTS_PATH,
        MockReply::json(
            202,
            json!({
                "backtest_id": "bt-42",
                "metrics": {"total_return": 0.12, "final_equity": 1120000.0}
            }),
        ),
        gate.clone(),
    ));
    console.edit(|state| {
        state.backtest_form = BacktestForm {
            strategy_id: "nifty-test".to_string(),
            symbols: "RELIANCE, INFY ,,TCS".to_string(),
            start: "2024-01-01T09:15".to_string(),
            end: "2024-03-01T15:30".to_string(),
            initial_capital: String::new(),
        };
    });

    let mut task = tokio_test::task::spawn(console.run_backtest());
    assert_pending!(task.poll());
    assert!(console.backtest_run().is_pending());
    assert_eq!(console.backtest_run().snapshot().phase(), Phase::Pending);

    gate.notify_one();
    let result = assert_ready!(task.poll()).unwrap();
    drop(task);

    assert_eq!(result.backtest_id, "bt-42");
    assert_eq!(result.metrics.final_equity, 1120000.0);
    assert_eq!(console.backtest_run().snapshot(), OperationState::Succeeded(result));

    let body = sent_json(&console, Method::POST, BACKTESTS_PATH);
    assert_eq!(body["strategy_id"], "nifty-test");
    assert_eq!(body["symbols"], json!(["RELIANCE", "INFY", "TCS"]));
    assert_eq!(body["initial_capital"], 1000000.0);

    let start: DateTime<Utc> = body["start"].as_str().unwrap().parse().unwrap();
    let end: DateTime<Utc> = body["end"].as_str().unwrap().parse().unwrap();
    assert_eq!(start, parse_local_datetime("2024-01-01T09:15", "Start", &Local).unwrap());
    assert_eq!(end, parse_local_datetime("2024-03-01T15:30", "End", &Local).unwrap());
}

#[tokio::test]
async fn test_rerun_clears_previous_error_while_pending() {
    let gate = Arc::new(Notify::new());
    let console = console(
        MockTransport::new()
            .route(Method::GET, ACCOUNT_PATH, MockReply::text(500, "boom"))
            .gated_route(Method::GET, ACCOUNT_PATH, MockReply::json(200, account_json()), gate.clone()),
    );

    gate.notify_one();
    assert!(console.load_account().await.is_err());
    assert_eq!(
        console.account().snapshot().error_message(),
        Some("500 Internal Server Error: boom")
    );

    let mut task = tokio_test::task::spawn(console.load_account());
    assert_pending!(task.poll());
    let pending = console.account().snapshot();
    assert!(pending.is_pending());
    assert_eq!(pending.error_message(), None);
    assert!(pending.value().is_none());

    gate.notify_one();
    assert!(assert_ready!(task.poll()).is_ok());
    drop(task);

    assert!(console.account().snapshot().value().is_some());
    assert_eq!(console.account().invocations(), 2);
}

#[tokio::test]
async fn test_not_found_only_fails_triggering_operation() {
    let console = console(MockTransport::new());

    let err = console.load_account().await.unwrap_err();

    assert_eq!(err.to_string(), "404 Not Found: Not Found");
    assert_eq!(
        console.account().snapshot(),
        OperationState::Failed("404 Not Found: Not Found".to_string())
    );
    assert_eq!(console.instruments().snapshot(), OperationState::Idle);
    assert_eq!(console.order_submit().snapshot(), OperationState::Idle);
    assert_eq!(console.health().snapshot(), OperationState::Idle);
}

// =========================================================================
// Instruments
// =========================================================================

#[tokio::test]
async fn test_create_instrument_reloads_catalogue_once() {
    let console = console(
        MockTransport::new()
            .route(Method::POST, INSTRUMENTS_PATH, MockReply::json(201, instrument_json("RELIANCE")))
            .route(
                Method::GET,
                INSTRUMENTS_PATH,
                MockReply::json(200, json!([instrument_json("INFY"), instrument_json("RELIANCE")])),
            ),
    );
    console.edit(|state| state.instrument_form.symbol = "reliance".to_string());

    let created = console.create_instrument().await.unwrap();

    assert_eq!(created.symbol, "RELIANCE");
    let transport = console.client().transport();
    assert_eq!(transport.count(Method::POST, INSTRUMENTS_PATH), 1);
    assert_eq!(transport.count(Method::GET, INSTRUMENTS_PATH), 1);

    let body = sent_json(&console, Method::POST, INSTRUMENTS_PATH);
    assert_eq!(body["symbol"], "RELIANCE");
    assert_eq!(body["exchange"], "NSE");
    assert_eq!(body["segment"], "EQ");
    assert_eq!(body["tick_size"], 0.05);

    let state = console.snapshot();
    assert!(state.instrument_form.symbol.is_empty());
    assert_eq!(state.catalogue.len(), 2);
    assert_eq!(state.order_form.symbol, "INFY");
    assert!(console.instruments().snapshot().value().is_some());
}

#[tokio::test]
async fn test_invalid_instrument_makes_no_request() {
    let console = console(MockTransport::new());
    console.edit(|state| state.instrument_form.symbol = "   ".to_string());

    let err = console.create_instrument().await.unwrap_err();

    assert!(matches!(err, OperationError::Validation(_)));
    assert_eq!(
        console.instrument_create().snapshot(),
        OperationState::Failed("Symbol is required".to_string())
    );
    assert!(console.client().transport().requests().is_empty());
    assert_eq!(console.instruments().snapshot(), OperationState::Idle);
}

#[tokio::test]
async fn test_failed_create_keeps_form_and_skips_reload() {
    let console = console(MockTransport::new().route(
        Method::POST,
        INSTRUMENTS_PATH,
        MockReply::text(409, "Instrument already exists"),
    ));
    console.edit(|state| state.instrument_form.symbol = "TCS".to_string());

    assert!(console.create_instrument().await.is_err());

    assert_eq!(console.snapshot().instrument_form.symbol, "TCS");
    assert_eq!(console.client().transport().count(Method::GET, INSTRUMENTS_PATH), 0);
}

#[tokio::test]
async fn test_load_instruments_replaces_catalogue() {
    let console = console(
        MockTransport::new()
            .route(
                Method::GET,
                INSTRUMENTS_PATH,
                MockReply::json(200, json!([instrument_json("INFY"), instrument_json("TCS")])),
            )
            .route(Method::GET, INSTRUMENTS_PATH, MockReply::json(200, json!([instrument_json("HDFC")]))),
    );

    console.load_instruments().await.unwrap();
    assert_eq!(console.catalogue().len(), 2);
    assert_eq!(console.snapshot().order_form.symbol, "INFY");

    console.load_instruments().await.unwrap();
    let symbols: Vec<String> = console.catalogue().into_iter().map(|i| i.symbol).collect();
    assert_eq!(symbols, vec!["HDFC"]);
    // An existing selection is left alone by a plain reload.
    assert_eq!(console.snapshot().order_form.symbol, "INFY");
}

#[tokio::test]
async fn test_repeated_list_is_idempotent() {
    let listing = json!([instrument_json("INFY"), instrument_json("TCS")]);
    let console = console(
        MockTransport::new()
            .route(Method::GET, INSTRUMENTS_PATH, MockReply::json(200, listing.clone()))
            .route(Method::GET, INSTRUMENTS_PATH, MockReply::json(200, listing)),
    );

    console.load_instruments().await.unwrap();
    let first = console.snapshot();
    console.load_instruments().await.unwrap();
    let second = console.snapshot();

    assert_eq!(second.catalogue.len(), 2);
    assert_eq!(first.catalogue, second.catalogue);
    assert_eq!(first.order_form.symbol, second.order_form.symbol);
    assert_eq!(console.client().transport().count(Method::GET, INSTRUMENTS_PATH), 2);
}

#[tokio::test]
async fn test_universe_refresh_replaces_live_catalogue() {
    let console = console(
        MockTransport::new()
            .route(Method::GET, INSTRUMENTS_PATH, MockReply::json(200, json!([instrument_json("INFY")])))
            .route(
                Method::POST,
                NIFTY100_REFRESH_PATH,
                MockReply::json(200, json!([instrument_json("HDFC"), instrument_json("TCS")])),
            ),
    );

    console.load_instruments().await.unwrap();
    console.refresh_universe().await.unwrap();

    let symbols: Vec<String> = console.catalogue().into_iter().map(|i| i.symbol).collect();
    assert_eq!(symbols, vec!["HDFC", "TCS"]);
    // The fetch operation still reports what it fetched.
    assert_eq!(console.instruments().snapshot().value().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_refresh_universe_reselects_and_announces() {
    let console = console(MockTransport::new().route(
        Method::POST,
        NIFTY100_REFRESH_PATH,
        MockReply::json(200, json!([instrument_json("INFY"), instrument_json("TCS")])),
    ));
    console.edit(|state| {
        state.order_form.symbol = "DELISTED".to_string();
        state.catalogue_notice = Some("stale".to_string());
    });

    let instruments = console.refresh_universe().await.unwrap();

    assert_eq!(instruments.len(), 2);
    let state = console.snapshot();
    assert_eq!(state.catalogue.len(), 2);
    assert_eq!(state.order_form.symbol, "INFY");
    assert_eq!(
        state.catalogue_notice.as_deref(),
        Some("Loaded 2 instruments from Motilal Oswal.")
    );
    assert_eq!(console.client().transport().count(Method::GET, INSTRUMENTS_PATH), 0);
}

#[tokio::test]
async fn test_refresh_universe_keeps_present_symbol() {
    let console = console(MockTransport::new().route(
        Method::POST,
        NIFTY100_REFRESH_PATH,
        MockReply::json(200, json!([instrument_json("INFY"), instrument_json("TCS")])),
    ));
    console.edit(|state| state.order_form.symbol = "TCS".to_string());

    console.refresh_universe().await.unwrap();

    assert_eq!(console.snapshot().order_form.symbol, "TCS");
}

#[tokio::test]
async fn test_failed_universe_refresh_clears_notice() {
    let console = console(MockTransport::new().route(
        Method::POST,
        NIFTY100_REFRESH_PATH,
        MockReply::text(502, "Broker unavailable"),
    ));
    console.edit(|state| state.catalogue_notice = Some("Loaded 100 instruments from Motilal Oswal.".to_string()));

    assert!(console.refresh_universe().await.is_err());

    assert!(console.snapshot().catalogue_notice.is_none());
    assert_eq!(
        console.universe_refresh().snapshot().error_message(),
        Some("502 Bad Gateway: Broker unavailable")
    );
}

// =========================================================================
// Orders
// =========================================================================

#[tokio::test]
async fn test_order_success_reloads_account() {
    let console = console(
        MockTransport::new()
            .route(Method::POST, ORDERS_PATH, MockReply::json(200, order_json()))
            .route(Method::GET, ACCOUNT_PATH, MockReply::json(200, account_json())),
    );
    console.edit(|state| {
        state.order_form.symbol = "RELIANCE".to_string();
        state.order_form.quantity = "1".to_string();
    });

    let result = console.submit_order().await.unwrap();

    assert_eq!(result.status, OrderStatus::Filled);
    assert_eq!(console.client().transport().count(Method::GET, ACCOUNT_PATH), 1);
    assert!(console.account().snapshot().value().is_some());

    let body = sent_json(&console, Method::POST, ORDERS_PATH);
    assert_eq!(
        body,
        json!({"symbol": "RELIANCE", "side": "BUY", "order_type": "MARKET", "quantity": 1})
    );
}

#[tokio::test]
async fn test_order_failure_skips_account_reload() {
    let console = console(MockTransport::new().route(
        Method::POST,
        ORDERS_PATH,
        MockReply::text(400, r#"{"detail":"Market closed"}"#),
    ));
    console.edit(|state| {
        state.order_form.symbol = "RELIANCE".to_string();
        state.order_form.quantity = "5".to_string();
    });

    assert!(console.submit_order().await.is_err());

    assert_eq!(console.client().transport().count(Method::GET, ACCOUNT_PATH), 0);
    assert_eq!(console.account().snapshot(), OperationState::Idle);
    assert_eq!(
        console.order_submit().snapshot().error_message(),
        Some(r#"400 Bad Request: {"detail":"Market closed"}"#)
    );
}

#[tokio::test]
async fn test_failed_reload_does_not_fail_order() {
    let console = console(
        MockTransport::new()
            .route(Method::POST, ORDERS_PATH, MockReply::json(200, order_json()))
            .route(Method::GET, ACCOUNT_PATH, MockReply::transport_error("connection reset")),
    );
    console.edit(|state| {
        state.order_form.symbol = "RELIANCE".to_string();
        state.order_form.quantity = "1".to_string();
    });

    assert!(console.submit_order().await.is_ok());

    assert!(console.order_submit().snapshot().value().is_some());
    assert_eq!(
        console.account().snapshot(),
        OperationState::Failed("connection reset".to_string())
    );
}

#[tokio::test]
async fn test_overtaken_order_still_reloads_account() {
    let gate = Arc::new(Notify::new());
    let console = console(
        MockTransport::new()
            .gated_route(Method::POST, ORDERS_PATH, MockReply::json(200, order_json()), gate.clone())
            .route(Method::GET, ACCOUNT_PATH, MockReply::json(200, account_json())),
    );
    console.edit(|state| {
        state.order_form.symbol = "RELIANCE".to_string();
        state.order_form.quantity = "1".to_string();
    });

    let mut first = tokio_test::task::spawn(console.submit_order());
    assert_pending!(first.poll());

    console.edit(|state| state.order_form.quantity = "0".to_string());
    let second = console.submit_order().await;
    assert!(matches!(second, Err(OperationError::Validation(_))));

    gate.notify_one();
    let first = assert_ready!(first.poll());
    assert_eq!(first, Err(OperationError::Superseded));

    let transport = console.client().transport();
    assert_eq!(transport.count(Method::POST, ORDERS_PATH), 1);
    assert_eq!(transport.count(Method::GET, ACCOUNT_PATH), 1);
    assert!(console.account().snapshot().value().is_some());
    assert_eq!(
        console.order_submit().snapshot().error_message(),
        Some("Quantity must be a positive number")
    );
}

#[tokio::test]
async fn test_overtaken_instrument_create_still_settles() {
    let gate = Arc::new(Notify::new());
    let console = console(
        MockTransport::new()
            .gated_route(
                Method::POST,
                INSTRUMENTS_PATH,
                MockReply::json(201, instrument_json("RELIANCE")),
                gate.clone(),
            )
            .route(
                Method::GET,
                INSTRUMENTS_PATH,
                MockReply::json(200, json!([instrument_json("RELIANCE")])),
            ),
    );
    console.edit(|state| state.instrument_form.symbol = "RELIANCE".to_string());

    let mut first = tokio_test::task::spawn(console.create_instrument());
    assert_pending!(first.poll());

    console.edit(|state| state.instrument_form.segment = "CASH".to_string());
    assert!(console.create_instrument().await.is_err());

    gate.notify_one();
    assert_eq!(assert_ready!(first.poll()), Err(OperationError::Superseded));

    assert_eq!(console.client().transport().count(Method::GET, INSTRUMENTS_PATH), 1);
    assert!(console.snapshot().instrument_form.symbol.is_empty());
    assert_eq!(console.catalogue().len(), 1);
    assert_eq!(
        console.instrument_create().snapshot().error_message(),
        Some("Segment must be one of EQ, FUT, OPT")
    );
}

#[tokio::test]
async fn test_invalid_order_makes_no_request() {
    let console = console(MockTransport::new());
    console.edit(|state| {
        state.order_form.symbol = "RELIANCE".to_string();
        state.order_form.quantity = "0".to_string();
    });

    assert!(console.submit_order().await.is_err());

    assert!(console.client().transport().requests().is_empty());
    assert_eq!(
        console.order_submit().snapshot().error_message(),
        Some("Quantity must be a positive number")
    );
}

// =========================================================================
// Webhooks
// =========================================================================

#[tokio::test]
async fn test_webhook_dispatch_per_provider() {
    let console = console(MockTransport::new().route(
        Method::POST,
        "/api/v1/webhooks/tradingview",
        MockReply::json(200, json!({"status": "accepted", "received_at": "2024-05-01T10:00:00Z"})),
    ));
    console.edit(|state| {
        state.webhook_form = WebhookForm {
            provider: WebhookProvider::TradingView,
            payload: r#"{"ticker": "NSE:INFY", "action": "buy"}"#.to_string(),
            token: "tv-token".to_string(),
        };
    });

    let ack = console.dispatch_webhook().await.unwrap();

    assert_eq!(ack.status, "accepted");
    let request = console
        .client()
        .transport()
        .last_request(Method::POST, "/api/v1/webhooks/tradingview")
        .unwrap();
    assert_eq!(request.headers["x-tradingview-token"], "tv-token");
    assert_eq!(request.headers["content-type"], "application/json");
    assert!(console
        .webhook_dispatch(WebhookProvider::TradingView)
        .snapshot()
        .value()
        .is_some());
    assert_eq!(
        console.webhook_dispatch(WebhookProvider::Chartink).snapshot(),
        OperationState::Idle
    );
}

#[tokio::test]
async fn test_webhook_bad_json_fails_without_request() {
    let console = console(MockTransport::new());
    console.edit(|state| state.webhook_form.payload = "not json".to_string());

    assert!(console.dispatch_webhook().await.is_err());

    assert!(console.client().transport().requests().is_empty());
    assert!(console
        .webhook_dispatch(WebhookProvider::Chartink)
        .snapshot()
        .error_message()
        .is_some());
}

// =========================================================================
// Broker credentials
// =========================================================================

#[tokio::test]
async fn test_save_credentials_clears_secrets() {
    let console = console(MockTransport::new().route(
        Method::POST,
        MOTILAL_PATH,
        MockReply::json(200, summary_json()),
    ));
    console.edit(|state| {
        state.credentials_form = CredentialsForm {
            api_key: "key-123".to_string(),
            client_code: "AB123".to_string(),
            auth_token: "tok-secret".to_string(),
            totp_secret: "totp-secret".to_string(),
        };
    });

    let summary = console.save_credentials().await.unwrap();

    assert!(summary.has_auth_token);
    let state = console.snapshot();
    assert_eq!(state.credentials_form.api_key, "key-123");
    assert_eq!(state.credentials_form.client_code, "AB123");
    assert!(state.credentials_form.auth_token.is_empty());
    assert!(state.credentials_form.totp_secret.is_empty());
    assert_eq!(
        state.credentials_notice.as_deref(),
        Some("Credentials saved. Updated at 2024-05-01T10:00:00+00:00")
    );

    let body = sent_json(&console, Method::POST, MOTILAL_PATH);
    assert_eq!(body["auth_token"], "tok-secret");
    assert_eq!(body["totp_secret"], "totp-secret");

    let recorded = format!("{:?}", console.credentials_save().snapshot());
    assert!(!recorded.contains("tok-secret"));
    assert!(!format!("{:?}", state.credentials_form).contains("totp-secret"));
}

#[tokio::test]
async fn test_failed_save_keeps_secrets_for_retry() {
    let console = console(MockTransport::new().route(
        Method::POST,
        MOTILAL_PATH,
        MockReply::text(401, "Invalid credentials"),
    ));
    console.edit(|state| {
        state.credentials_form = CredentialsForm {
            api_key: "key-123".to_string(),
            client_code: "AB123".to_string(),
            auth_token: "tok-secret".to_string(),
            totp_secret: String::new(),
        };
        state.credentials_notice = Some("old notice".to_string());
    });

    assert!(console.save_credentials().await.is_err());

    let state = console.snapshot();
    assert_eq!(state.credentials_form.auth_token, "tok-secret");
    assert!(state.credentials_notice.is_none());
}

#[tokio::test]
async fn test_load_credentials_prefills_form() {
    let console = console(MockTransport::new().route(
        Method::GET,
        MOTILAL_PATH,
        MockReply::json(200, summary_json()),
    ));

    let summary = console.load_credentials().await.unwrap();

    assert!(summary.is_some());
    let form = console.snapshot().credentials_form;
    assert_eq!(form.api_key, "key-123");
    assert_eq!(form.client_code, "AB123");
    assert!(form.auth_token.is_empty());
}

#[tokio::test]
async fn test_load_credentials_absent_leaves_form() {
    let console = console(MockTransport::new().route(Method::GET, MOTILAL_PATH, MockReply::text(200, "null")));
    console.edit(|state| state.credentials_form.api_key = "typed".to_string());

    assert_eq!(console.load_credentials().await.unwrap(), None);
    assert_eq!(console.snapshot().credentials_form.api_key, "typed");
    assert_eq!(console.credentials_load().snapshot(), OperationState::Succeeded(None));
}

// =========================================================================
// Health & broker status
// =========================================================================

#[tokio::test]
async fn test_ping_and_broker_status() {
    let console = console(
        MockTransport::new()
            .route(
                Method::GET,
                HEALTH_PATH,
                MockReply::json(200, json!({"status": "ok", "timestamp": "2024-05-01T10:00:00Z"})),
            )
            .route(
                Method::GET,
                MOTILAL_STATUS_PATH,
                MockReply::json(200, json!({"connected": true})),
            ),
    );

    assert!(console.ping().await.unwrap().is_ok());
    let status = console.check_broker_status().await.unwrap();
    assert!(status.connected);
    assert_eq!(status.broker, "motilal");
    assert_eq!(console.broker_status().snapshot().phase(), Phase::Succeeded);
}
