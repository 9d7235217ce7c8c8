//! HTTP API over the in-memory ledger adapters

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::{Duration as ChronoDuration, Utc};
use proptest::prelude::*;
use serde_json::{json, Value};

use core_kernel::UpdateId;
use domain_replay::HandlerRegistry;
use domain_update::{Update, UpdateState};
use interface_api::auth::{create_token, permissions};
use interface_api::config::ApiConfig;
use interface_api::scheduler::ReplayScheduler;
use interface_api::{create_router, AppState};
use test_utils::*;

const SECRET: &str = "api-test-secret";

struct Harness {
    server: TestServer,
    ledger: TestLedger,
    log: InvocationLog,
}

fn config() -> ApiConfig {
    ApiConfig {
        jwt_secret: SECRET.to_string(),
        ..ApiConfig::default()
    }
}

fn state(ledger: &TestLedger, registry: HandlerRegistry) -> AppState {
    AppState::new(
        ledger.store.clone(),
        ledger.sequences.clone(),
        ledger.files.clone(),
        Arc::new(registry),
        config(),
    )
}

fn harness() -> Harness {
    let ledger = TestLedger::new();
    let log = InvocationLog::new();
    let registry = HandlerRegistry::builder()
        .apply(recording(&log, &[RECEPTION_OBJECT_TYPE, INVENTORY_OBJECT_TYPE]))
        .build()
        .unwrap();
    let server = TestServer::new(create_router(state(&ledger, registry))).unwrap();
    Harness { server, ledger, log }
}

fn bearer(roles: &[&str]) -> HeaderValue {
    let roles = roles.iter().map(|r| r.to_string()).collect();
    let token = create_token("operator-7", roles, SECRET, 3600).unwrap();
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

fn operator() -> HeaderValue {
    bearer(&[permissions::UPDATE_READ, permissions::UPDATE_EXECUTE])
}

#[tokio::test]
async fn test_health_is_public() {
    let h = harness();

    h.server.get("/health").await.assert_status_ok();
    h.server.get("/health/ready").await.assert_status_ok();
}

#[tokio::test]
async fn test_updates_require_a_token() {
    let h = harness();

    let response = h.server.get("/api/v1/updates").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = h
        .server
        .get("/api/v1/updates")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer not-a-jwt"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_execute_requires_execute_role() {
    let h = harness();
    let update = UpdateBuilder::new().build();
    h.ledger.store.put(update.clone()).await;

    let response = h
        .server
        .post("/api/v1/updates/execute")
        .add_header(AUTHORIZATION, bearer(&[permissions::UPDATE_READ]))
        .json(&json!({"ids": [update.id.to_string()]}))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["error"], "forbidden");
    assert!(h.log.is_empty());
    assert_pending(&h.ledger.ledger().get(update.id).await.unwrap());
}

#[tokio::test]
async fn test_list_is_in_numeric_sequence_order() {
    let h = harness();
    for sequence in [10u64, 9, 2] {
        h.ledger.store.put(UpdateBuilder::new().with_sequence(sequence).build()).await;
    }

    let response = h
        .server
        .get("/api/v1/updates")
        .add_header(AUTHORIZATION, bearer(&[permissions::UPDATE_READ]))
        .await;

    response.assert_status_ok();
    let body = response.json::<Vec<Value>>();
    let sequences: Vec<u64> = body.iter().filter_map(|u| u["sequence"].as_u64()).collect();
    assert_eq!(sequences, vec![2, 9, 10]);
    assert!(body.iter().all(|u| u.get("name").is_none()));
}

#[tokio::test]
async fn test_list_filters_by_state() {
    let h = harness();
    h.ledger.store.put(UpdateBuilder::new().with_sequence(1).build()).await;
    h.ledger.store.put(UpdateBuilder::new().with_sequence(2).failed("boom").build()).await;

    let response = h
        .server
        .get("/api/v1/updates")
        .add_query_param("state", "failed")
        .add_header(AUTHORIZATION, operator())
        .await;

    let body = response.json::<Vec<Value>>();
    assert_eq!(body.len(), 1);
    assert_eq!(body[0]["result"], "boom");

    let response = h
        .server
        .get("/api/v1/updates")
        .add_query_param("state", "sleeping")
        .add_header(AUTHORIZATION, operator())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_includes_display_name() {
    let h = harness();
    let file = h.ledger.file(FileFixtures::reception_file()).await.unwrap();
    let update = UpdateBuilder::new().with_file(file.id).with_node_number(3).build();
    h.ledger.store.put(update.clone()).await;

    let response = h
        .server
        .get(&format!("/api/v1/updates/{}", update.id))
        .add_header(AUTHORIZATION, operator())
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["name"], "FOUR_20261012_0930.xml, Node 3");
    assert_eq!(body["state"], "to_execute");
}

#[tokio::test]
async fn test_get_unknown_and_malformed_ids() {
    let h = harness();

    let response = h
        .server
        .get(&format!("/api/v1/updates/{}", UpdateId::new()))
        .add_header(AUTHORIZATION, operator())
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = h
        .server
        .get("/api/v1/updates/not-an-id")
        .add_header(AUTHORIZATION, operator())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_execute_runs_in_sequence_order() {
    let h = harness();
    let late = UpdateBuilder::new().with_sequence(10).build();
    let early = UpdateBuilder::new()
        .with_sequence(9)
        .with_object_type(INVENTORY_OBJECT_TYPE)
        .with_payload(PayloadFixtures::inventory())
        .build();
    h.ledger.store.put(late.clone()).await;
    h.ledger.store.put(early.clone()).await;

    let response = h
        .server
        .post("/api/v1/updates/execute")
        .add_header(AUTHORIZATION, operator())
        .json(&json!({"ids": [late.id.to_string(), early.id.to_string()]}))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["executed"], 2);
    assert_eq!(body["failed"], 0);
    assert_eq!(body["records"][0]["sequence"], 9);
    assert_eq!(body["records"][0]["outcome"], "executed");
    assert_eq!(h.log.sequences(), vec![9, 10]);
    assert_eq!(h.log.calls()[0].payload, PayloadFixtures::inventory());
}

#[tokio::test]
async fn test_equal_sequences_run_in_creation_order() {
    let h = harness();
    let now = Utc::now();
    let newer = UpdateBuilder::new().with_sequence(5).created_at(now).build();
    let older = UpdateBuilder::new()
        .with_sequence(5)
        .created_at(now - ChronoDuration::minutes(5))
        .build();
    h.ledger.store.put(newer.clone()).await;
    h.ledger.store.put(older.clone()).await;

    h.server
        .post("/api/v1/updates/execute")
        .add_header(AUTHORIZATION, operator())
        .json(&json!({"ids": [newer.id.to_string(), older.id.to_string()]}))
        .await
        .assert_status_ok();

    let order: Vec<UpdateId> = h.log.calls().iter().map(|c| c.update_id).collect();
    assert_eq!(order, vec![older.id, newer.id]);
}

#[tokio::test]
async fn test_undecodable_data_fails_its_record() {
    let h = harness();
    let garbled = UpdateBuilder::new()
        .with_sequence(1)
        .with_raw_data("<NUM_BL>IN/00042</NUM_BL>")
        .build();
    let reception = UpdateBuilder::new().with_sequence(2).build();
    h.ledger.store.put(garbled.clone()).await;
    h.ledger.store.put(reception.clone()).await;

    let response = h
        .server
        .post("/api/v1/updates/execute")
        .add_header(AUTHORIZATION, operator())
        .json(&json!({"ids": [garbled.id.to_string(), reception.id.to_string()]}))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["failed"], 1);
    assert_failed_with(&h.ledger.ledger().get(garbled.id).await.unwrap(), "deserialize");
    assert_eq!(h.log.sequences(), vec![2]);
}

#[tokio::test]
async fn test_execute_rejects_empty_and_malformed_requests() {
    let h = harness();

    let response = h
        .server
        .post("/api/v1/updates/execute")
        .add_header(AUTHORIZATION, operator())
        .json(&json!({"ids": []}))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let response = h
        .server
        .post("/api/v1/updates/execute")
        .add_header(AUTHORIZATION, operator())
        .json(&json!({"ids": ["42"]}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_execute_all_reports_failures_per_record() {
    let h = harness();
    let ghost = UpdateBuilder::new().with_sequence(1).with_object_type("GHOST").build();
    let reception = UpdateBuilder::new().with_sequence(2).build();
    h.ledger.store.put(ghost.clone()).await;
    h.ledger.store.put(reception.clone()).await;
    h.ledger.store.put(UpdateBuilder::new().with_sequence(3).executed().build()).await;

    let response = h
        .server
        .post("/api/v1/updates/execute_all")
        .add_header(AUTHORIZATION, operator())
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["executed"], 1);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["records"][0]["outcome"], "failed");
    assert!(body["records"][0]["result"]
        .as_str()
        .unwrap_or_default()
        .starts_with("Error while executing: "));

    assert_failed_with(&h.ledger.ledger().get(ghost.id).await.unwrap(), "GHOST");
    assert_executed(&h.ledger.ledger().get(reception.id).await.unwrap());
}

#[tokio::test]
async fn test_handler_failure_is_stored_on_the_record() {
    let ledger = TestLedger::new();
    let log = InvocationLog::new();
    let registry = HandlerRegistry::builder()
        .apply(recording(&log, &[RECEPTION_OBJECT_TYPE]))
        .apply(failing(INVENTORY_OBJECT_TYPE, "stock location B-2 is closed"))
        .build()
        .unwrap();
    let server = TestServer::new(create_router(state(&ledger, registry))).unwrap();
    let inventory = UpdateBuilder::new()
        .with_sequence(1)
        .with_object_type(INVENTORY_OBJECT_TYPE)
        .with_payload(PayloadFixtures::inventory())
        .build();
    let reception = UpdateBuilder::new().with_sequence(2).build();
    ledger.store.put(inventory.clone()).await;
    ledger.store.put(reception.clone()).await;

    let response = server
        .post("/api/v1/updates/execute_all")
        .add_header(AUTHORIZATION, operator())
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>()["records"][0]["result"],
        "Error while executing: stock location B-2 is closed"
    );
    assert_failed_with(&ledger.ledger().get(inventory.id).await.unwrap(), "B-2 is closed");
    assert_executed(&ledger.ledger().get(reception.id).await.unwrap());
}

#[tokio::test]
async fn test_record_claimed_elsewhere_is_skipped() {
    let h = harness();
    let update = UpdateBuilder::new()
        .claimed_until(Utc::now() + ChronoDuration::minutes(10))
        .build();
    h.ledger.store.put(update.clone()).await;

    let response = h
        .server
        .post("/api/v1/updates/execute")
        .add_header(AUTHORIZATION, operator())
        .json(&json!({"ids": [update.id.to_string()]}))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["skipped"], 1);
    assert_eq!(body["records"][0]["outcome"], "skipped_claimed");
    assert!(h.log.is_empty());
    assert_pending(&h.ledger.ledger().get(update.id).await.unwrap());
}

#[tokio::test]
async fn test_replay_refused_without_handlers() {
    let ledger = TestLedger::new();
    let server =
        TestServer::new(create_router(state(&ledger, HandlerRegistry::default()))).unwrap();
    let update = UpdateBuilder::new().build();
    ledger.store.put(update.clone()).await;

    let response = server
        .post("/api/v1/updates/execute")
        .add_header(AUTHORIZATION, operator())
        .json(&json!({"ids": [update.id.to_string()]}))
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["error"], "service_unavailable");

    server
        .post("/api/v1/updates/execute_all")
        .add_header(AUTHORIZATION, operator())
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    assert_pending(&ledger.ledger().get(update.id).await.unwrap());
}

#[tokio::test]
async fn test_delete_is_refused() {
    let h = harness();
    let update = UpdateBuilder::new().build();
    h.ledger.store.put(update.clone()).await;

    let response = h
        .server
        .delete(&format!("/api/v1/updates/{}", update.id))
        .add_header(AUTHORIZATION, operator())
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["error"], "protected_record");
    assert_eq!(h.ledger.store.len().await, 1);
}

#[tokio::test]
async fn test_scheduler_replays_pending_updates() {
    let ledger = TestLedger::new();
    let log = InvocationLog::new();
    let registry = HandlerRegistry::builder()
        .apply(recording(&log, &[RECEPTION_OBJECT_TYPE]))
        .build()
        .unwrap();
    let update = UpdateBuilder::new().build();
    ledger.store.put(update.clone()).await;

    let scheduler = ReplayScheduler::spawn(ledger.engine(registry), Duration::from_millis(20));

    let mut waited = Duration::ZERO;
    while log.is_empty() && waited < Duration::from_secs(5) {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }
    scheduler.shutdown().await;

    assert_eq!(log.count_for(update.id), 1);
    assert_executed(&ledger.ledger().get(update.id).await.unwrap());
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_list_orders_any_sequences_numerically(sequences in distinct_sequences_strategy(1..20)) {
        let listed = runtime().block_on(async {
            let h = harness();
            for sequence in &sequences {
                h.ledger.store.put(UpdateBuilder::new().with_sequence(*sequence).build()).await;
            }
            let response = h
                .server
                .get("/api/v1/updates")
                .add_header(AUTHORIZATION, operator())
                .await;
            response.assert_status_ok();
            response
                .json::<Vec<Value>>()
                .iter()
                .filter_map(|u| u["sequence"].as_u64())
                .collect::<Vec<u64>>()
        });

        let mut expected = sequences.clone();
        expected.sort_unstable();
        prop_assert_eq!(listed, expected);
    }

    #[test]
    fn prop_state_filter_returns_exactly_that_state(
        states in proptest::collection::vec(update_state_strategy(), 1..15),
        wanted in update_state_strategy(),
    ) {
        let listed = runtime().block_on(async {
            let h = harness();
            for (i, state) in states.iter().enumerate() {
                let update = UpdateBuilder::new()
                    .with_sequence(i as u64 + 1)
                    .with_state(*state)
                    .build();
                h.ledger.store.put(update).await;
            }
            h.server
                .get("/api/v1/updates")
                .add_query_param("state", wanted.as_str())
                .add_header(AUTHORIZATION, operator())
                .await
                .json::<Vec<Value>>()
        });

        prop_assert_eq!(listed.len(), states.iter().filter(|s| **s == wanted).count());
        prop_assert!(listed.iter().all(|u| u["state"] == wanted.as_str()));
    }

    #[test]
    fn prop_execute_all_applies_every_payload_once_in_replay_order(
        updates in proptest::collection::vec(update_strategy(), 1..12)
    ) {
        let (calls, second_pass_calls, stored) = runtime().block_on(async {
            let ledger = TestLedger::new();
            let log = InvocationLog::new();
            let mut object_types: Vec<&str> =
                updates.iter().map(|u| u.object_type.as_str()).collect();
            object_types.sort_unstable();
            object_types.dedup();
            let registry = HandlerRegistry::builder()
                .apply(recording(&log, &object_types))
                .build()
                .unwrap();
            let server = TestServer::new(create_router(state(&ledger, registry))).unwrap();
            for update in &updates {
                ledger.store.put(update.clone()).await;
            }

            let execute_all = || {
                server
                    .post("/api/v1/updates/execute_all")
                    .add_header(AUTHORIZATION, operator())
            };
            execute_all().await.assert_status_ok();
            let calls = log.calls();
            execute_all().await.assert_status_ok();

            let mut stored = Vec::new();
            for update in &updates {
                stored.push(ledger.ledger().get(update.id).await.unwrap());
            }
            (calls, log.len(), stored)
        });

        let mut expected: Vec<&Update> = updates.iter().collect();
        expected.sort_by_key(|u| u.replay_key());
        let order: Vec<UpdateId> = calls.iter().map(|c| c.update_id).collect();
        prop_assert_eq!(order, expected.iter().map(|u| u.id).collect::<Vec<_>>());
        for (call, update) in calls.iter().zip(expected) {
            let payload = update.payload().unwrap();
            prop_assert_eq!(&call.payload, &payload);
        }
        prop_assert_eq!(second_pass_calls, calls.len());
        prop_assert!(stored.iter().all(|u| u.state == UpdateState::Executed));
    }
}
