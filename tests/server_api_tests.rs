use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use pitwall::live::{run_pass, ConfigStore, LiveSettings};
use pitwall::race::{Compound, StrategyInput};
use pitwall::server::api::{evaluate_payload, rank_payload, ApiDefaults, ApiError};
use pitwall::server::routes::{router, AppState};
use tokio::sync::watch;
use tower::ServiceExt;

fn test_state() -> (AppState, watch::Sender<Option<Arc<pitwall::live::LiveSnapshot>>>) {
    let store = Arc::new(ConfigStore::new(StrategyInput::default()).expect("default input is valid"));
    let (sender, receiver) = watch::channel(None);
    let state = AppState {
        store,
        defaults: ApiDefaults {
            samples: 20,
            seed: Some(7),
            ..ApiDefaults::default()
        },
        live: receiver,
    };
    (state, sender)
}

async fn send(state: AppState, method: &str, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build");
    let response = router(state).oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let payload = serde_json::from_slice(&bytes).expect("response should be valid json");
    (status, payload)
}

#[tokio::test]
async fn health_endpoint_returns_ok_json() {
    let (state, _sender) = test_state();
    let (status, payload) = send(state, "GET", "/api/health", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["service"], "pitwall-api");
}

#[tokio::test]
async fn rank_endpoint_returns_sorted_results() {
    let (state, _sender) = test_state();
    let body = r#"{"samples":30,"top_k":4,"max_stops":2,"seed":11}"#;
    let (status, payload) = send(state, "POST", "/api/rank", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["engine"], "monte_carlo_v1");
    assert_eq!(payload["scenario"]["samples"], 30);
    assert_eq!(payload["scenario"]["seed"], 11);
    assert_eq!(payload["scenario"]["laps"], 58);

    let results = payload["results"].as_array().expect("results should be an array");
    assert!(!results.is_empty());
    assert!(results.len() <= 4);

    let means: Vec<f64> = results
        .iter()
        .map(|result| result["mean_ms"].as_f64().expect("mean_ms is a number"))
        .collect();
    assert!(means.windows(2).all(|pair| pair[0] <= pair[1]));

    for (index, result) in results.iter().enumerate() {
        assert_eq!(result["rank"], index + 1);
        let stints = result["stints"].as_array().expect("stints should be an array");
        assert!((1..=3).contains(&stints.len()));
        let laps: u64 = stints.iter().map(|stint| stint["laps"].as_u64().unwrap_or(0)).sum();
        assert_eq!(laps, 58);
        assert!(result["summary"]["label"].as_str().is_some());
    }
}

#[tokio::test]
async fn rank_endpoint_accepts_empty_body() {
    let (state, _sender) = test_state();
    let (status, payload) = send(state, "POST", "/api/rank", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["scenario"]["seed"], 7);
    assert_eq!(payload["scenario"]["samples"], 20);
}

#[tokio::test]
async fn rank_endpoint_rejects_out_of_range_fields() {
    let (state, _sender) = test_state();
    let body = r#"{"samples":0,"top_k":99}"#;
    let (status, payload) = send(state, "POST", "/api/rank", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["status"], "error");
    let fields: Vec<&str> = payload["errors"]
        .as_array()
        .expect("errors should be an array")
        .iter()
        .filter_map(|issue| issue["field"].as_str())
        .collect();
    assert!(fields.contains(&"samples"));
    assert!(fields.contains(&"top_k"));
}

#[tokio::test]
async fn rank_endpoint_rejects_malformed_json() {
    let (state, _sender) = test_state();
    let (status, payload) = send(state, "POST", "/api/rank", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["status"], "error");
    assert!(payload["message"].as_str().is_some());
}

#[tokio::test]
async fn config_put_replaces_the_stored_input() {
    let (state, _sender) = test_state();
    let store = Arc::clone(&state.store);

    let mut input = StrategyInput::default();
    input.race.laps = 44;
    let body = serde_json::to_string(&input).expect("input serializes");
    let (status, payload) = send(state.clone(), "PUT", "/api/config", &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["race"]["laps"], 44);
    assert_eq!(store.snapshot().race.laps, 44);

    let (status, payload) = send(state, "GET", "/api/config", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["race"]["laps"], 44);
}

#[tokio::test]
async fn config_put_rejects_invalid_input_and_keeps_the_old_one() {
    let (state, _sender) = test_state();
    let store = Arc::clone(&state.store);

    let mut input = StrategyInput::default();
    input.race.laps = 0;
    input.race.compounds.clear();
    let body = serde_json::to_string(&input).expect("input serializes");
    let (status, payload) = send(state, "PUT", "/api/config", &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["message"], "Validation failed");
    assert!(payload["errors"].as_array().is_some_and(|errors| errors.len() >= 2));
    assert_eq!(store.snapshot().race.laps, 58);
}

#[tokio::test]
async fn evaluate_endpoint_accepts_plan_keys() {
    let (state, _sender) = test_state();
    let body = r#"{"plan":"SOFT:20,HARD:38","samples":10,"seed":3}"#;
    let (status, payload) = send(state, "POST", "/api/evaluate", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["samples"], 10);
    assert_eq!(payload["result"]["key"], "SOFT:20,HARD:38");
    assert!(payload["result"]["mean_ms"].as_f64().is_some_and(|mean| mean > 0.0));
}

#[tokio::test]
async fn evaluate_endpoint_rejects_plans_that_miss_the_race_distance() {
    let (state, _sender) = test_state();
    let body = r#"{"plan":{"stints":[{"compound":"SOFT","laps":20},{"compound":"HARD","laps":30}]}}"#;
    let (status, payload) = send(state, "POST", "/api/evaluate", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["status"], "error");
}

#[tokio::test]
async fn evaluate_endpoint_rejects_compounds_the_race_does_not_allow() {
    let (state, _sender) = test_state();
    let mut hard_only = StrategyInput::default();
    hard_only.race.compounds = [Compound::Hard].into_iter().collect();
    state.store.replace(hard_only).expect("hard-only input is valid");

    let body = r#"{"plan":"SOFT:58","samples":5,"seed":1}"#;
    let (status, payload) = send(state.clone(), "POST", "/api/evaluate", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["errors"][0]["field"], "plan.stints[0].compound");

    let body = r#"{"plan":"HARD:58","samples":5,"seed":1}"#;
    let (status, _) = send(state, "POST", "/api/evaluate", body).await;
    assert_eq!(status, StatusCode::OK);
}

#[test]
fn evaluate_payload_rejects_disallowed_compounds_in_supplied_input() {
    let store = ConfigStore::new(StrategyInput::default()).expect("default input is valid");
    let mut input = StrategyInput::default();
    input.race.compounds = [Compound::Medium, Compound::Hard].into_iter().collect();
    let body = serde_json::json!({ "input": input, "plan": "SOFT:29,HARD:29", "samples": 3 }).to_string();

    let result = evaluate_payload(&body, &store, &ApiDefaults::default());
    match result {
        Err(ApiError::Validation(err)) => {
            assert_eq!(err.issues.len(), 1);
            assert_eq!(err.issues[0].field, "plan.stints[0].compound");
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn config_put_rejects_unbounded_race_distance() {
    let (state, _sender) = test_state();
    let store = Arc::clone(&state.store);

    let mut input = StrategyInput::default();
    input.race.laps = 4_000_000_000;
    let body = serde_json::to_string(&input).expect("input serializes");
    let (status, payload) = send(state, "PUT", "/api/config", &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["errors"][0]["field"], "race.laps");
    assert_eq!(store.snapshot().race.laps, 58);
}

#[test]
fn rank_payload_is_deterministic_for_a_fixed_seed() {
    let store = ConfigStore::new(StrategyInput::default()).expect("default input is valid");
    let defaults = ApiDefaults::default();
    let body = r#"{"samples":25,"top_k":3,"seed":5}"#;

    let first = rank_payload(body, &store, &defaults).expect("rank should succeed");
    let second = rank_payload(body, &store, &defaults).expect("rank should succeed");
    let keys = |response: &pitwall::server::api::RankResponse| {
        response
            .results
            .iter()
            .map(|result| (result.key.clone(), result.mean_ms.to_bits()))
            .collect::<Vec<_>>()
    };
    assert_eq!(keys(&first), keys(&second));
}

#[test]
fn rank_payload_reports_parse_errors() {
    let store = ConfigStore::new(StrategyInput::default()).expect("default input is valid");
    let result = rank_payload("[1, 2", &store, &ApiDefaults::default());
    assert!(matches!(result, Err(ApiError::Parse(_))));
}

#[tokio::test]
async fn live_snapshot_is_shared_through_the_watch_channel() {
    let (state, sender) = test_state();
    let settings = LiveSettings {
        samples: 10,
        top_k: 2,
        seed: Some(9),
        ..LiveSettings::from(&pitwall::config::AppConfig::default())
    };
    let snapshot = Arc::new(run_pass(&state.store.snapshot(), &settings));
    sender.send_replace(Some(Arc::clone(&snapshot)));

    let received = state.live.borrow().clone().expect("snapshot published");
    assert_eq!(received.pass_id, snapshot.pass_id);
    assert!(received.results.len() <= 2);
}
