use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use rootai_sensorflow::store::{FixtureStore, SensorStore};
use rootai_sensorflow::{routes, AppState, Config, RawSnapshot, RuleSet};

/// Store whose every read fails, as an unreachable database would.
struct FailingStore;

#[async_trait]
impl SensorStore for FailingStore {
    async fn fetch_records(&self, _user_id: &str, _field_id: &str) -> Result<Option<RawSnapshot>> {
        Err(anyhow!("connection refused"))
    }

    fn kind(&self) -> &'static str {
        "failing"
    }
}

fn snapshot(value: Value) -> RawSnapshot {
    match value {
        Value::Object(map) => map,
        other => panic!("snapshot must be an object, got {other}"),
    }
}

/// Serve the router on an ephemeral port and return its base URL.
async fn spawn_app(store: Arc<dyn SensorStore>, config: Config) -> Result<String> {
    // ---
    let app = routes::router(AppState::new(store, None, config));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    Ok(format!("http://{addr}"))
}

fn field_records() -> RawSnapshot {
    // ---
    snapshot(json!({
        "-N1": {
            "timestamp": "2025-06-01T06:00:00Z",
            "moisture": 52.0,
            "soil_temperature": 21.0,
            "environment": {"temperature": 24.0, "humidity": 55.0}
        },
        "-N2": {
            "timestamp": "2025-06-01T07:00:00Z",
            "environment": {"temperature": 36.4, "humidity": 22.0, "pressure": 1008.0},
            "rain": {"precipitation": 0.0},
            "probes": {
                "p1": {"soil_moisture": 24.0, "soil_temperature": 41.0},
                "p2": {"soil_moisture": 28.0, "soil_temperature": null},
                "p3": {"soil_humidity": 40.0}
            }
        },
        "-N0": "corrupted"
    }))
}

#[tokio::test]
async fn latest_reading_is_normalized_with_alerts() -> Result<()> {
    // ---
    let store = Arc::new(FixtureStore::with_records(field_records()));
    let base = spawn_app(store, Config::default()).await?;

    let url = format!("{base}/api/users/u1/fields/f1/sensor-data/latest");
    let body: Value = Client::new().get(&url).send().await?.json().await?;

    assert_eq!(body["readingId"], "-N2");
    assert_eq!(body["soil"]["moisture"], json!(26.0));
    assert_eq!(body["soil"]["temperature"], json!(41.0));
    assert_eq!(body["soil"]["humidity"], json!(40.0));
    assert_eq!(body["probes"]["p2"]["soil_moisture"], json!(28.0));
    assert_eq!(body["environment"]["pressure"], json!(1008.0));

    let types: Vec<&str> = body["alerts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["type"].as_str().unwrap())
        .collect();
    assert_eq!(
        types,
        vec!["dehydration_alert", "soil_temp_high", "temperature_high", "humidity_low"]
    );
    assert_eq!(body["alerts"][0]["severity"], "critical");
    assert_eq!(
        body["alerts"][2]["message"],
        "High temperature detected: 36.4°C"
    );

    Ok(())
}

#[tokio::test]
async fn essential_rule_set_limits_alerts() -> Result<()> {
    // ---
    let store = Arc::new(FixtureStore::with_records(field_records()));
    let config = Config {
        alert_rule_set: RuleSet::Essential,
        ..Config::default()
    };
    let base = spawn_app(store, config).await?;

    let url = format!("{base}/api/users/u1/fields/f1/sensor-data/latest");
    let body: Value = Client::new().get(&url).send().await?.json().await?;

    assert_eq!(body["alerts"].as_array().unwrap().len(), 2);
    Ok(())
}

#[tokio::test]
async fn history_is_chronological_without_alerts() -> Result<()> {
    // ---
    let store = Arc::new(FixtureStore::with_records(field_records()));
    let base = spawn_app(store, Config::default()).await?;
    let client = Client::new();

    let url = format!("{base}/api/users/u1/fields/f1/sensor-data/history");
    let body: Value = client.get(&url).send().await?.json().await?;
    let readings = body["readings"].as_array().unwrap();

    let ids: Vec<&str> = readings
        .iter()
        .map(|r| r["readingId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["-N0", "-N1", "-N2"]);
    assert!(readings[0]["error"].is_string(), "corrupted record should degrade");
    assert!(readings.iter().all(|r| r.get("alerts").is_none()));
    assert!(readings[1]["probes"].is_null());

    let url = format!("{base}/api/users/u1/fields/f1/sensor-data/history?limit=1");
    let body: Value = client.get(&url).send().await?.json().await?;
    assert_eq!(body["readings"].as_array().unwrap().len(), 1);
    assert_eq!(body["readings"][0]["readingId"], "-N2");

    let url = format!("{base}/api/users/u1/fields/f1/sensor-data/history?limit=0");
    let response = client.get(&url).send().await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn current_alerts_only_actionable() -> Result<()> {
    // ---
    let records = snapshot(json!({
        "-A": {"timestamp": 1717221600, "moisture": 91.5, "environment": {"humidity": 85}}
    }));
    let base = spawn_app(
        Arc::new(FixtureStore::with_records(records)),
        Config::default(),
    )
    .await?;

    let url = format!("{base}/api/users/u1/fields/f1/alerts/current");
    let body: Value = Client::new().get(&url).send().await?.json().await?;

    assert_eq!(body["total_alerts"], 1);
    assert_eq!(body["alerts"][0]["type"], "pest_alert");
    assert_eq!(body["timestamp"], json!(1717221600));
    Ok(())
}

#[tokio::test]
async fn missing_and_failing_stores() -> Result<()> {
    // ---
    let client = Client::new();

    let base = spawn_app(Arc::new(FixtureStore::empty()), Config::default()).await?;
    let latest = client
        .get(format!("{base}/api/users/u1/fields/f1/sensor-data/latest"))
        .send()
        .await?;
    assert_eq!(latest.status(), StatusCode::NOT_FOUND);

    let history: Value = client
        .get(format!("{base}/api/users/u1/fields/f1/sensor-data/history"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(history, json!({"readings": []}));

    let base = spawn_app(Arc::new(FailingStore), Config::default()).await?;
    let response = client
        .get(format!("{base}/api/users/u1/fields/f1/sensor-data/latest"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await?;
    assert_eq!(body["code"], "STORE_UNAVAILABLE");

    Ok(())
}

#[tokio::test]
async fn health_and_disabled_alert_log() -> Result<()> {
    // ---
    let base = spawn_app(Arc::new(FixtureStore::default()), Config::default()).await?;
    let client = Client::new();

    let health: Value = client.get(format!("{base}/health")).send().await?.json().await?;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["store"], "fixture");
    assert_eq!(health["alert_rules"], "extended");
    assert_eq!(health["alert_log"], false);

    let logged: Value = client
        .get(format!("{base}/api/users/u1/fields/f1/alerts"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(logged, json!({"alerts": []}));

    Ok(())
}

#[tokio::test]
async fn invalid_ids_and_query_are_bad_requests() -> Result<()> {
    // ---
    let base = spawn_app(Arc::new(FixtureStore::default()), Config::default()).await?;
    let client = Client::new();

    for path in [
        "/api/users/u1/fields/a.b/sensor-data/latest",
        "/api/users/u%23x/fields/f1/sensor-data/history",
        "/api/users/u1/fields/a$b/alerts/current",
    ] {
        let response = client.get(format!("{base}{path}")).send().await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
        let body: Value = response.json().await?;
        assert_eq!(body["code"], "BAD_REQUEST", "{path}");
    }

    let url = format!("{base}/api/users/u1/fields/f1/sensor-data/history?limit=abc");
    let response = client.get(&url).send().await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["error"].is_string());

    Ok(())
}
