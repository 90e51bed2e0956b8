use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::SensorStore;
use crate::models::RawSnapshot;

// ---

/// Static raw telemetry, identical for every (user, field) pair.
///
/// Records are raw store shapes, not canonical readings, so they go through
/// the normalizer like real data does.
#[derive(Debug, Clone)]
pub struct FixtureStore {
    records: RawSnapshot,
}

impl FixtureStore {
    // ---
    pub fn with_records(records: RawSnapshot) -> Self {
        FixtureStore { records }
    }

    /// A store with no records at all.
    pub fn empty() -> Self {
        FixtureStore {
            records: RawSnapshot::new(),
        }
    }
}

impl Default for FixtureStore {
    /// One legacy flat record followed by one multi-probe record.
    fn default() -> Self {
        // ---
        let records = json!({
            "fixture_001": {
                "timestamp": "2025-01-01T06:00:00Z",
                "moisture": 45.8,
                "soil_temperature": 22.4,
                "environment": {"temperature": 25.5, "humidity": 65.2, "pressure": 1013.25},
                "rain": {"precipitation": 0.0, "intensity": "none"}
            },
            "fixture_002": {
                "timestamp": "2025-01-01T07:00:00Z",
                "environment": {"temperature": 26.1, "humidity": 63.0, "pressure": 1013.1},
                "rain": {"precipitation": 0.0, "intensity": "none"},
                "probes": {
                    "probe_1": {"soil_moisture": 44.0, "soil_temperature": 22.0, "soil_humidity": 58.0},
                    "probe_2": {"soil_moisture": 48.0, "soil_temperature": 23.0, "soil_humidity": 61.0}
                }
            }
        });

        match records {
            Value::Object(records) => FixtureStore { records },
            _ => FixtureStore::empty(),
        }
    }
}

#[async_trait]
impl SensorStore for FixtureStore {
    // ---
    async fn fetch_records(&self, _user_id: &str, _field_id: &str) -> Result<Option<RawSnapshot>> {
        if self.records.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.records.clone()))
    }

    fn kind(&self) -> &'static str {
        "fixture"
    }
}
