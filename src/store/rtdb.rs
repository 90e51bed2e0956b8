use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{validate_path_segment, SensorStore};
use crate::models::RawSnapshot;

// ---

/// Roots tried after the configured one, in order.
const FALLBACK_ROOTS: [&str; 2] = ["sensorData", "sensorReadings"];

/// Firebase Realtime Database reader.
///
/// Records for a pair live at `{root}/{user_id}/{field_id}` as a mapping of
/// record key to raw record.
#[derive(Debug, Clone)]
pub struct RtdbStore {
    // ---
    client: Client,
    base_url: String,
    roots: Vec<String>,
    auth: Option<String>,
}

impl RtdbStore {
    // ---
    pub fn new(base_url: &str, preferred_root: &str, auth: Option<String>) -> Result<Self> {
        // ---
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            bail!("FIREBASE_RTDB_URL must be an http(s) URL, got '{}'", base_url);
        }

        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client for RTDB")?;

        Ok(RtdbStore {
            client,
            base_url,
            roots: candidate_roots(preferred_root),
            auth,
        })
    }

    fn record_url(&self, root: &str, user_id: &str, field_id: &str) -> String {
        format!("{}/{}/{}/{}.json", self.base_url, root, user_id, field_id)
    }
}

#[async_trait]
impl SensorStore for RtdbStore {
    // ---
    async fn fetch_records(&self, user_id: &str, field_id: &str) -> Result<Option<RawSnapshot>> {
        // ---
        validate_path_segment("user_id", user_id)?;
        validate_path_segment("field_id", field_id)?;

        let mut answered = false;
        let mut last_error = None;

        for root in &self.roots {
            let url = self.record_url(root, user_id, field_id);
            debug!("Fetching RTDB records from: {}", url);

            let mut request = self.client.get(&url);
            if let Some(auth) = &self.auth {
                request = request.query(&[("auth", auth)]);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    debug!("RTDB root '{}' request failed: {}", root, e);
                    last_error = Some(anyhow!(e));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                debug!("RTDB root '{}' answered {}", root, status);
                last_error = Some(anyhow!("RTDB returned {} for root '{}'", status, root));
                continue;
            }

            let body: Value = match response.json().await {
                Ok(body) => body,
                Err(e) => {
                    debug!("RTDB root '{}' returned an unreadable body: {}", root, e);
                    last_error = Some(anyhow!(e));
                    continue;
                }
            };
            answered = true;

            match body {
                Value::Object(records) if !records.is_empty() => {
                    info!(
                        "Using RTDB root '{}' with {} records for {}/{}",
                        root,
                        records.len(),
                        user_id,
                        field_id
                    );
                    return Ok(Some(records));
                }
                Value::Null => debug!("RTDB root '{}' has no records", root),
                other => warn!(
                    "RTDB root '{}' holds a non-object value for {}/{}: {}",
                    root, user_id, field_id, other
                ),
            }
        }

        match last_error {
            Some(e) if !answered => Err(e.context("No RTDB root could be read")),
            _ => Ok(None),
        }
    }

    fn kind(&self) -> &'static str {
        "rtdb"
    }
}

/// Configured root first, then the fallbacks, without duplicates.
fn candidate_roots(preferred: &str) -> Vec<String> {
    // ---
    let mut roots = Vec::new();
    let preferred = preferred.trim().trim_matches('/');
    if !preferred.is_empty() {
        roots.push(preferred.to_string());
    }
    for root in FALLBACK_ROOTS {
        if !roots.iter().any(|r| r == root) {
            roots.push(root.to_string());
        }
    }
    roots
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_candidate_roots_order_and_dedup() {
        // ---
        assert_eq!(
            candidate_roots("/farmData/"),
            vec!["farmData", "sensorData", "sensorReadings"]
        );
        assert_eq!(
            candidate_roots("sensorReadings"),
            vec!["sensorReadings", "sensorData"]
        );
        assert_eq!(candidate_roots(""), vec!["sensorData", "sensorReadings"]);
    }

    #[test]
    fn test_record_url() {
        // ---
        let store = RtdbStore::new("https://demo.firebaseio.com/", "sensorData", None).unwrap();
        assert_eq!(
            store.record_url("sensorData", "u1", "f1"),
            "https://demo.firebaseio.com/sensorData/u1/f1.json"
        );
    }

    #[test]
    fn test_rejects_non_http_url() {
        assert!(RtdbStore::new("demo.firebaseio.com", "sensorData", None).is_err());
    }
}
