//! Data models shared by the normalizer, the alert engine and the HTTP layer.
//!
//! Field names on the wire are fixed by existing dashboard consumers
//! (`readingId`, `environment`, `rain`, `soil`, `probes`, `alerts`), so every
//! serialized type here pins its names explicitly.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

// ---

/// Raw records for one (user, field) pair, keyed by record id.
pub type RawSnapshot = Map<String, Value>;

/// Reading timestamp, either as the store sent it or generated at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    // ---
    /// Numeric epoch as delivered by the device.
    Epoch(Number),
    /// ISO-8601 text.
    Iso(String),
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Epoch(n) => write!(f, "{n}"),
            Timestamp::Iso(s) => f.write_str(s),
        }
    }
}

/// Soil measurements. `None` serializes as `null` and is never the same as `0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoilReading {
    // ---
    pub moisture: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

/// Schema-unified reading consumed by alerting and presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalReading {
    // ---
    pub reading_id: String,
    pub timestamp: Timestamp,
    pub environment: Map<String, Value>,
    pub rain: Map<String, Value>,
    pub soil: SoilReading,
    /// Untouched per-probe breakdown; `null` for legacy records.
    pub probes: Option<Map<String, Value>>,
}

impl CanonicalReading {
    // ---
    /// Numeric view of an environment entry.
    ///
    /// Environment groups are passed through verbatim, so the value may be a
    /// number, a numeric string, or something else entirely. Anything that is
    /// not a finite number reads as absent.
    pub fn environment_metric(&self, key: &str) -> Option<f64> {
        // ---
        let value = match self.environment.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        value.filter(|v| v.is_finite())
    }
}

/// Minimal reading returned when a raw record could not be normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DegradedReading {
    // ---
    pub reading_id: String,
    pub error: String,
}

/// Outcome of normalizing one raw record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalizedReading {
    // ---
    Complete(CanonicalReading),
    Degraded(DegradedReading),
}

impl NormalizedReading {
    // ---
    pub fn reading_id(&self) -> &str {
        match self {
            NormalizedReading::Complete(r) => &r.reading_id,
            NormalizedReading::Degraded(r) => &r.reading_id,
        }
    }

    pub fn timestamp(&self) -> Option<&Timestamp> {
        match self {
            NormalizedReading::Complete(r) => Some(&r.timestamp),
            NormalizedReading::Degraded(_) => None,
        }
    }

    pub fn as_complete(&self) -> Option<&CanonicalReading> {
        match self {
            NormalizedReading::Complete(r) => Some(r),
            NormalizedReading::Degraded(_) => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, NormalizedReading::Degraded(_))
    }
}

/// Closed set of alert types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    // ---
    DehydrationAlert,
    SoilTempHigh,
    PestAlert,
    TemperatureHigh,
    TemperatureLow,
    HumidityLow,
    SoilWet,
}

impl AlertKind {
    // ---
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::DehydrationAlert => "dehydration_alert",
            AlertKind::SoilTempHigh => "soil_temp_high",
            AlertKind::PestAlert => "pest_alert",
            AlertKind::TemperatureHigh => "temperature_high",
            AlertKind::TemperatureLow => "temperature_low",
            AlertKind::HumidityLow => "humidity_low",
            AlertKind::SoilWet => "soil_wet",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            AlertKind::DehydrationAlert => Severity::Critical,
            AlertKind::SoilWet => Severity::Info,
            _ => Severity::Warning,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            AlertKind::DehydrationAlert | AlertKind::SoilWet => "💧",
            AlertKind::SoilTempHigh | AlertKind::TemperatureHigh => "🌡️",
            AlertKind::PestAlert => "🐛",
            AlertKind::TemperatureLow => "❄️",
            AlertKind::HumidityLow => "☁️",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            AlertKind::DehydrationAlert => "red",
            AlertKind::SoilTempHigh | AlertKind::TemperatureHigh | AlertKind::HumidityLow => {
                "orange"
            }
            AlertKind::PestAlert => "yellow",
            AlertKind::TemperatureLow | AlertKind::SoilWet => "blue",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    // ---
    Critical,
    Warning,
    Info,
}

impl Severity {
    // ---
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }

    /// Critical and warning alerts are shown on the dashboard banner.
    pub fn is_actionable(self) -> bool {
        matches!(self, Severity::Critical | Severity::Warning)
    }
}

/// Severity-tagged advisory derived from a canonical reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    // ---
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub recommendation: String,
    pub icon: String,
    pub color: String,
}

impl Alert {
    // ---
    pub fn new(kind: AlertKind, message: String, recommendation: String) -> Self {
        Alert {
            kind,
            severity: kind.severity(),
            message,
            recommendation,
            icon: kind.icon().to_string(),
            color: kind.color().to_string(),
        }
    }
}

/// Most recent reading with its freshly evaluated alerts.
#[derive(Debug, Clone, Serialize)]
pub struct LatestReading {
    // ---
    #[serde(flatten)]
    pub reading: NormalizedReading,
    pub alerts: Vec<Alert>,
}

/// Chronologically ordered readings. No alerts are attached to history.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    // ---
    pub readings: Vec<NormalizedReading>,
}

/// Actionable alerts for the latest reading.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentAlerts {
    // ---
    pub alerts: Vec<Alert>,
    pub timestamp: Option<Timestamp>,
    pub total_alerts: usize,
}

/// Alert row persisted in the optional alert log.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoredAlert {
    // ---
    pub id: Uuid,
    pub user_id: String,
    pub field_id: String,
    pub reading_id: String,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub severity: String,
    pub message: String,
    pub recommendation: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
