//! Reading normalizer.
//!
//! Turns one raw telemetry record into a [`CanonicalReading`]. Two record
//! shapes exist in the store:
//!
//! - legacy flat records with `moisture`, `soil_temperature`, `soil_humidity`
//!   at the top level, and
//! - multi-probe records carrying a `probes` mapping of probe id to
//!   `soil_moisture` / `soil_temperature` / `soil_humidity`.
//!
//! The shape is decided once by [`RawRecord::detect`]. Every extraction step
//! validates its own input; the first failure becomes a
//! [`NormalizedReading::Degraded`] carrying the error text, so callers always
//! get something to render.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{
    CanonicalReading, DegradedReading, NormalizedReading, SoilReading, Timestamp,
};

// ---

/// Why a raw record could not be normalized.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    // ---
    #[error("record is not a JSON object (found {found})")]
    NotAnObject { found: &'static str },

    #[error("field `{field}` has unexpected type {found}")]
    InvalidField { field: String, found: &'static str },
}

/// A raw record resolved into one of the known schema families.
#[derive(Debug, Clone, Copy)]
pub enum RawRecord<'a> {
    // ---
    /// Top-level record fields.
    Legacy(&'a Map<String, Value>),
    /// The `probes` mapping.
    MultiProbe(&'a Map<String, Value>),
}

impl<'a> RawRecord<'a> {
    // ---
    /// Multi-probe iff `probes` is present and mapping-typed. An empty
    /// mapping is still multi-probe: it yields null soil values rather than
    /// falling back to the legacy fields.
    pub fn detect(fields: &'a Map<String, Value>) -> Self {
        match fields.get("probes") {
            Some(Value::Object(probes)) => RawRecord::MultiProbe(probes),
            _ => RawRecord::Legacy(fields),
        }
    }

    fn soil(&self) -> Result<SoilReading, NormalizeError> {
        // ---
        match *self {
            RawRecord::Legacy(fields) => Ok(SoilReading {
                moisture: measurement("moisture", fields.get("moisture"))?,
                temperature: measurement("soil_temperature", fields.get("soil_temperature"))?,
                humidity: measurement("soil_humidity", fields.get("soil_humidity"))?,
            }),
            RawRecord::MultiProbe(probes) => Ok(SoilReading {
                moisture: probe_mean(probes, "soil_moisture")?,
                temperature: probe_mean(probes, "soil_temperature")?,
                humidity: probe_mean(probes, "soil_humidity")?,
            }),
        }
    }

    fn probes(&self) -> Option<Map<String, Value>> {
        match *self {
            RawRecord::Legacy(_) => None,
            RawRecord::MultiProbe(probes) => Some(probes.clone()),
        }
    }
}

/// Normalize a raw record, stamping records without a timestamp with the
/// current wall-clock time.
pub fn normalize(key: &str, raw: &Value) -> NormalizedReading {
    normalize_at(key, raw, Utc::now())
}

/// Normalize a raw record with an explicit clock.
///
/// `now` is used only when the record carries neither `timestamp` nor `time`,
/// so identical input and clock always give identical output.
pub fn normalize_at(key: &str, raw: &Value, now: DateTime<Utc>) -> NormalizedReading {
    // ---
    match try_normalize(key, raw, now) {
        Ok(reading) => NormalizedReading::Complete(reading),
        Err(e) => {
            warn!(reading_id = key, error = %e, "Returning degraded reading");
            NormalizedReading::Degraded(DegradedReading {
                reading_id: key.to_string(),
                error: e.to_string(),
            })
        }
    }
}

/// Timestamp exactly as the record carries it, without the clock fallback.
///
/// Used to order records before normalizing them.
pub fn source_timestamp(raw: &Value) -> Option<Timestamp> {
    raw.as_object()
        .and_then(|fields| record_timestamp(fields).ok().flatten())
}

fn try_normalize(
    key: &str,
    raw: &Value,
    now: DateTime<Utc>,
) -> Result<CanonicalReading, NormalizeError> {
    // ---
    let fields = raw.as_object().ok_or(NormalizeError::NotAnObject {
        found: type_name(raw),
    })?;
    let record = RawRecord::detect(fields);

    let timestamp = record_timestamp(fields)?.unwrap_or_else(|| {
        debug!(reading_id = key, "No timestamp in record, using current time");
        Timestamp::Iso(now.to_rfc3339_opts(SecondsFormat::Millis, true))
    });

    let reading_id = if key.is_empty() {
        timestamp.to_string()
    } else {
        key.to_string()
    };

    Ok(CanonicalReading {
        reading_id,
        environment: environment(fields)?,
        rain: group(fields, "rain")?,
        soil: record.soil()?,
        probes: record.probes(),
        timestamp,
    })
}

/// `timestamp`, else `time`. Blank strings count as absent.
fn record_timestamp(fields: &Map<String, Value>) -> Result<Option<Timestamp>, NormalizeError> {
    // ---
    for field in ["timestamp", "time"] {
        match fields.get(field) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) if s.trim().is_empty() => continue,
            Some(Value::String(s)) => return Ok(Some(Timestamp::Iso(s.clone()))),
            Some(Value::Number(n)) => return Ok(Some(Timestamp::Epoch(n.clone()))),
            Some(other) => {
                return Err(NormalizeError::InvalidField {
                    field: field.to_string(),
                    found: type_name(other),
                })
            }
        }
    }
    Ok(None)
}

/// Nested `environment` group, copied verbatim.
///
/// Legacy flat records keep temperature, humidity and pressure at the top
/// level; when the nested group is missing those are gathered instead.
fn environment(fields: &Map<String, Value>) -> Result<Map<String, Value>, NormalizeError> {
    // ---
    if fields.get("environment").is_some_and(|v| !v.is_null()) {
        return group(fields, "environment");
    }

    const FLAT: [(&str, &[&str]); 3] = [
        ("temperature", &["temperature", "temp"]),
        ("humidity", &["humidity"]),
        ("pressure", &["pressure"]),
    ];

    let mut env = Map::new();
    for (target, sources) in FLAT {
        if let Some(value) = sources
            .iter()
            .filter_map(|s| fields.get(*s))
            .find(|v| !v.is_null())
        {
            env.insert(target.to_string(), value.clone());
        }
    }
    Ok(env)
}

fn group(fields: &Map<String, Value>, name: &str) -> Result<Map<String, Value>, NormalizeError> {
    // ---
    match fields.get(name) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(other) => Err(NormalizeError::InvalidField {
            field: name.to_string(),
            found: type_name(other),
        }),
    }
}

/// Mean of `field` across the probes that report it; `None` if none do.
fn probe_mean(probes: &Map<String, Value>, field: &str) -> Result<Option<f64>, NormalizeError> {
    // ---
    let mut sum = 0.0;
    let mut count = 0u32;

    for (probe_id, entry) in probes {
        let Some(entry) = entry.as_object() else {
            debug!(probe_id, "Skipping probe entry that is not an object");
            continue;
        };
        let path = format!("probes.{probe_id}.{field}");
        if let Some(value) = measurement(&path, entry.get(field))? {
            sum += value;
            count += 1;
        }
    }

    Ok((count > 0).then(|| sum / f64::from(count)))
}

/// A single measured value. Null, absent and blank read as `None`; numeric
/// strings are accepted since some firmware sends them.
fn measurement(field: &str, value: Option<&Value>) -> Result<Option<f64>, NormalizeError> {
    // ---
    let invalid = |found| NormalizeError::InvalidField {
        field: field.to_string(),
        found,
    };

    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => Some(
            s.trim()
                .parse::<f64>()
                .map_err(|_| invalid("non-numeric string"))?,
        ),
        Some(other) => return Err(invalid(type_name(other))),
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(invalid("non-finite number")),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
