//! Reading selection on top of the normalizer and the alert engine.
//!
//! The store hands back every raw record for a (user, field) pair. This
//! module picks the latest one (normalized, with alerts) or builds the
//! chronological history (normalized, no alerts).

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::alerts::{self, RuleSet};
use crate::models::{
    CurrentAlerts, HistoryResponse, LatestReading, NormalizedReading, RawSnapshot, Timestamp,
};
use crate::normalize::{normalize_at, source_timestamp};

// ---

/// Latest reading with the default rule set and the wall clock.
pub fn latest(snapshot: &RawSnapshot) -> Option<LatestReading> {
    latest_with(snapshot, RuleSet::default(), Utc::now())
}

/// Pick the record with the greatest source timestamp, normalize it and
/// evaluate `rule_set` against it.
///
/// Timestamps compare by the instant they denote, so ISO text and numeric
/// epochs mix freely. Records without a timestamp sort before all others.
/// On ties the record with the greater key wins, since store keys are issued
/// in insertion order.
pub fn latest_with(
    snapshot: &RawSnapshot,
    rule_set: RuleSet,
    now: DateTime<Utc>,
) -> Option<LatestReading> {
    // ---
    let (key, raw) = snapshot
        .iter()
        .map(|(key, raw)| (key, raw, source_timestamp(raw)))
        .max_by(|a, b| compare_timestamps(a.2.as_ref(), b.2.as_ref()))
        .map(|(key, raw, _)| (key, raw))?;

    debug!(reading_id = %key, candidates = snapshot.len(), "Selected latest record");

    let reading = normalize_at(key, raw, now);
    let alerts = reading
        .as_complete()
        .map(|r| alerts::evaluate_with(r, rule_set))
        .unwrap_or_default();

    Some(LatestReading { reading, alerts })
}

/// History with the wall clock.
pub fn history(snapshot: &RawSnapshot, limit: usize) -> HistoryResponse {
    history_at(snapshot, limit, Utc::now())
}

/// Normalize every record, oldest first, keeping the `limit` most recent.
/// Alerts are deliberately not evaluated for history.
///
/// Ordering uses the timestamp each reading ends up with, so records stamped
/// with `now` sort last and degraded readings (no timestamp) sort first.
pub fn history_at(snapshot: &RawSnapshot, limit: usize, now: DateTime<Utc>) -> HistoryResponse {
    // ---
    let mut readings: Vec<NormalizedReading> = snapshot
        .iter()
        .map(|(key, raw)| normalize_at(key, raw, now))
        .collect();

    // stable: equal timestamps keep key order
    readings.sort_by(|a, b| compare_timestamps(a.timestamp(), b.timestamp()));

    let skip = readings.len().saturating_sub(limit);
    HistoryResponse {
        readings: readings.split_off(skip),
    }
}

/// Critical and warning alerts of the latest reading.
pub fn current_alerts(latest: &LatestReading) -> CurrentAlerts {
    // ---
    let alerts: Vec<_> = latest
        .alerts
        .iter()
        .filter(|a| a.severity.is_actionable())
        .cloned()
        .collect();

    CurrentAlerts {
        total_alerts: alerts.len(),
        alerts,
        timestamp: latest.reading.timestamp().cloned(),
    }
}

/// Epoch values at or above this are milliseconds, not seconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

/// Order by the instant a timestamp denotes, whichever format carries it.
///
/// Missing < unparseable < parsed. Unparseable values fall back to epoch <
/// text, epochs numerically and text lexically.
fn compare_timestamps(a: Option<&Timestamp>, b: Option<&Timestamp>) -> Ordering {
    // ---
    fn rank(ts: Option<&Timestamp>) -> u8 {
        match ts {
            None => 0,
            Some(Timestamp::Epoch(_)) => 1,
            Some(Timestamp::Iso(_)) => 2,
        }
    }

    match (a.and_then(instant), b.and_then(instant)) {
        (Some(x), Some(y)) => return x.cmp(&y),
        (Some(_), None) => return Ordering::Greater,
        (None, Some(_)) => return Ordering::Less,
        (None, None) => {}
    }

    match (a, b) {
        (Some(Timestamp::Epoch(x)), Some(Timestamp::Epoch(y))) => {
            let x = x.as_f64().unwrap_or(f64::NEG_INFINITY);
            let y = y.as_f64().unwrap_or(f64::NEG_INFINITY);
            x.total_cmp(&y)
        }
        (Some(Timestamp::Iso(x)), Some(Timestamp::Iso(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// RFC 3339 text, or epoch seconds / milliseconds.
fn instant(ts: &Timestamp) -> Option<DateTime<Utc>> {
    // ---
    match ts {
        Timestamp::Iso(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Timestamp::Epoch(n) => {
            let value = n.as_f64().filter(|v| v.is_finite())?;
            let millis = if value.abs() >= EPOCH_MILLIS_THRESHOLD {
                value
            } else {
                value * 1000.0
            };
            DateTime::from_timestamp_millis(millis.round() as i64)
        }
    }
}
