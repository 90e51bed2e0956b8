//! Alert engine: fixed threshold rules over a canonical reading.
//!
//! Two rule sets are supported:
//!
//! | Rule set    | Version | Rules                                      |
//! |-------------|---------|--------------------------------------------|
//! | `extended`  | v2      | all seven rules below (default)            |
//! | `essential` | v1      | dehydration, soil temperature, pest only   |
//!
//! Rules, in output order:
//!
//! 1. soil moisture < 30 %            → `dehydration_alert` (critical)
//! 2. soil temperature > 40 °C        → `soil_temp_high` (warning)
//! 3. air humidity > 80 % or soil humidity > 85 % → `pest_alert` (warning)
//! 4. air temperature > 35 °C         → `temperature_high` (warning)
//! 5. air temperature < 10 °C         → `temperature_low` (warning)
//! 6. air humidity < 30 %             → `humidity_low` (warning)
//! 7. soil moisture > 80 %            → `soil_wet` (info)
//!
//! A rule whose inputs are absent is skipped; absence never counts as zero.

use std::{fmt, str::FromStr};

use anyhow::anyhow;

use crate::models::{Alert, AlertKind, CanonicalReading};

// ---

pub const DEHYDRATION_MOISTURE_PCT: f64 = 30.0;
pub const SOIL_TEMP_HIGH_C: f64 = 40.0;
pub const PEST_AIR_HUMIDITY_PCT: f64 = 80.0;
pub const PEST_SOIL_HUMIDITY_PCT: f64 = 85.0;
pub const AIR_TEMP_HIGH_C: f64 = 35.0;
pub const AIR_TEMP_LOW_C: f64 = 10.0;
pub const AIR_HUMIDITY_LOW_PCT: f64 = 30.0;
pub const SOIL_WET_MOISTURE_PCT: f64 = 80.0;

/// Versioned alert rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleSet {
    // ---
    /// Dehydration, soil temperature and pest rules only.
    Essential,
    /// Full seven-rule table.
    #[default]
    Extended,
}

impl RuleSet {
    // ---
    pub fn name(self) -> &'static str {
        match self {
            RuleSet::Essential => "essential",
            RuleSet::Extended => "extended",
        }
    }

    pub fn version(self) -> &'static str {
        match self {
            RuleSet::Essential => "v1",
            RuleSet::Extended => "v2",
        }
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.version())
    }
}

impl FromStr for RuleSet {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "essential" | "v1" => Ok(RuleSet::Essential),
            "extended" | "v2" => Ok(RuleSet::Extended),
            other => Err(anyhow!(
                "unknown alert rule set '{other}' (expected 'extended' or 'essential')"
            )),
        }
    }
}

/// Evaluate the default (extended) rule set.
pub fn evaluate(reading: &CanonicalReading) -> Vec<Alert> {
    evaluate_with(reading, RuleSet::default())
}

/// Evaluate `rule_set` against `reading`. Pure and total.
pub fn evaluate_with(reading: &CanonicalReading, rule_set: RuleSet) -> Vec<Alert> {
    // ---
    let soil_moisture = reading.soil.moisture;
    let soil_temp = reading.soil.temperature;
    let soil_humidity = reading.soil.humidity;
    let air_temp = reading.environment_metric("temperature");
    let air_humidity = reading.environment_metric("humidity");

    let mut alerts = Vec::new();

    if let Some(moisture) = soil_moisture.filter(|m| *m < DEHYDRATION_MOISTURE_PCT) {
        alerts.push(Alert::new(
            AlertKind::DehydrationAlert,
            "Area is Dehydrated! Start irrigation!".to_string(),
            format!(
                "Soil moisture is critically low at {moisture:.1}%. Immediate irrigation required."
            ),
        ));
    }

    if let Some(temp) = soil_temp.filter(|t| *t > SOIL_TEMP_HIGH_C) {
        alerts.push(Alert::new(
            AlertKind::SoilTempHigh,
            "High soil temperature detected!".to_string(),
            format!("Soil temperature is {temp:.1}°C. Consider shading or irrigation."),
        ));
    }

    let humid_air = air_humidity.is_some_and(|h| h > PEST_AIR_HUMIDITY_PCT);
    let humid_soil = soil_humidity.is_some_and(|h| h > PEST_SOIL_HUMIDITY_PCT);
    if humid_air || humid_soil {
        alerts.push(Alert::new(
            AlertKind::PestAlert,
            "Pest Alert! Be Aware!".to_string(),
            format!(
                "High humidity detected (Air: {}, Soil: {}). Pests may affect your crops. Monitor closely.",
                percent(air_humidity),
                percent(soil_humidity),
            ),
        ));
    }

    if rule_set == RuleSet::Essential {
        return alerts;
    }

    match air_temp {
        Some(temp) if temp > AIR_TEMP_HIGH_C => alerts.push(Alert::new(
            AlertKind::TemperatureHigh,
            format!("High temperature detected: {temp:.1}°C"),
            "Consider irrigation to cool the soil".to_string(),
        )),
        Some(temp) if temp < AIR_TEMP_LOW_C => alerts.push(Alert::new(
            AlertKind::TemperatureLow,
            format!("Low temperature detected: {temp:.1}°C"),
            "Consider frost protection measures".to_string(),
        )),
        _ => {}
    }

    if let Some(humidity) = air_humidity.filter(|h| *h < AIR_HUMIDITY_LOW_PCT) {
        alerts.push(Alert::new(
            AlertKind::HumidityLow,
            format!("Low humidity detected: {humidity:.1}%"),
            "Consider irrigation".to_string(),
        ));
    }

    if let Some(moisture) = soil_moisture.filter(|m| *m > SOIL_WET_MOISTURE_PCT) {
        alerts.push(Alert::new(
            AlertKind::SoilWet,
            format!("High soil moisture: {moisture:.1}%"),
            "Check drainage system".to_string(),
        ));
    }

    alerts
}

fn percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.1}%"),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::{Severity, SoilReading, Timestamp};
    use serde_json::{json, Map, Value};
    use std::collections::HashSet;

    fn reading(soil: SoilReading, environment: Value) -> CanonicalReading {
        // ---
        let environment = match environment {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        CanonicalReading {
            reading_id: "r".to_string(),
            timestamp: Timestamp::Iso("2025-06-01T06:00:00Z".to_string()),
            environment,
            rain: Map::new(),
            soil,
            probes: None,
        }
    }

    fn kinds(alerts: &[Alert]) -> Vec<AlertKind> {
        alerts.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn test_dry_hot_soil_fires_dehydration_and_soil_temp() {
        // ---
        let r = reading(
            SoilReading {
                moisture: Some(25.0),
                temperature: Some(45.0),
                humidity: None,
            },
            json!({}),
        );

        let alerts = evaluate(&r);
        assert_eq!(alerts.len(), 2);
        let fired: HashSet<_> = alerts.iter().map(|a| (a.kind, a.severity)).collect();
        assert_eq!(
            fired,
            HashSet::from([
                (AlertKind::DehydrationAlert, Severity::Critical),
                (AlertKind::SoilTempHigh, Severity::Warning),
            ])
        );
        assert_eq!(
            alerts[0].recommendation,
            "Soil moisture is critically low at 25.0%. Immediate irrigation required."
        );
        assert_eq!(
            alerts[1].recommendation,
            "Soil temperature is 45.0°C. Consider shading or irrigation."
        );
    }

    #[test]
    fn test_hot_dry_air_fires_high_temp_and_low_humidity_only() {
        // ---
        let r = reading(
            SoilReading::default(),
            json!({"temperature": 36, "humidity": 20}),
        );

        let alerts = evaluate(&r);
        assert_eq!(
            kinds(&alerts),
            vec![AlertKind::TemperatureHigh, AlertKind::HumidityLow]
        );
        assert_eq!(alerts[0].message, "High temperature detected: 36.0°C");
        assert_eq!(alerts[1].message, "Low humidity detected: 20.0%");
    }

    #[test]
    fn test_nominal_reading_fires_nothing() {
        // ---
        let r = reading(
            SoilReading {
                moisture: Some(50.0),
                temperature: Some(25.0),
                humidity: None,
            },
            json!({"humidity": 50}),
        );
        assert!(evaluate(&r).is_empty());
    }

    #[test]
    fn test_absent_inputs_never_trigger() {
        // ---
        let r = reading(SoilReading::default(), json!({"temperature": null}));
        assert!(evaluate(&r).is_empty());
    }

    #[test]
    fn test_thresholds_are_strict() {
        // ---
        let r = reading(
            SoilReading {
                moisture: Some(30.0),
                temperature: Some(40.0),
                humidity: Some(85.0),
            },
            json!({"temperature": 35.0, "humidity": 80.0}),
        );
        assert!(evaluate(&r).is_empty());

        let r = reading(SoilReading::default(), json!({"temperature": 10.0, "humidity": 30.0}));
        assert!(evaluate(&r).is_empty());
    }

    #[test]
    fn test_pest_alert_from_soil_humidity_alone() {
        // ---
        let r = reading(
            SoilReading {
                moisture: None,
                temperature: None,
                humidity: Some(86.3),
            },
            json!({}),
        );

        let alerts = evaluate(&r);
        assert_eq!(kinds(&alerts), vec![AlertKind::PestAlert]);
        assert_eq!(
            alerts[0].recommendation,
            "High humidity detected (Air: n/a, Soil: 86.3%). Pests may affect your crops. Monitor closely."
        );
        assert_eq!(alerts[0].color, "yellow");
    }

    #[test]
    fn test_all_rules_can_co_fire_in_table_order() {
        // ---
        let r = reading(
            SoilReading {
                moisture: Some(90.0),
                temperature: Some(41.0),
                humidity: None,
            },
            json!({"temperature": 5.0, "humidity": 85.0}),
        );

        assert_eq!(
            kinds(&evaluate(&r)),
            vec![
                AlertKind::SoilTempHigh,
                AlertKind::PestAlert,
                AlertKind::TemperatureLow,
                AlertKind::SoilWet,
            ]
        );
    }

    #[test]
    fn test_essential_rule_set_stops_after_pest_rule() {
        // ---
        let r = reading(
            SoilReading {
                moisture: Some(10.0),
                temperature: None,
                humidity: None,
            },
            json!({"temperature": 2.0, "humidity": 95.0}),
        );

        assert_eq!(
            kinds(&evaluate_with(&r, RuleSet::Essential)),
            vec![AlertKind::DehydrationAlert, AlertKind::PestAlert]
        );
        assert_eq!(
            kinds(&evaluate_with(&r, RuleSet::Extended)),
            vec![
                AlertKind::DehydrationAlert,
                AlertKind::PestAlert,
                AlertKind::TemperatureLow,
            ]
        );
    }

    #[test]
    fn test_rule_set_parsing() {
        // ---
        assert_eq!("Extended".parse::<RuleSet>().unwrap(), RuleSet::Extended);
        assert_eq!("v1".parse::<RuleSet>().unwrap(), RuleSet::Essential);
        assert!("everything".parse::<RuleSet>().is_err());
        assert_eq!(RuleSet::default().to_string(), "extended (v2)");
    }
}
