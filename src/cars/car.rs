//! Vehicle record model.
//!
//! The upstream API returns vehicles as loosely structured JSON objects whose
//! field set differs between the cheap list endpoint (identity fields like
//! `vin`, `nickname`, `model_name`) and the per-VIN detail endpoint (telemetry
//! under `ev_info`, `location`, `odometer`, timestamps). `Car` keeps the raw
//! field map so detail records can overlay list records key by key, and layers
//! typed accessors on top for the values consumers actually display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One vehicle's state, keyed by VIN.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Car {
    fields: Map<String, Value>,
}

/// High-level activity state derived from the telemetry flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarStatus {
    Charging,
    Running,
    AcOn,
    Idle,
}

impl Car {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Raw access to a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Overlay a detail record onto this list record.
    ///
    /// Every key present in `detail` overwrites the list value; keys present
    /// only in the list record survive; keys present only in the detail
    /// record are added.
    pub fn merge_detail(&mut self, detail: Car) {
        for (key, value) in detail.fields {
            self.fields.insert(key, value);
        }
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn vin(&self) -> Option<&str> {
        self.str_field("vin")
    }

    pub fn nickname(&self) -> Option<&str> {
        self.str_field("nickname")
    }

    pub fn model_name(&self) -> Option<&str> {
        self.str_field("model_name")
    }

    pub fn make(&self) -> Option<&str> {
        self.str_field("make")
    }

    /// Display label: nickname, then model name, then "Car {vin}".
    pub fn display_name(&self) -> String {
        if let Some(nickname) = self.nickname() {
            return nickname.to_string();
        }
        if let Some(model) = self.model_name() {
            return model.to_string();
        }
        match self.vin() {
            Some(vin) => format!("Car {vin}"),
            None => "Car".to_string(),
        }
    }

    /// Look up a telemetry value in `ev_info`, falling back to the top-level
    /// field of the same name when `ev_info` lacks it.
    fn ev_field(&self, key: &str) -> Option<&Value> {
        if let Some(Value::Object(ev)) = self.fields.get("ev_info") {
            if let Some(value) = ev.get(key) {
                return Some(value);
            }
        }
        self.fields.get(key)
    }

    /// State of charge in percent.
    pub fn soc(&self) -> Option<f64> {
        self.ev_field("soc").and_then(Value::as_f64)
    }

    pub fn soc_display(&self) -> Option<f64> {
        self.ev_field("soc_display").and_then(Value::as_f64)
    }

    /// Remaining range with the A/C on, in the unit reported by the car.
    pub fn range_acon(&self) -> Option<f64> {
        self.ev_field("range_acon").and_then(Value::as_f64)
    }

    /// Remaining range with the A/C off.
    pub fn range_acoff(&self) -> Option<f64> {
        self.ev_field("range_acoff").and_then(Value::as_f64)
    }

    pub fn charge_bars(&self) -> Option<i64> {
        self.ev_field("charge_bars").and_then(Value::as_i64)
    }

    /// Whether the charge cable is connected.
    pub fn plugged_in(&self) -> Option<bool> {
        self.ev_field("plugged_in").and_then(Value::as_bool)
    }

    pub fn charging(&self) -> Option<bool> {
        self.ev_field("charging").and_then(Value::as_bool)
    }

    pub fn quick_charging(&self) -> Option<bool> {
        self.ev_field("quick_charging").and_then(Value::as_bool)
    }

    pub fn ac_status(&self) -> Option<bool> {
        self.ev_field("ac_status").and_then(Value::as_bool)
    }

    pub fn car_running(&self) -> Option<bool> {
        self.ev_field("car_running").and_then(Value::as_bool)
    }

    /// Odometer reading; some server versions report it only inside `ev_info`.
    pub fn odometer(&self) -> Option<i64> {
        self.fields
            .get("odometer")
            .or_else(|| self.ev_field("odometer"))
            .and_then(Value::as_i64)
    }

    fn location_object(&self) -> Option<&Map<String, Value>> {
        for key in ["last_location", "location"] {
            if let Some(Value::Object(loc)) = self.fields.get(key) {
                return Some(loc);
            }
        }
        None
    }

    /// GPS position as (latitude, longitude).
    ///
    /// Reads `last_location` or `location`, accepting both the short
    /// (`lat`/`lon`) and long (`latitude`/`longitude`) key forms and values
    /// encoded as numbers or numeric strings.
    pub fn position(&self) -> Option<(f64, f64)> {
        let loc = self.location_object()?;
        let lat = coordinate(loc.get("lat").or_else(|| loc.get("latitude"))?)?;
        let lon = coordinate(loc.get("lon").or_else(|| loc.get("longitude"))?)?;
        Some((lat, lon))
    }

    /// Friendly location label (zone name or address), when the server
    /// provides one.
    pub fn location_name(&self) -> Option<&str> {
        let loc = self.location_object()?;
        loc.get("name")
            .or_else(|| loc.get("address"))
            .and_then(Value::as_str)
    }

    /// Timestamp reported by the car: `ev_info.last_updated`, then the
    /// location record's `last_updated`, then `last_connection`.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        let ev_ts = match self.fields.get("ev_info") {
            Some(Value::Object(ev)) => ev.get("last_updated"),
            _ => None,
        };
        let loc_ts = self.location_object().and_then(|loc| loc.get("last_updated"));
        let raw = ev_ts
            .or(loc_ts)
            .or_else(|| self.fields.get("last_connection"))?
            .as_str()?;
        parse_timestamp(raw)
    }

    /// High-level activity state, in priority order.
    pub fn status(&self) -> CarStatus {
        if self.charging().unwrap_or(false) {
            CarStatus::Charging
        } else if self.car_running().unwrap_or(false) {
            CarStatus::Running
        } else if self.ac_status().unwrap_or(false) {
            CarStatus::AcOn
        } else {
            CarStatus::Idle
        }
    }
}

fn coordinate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Parse an ISO 8601 timestamp like `2026-01-04T12:00:00Z`, with or without
/// fractional seconds.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn car(value: serde_json::Value) -> Car {
        serde_json::from_value(value).expect("test JSON should deserialize")
    }

    #[test]
    fn test_merge_detail_overrides_and_retains() {
        let mut listed = car(json!({
            "vin": "V1",
            "nickname": "Blue Leaf",
            "odometer": 100
        }));
        let detail = car(json!({
            "vin": "V1",
            "odometer": 12345,
            "ev_info": {"soc": 80}
        }));

        listed.merge_detail(detail);

        // Detail wins for shared keys, detail-only keys are added,
        // list-only keys survive.
        assert_eq!(listed.odometer(), Some(12345));
        assert_eq!(listed.soc(), Some(80.0));
        assert_eq!(listed.nickname(), Some("Blue Leaf"));
        assert_eq!(listed.vin(), Some("V1"));
    }

    #[test]
    fn test_display_name_precedence() {
        assert_eq!(
            car(json!({"vin": "V1", "nickname": "Zippy", "model_name": "Leaf"})).display_name(),
            "Zippy"
        );
        assert_eq!(
            car(json!({"vin": "V1", "model_name": "Leaf"})).display_name(),
            "Leaf"
        );
        assert_eq!(car(json!({"vin": "V1"})).display_name(), "Car V1");
        assert_eq!(car(json!({})).display_name(), "Car");
    }

    #[test]
    fn test_ev_fields_fall_back_to_top_level() {
        let nested = car(json!({"ev_info": {"soc": 70, "plugged_in": true}}));
        assert_eq!(nested.soc(), Some(70.0));
        assert_eq!(nested.plugged_in(), Some(true));

        let flat = car(json!({"soc": 55, "charging": false}));
        assert_eq!(flat.soc(), Some(55.0));
        assert_eq!(flat.charging(), Some(false));
    }

    #[test]
    fn test_odometer_prefers_top_level() {
        let both = car(json!({"odometer": 200, "ev_info": {"odometer": 999}}));
        assert_eq!(both.odometer(), Some(200));

        let nested_only = car(json!({"ev_info": {"odometer": 999}}));
        assert_eq!(nested_only.odometer(), Some(999));
    }

    #[test]
    fn test_position_accepts_both_key_and_value_forms() {
        let short = car(json!({"location": {"lat": 52.1, "lon": 21.0}}));
        assert_eq!(short.position(), Some((52.1, 21.0)));

        let long = car(json!({"location": {"latitude": "52.1", "longitude": "21.0"}}));
        assert_eq!(long.position(), Some((52.1, 21.0)));

        // last_location takes precedence over location
        let both = car(json!({
            "last_location": {"lat": 1.0, "lon": 2.0},
            "location": {"lat": 3.0, "lon": 4.0}
        }));
        assert_eq!(both.position(), Some((1.0, 2.0)));

        let missing = car(json!({"location": {"lat": 52.1}}));
        assert_eq!(missing.position(), None);
    }

    #[test]
    fn test_location_name() {
        let named = car(json!({"location": {"lat": 1.0, "lon": 2.0, "name": "Home"}}));
        assert_eq!(named.location_name(), Some("Home"));

        let addressed = car(json!({"location": {"address": "Main St 1"}}));
        assert_eq!(addressed.location_name(), Some("Main St 1"));
    }

    #[test]
    fn test_last_updated_priority_and_parsing() {
        let with_ev = car(json!({
            "ev_info": {"last_updated": "2026-01-04T12:00:00Z"},
            "last_connection": "2026-01-01T00:00:00Z"
        }));
        let ts = with_ev.last_updated().expect("timestamp should parse");
        assert_eq!(ts.to_rfc3339(), "2026-01-04T12:00:00+00:00");

        let fractional = car(json!({
            "last_connection": "2026-01-04T12:00:10.419903Z"
        }));
        assert!(fractional.last_updated().is_some());

        let garbage = car(json!({"last_connection": "yesterday"}));
        assert!(garbage.last_updated().is_none());
    }

    #[test]
    fn test_status_priority() {
        let charging = car(json!({"ev_info": {"charging": true, "car_running": true}}));
        assert_eq!(charging.status(), CarStatus::Charging);

        let running = car(json!({"ev_info": {"car_running": true, "ac_status": true}}));
        assert_eq!(running.status(), CarStatus::Running);

        let ac = car(json!({"ev_info": {"ac_status": true}}));
        assert_eq!(ac.status(), CarStatus::AcOn);

        assert_eq!(car(json!({})).status(), CarStatus::Idle);
    }
}
