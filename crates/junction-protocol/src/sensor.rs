use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters for `configure`. The supervisor memoizes the last-seen
/// instance of this per plugin so it can be replayed after a restart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureParams {
    pub collector_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_places: Option<i64>,
}

/// A single measurement reported by a plugin. `uniqueSensorKey` must be
/// unique within one `fetchSensors` reply; `value` is always a string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorRecord {
    pub unique_sensor_key: String,
    pub name: String,
    pub value: String,
    pub unit: String,
    pub category: String,
    pub decimal_places: u8,
    pub sensor_type: String,
    pub component_name: String,
    pub sensor_tag: String,
}

/// A plugin located by discovery: where it lives, what to run, and its
/// raw manifest block for anything the host wants beyond `name`/`version`/`entry`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiscoveredPlugin {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
    pub entry: String,
    pub manifest: Value,
}

/// Clamps a raw `decimalPlaces` input to the valid `[0, 15]` range.
pub fn clamp_decimal_places(n: i64) -> u8 {
    n.clamp(0, 15) as u8
}

/// Counts the digits after the decimal point in the canonical form of a
/// numeric string, with trailing zeros collapsed. Non-numeric input
/// (including the empty string) yields `0`.
pub fn decimal_places_of(s: &str) -> u8 {
    let trimmed = s.trim();
    let Ok(value) = trimmed.parse::<f64>() else {
        return 0;
    };
    if !value.is_finite() {
        return 0;
    }
    match trimmed.split_once('.') {
        Some((_, fraction)) => fraction.trim_end_matches('0').len() as u8,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_into_range() {
        assert_eq!(clamp_decimal_places(-5), 0);
        assert_eq!(clamp_decimal_places(0), 0);
        assert_eq!(clamp_decimal_places(15), 15);
        assert_eq!(clamp_decimal_places(42), 15);
    }

    #[test]
    fn counts_fractional_digits_with_trailing_zeros_collapsed() {
        assert_eq!(decimal_places_of("1.50"), 1);
        assert_eq!(decimal_places_of("1.00"), 0);
        assert_eq!(decimal_places_of("1.234"), 3);
        assert_eq!(decimal_places_of("42"), 0);
    }

    #[test]
    fn non_numeric_input_yields_zero() {
        assert_eq!(decimal_places_of(""), 0);
        assert_eq!(decimal_places_of("not-a-number"), 0);
    }
}
