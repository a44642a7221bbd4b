// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The live reading with its verdict. Field names are the wire contract
/// consumed by dashboards; do not rename.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub wind_speed: f64,
    pub timestamp: DateTime<Utc>,
    pub is_anomaly: bool,
    pub score: f64,
}

/// One chart point of classified history.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub temp: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub is_anomaly: bool,
}

/// Full answer to a location query: the scored live point, a classified
/// history window for charting, and its mean temperature. `degraded` is
/// additive to the wire contract and marks substituted (synthetic) data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub location: String,
    pub current: CurrentConditions,
    pub history: Vec<HistoryPoint>,
    pub mean_temp: f64,
    pub degraded: bool,
}

/// Rounds to two decimals for wire values.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rounds to three decimals for scores.
pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
