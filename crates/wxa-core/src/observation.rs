// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::WxaError;
use chrono::{DateTime, Utc};

/// One raw weather reading. Immutable once constructed.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub temp: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub wind_speed: f64,
}

impl Observation {
    /// Constructs a validated observation; every reading must be finite.
    pub fn new(
        timestamp: DateTime<Utc>,
        temp: f64,
        humidity: f64,
        pressure: f64,
        wind_speed: f64,
    ) -> Result<Self, WxaError> {
        for (name, value) in [
            ("temp", temp),
            ("humidity", humidity),
            ("pressure", pressure),
            ("wind_speed", wind_speed),
        ] {
            if !value.is_finite() {
                return Err(WxaError::invalid_input(format!(
                    "Observation.{name} must be finite; got {value}"
                )));
            }
        }

        Ok(Self {
            timestamp,
            temp,
            humidity,
            pressure,
            wind_speed,
        })
    }
}

/// A sequence of observations ordered by timestamp.
///
/// Producers are not required to pre-sort; the feature engine sorts before
/// deriving anything. Duplicate timestamps are kept as-is.
pub type ObservationSeries = Vec<Observation>;
