// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Feature engineering for weather observation series.
//!
//! [`engineer`] turns a raw, possibly unsorted observation series into a
//! fixed-width feature table: a trailing rolling temperature mean, the
//! deviation of each reading from that mean, and two diagnostic columns
//! (calendar hour, one-step temperature lag). The subset consumed by the
//! detector is exported through [`FeatureTable::to_matrix`].

use chrono::{DateTime, Timelike, Utc};
use wxa_core::{FeatureMatrix, Observation, WxaError};

/// Trailing window length for the rolling temperature mean, current row
/// included.
pub const ROLL_WINDOW: usize = 6;

/// Number of columns handed to the detector:
/// temp, humidity, pressure, wind_speed, temp_delta.
pub const DETECTOR_DIMS: usize = 5;

/// One engineered row. Field order mirrors the derivation order; `hour`
/// and `temp_lag_1` are diagnostic only and never reach the detector.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureRow {
    pub timestamp: DateTime<Utc>,
    pub temp: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub wind_speed: f64,
    pub hour: u32,
    pub temp_roll_avg: f64,
    pub temp_delta: f64,
    pub temp_lag_1: f64,
}

/// Engineered feature table in timestamp order.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureTable {
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }

    /// Exports the detector subset as a validated `n x 5` matrix.
    pub fn to_matrix(&self) -> Result<FeatureMatrix, WxaError> {
        let mut values = Vec::with_capacity(self.rows.len() * DETECTOR_DIMS);
        for row in &self.rows {
            values.extend_from_slice(&[
                row.temp,
                row.humidity,
                row.pressure,
                row.wind_speed,
                row.temp_delta,
            ]);
        }
        FeatureMatrix::new(values, self.rows.len(), DETECTOR_DIMS)
    }
}

/// Derives the feature table for a series.
///
/// The input need not be pre-sorted; rows are stable-sorted by timestamp
/// ascending first, so duplicate timestamps keep their relative order. An
/// empty series yields an empty table. Pure and deterministic.
pub fn engineer(series: &[Observation]) -> FeatureTable {
    let mut sorted: Vec<Observation> = series.to_vec();
    sorted.sort_by_key(|obs| obs.timestamp);

    let n = sorted.len();
    let mut roll_avg: Vec<Option<f64>> = vec![None; n];
    let mut lag: Vec<Option<f64>> = vec![None; n];

    for i in 0..n {
        if i + 1 >= ROLL_WINDOW {
            let window = &sorted[i + 1 - ROLL_WINDOW..=i];
            let sum: f64 = window.iter().map(|obs| obs.temp).sum();
            roll_avg[i] = Some(sum / ROLL_WINDOW as f64);
        }
        if i >= 1 {
            lag[i] = Some(sorted[i - 1].temp);
        }
    }

    backfill(&mut roll_avg);
    backfill(&mut lag);

    let rows = sorted
        .iter()
        .enumerate()
        .map(|(i, obs)| {
            // Series shorter than the window (or a single row) leaves the
            // rolling/lag columns undefined even after backfill; they then
            // collapse to the reading itself, making the delta zero.
            let temp_roll_avg = roll_avg[i].unwrap_or(obs.temp);
            let temp_lag_1 = lag[i].unwrap_or(obs.temp);
            FeatureRow {
                timestamp: obs.timestamp,
                temp: obs.temp,
                humidity: obs.humidity,
                pressure: obs.pressure,
                wind_speed: obs.wind_speed,
                hour: obs.timestamp.hour(),
                temp_roll_avg,
                temp_delta: obs.temp - temp_roll_avg,
                temp_lag_1,
            }
        })
        .collect();

    FeatureTable { rows }
}

/// Fills leading `None`s with the nearest later defined value, walking
/// backwards through the column.
fn backfill(column: &mut [Option<f64>]) {
    let mut next_defined = None;
    for slot in column.iter_mut().rev() {
        match *slot {
            Some(value) => next_defined = Some(value),
            None => *slot = next_defined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{engineer, FeatureTable, DETECTOR_DIMS, ROLL_WINDOW};
    use chrono::{Duration, TimeZone, Utc};
    use wxa_core::Observation;

    fn hourly_series(temps: &[f64]) -> Vec<Observation> {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        temps
            .iter()
            .enumerate()
            .map(|(i, &temp)| {
                Observation::new(
                    start + Duration::hours(i as i64),
                    temp,
                    50.0 + i as f64,
                    1013.0,
                    5.0,
                )
                .expect("test observations are finite")
            })
            .collect()
    }

    #[test]
    fn empty_series_yields_empty_table() {
        let table = engineer(&[]);
        assert!(table.is_empty());
        let matrix = table.to_matrix().expect("empty table exports empty matrix");
        assert!(matrix.is_empty());
    }

    #[test]
    fn row_count_is_preserved_and_output_is_sorted() {
        let mut series = hourly_series(&[20.0, 21.0, 19.5, 22.0, 18.0, 20.5, 23.0, 19.0]);
        series.swap(0, 7);
        series.swap(2, 5);

        let table = engineer(&series);
        assert_eq!(table.len(), series.len());

        let timestamps: Vec<_> = table.rows().iter().map(|r| r.timestamp).collect();
        let mut expected = timestamps.clone();
        expected.sort();
        assert_eq!(timestamps, expected);
    }

    #[test]
    fn rolling_average_matches_exact_trailing_mean_once_window_is_full() {
        let temps = [20.0, 22.0, 18.0, 24.0, 16.0, 26.0, 14.0, 28.0];
        let table = engineer(&hourly_series(&temps));

        for i in (ROLL_WINDOW - 1)..temps.len() {
            let expected: f64 =
                temps[i + 1 - ROLL_WINDOW..=i].iter().sum::<f64>() / ROLL_WINDOW as f64;
            let row = table.rows()[i];
            assert!(
                (row.temp_roll_avg - expected).abs() < 1e-12,
                "row {i}: got {}, expected {expected}",
                row.temp_roll_avg
            );
            assert!((row.temp_delta - (temps[i] - expected)).abs() < 1e-12);
        }
    }

    #[test]
    fn leading_rows_are_backfilled_from_the_first_full_window() {
        let temps = [20.0, 22.0, 18.0, 24.0, 16.0, 26.0, 14.0];
        let table = engineer(&hourly_series(&temps));

        let first_defined = table.rows()[ROLL_WINDOW - 1].temp_roll_avg;
        for i in 0..ROLL_WINDOW - 1 {
            let row = table.rows()[i];
            assert_eq!(row.temp_roll_avg, first_defined, "row {i} not backfilled");
            assert!((row.temp_delta - (temps[i] - first_defined)).abs() < 1e-12);
        }
    }

    #[test]
    fn lag_column_shifts_by_one_and_backfills_the_first_row() {
        let temps = [20.0, 22.0, 18.0];
        let table = engineer(&hourly_series(&temps));

        // Row 0 has no predecessor; backfill pulls row 1's lag, which is
        // row 0's own temperature.
        assert_eq!(table.rows()[0].temp_lag_1, 20.0);
        assert_eq!(table.rows()[1].temp_lag_1, 20.0);
        assert_eq!(table.rows()[2].temp_lag_1, 22.0);
    }

    #[test]
    fn single_row_series_does_not_panic_and_has_zero_delta() {
        let table = engineer(&hourly_series(&[21.0]));
        assert_eq!(table.len(), 1);

        let row = table.rows()[0];
        assert_eq!(row.temp_roll_avg, 21.0);
        assert_eq!(row.temp_delta, 0.0);
        assert_eq!(row.temp_lag_1, 21.0);
    }

    #[test]
    fn short_series_without_a_full_window_collapses_deltas_to_zero() {
        let table = engineer(&hourly_series(&[20.0, 22.0, 18.0, 24.0]));
        for row in table.rows() {
            assert_eq!(row.temp_roll_avg, row.temp);
            assert_eq!(row.temp_delta, 0.0);
        }
    }

    #[test]
    fn derivation_is_deterministic_and_order_stable() {
        let series = hourly_series(&[20.0, 21.0, 19.5, 22.0, 18.0, 20.5, 23.0, 19.0, 24.5]);
        let mut shuffled = series.clone();
        shuffled.reverse();
        shuffled.swap(1, 6);

        let from_sorted = engineer(&series);
        let from_shuffled = engineer(&shuffled);
        assert_eq!(from_sorted, from_shuffled);

        let deltas_a: Vec<f64> = from_sorted.rows().iter().map(|r| r.temp_delta).collect();
        let deltas_b: Vec<f64> = from_shuffled.rows().iter().map(|r| r.temp_delta).collect();
        assert_eq!(deltas_a, deltas_b);
    }

    #[test]
    fn hour_column_reflects_the_calendar_hour() {
        let table = engineer(&hourly_series(&[20.0, 21.0, 22.0]));
        let hours: Vec<u32> = table.rows().iter().map(|r| r.hour).collect();
        assert_eq!(hours, vec![0, 1, 2]);
    }

    #[test]
    fn matrix_export_keeps_row_order_and_the_detector_subset() {
        let temps = [20.0, 22.0, 18.0, 24.0, 16.0, 26.0, 14.0];
        let table = engineer(&hourly_series(&temps));
        let matrix = table.to_matrix().expect("engineered table is finite");

        assert_eq!(matrix.n(), temps.len());
        assert_eq!(matrix.d(), DETECTOR_DIMS);
        for (row, feature_row) in matrix.rows().zip(table.rows()) {
            assert_eq!(
                row,
                &[
                    feature_row.temp,
                    feature_row.humidity,
                    feature_row.pressure,
                    feature_row.wind_speed,
                    feature_row.temp_delta,
                ]
            );
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn feature_table_serde_roundtrip() {
        let table = engineer(&hourly_series(&[20.0, 22.0, 18.0]));
        let encoded = serde_json::to_string(&table).expect("serialize table");
        let decoded: FeatureTable = serde_json::from_str(&encoded).expect("deserialize table");
        assert_eq!(decoded, table);
    }

    #[test]
    fn default_table_is_empty() {
        assert!(FeatureTable::default().is_empty());
        assert!(FeatureTable::default().last().is_none());
    }
}
