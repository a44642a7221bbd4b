// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::warn;
use wxa_core::{Observation, ObservationSeries, StableRng, WxaError};

/// Hourly cadence of generated backfill data.
const POINTS_PER_DAY: u32 = 24;
/// Number of spike pairs injected into generated backfill.
const INJECTED_ANOMALIES: usize = 5;
/// Stream separator so historical and live draws never share a sequence.
const LIVE_STREAM: u64 = 0xa076_1d64_78bd_642f;

/// Raw observation supplier consumed by the session layer.
///
/// `fetch_historical` must return a non-empty series ordered by timestamp
/// ascending; synthesizing data when a real backend cannot serve the window
/// is the implementor's job, not the pipeline's.
pub trait DataSource {
    fn fetch_live(&self) -> Result<Observation, WxaError>;
    fn fetch_historical(&self, window_days: u32) -> Result<ObservationSeries, WxaError>;

    /// True when the most recent data was substituted rather than fetched
    /// from the primary backend. Defaults to never degraded.
    fn is_degraded(&self) -> bool {
        false
    }
}

/// Deterministic synthetic weather generator.
///
/// Produces a diurnal temperature/humidity cycle with Gaussian noise and a
/// handful of injected spike pairs (a heat spike followed by a humidity
/// drop), mirroring what a demo backfill looks like. Fully reproducible for
/// a fixed seed and anchor.
#[derive(Debug)]
pub struct SyntheticSource {
    seed: u64,
    anchor: Option<DateTime<Utc>>,
    live_rng: Mutex<StableRng>,
}

impl SyntheticSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            anchor: None,
            live_rng: Mutex::new(StableRng::new(seed ^ LIVE_STREAM)),
        }
    }

    /// Pins the generator to a fixed "now", making every fetch fully
    /// reproducible. Intended for tests.
    pub fn with_anchor(seed: u64, anchor: DateTime<Utc>) -> Self {
        Self {
            seed,
            anchor: Some(anchor),
            live_rng: Mutex::new(StableRng::new(seed ^ LIVE_STREAM)),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.anchor.unwrap_or_else(Utc::now)
    }
}

impl DataSource for SyntheticSource {
    fn fetch_live(&self) -> Result<Observation, WxaError> {
        let mut rng = self
            .live_rng
            .lock()
            .map_err(|_| WxaError::source_unavailable("synthetic live rng poisoned"))?;

        Observation::new(
            self.now(),
            20.0 + rng.normal(0.0, 5.0),
            50.0 + rng.normal(0.0, 10.0),
            1013.0 + rng.normal(0.0, 5.0),
            5.0 + rng.normal(0.0, 2.0),
        )
    }

    fn fetch_historical(&self, window_days: u32) -> Result<ObservationSeries, WxaError> {
        if window_days == 0 {
            return Err(WxaError::invalid_input(
                "fetch_historical requires window_days >= 1; got 0",
            ));
        }

        let n = (window_days * POINTS_PER_DAY) as usize;
        // Each (seed, window) pair is its own stream, so repeated fetches of
        // the same window return identical series.
        let mut rng = StableRng::new(
            self.seed ^ u64::from(window_days).wrapping_mul(0x9e37_79b9_7f4a_7c15),
        );

        let end = self.now();
        let mut temps = Vec::with_capacity(n);
        let mut humidities = Vec::with_capacity(n);
        let mut pressures = Vec::with_capacity(n);
        let mut winds = Vec::with_capacity(n);
        for i in 0..n {
            let phase = i as f64 * 2.0 * std::f64::consts::PI / f64::from(POINTS_PER_DAY);
            temps.push(20.0 + 10.0 * phase.sin() + rng.normal(0.0, 2.0));
            humidities.push(50.0 + 20.0 * phase.cos() + rng.normal(0.0, 5.0));
            pressures.push(1013.0 + rng.normal(0.0, 3.0));
            winds.push(5.0 + rng.normal(0.0, 1.0));
        }

        // Spike pairs: a heat spike, then a humidity drop on the next point.
        for _ in 0..INJECTED_ANOMALIES {
            let idx = rng.gen_range(n)?;
            temps[idx] += 15.0;
            if idx + 1 < n {
                humidities[idx + 1] -= 30.0;
            }
        }

        let mut series = Vec::with_capacity(n);
        for i in 0..n {
            let offset = (n - 1 - i) as i64;
            series.push(Observation::new(
                end - Duration::hours(offset),
                temps[i],
                humidities[i],
                pressures[i],
                winds[i],
            )?);
        }
        Ok(series)
    }
}

/// Wraps a primary source and substitutes synthetic data when it fails.
///
/// The substitution keeps the pipeline operable offline, but it is never
/// silent: each fallback is logged and latches [`DataSource::is_degraded`],
/// which the session layer copies into every report.
#[derive(Debug)]
pub struct FallbackSource<P> {
    primary: P,
    fallback: SyntheticSource,
    degraded: AtomicBool,
}

impl<P: DataSource> FallbackSource<P> {
    pub fn new(primary: P, fallback: SyntheticSource) -> Self {
        Self {
            primary,
            fallback,
            degraded: AtomicBool::new(false),
        }
    }
}

impl<P: DataSource> DataSource for FallbackSource<P> {
    fn fetch_live(&self) -> Result<Observation, WxaError> {
        match self.primary.fetch_live() {
            Ok(obs) => Ok(obs),
            Err(err) => {
                warn!(error = %err, "live fetch failed, substituting synthetic observation");
                self.degraded.store(true, Ordering::Relaxed);
                self.fallback.fetch_live()
            }
        }
    }

    fn fetch_historical(&self, window_days: u32) -> Result<ObservationSeries, WxaError> {
        match self.primary.fetch_historical(window_days) {
            Ok(series) if !series.is_empty() => Ok(series),
            Ok(_) => {
                warn!(window_days, "primary returned an empty window, substituting synthetic series");
                self.degraded.store(true, Ordering::Relaxed);
                self.fallback.fetch_historical(window_days)
            }
            Err(err) => {
                warn!(error = %err, window_days, "historical fetch failed, substituting synthetic series");
                self.degraded.store(true, Ordering::Relaxed);
                self.fallback.fetch_historical(window_days)
            }
        }
    }

    fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }
}
