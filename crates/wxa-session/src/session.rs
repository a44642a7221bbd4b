// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::report::{round2, round3, CurrentConditions, HistoryPoint, WeatherReport};
use crate::source::DataSource;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use wxa_core::{FeatureMatrix, Observation, WxaError};
use wxa_detect::{ForestConfig, IsolationForest, TrainedForest};
use wxa_features::{engineer, FeatureRow, DETECTOR_DIMS};

const DEFAULT_TRAIN_WINDOW_DAYS: u32 = 7;
const DEFAULT_CONTEXT_WINDOW_DAYS: u32 = 1;
const DEFAULT_CONTEXT_TAIL: usize = 10;
const DEFAULT_CHART_WINDOW_DAYS: u32 = 3;

/// Session layer configuration. Forest parameters beyond contamination and
/// seed keep their detector defaults.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionConfig {
    /// Default contamination for newly seen locations.
    pub contamination: f64,
    /// Historical window used to train a location's detector.
    pub train_window_days: u32,
    /// Window fetched on each live query to supply rolling context.
    pub context_window_days: u32,
    /// Number of trailing context points concatenated before the live one.
    pub context_tail: usize,
    /// Window classified for the report's chart history.
    pub chart_window_days: u32,
    /// Seed for detector training; one seed serves all locations.
    pub seed: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let forest = ForestConfig::default();
        Self {
            contamination: forest.contamination,
            train_window_days: DEFAULT_TRAIN_WINDOW_DAYS,
            context_window_days: DEFAULT_CONTEXT_WINDOW_DAYS,
            context_tail: DEFAULT_CONTEXT_TAIL,
            chart_window_days: DEFAULT_CHART_WINDOW_DAYS,
            seed: forest.seed,
        }
    }
}

impl SessionConfig {
    fn validate(&self) -> Result<(), WxaError> {
        // Contamination bounds are enforced by the forest config itself.
        IsolationForest::new(ForestConfig {
            contamination: self.contamination,
            seed: self.seed,
            ..ForestConfig::default()
        })?;

        for (name, value) in [
            ("train_window_days", self.train_window_days),
            ("context_window_days", self.context_window_days),
            ("chart_window_days", self.chart_window_days),
        ] {
            if value == 0 {
                return Err(WxaError::invalid_input(format!(
                    "SessionConfig.{name} must be >= 1; got 0"
                )));
            }
        }
        if self.context_tail == 0 {
            return Err(WxaError::invalid_input(
                "SessionConfig.context_tail must be >= 1; got 0",
            ));
        }
        Ok(())
    }
}

/// Per-location state: the contamination in force and, once trained, the
/// immutable forest. A `None` forest is the `Untrained` state.
#[derive(Debug)]
struct Slot {
    inner: Mutex<SlotState>,
}

#[derive(Debug)]
struct SlotState {
    contamination: f64,
    forest: Option<Arc<TrainedForest>>,
}

/// Per-location detector cache and query orchestrator.
///
/// Locations move `Untrained -> Trained` on their first query and stay
/// trained until [`SessionManager::set_contamination`] changes their
/// parameter; there is no time-based expiry. Entries are never evicted, so
/// the map grows with the number of distinct location keys — acceptable
/// here, a real deployment would want a bound.
///
/// Training for a key is serialized by that key's slot lock; scoring runs
/// against the shared immutable forest without holding any lock.
#[derive(Debug)]
pub struct SessionManager<S> {
    source: S,
    config: SessionConfig,
    slots: Mutex<HashMap<String, Arc<Slot>>>,
}

impl<S: DataSource> SessionManager<S> {
    pub fn new(source: S, config: SessionConfig) -> Result<Self, WxaError> {
        config.validate()?;
        Ok(Self {
            source,
            config,
            slots: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Answers one query for `location`: trains the detector on first
    /// contact, scores the live reading against rolling context, and
    /// classifies the chart window.
    pub fn query(&self, location: &str) -> Result<WeatherReport, WxaError> {
        if location.trim().is_empty() {
            return Err(WxaError::invalid_input("location key must be non-empty"));
        }

        let forest = self.trained_forest(location)?;
        debug!(location, "scoring live observation");

        let live = self.source.fetch_live()?;
        let (score, is_anomaly) = self.score_live(&forest, live)?;

        let chart = self.source.fetch_historical(self.config.chart_window_days)?;
        let table = engineer(&chart);
        let verdicts = forest.classify(&table.to_matrix()?)?;

        let history: Vec<HistoryPoint> = table
            .rows()
            .iter()
            .zip(&verdicts)
            .map(|(row, &is_anomaly)| HistoryPoint {
                timestamp: row.timestamp,
                temp: round2(row.temp),
                humidity: round2(row.humidity),
                pressure: round2(row.pressure),
                is_anomaly,
            })
            .collect();

        let mean_temp = if table.is_empty() {
            0.0
        } else {
            table.rows().iter().map(|row| row.temp).sum::<f64>() / table.len() as f64
        };

        Ok(WeatherReport {
            location: location.to_string(),
            current: CurrentConditions {
                temp: round2(live.temp),
                humidity: round2(live.humidity),
                pressure: round2(live.pressure),
                wind_speed: round2(live.wind_speed),
                timestamp: live.timestamp,
                is_anomaly,
                score: round3(score),
            },
            history,
            mean_temp: round2(mean_temp),
            degraded: self.source.is_degraded(),
        })
    }

    /// Changes a location's contamination. A differing value drops the
    /// trained forest, so the next query retrains; an equal value is a
    /// no-op and keeps the cached forest.
    pub fn set_contamination(&self, location: &str, contamination: f64) -> Result<(), WxaError> {
        // Validate eagerly so a bad parameter never poisons the slot.
        IsolationForest::new(ForestConfig {
            contamination,
            ..ForestConfig::default()
        })?;

        let slot = self.slot(location);
        let mut state = lock_recovering(&slot.inner);
        if state.contamination != contamination {
            info!(
                location,
                old = state.contamination,
                new = contamination,
                "contamination changed, dropping trained detector"
            );
            state.contamination = contamination;
            state.forest = None;
        }
        Ok(())
    }

    /// True once `location` holds a trained detector.
    pub fn is_trained(&self, location: &str) -> bool {
        let slots = lock_recovering(&self.slots);
        slots
            .get(location)
            .map(|slot| lock_recovering(&slot.inner).forest.is_some())
            .unwrap_or(false)
    }

    fn slot(&self, location: &str) -> Arc<Slot> {
        let mut slots = lock_recovering(&self.slots);
        Arc::clone(slots.entry(location.to_string()).or_insert_with(|| {
            Arc::new(Slot {
                inner: Mutex::new(SlotState {
                    contamination: self.config.contamination,
                    forest: None,
                }),
            })
        }))
    }

    /// Train-or-fetch under the slot lock; the returned forest is shared
    /// and immutable, so callers score without any lock.
    fn trained_forest(&self, location: &str) -> Result<Arc<TrainedForest>, WxaError> {
        let slot = self.slot(location);
        let mut state = lock_recovering(&slot.inner);

        if let Some(forest) = &state.forest {
            return Ok(Arc::clone(forest));
        }

        let history = self
            .source
            .fetch_historical(self.config.train_window_days)?;
        let matrix = engineer(&history).to_matrix()?;
        let forest = IsolationForest::new(ForestConfig {
            contamination: state.contamination,
            seed: self.config.seed,
            ..ForestConfig::default()
        })?
        .train(&matrix)?;

        info!(
            location,
            rows = matrix.n(),
            contamination = state.contamination,
            "trained location detector"
        );

        let forest = Arc::new(forest);
        state.forest = Some(Arc::clone(&forest));
        Ok(forest)
    }

    /// Scores the live point against a short rolling-context tail so its
    /// delta feature is well defined. Never retrains.
    fn score_live(
        &self,
        forest: &TrainedForest,
        live: Observation,
    ) -> Result<(f64, bool), WxaError> {
        let mut context = self
            .source
            .fetch_historical(self.config.context_window_days)?;
        if context.len() > self.config.context_tail {
            context.drain(..context.len() - self.config.context_tail);
        }
        context.push(live);

        let table = engineer(&context);
        let last = table
            .last()
            .ok_or_else(|| WxaError::insufficient_data("engineered live context is empty"))?;
        let matrix = last_row_matrix(last)?;

        let score = forest.score(&matrix)?[0];
        let is_anomaly = forest.classify(&matrix)?[0];
        Ok((score, is_anomaly))
    }
}

/// Locks a mutex, recovering from poisoning: slot state is a plain value,
/// so a panicked peer cannot leave it torn.
fn lock_recovering<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn last_row_matrix(row: &FeatureRow) -> Result<FeatureMatrix, WxaError> {
    FeatureMatrix::new(
        vec![
            row.temp,
            row.humidity,
            row.pressure,
            row.wind_speed,
            row.temp_delta,
        ],
        1,
        DETECTOR_DIMS,
    )
}
