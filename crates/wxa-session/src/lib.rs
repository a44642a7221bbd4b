// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Session layer of the weather anomaly pipeline.
//!
//! Owns the per-location cache of trained detectors, the [`DataSource`]
//! boundary (with a synthetic generator and a degraded-mode fallback
//! wrapper), and the [`WeatherReport`] query contract that presentation
//! layers consume.

pub mod report;
pub mod session;
pub mod source;

pub use report::{CurrentConditions, HistoryPoint, WeatherReport};
pub use session::{SessionConfig, SessionManager};
pub use source::{DataSource, FallbackSource, SyntheticSource};
