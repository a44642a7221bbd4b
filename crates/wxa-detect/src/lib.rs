// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Seeded isolation forest over engineered weather features.
//!
//! The ensemble isolates points with randomized axis-aligned splits; points
//! that isolate in fewer splits score as more anomalous. Training fixes a
//! decision threshold from the configured contamination fraction, so callers
//! use [`TrainedForest::classify`] rather than re-deriving verdicts from raw
//! scores.

pub mod forest;

pub use forest::{ForestConfig, IsolationForest, TrainedForest};
