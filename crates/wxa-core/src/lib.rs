// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Core shared types for the weather anomaly workspace.

pub mod error;
pub mod matrix;
pub mod observation;
pub mod rng;

pub use error::WxaError;
pub use matrix::FeatureMatrix;
pub use observation::{Observation, ObservationSeries};
pub use rng::StableRng;
