// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::WxaError;

/// Owned row-major numeric matrix handed from the feature engine to the
/// detector. `n` rows (points in time order), `d` columns (features).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureMatrix {
    values: Vec<f64>,
    n: usize,
    d: usize,
}

impl FeatureMatrix {
    /// Constructs a validated matrix. `n == 0` is allowed (empty table);
    /// `d` must be at least 1 and every value finite.
    pub fn new(values: Vec<f64>, n: usize, d: usize) -> Result<Self, WxaError> {
        if d == 0 {
            return Err(WxaError::invalid_input("FeatureMatrix d must be >= 1"));
        }

        let expected_len = n
            .checked_mul(d)
            .ok_or_else(|| WxaError::invalid_input("n*d overflow while validating shape"))?;
        if values.len() != expected_len {
            return Err(WxaError::invalid_input(format!(
                "value length mismatch: got {}, expected {expected_len} (n={n}, d={d})",
                values.len()
            )));
        }

        if let Some((idx, value)) = values
            .iter()
            .copied()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(WxaError::invalid_input(format!(
                "FeatureMatrix values must be finite: index {idx} has {value}"
            )));
        }

        Ok(Self { values, n, d })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn d(&self) -> usize {
        self.d
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Borrowed view of row `t`; `None` past the end.
    pub fn row(&self, t: usize) -> Option<&[f64]> {
        if t >= self.n {
            return None;
        }
        Some(&self.values[t * self.d..(t + 1) * self.d])
    }

    /// Iterator over rows in time order.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks_exact(self.d)
    }
}
