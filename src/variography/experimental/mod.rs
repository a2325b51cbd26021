use itertools::izip;
use serde::{Deserialize, Serialize};

use crate::error::{KrigingError, Result};

pub mod lag_bins;
pub mod point;
pub mod weighted;

/// Upper bound on the number of lag bins a configuration may produce.
pub const MAX_LAG_BINS: usize = 1 << 20;

/// Lag binning configuration shared by all experimental estimators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariogramParams {
    pub step_size: f64,
    pub max_range: f64,
}

impl VariogramParams {
    pub fn new(step_size: f64, max_range: f64) -> Self {
        Self {
            step_size,
            max_range,
        }
    }

    /// Splits `max_range` into `n_lags` equal steps.
    pub fn with_divisions(max_range: f64, n_lags: usize) -> Self {
        Self::new(max_range / n_lags.max(1) as f64, max_range)
    }

    /// A non-positive range can never produce a populated bin, which is reported as
    /// [`KrigingError::InsufficientData`] rather than as a bad parameter.
    pub fn validate(&self) -> Result<()> {
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(KrigingError::InvalidParameter {
                name: "step_size",
                value: self.step_size,
                reason: "must be finite and > 0",
            });
        }
        if self.max_range.is_nan() || self.max_range.is_infinite() {
            return Err(KrigingError::InvalidParameter {
                name: "max_range",
                value: self.max_range,
                reason: "must be finite",
            });
        }
        if self.max_range <= 0.0 {
            return Err(KrigingError::InsufficientData {
                bins: 0,
                required: 2,
            });
        }
        let n_lags = (self.max_range / self.step_size).ceil();
        if !n_lags.is_finite() || n_lags > MAX_LAG_BINS as f64 {
            return Err(KrigingError::InvalidParameter {
                name: "step_size",
                value: self.step_size,
                reason: "produces more than MAX_LAG_BINS lag bins",
            });
        }
        Ok(())
    }

    pub fn n_lags(&self) -> usize {
        ((self.max_range / self.step_size).ceil() as usize).max(1)
    }

    /// Half-open intervals `[k * step, (k + 1) * step)` covering `max_range`.
    pub fn lag_bounds(&self) -> Vec<LagBounds> {
        (0..self.n_lags())
            .map(|k| {
                LagBounds::new(
                    k as f64 * self.step_size,
                    (k + 1) as f64 * self.step_size,
                )
            })
            .collect()
    }

    /// Bin index of a pair distance, `None` for coincident pairs or pairs beyond `max_range`.
    /// A pair exactly at `max_range` lands in the last bin.
    #[inline(always)]
    pub fn bin_of(&self, distance: f64) -> Option<usize> {
        if !distance.is_finite() || distance <= 0.0 || distance > self.max_range {
            return None;
        }
        let k = (distance / self.step_size).floor() as usize;
        Some(k.min(self.n_lags() - 1))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LagBounds {
    pub lb: f64,
    pub ub: f64,
}

impl LagBounds {
    pub fn new(lb: f64, ub: f64) -> Self {
        Self { lb, ub }
    }

    pub fn mid_point(&self) -> f64 {
        (self.lb + self.ub) / 2f64
    }
}

/// Experimental semivariogram. Only populated bins are stored, in ascending lag order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentalVariogram {
    pub lags: Vec<LagBounds>,
    pub semivariance: Vec<f64>,
    pub counts: Vec<u32>,
}

impl ExperimentalVariogram {
    pub fn new(lags: Vec<LagBounds>, semivariance: Vec<f64>, counts: Vec<u32>) -> Self {
        debug_assert_eq!(lags.len(), semivariance.len());
        debug_assert_eq!(lags.len(), counts.len());
        Self {
            lags,
            semivariance,
            counts,
        }
    }

    pub fn len(&self) -> usize {
        self.lags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lags.is_empty()
    }

    /// Representative distance of each bin (its mid point).
    pub fn lag_distances(&self) -> Vec<f64> {
        self.lags.iter().map(LagBounds::mid_point).collect()
    }

    /// `(lag distance, semivariance, pair count)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, u32)> + '_ {
        izip!(
            self.lags.iter(),
            self.semivariance.iter(),
            self.counts.iter()
        )
        .map(|(l, g, c)| (l.mid_point(), *g, *c))
    }

    pub fn max_semivariance(&self) -> Option<f64> {
        self.semivariance
            .iter()
            .copied()
            .filter(|g| g.is_finite())
            .max_by(|a, b| a.total_cmp(b))
    }
}
