use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use super::lag_bins::bin_pairs;
use super::{ExperimentalVariogram, LagBounds, VariogramParams};
use crate::error::{KrigingError, Result};

/// Experimental covariance, one entry per populated lag bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentalCovariance {
    pub lags: Vec<LagBounds>,
    pub covariance: Vec<f64>,
    pub counts: Vec<u32>,
}

fn check_inputs(points: &[Point2<f64>], values: &[f64]) -> Result<()> {
    if points.len() != values.len() {
        return Err(KrigingError::InvalidInput(format!(
            "{} points but {} values",
            points.len(),
            values.len()
        )));
    }
    if let Some(p) = points.iter().find(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(KrigingError::InvalidInput(format!(
            "point ({}, {}) has non-finite coordinates",
            p.x, p.y
        )));
    }
    if let Some(v) = values.iter().find(|v| !v.is_finite()) {
        return Err(KrigingError::InvalidInput(format!(
            "non-finite point value {v}"
        )));
    }
    Ok(())
}

/// Classical semivariance of point data, `Σ (z_i - z_j)² / (2 N(h))`.
pub fn point_semivariance(
    points: &[Point2<f64>],
    values: &[f64],
    params: &VariogramParams,
) -> Result<ExperimentalVariogram> {
    check_inputs(points, values)?;
    let bins = bin_pairs(points, params)?;

    let (mut lags, mut semivariance, mut counts) = (vec![], vec![], vec![]);
    for (bounds, pairs) in bins.populated() {
        let sq = pairs
            .iter()
            .map(|p| (values[p.i] - values[p.j]).powi(2))
            .sum::<f64>();
        lags.push(*bounds);
        semivariance.push(sq / (2.0 * pairs.len() as f64));
        counts.push(pairs.len() as u32);
    }

    Ok(ExperimentalVariogram::new(lags, semivariance, counts))
}

/// Experimental covariance of point data, `Σ z_i z_j / N(h) - μ²` with `μ` the mean of all values.
pub fn point_covariance(
    points: &[Point2<f64>],
    values: &[f64],
    params: &VariogramParams,
) -> Result<ExperimentalCovariance> {
    check_inputs(points, values)?;
    let bins = bin_pairs(points, params)?;

    let mean = if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    };

    let (mut lags, mut covariance, mut counts) = (vec![], vec![], vec![]);
    for (bounds, pairs) in bins.populated() {
        let prod = pairs
            .iter()
            .map(|p| values[p.i] * values[p.j])
            .sum::<f64>();
        lags.push(*bounds);
        covariance.push(prod / pairs.len() as f64 - mean * mean);
        counts.push(pairs.len() as u32);
    }

    Ok(ExperimentalCovariance {
        lags,
        covariance,
        counts,
    })
}
