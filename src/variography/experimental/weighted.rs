//! Population-weighted semivariance of areal rates.
//!
//! For every lag bin the estimator is
//!
//! ```text
//! γ(h) = Σ w_ij (z_i - z_j)² / (2 Σ w_ij),    w_ij = n_i n_j / (n_i + n_j)
//! ```
//!
//! where `n_i` is the population carried by the support points of area `i`. Pairs
//! backed by a sparse population receive a small weight. Optionally the
//! population-weighted mean rate `m*` is subtracted from every weighted squared
//! difference, which removes the Poisson noise contribution from the curve.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::lag_bins::bin_weighted_pairs;
use super::{ExperimentalVariogram, VariogramParams};
use crate::error::Result;
use crate::spatial_database::ArealDataSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedSemivarianceOptions {
    pub subtract_population_bias: bool,
}

/// Experimental semivariogram of the areal values of `data`, weighted by the areas'
/// point-support populations. Bins without a positively weighted pair are omitted.
pub fn weighted_semivariance(
    data: &ArealDataSet,
    params: &VariogramParams,
    options: &WeightedSemivarianceOptions,
) -> Result<ExperimentalVariogram> {
    let centroids = data.centroids();
    let bins = bin_weighted_pairs(&centroids, &data.populations, params)?;

    let bias = if options.subtract_population_bias {
        let all = (0..data.len()).collect::<Vec<_>>();
        data.weighted_mean(&all).unwrap_or(0.0)
    } else {
        0.0
    };

    let mut lags = Vec::new();
    let mut semivariance = Vec::new();
    let mut counts = Vec::new();

    for (bounds, pairs) in bins.populated() {
        let mut weight_sum = 0f64;
        let mut weighted_sq = 0f64;
        let mut count = 0u32;

        for pair in pairs.iter().filter(|p| p.weight > 0.0) {
            let diff = data.area(pair.i).value - data.area(pair.j).value;
            weighted_sq += pair.weight * diff * diff - bias;
            weight_sum += pair.weight;
            count += 1;
        }

        if count == 0 {
            continue;
        }

        lags.push(*bounds);
        semivariance.push(weighted_sq / (2.0 * weight_sum));
        counts.push(count);
    }

    debug!(
        n_areas = data.len(),
        n_bins = lags.len(),
        bias,
        "weighted semivariance computed"
    );

    Ok(ExperimentalVariogram::new(lags, semivariance, counts))
}
