//! Iterative deconvolution of an areal semivariogram into a point-support model.
//!
//! A point model is fitted to the areal curve, regularized over the areas and compared
//! with the areal curve. The point curve is then rescaled by
//! `w(h) = 1 + (γ_areal(h) - γ_regularized(h)) / (s √i)` and refitted, keeping the model
//! whose regularization deviates least from the areal curve. When an iteration does
//! not improve, the rescaling weights are pulled halfway back towards 1.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::experimental::weighted::{weighted_semivariance, WeightedSemivarianceOptions};
use super::experimental::{ExperimentalVariogram, VariogramParams};
use super::model_variograms::iso_fitter::{FitterOptions, VariogramFitter};
use super::model_variograms::theoretical::TheoreticalVariogram;
use super::regularization::regularize;
use crate::error::{KrigingError, Result};
use crate::spatial_database::ArealDataSet;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeconvolutionOptions {
    pub max_iters: usize,
    /// Stop once the deviation falls below this fraction of the initial deviation.
    pub min_deviation_ratio: f64,
    /// Relative deviation change under which an iteration counts as stalled.
    pub min_deviation_decrease: f64,
    /// Consecutive stalled iterations before stopping.
    pub max_stalled: usize,
    pub weighting: WeightedSemivarianceOptions,
    pub fitter: FitterOptions,
}

impl Default for DeconvolutionOptions {
    fn default() -> Self {
        Self {
            max_iters: 25,
            min_deviation_ratio: 0.01,
            min_deviation_decrease: 0.001,
            max_stalled: 3,
            weighting: WeightedSemivarianceOptions::default(),
            fitter: FitterOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deconvolution {
    /// Point-support model whose regularization best matches the areal curve.
    pub point_model: TheoreticalVariogram,
    pub areal: ExperimentalVariogram,
    /// Regularization of `point_model` over the areas.
    pub regularized: ExperimentalVariogram,
    pub initial_deviation: f64,
    pub deviation: f64,
    pub iterations: usize,
}

/// Mean absolute difference between two curves over their shared lags, relative to the
/// mean of `reference`.
pub fn deviation(reference: &ExperimentalVariogram, other: &ExperimentalVariogram) -> f64 {
    let (mut diff, mut total) = (0f64, 0f64);
    for (lag, gamma) in reference.lags.iter().zip(reference.semivariance.iter()) {
        if let Some(k) = other.lags.iter().position(|l| l == lag) {
            diff += (gamma - other.semivariance[k]).abs();
            total += gamma;
        }
    }
    if total > 0.0 {
        diff / total
    } else {
        f64::INFINITY
    }
}

/// Rescaling weight per areal lag. Lags the regularized curve lacks keep a weight of 1.
fn rescaling_weights(
    areal: &ExperimentalVariogram,
    regularized: &ExperimentalVariogram,
    sill: f64,
    iter: usize,
) -> Vec<f64> {
    let scale = sill * (iter as f64).sqrt();
    areal
        .lags
        .iter()
        .zip(areal.semivariance.iter())
        .map(|(lag, gamma)| {
            match regularized.lags.iter().position(|l| l == lag) {
                Some(k) => 1.0 + (gamma - regularized.semivariance[k]) / scale,
                None => 1.0,
            }
        })
        .collect()
}

/// Deconvolutes the weighted areal semivariogram of `data` into a point-support model.
pub fn deconvolve(
    data: &ArealDataSet,
    params: &VariogramParams,
    options: &DeconvolutionOptions,
) -> Result<Deconvolution> {
    let areal = weighted_semivariance(data, params, &options.weighting)?;
    let initial = VariogramFitter::with_options(&areal, options.fitter)?.fit()?;
    let initial_reg = regularize(&initial, data, params)?;
    let initial_deviation = deviation(&areal, &initial_reg);
    if !initial_deviation.is_finite() {
        return Err(KrigingError::NoValidModel {
            reason: "regularized curve shares no lag with the areal curve".to_string(),
        });
    }

    let sill = initial.sill();
    let mut best = Deconvolution {
        point_model: initial,
        areal: areal.clone(),
        regularized: initial_reg,
        initial_deviation,
        deviation: initial_deviation,
        iterations: 0,
    };

    let mut weights = rescaling_weights(&areal, &best.regularized, sill, 1);
    let mut previous = initial_deviation;
    let mut stalled = 0;

    for iter in 1..=options.max_iters {
        if best.deviation <= options.min_deviation_ratio * initial_deviation {
            break;
        }
        best.iterations = iter;

        let rescaled = areal
            .lags
            .iter()
            .zip(weights.iter())
            .map(|(lag, w)| best.point_model.semivariance(lag.mid_point()) * w)
            .collect();
        let point_curve =
            ExperimentalVariogram::new(areal.lags.clone(), rescaled, areal.counts.clone());

        let candidate = match VariogramFitter::with_options(&point_curve, options.fitter)
            .and_then(|fitter| fitter.fit())
        {
            Ok(model) => model,
            Err(err) => {
                debug!(iter, %err, "refit of rescaled point curve failed");
                break;
            }
        };

        let regularized = regularize(&candidate, data, params)?;
        let current = deviation(&areal, &regularized);
        debug!(iter, deviation = current, best = best.deviation, "deconvolution step");

        if current < best.deviation {
            weights = rescaling_weights(&areal, &regularized, sill, iter + 1);
            best.point_model = candidate;
            best.regularized = regularized;
            best.deviation = current;
        } else {
            weights.iter_mut().for_each(|w| *w = 1.0 + (*w - 1.0) / 2.0);
        }

        if (previous - current).abs() <= options.min_deviation_decrease * previous {
            stalled += 1;
            if stalled >= options.max_stalled {
                break;
            }
        } else {
            stalled = 0;
        }
        previous = current;
    }

    info!(
        kind = %best.point_model.kind(),
        initial_deviation = best.initial_deviation,
        deviation = best.deviation,
        iterations = best.iterations,
        "areal semivariogram deconvoluted"
    );
    Ok(best)
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::*;
    use crate::spatial_database::{ArealUnit, SupportPoint};
    use crate::variography::experimental::LagBounds;

    /// 6 x 6 grid of 10 x 10 cells, four support points per cell.
    fn grid() -> ArealDataSet {
        let mut areas = vec![];
        let mut points = vec![];
        for id in 0..36 {
            let (col, row) = (id % 6, id / 6);
            let (x, y) = (col as f64 * 10.0 + 5.0, row as f64 * 10.0 + 5.0);
            let noise = ((col * 7 + row * 3) % 5) as f64 * 3.0;
            areas.push(ArealUnit::new(id, x, y, 50.0 + 1.5 * x + 0.5 * y + noise));
            for (dx, dy) in [(-2.5, -2.5), (2.5, -2.5), (-2.5, 2.5), (2.5, 2.5)] {
                let pop = 20.0 + ((id + (dx > 0.0) as i64) % 3) as f64 * 10.0;
                points.push(SupportPoint::new(id, x + dx, y + dy, pop));
            }
        }
        ArealDataSet::new(areas, &points).unwrap()
    }

    #[test]
    fn deviation_of_shared_lags() {
        let lags = vec![LagBounds::new(0.0, 1.0), LagBounds::new(1.0, 2.0)];
        let a = ExperimentalVariogram::new(lags.clone(), vec![2.0, 4.0], vec![1, 1]);
        let b = ExperimentalVariogram::new(vec![lags[1]], vec![3.0], vec![1]);

        assert_relative_eq!(deviation(&a, &a), 0.0);
        assert_relative_eq!(deviation(&a, &b), 0.25);
        let empty = ExperimentalVariogram::new(vec![], vec![], vec![]);
        assert_eq!(deviation(&b, &empty), f64::INFINITY);
    }

    #[test]
    fn weights_follow_the_gap() {
        let lags = vec![LagBounds::new(0.0, 1.0), LagBounds::new(1.0, 2.0)];
        let areal = ExperimentalVariogram::new(lags.clone(), vec![2.0, 4.0], vec![1, 1]);
        let reg = ExperimentalVariogram::new(vec![lags[0]], vec![1.0], vec![1]);

        let w = rescaling_weights(&areal, &reg, 4.0, 4);
        assert_relative_eq!(w[0], 1.0 + 1.0 / 8.0);
        assert_relative_eq!(w[1], 1.0);
    }

    #[test]
    fn deconvolution_never_worsens_the_fit() {
        let data = grid();
        let params = VariogramParams::new(10.0, 40.0);
        let options = DeconvolutionOptions {
            max_iters: 6,
            ..DeconvolutionOptions::default()
        };

        let res = deconvolve(&data, &params, &options).unwrap();

        assert!(res.point_model.in_parameter_box());
        assert!(res.initial_deviation.is_finite());
        assert!(res.deviation <= res.initial_deviation);
        assert!(res.iterations <= 6);
        assert_eq!(res.regularized.lags, res.areal.lags);
        assert_relative_eq!(
            deviation(&res.areal, &regularize(&res.point_model, &data, &params).unwrap()),
            res.deviation
        );
    }
}
