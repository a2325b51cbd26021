//! Centroid-based Poisson kriging of areal data.
//!
//! Each area is reduced to its centroid. The conditioning areas of a prediction are the
//! `k` nearest known centroids within the search radius. With weighting enabled the
//! diagonal of the semivariance matrix carries the Poisson sampling-error term
//! `m* / n_i`, where `n_i` is the population of neighbor `i` and `m*` the
//! population-weighted mean of the neighborhood values, so sparsely populated areas are
//! trusted less.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{KrigingError, Result};
use crate::spatial_database::{total_population, ArealDataSet, SupportPoint};
use crate::systems::{SemivarianceSystemBuilder, SolvedOKSystem};
use crate::variography::model_variograms::theoretical::TheoreticalVariogram;

use super::{KrigingNeighborhood, PoissonKrigingParams, PredictionResult, UnknownArea};

/// Relative tolerance, in units of the model sill, under which a negative kriging
/// variance is treated as rounding and clamped to 0.
const VARIANCE_TOLERANCE: f64 = 1e-9;

/// Predictor over a fitted model and a set of known areas. Both are borrowed read-only,
/// so one predictor can serve any number of queries, including from several threads.
#[derive(Debug, Clone, Copy)]
pub struct CentroidPoissonKriging<'a> {
    model: &'a TheoreticalVariogram,
    known: &'a ArealDataSet,
}

impl<'a> CentroidPoissonKriging<'a> {
    pub fn new(model: &'a TheoreticalVariogram, known: &'a ArealDataSet) -> Self {
        Self { model, known }
    }

    pub fn model(&self) -> &TheoreticalVariogram {
        self.model
    }

    pub fn known(&self) -> &ArealDataSet {
        self.known
    }

    /// Predicts the value of `unknown` and its kriging error variance.
    ///
    /// # Arguments
    /// * `unknown` - area to predict, must not be one of the known areas
    /// * `unknown_points` - support points of the unknown area
    /// * `params` - neighborhood size, search radius and Poisson weighting switch
    pub fn predict(
        &self,
        unknown: &UnknownArea,
        unknown_points: &[SupportPoint],
        params: &PoissonKrigingParams,
    ) -> Result<PredictionResult> {
        params.validate()?;
        self.check_unknown(unknown, unknown_points)?;

        let kriging_point = unknown.centroid();
        let neighborhood =
            KrigingNeighborhood::select(self.known, unknown.id, &kriging_point, params)?;

        let diagonal = if params.is_weighted {
            Some(neighborhood.poisson_diagonal(self.known)?)
        } else {
            None
        };

        let system = SemivarianceSystemBuilder::build(
            &neighborhood.centroids(),
            &kriging_point,
            diagonal.as_deref(),
            self.model,
        );

        let Some(solved) = SolvedOKSystem::solve(&system) else {
            warn!(
                area_id = unknown.id,
                n_neighbors = neighborhood.len(),
                "singular kriging system"
            );
            return Err(KrigingError::SingularSystem {
                area_id: unknown.id,
                n_neighbors: neighborhood.len(),
            });
        };

        let predicted_value = solved.estimate(&neighborhood.values());
        let error_variance = self.clamp_variance(unknown, solved.variance());

        debug!(
            area_id = unknown.id,
            predicted_value,
            error_variance,
            "area predicted"
        );

        Ok(PredictionResult {
            area_id: unknown.id,
            predicted_value,
            error_variance,
            true_value: unknown.true_value,
            weights: neighborhood
                .neighbors
                .iter()
                .zip(solved.weights.iter())
                .map(|(n, &w)| (n.area_id, w))
                .collect(),
            lagrange_multiplier: solved.lagrange,
        })
    }

    /// Runs [`predict`](Self::predict) for every query in parallel. Results are returned
    /// in query order, failures included.
    pub fn predict_many(
        &self,
        queries: &[(UnknownArea, Vec<SupportPoint>)],
        params: &PoissonKrigingParams,
    ) -> Vec<Result<PredictionResult>> {
        queries
            .par_iter()
            .map(|(unknown, points)| self.predict(unknown, points, params))
            .collect()
    }

    fn check_unknown(&self, unknown: &UnknownArea, points: &[SupportPoint]) -> Result<()> {
        if !unknown.x.is_finite() || !unknown.y.is_finite() {
            return Err(KrigingError::InvalidInput(format!(
                "unknown area {} has a non-finite centroid ({}, {})",
                unknown.id, unknown.x, unknown.y
            )));
        }
        if self.known.contains(unknown.id) {
            return Err(KrigingError::InvalidInput(format!(
                "area {} is both known and unknown",
                unknown.id
            )));
        }
        for point in points {
            point.validate()?;
            if point.area_id != unknown.id {
                return Err(KrigingError::InvalidInput(format!(
                    "support point of area {} passed for unknown area {}",
                    point.area_id, unknown.id
                )));
            }
        }

        debug!(
            area_id = unknown.id,
            n_points = points.len(),
            population = total_population(points),
            "unknown area support"
        );
        Ok(())
    }

    fn clamp_variance(&self, unknown: &UnknownArea, variance: f64) -> f64 {
        if variance >= 0.0 {
            return variance;
        }
        if variance >= -VARIANCE_TOLERANCE * self.model.sill() {
            return 0.0;
        }
        warn!(area_id = unknown.id, variance, "negative kriging variance");
        variance
    }
}
