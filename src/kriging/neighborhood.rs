use nalgebra::Point2;
use tracing::debug;

use crate::error::{KrigingError, Result};
use crate::spatial_database::{AreaId, ArealDataSet};

use super::PoissonKrigingParams;

/// A known area selected to condition one prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position in the known [`ArealDataSet`].
    pub ind: usize,
    pub area_id: AreaId,
    pub centroid: Point2<f64>,
    pub value: f64,
    pub population: f64,
    /// Centroid distance to the kriging point.
    pub distance: f64,
}

/// Conditioning areas of a single prediction, nearest first.
#[derive(Debug, Clone)]
pub struct KrigingNeighborhood {
    pub neighbors: Vec<Neighbor>,
}

impl KrigingNeighborhood {
    /// Selects at most `k_neighbors` known areas whose centroid lies within `search_radius`
    /// of `kriging_point`.
    pub fn select(
        known: &ArealDataSet,
        area_id: AreaId,
        kriging_point: &Point2<f64>,
        params: &PoissonKrigingParams,
    ) -> Result<Self> {
        let neighbors = known
            .nearest_within(kriging_point, params.search_radius, params.k_neighbors)
            .into_iter()
            .map(|(ind, distance)| {
                let area = known.area(ind);
                Neighbor {
                    ind,
                    area_id: area.id,
                    centroid: area.centroid(),
                    value: area.value,
                    population: known.population(ind),
                    distance,
                }
            })
            .collect::<Vec<_>>();

        if neighbors.is_empty() {
            return Err(KrigingError::NoNeighborsInRange {
                area_id,
                search_radius: params.search_radius,
            });
        }

        debug!(area_id, n_neighbors = neighbors.len(), "neighborhood selected");

        Ok(Self { neighbors })
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn centroids(&self) -> Vec<Point2<f64>> {
        self.neighbors.iter().map(|n| n.centroid).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.neighbors.iter().map(|n| n.value).collect()
    }

    pub fn inds(&self) -> Vec<usize> {
        self.neighbors.iter().map(|n| n.ind).collect()
    }

    /// Poisson sampling-error terms `m* / n_i`, with `m*` the population-weighted mean
    /// of the neighborhood values.
    pub fn poisson_diagonal(&self, known: &ArealDataSet) -> Result<Vec<f64>> {
        if let Some(n) = self.neighbors.iter().find(|n| n.population <= 0.0) {
            return Err(KrigingError::InvalidInput(format!(
                "area {} has no support population, required for Poisson weighting",
                n.area_id
            )));
        }

        let Some(mean) = known.weighted_mean(&self.inds()) else {
            return Err(KrigingError::InvalidInput(
                "neighborhood has no support population".to_string(),
            ));
        };

        Ok(self.neighbors.iter().map(|n| mean / n.population).collect())
    }
}
