use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::error::{KrigingError, Result};
use crate::spatial_database::{AreaId, ArealUnit};

pub mod centroid_poisson_kriging;
pub mod neighborhood;

pub use centroid_poisson_kriging::CentroidPoissonKriging;
pub use neighborhood::{KrigingNeighborhood, Neighbor};

/// Smallest neighborhood size accepted by the predictor.
pub const MIN_NEIGHBORS: usize = 2;

/// Predictor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoissonKrigingParams {
    pub k_neighbors: usize,
    pub search_radius: f64,
    /// Add the Poisson sampling-error term to the diagonal of the kriging matrix.
    pub is_weighted: bool,
}

impl Default for PoissonKrigingParams {
    fn default() -> Self {
        Self {
            k_neighbors: 8,
            search_radius: f64::INFINITY,
            is_weighted: true,
        }
    }
}

impl PoissonKrigingParams {
    pub fn new(k_neighbors: usize, search_radius: f64, is_weighted: bool) -> Self {
        Self {
            k_neighbors,
            search_radius,
            is_weighted,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.k_neighbors < MIN_NEIGHBORS {
            return Err(KrigingError::InsufficientNeighbors {
                requested: self.k_neighbors,
                minimum: MIN_NEIGHBORS,
            });
        }
        if self.search_radius.is_nan() || self.search_radius <= 0.0 {
            return Err(KrigingError::InvalidParameter {
                name: "search_radius",
                value: self.search_radius,
                reason: "must be positive",
            });
        }
        Ok(())
    }
}

/// Area to predict. `true_value` is carried through to the result for validation only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnknownArea {
    pub id: AreaId,
    pub x: f64,
    pub y: f64,
    pub true_value: Option<f64>,
}

impl UnknownArea {
    pub fn new(id: AreaId, x: f64, y: f64) -> Self {
        Self {
            id,
            x,
            y,
            true_value: None,
        }
    }

    pub fn with_true_value(mut self, value: f64) -> Self {
        self.true_value = Some(value);
        self
    }

    #[inline(always)]
    pub fn centroid(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

impl From<ArealUnit> for UnknownArea {
    fn from(area: ArealUnit) -> Self {
        UnknownArea::new(area.id, area.x, area.y).with_true_value(area.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub area_id: AreaId,
    pub predicted_value: f64,
    pub error_variance: f64,
    pub true_value: Option<f64>,
    /// Neighbor area ids and their kriging weights, nearest first.
    pub weights: Vec<(AreaId, f64)>,
    pub lagrange_multiplier: f64,
}
