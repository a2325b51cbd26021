//! Crate errors

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KrigingError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum KrigingError {
    /// Too few populated lag bins to fit a model.
    #[error("insufficient data: {bins} populated lag bins, at least {required} required")]
    InsufficientData { bins: usize, required: usize },

    /// Every candidate model violated the parameter box or failed to converge.
    #[error("no valid variogram model: {reason}")]
    NoValidModel { reason: String },

    #[error("insufficient neighbors: requested {requested}, at least {minimum} required")]
    InsufficientNeighbors { requested: usize, minimum: usize },

    #[error("no known area within search radius {search_radius} of area {area_id}")]
    NoNeighborsInRange { area_id: i64, search_radius: f64 },

    #[error("singular kriging system for area {area_id} ({n_neighbors} neighbors)")]
    SingularSystem { area_id: i64, n_neighbors: usize },

    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
