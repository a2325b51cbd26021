use nalgebra::DVector;
use tracing::trace;

use crate::systems::system_builder::KrigingSystem;

/// Weights and Lagrange multiplier of a solved [`KrigingSystem`].
#[derive(Debug, Clone)]
pub struct SolvedOKSystem {
    pub weights: Vec<f64>,
    pub lagrange: f64,
    pub k0: DVector<f64>,
}

impl SolvedOKSystem {
    /// Solves by LU decomposition with partial pivoting. `None` when the matrix is
    /// singular or the solution is not finite. No regularization is attempted.
    pub fn solve(system: &KrigingSystem) -> Option<Self> {
        let n = system.n_cond();
        let solution = system.k_mat.clone().lu().solve(&system.k0)?;

        if solution.iter().any(|v| !v.is_finite()) {
            return None;
        }

        trace!(n_cond = n, lagrange = solution[n], "kriging system solved");

        Some(Self {
            weights: solution.rows(0, n).iter().copied().collect(),
            lagrange: solution[n],
            k0: system.k0.clone(),
        })
    }

    /// Weighted sum of the conditioning values.
    pub fn estimate(&self, values: &[f64]) -> f64 {
        self.weights.iter().zip(values).map(|(w, v)| w * v).sum()
    }

    /// Kriging variance `Σ λ_i γ_i0 + μ`.
    pub fn variance(&self) -> f64 {
        self.weights
            .iter()
            .zip(self.k0.iter())
            .map(|(w, g)| w * g)
            .sum::<f64>()
            + self.lagrange
    }
}
