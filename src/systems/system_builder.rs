use nalgebra::{DMatrix, DVector, Point2};

use crate::variography::model_variograms::theoretical::TheoreticalVariogram;

/// Ordinary kriging system in semivariance form, bordered by the unbiasedness constraint.
///
/// ```text
/// | γ_11 + d_1 ... γ_1n       1 | | λ_1 |   | γ_10 |
/// |   ...                   ... | | ... | = | ...  |
/// | γ_n1       ... γ_nn + d_n 1 | | λ_n |   | γ_n0 |
/// |   1        ...    1       0 | |  μ  |   |  1   |
/// ```
///
/// `d_i` is the per-sample diagonal term, the Poisson correction when weighting is on.
#[derive(Debug, Clone)]
pub struct KrigingSystem {
    pub k_mat: DMatrix<f64>,
    pub k0: DVector<f64>,
}

impl KrigingSystem {
    pub fn n_cond(&self) -> usize {
        self.k0.len() - 1
    }
}

pub struct SemivarianceSystemBuilder;

impl SemivarianceSystemBuilder {
    /// Semivariance between every pair of conditioning centroids. Only the lower triangle
    /// is evaluated and mirrored.
    pub fn build_semivariance_mat(
        cond: &[Point2<f64>],
        diagonal: Option<&[f64]>,
        vgram: &TheoreticalVariogram,
    ) -> DMatrix<f64> {
        let n = cond.len();
        let mut k_mat = DMatrix::zeros(n + 1, n + 1);

        for (i, p1) in cond.iter().enumerate() {
            for (j, p2) in cond.iter().enumerate().take(i + 1) {
                let gamma = vgram.semivariance(nalgebra::distance(p1, p2));
                k_mat[(i, j)] = gamma;
                k_mat[(j, i)] = gamma;
            }
            k_mat[(i, n)] = 1.0;
            k_mat[(n, i)] = 1.0;
        }

        if let Some(diagonal) = diagonal {
            for (i, d) in diagonal.iter().enumerate().take(n) {
                k_mat[(i, i)] += d;
            }
        }

        k_mat
    }

    /// Semivariance from each conditioning centroid to the kriging point, followed by the
    /// constraint entry.
    pub fn build_semivariance_vec(
        cond: &[Point2<f64>],
        kriging_point: &Point2<f64>,
        vgram: &TheoreticalVariogram,
    ) -> DVector<f64> {
        let n = cond.len();
        DVector::from_fn(n + 1, |i, _| {
            if i == n {
                1.0
            } else {
                vgram.semivariance(nalgebra::distance(&cond[i], kriging_point))
            }
        })
    }

    pub fn build(
        cond: &[Point2<f64>],
        kriging_point: &Point2<f64>,
        diagonal: Option<&[f64]>,
        vgram: &TheoreticalVariogram,
    ) -> KrigingSystem {
        KrigingSystem {
            k_mat: Self::build_semivariance_mat(cond, diagonal, vgram),
            k0: Self::build_semivariance_vec(cond, kriging_point, vgram),
        }
    }
}
