use std::fmt;

use serde::{Deserialize, Serialize};

use super::iso_exponential::IsoExponential;
use super::iso_gaussian::IsoGaussian;
use super::iso_linear::IsoLinear;
use super::iso_spherical::IsoSpherical;
use super::IsoVariogramModel;
use crate::variography::experimental::ExperimentalVariogram;

/// Candidate model families. Declaration order is the tie-break preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariogramKind {
    Spherical,
    Exponential,
    Gaussian,
    Linear,
}

impl VariogramKind {
    pub const ALL: [VariogramKind; 4] = [
        VariogramKind::Spherical,
        VariogramKind::Exponential,
        VariogramKind::Gaussian,
        VariogramKind::Linear,
    ];
}

impl fmt::Display for VariogramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariogramKind::Spherical => "spherical",
            VariogramKind::Exponential => "exponential",
            VariogramKind::Gaussian => "gaussian",
            VariogramKind::Linear => "linear",
        };
        f.write_str(name)
    }
}

/// A fitted isotropic semivariogram model.
///
/// Immutable once fitted; share it between predictions by reference or `Arc`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TheoreticalVariogram {
    Spherical(IsoSpherical),
    Exponential(IsoExponential),
    Gaussian(IsoGaussian),
    Linear(IsoLinear),
}

impl TheoreticalVariogram {
    pub fn new(kind: VariogramKind, nugget: f64, sill: f64, range: f64) -> Self {
        match kind {
            VariogramKind::Spherical => {
                TheoreticalVariogram::Spherical(IsoSpherical::new(nugget, sill, range))
            }
            VariogramKind::Exponential => {
                TheoreticalVariogram::Exponential(IsoExponential::new(nugget, sill, range))
            }
            VariogramKind::Gaussian => {
                TheoreticalVariogram::Gaussian(IsoGaussian::new(nugget, sill, range))
            }
            VariogramKind::Linear => {
                TheoreticalVariogram::Linear(IsoLinear::new(nugget, sill, range))
            }
        }
    }

    pub fn kind(&self) -> VariogramKind {
        match self {
            TheoreticalVariogram::Spherical(_) => VariogramKind::Spherical,
            TheoreticalVariogram::Exponential(_) => VariogramKind::Exponential,
            TheoreticalVariogram::Gaussian(_) => VariogramKind::Gaussian,
            TheoreticalVariogram::Linear(_) => VariogramKind::Linear,
        }
    }

    pub fn nugget(&self) -> f64 {
        match self {
            TheoreticalVariogram::Spherical(v) => v.nugget(),
            TheoreticalVariogram::Exponential(v) => v.nugget(),
            TheoreticalVariogram::Gaussian(v) => v.nugget(),
            TheoreticalVariogram::Linear(v) => v.nugget(),
        }
    }

    pub fn sill(&self) -> f64 {
        match self {
            TheoreticalVariogram::Spherical(v) => v.c_0(),
            TheoreticalVariogram::Exponential(v) => v.c_0(),
            TheoreticalVariogram::Gaussian(v) => v.c_0(),
            TheoreticalVariogram::Linear(v) => v.c_0(),
        }
    }

    pub fn range(&self) -> f64 {
        match self {
            TheoreticalVariogram::Spherical(v) => v.range(),
            TheoreticalVariogram::Exponential(v) => v.range(),
            TheoreticalVariogram::Gaussian(v) => v.range(),
            TheoreticalVariogram::Linear(v) => v.range(),
        }
    }

    /// `[nugget, sill, range]`
    pub fn params(&self) -> [f64; 3] {
        [self.nugget(), self.sill(), self.range()]
    }

    pub fn param_cnt(&self) -> usize {
        match self {
            TheoreticalVariogram::Spherical(_) => IsoSpherical::param_cnt(),
            TheoreticalVariogram::Exponential(_) => IsoExponential::param_cnt(),
            TheoreticalVariogram::Gaussian(_) => IsoGaussian::param_cnt(),
            TheoreticalVariogram::Linear(_) => IsoLinear::param_cnt(),
        }
    }

    pub fn update_params(&mut self, params: &[f64]) {
        match self {
            TheoreticalVariogram::Spherical(v) => v.update_from_slice(params),
            TheoreticalVariogram::Exponential(v) => v.update_from_slice(params),
            TheoreticalVariogram::Gaussian(v) => v.update_from_slice(params),
            TheoreticalVariogram::Linear(v) => v.update_from_slice(params),
        }
    }

    /// Whether the parameters satisfy `0 <= nugget < sill` and `range > 0`.
    pub fn in_parameter_box(&self) -> bool {
        let [nugget, sill, range] = self.params();
        nugget.is_finite()
            && sill.is_finite()
            && range.is_finite()
            && nugget >= 0.0
            && sill > nugget
            && range > 0.0
    }

    #[inline(always)]
    pub fn semivariance(&self, h: f64) -> f64 {
        match self {
            TheoreticalVariogram::Spherical(v) => v.variogram(h),
            TheoreticalVariogram::Exponential(v) => v.variogram(h),
            TheoreticalVariogram::Gaussian(v) => v.variogram(h),
            TheoreticalVariogram::Linear(v) => v.variogram(h),
        }
    }

    /// `sill - semivariance(h)`. Negative past the range for the linear model.
    #[inline(always)]
    pub fn covariance(&self, h: f64) -> f64 {
        match self {
            TheoreticalVariogram::Spherical(v) => v.covariogram(h),
            TheoreticalVariogram::Exponential(v) => v.covariogram(h),
            TheoreticalVariogram::Gaussian(v) => v.covariogram(h),
            TheoreticalVariogram::Linear(v) => v.covariogram(h),
        }
    }

    pub fn predict(&self, lags: &[f64]) -> Vec<f64> {
        lags.iter().map(|&h| self.semivariance(h)).collect()
    }

    /// Sum of squared differences to an experimental curve.
    pub fn fit_error(&self, experimental: &ExperimentalVariogram) -> f64 {
        experimental
            .iter()
            .map(|(h, gamma, _)| (gamma - self.semivariance(h)).powi(2))
            .sum()
    }
}
