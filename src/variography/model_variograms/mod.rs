pub mod iso_exponential;
pub mod iso_fitter;
pub mod iso_gaussian;
pub mod iso_linear;
pub mod iso_spherical;
pub mod theoretical;

/// `1 - e^{-3}`, the fraction of the partial sill the exponential and gaussian shapes reach
/// at `h = range`. Both are divided by it so they meet the sill at the range.
pub(crate) const PRACTICAL_SILL: f64 = 0.950_212_931_632_136;

/// Isotropic semivariogram structure with a nugget, a total sill and a range.
pub trait IsoVariogramModel {
    /// Total sill.
    fn c_0(&self) -> f64;
    fn nugget(&self) -> f64;
    fn range(&self) -> f64;

    /// Semivariance at lag `h`, 0 at the origin.
    fn variogram(&self, h: f64) -> f64;

    fn covariogram(&self, h: f64) -> f64 {
        self.c_0() - self.variogram(h)
    }
}
