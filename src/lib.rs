pub mod error;
pub mod kriging;
pub mod spatial_database;
pub mod systems;
pub mod variography;

pub mod prelude {

    pub mod re_exports {
        pub use nalgebra;
        pub use rstar;
    }

    pub use crate::error::{KrigingError, Result};
    pub use crate::kriging::{
        CentroidPoissonKriging, PoissonKrigingParams, PredictionResult, UnknownArea,
    };
    pub use crate::spatial_database::{AreaId, ArealDataSet, ArealUnit, SupportPoint};
    pub use crate::variography::deconvolution::{deconvolve, Deconvolution, DeconvolutionOptions};
    pub use crate::variography::experimental::{
        weighted::{weighted_semivariance, WeightedSemivarianceOptions},
        ExperimentalVariogram, VariogramParams,
    };
    pub use crate::variography::model_variograms::{
        iso_fitter::{FitterOptions, VariogramFitter},
        theoretical::{TheoreticalVariogram, VariogramKind},
    };
}
