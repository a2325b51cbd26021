pub mod deconvolution;
pub mod experimental;
pub mod model_variograms;
pub mod regularization;
