pub mod areal_data_set;

pub use areal_data_set::{total_population, AreaId, ArealDataSet, ArealUnit, SupportPoint};
