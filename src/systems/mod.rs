pub mod solved_systems;
pub mod system_builder;

pub use solved_systems::SolvedOKSystem;
pub use system_builder::{KrigingSystem, SemivarianceSystemBuilder};
