pub mod ok_system;

pub use ok_system::SolvedOKSystem;
