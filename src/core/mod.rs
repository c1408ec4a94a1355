//! The core data types of the library.

pub mod tables;
pub mod tensor;

pub use tables::MutationTables;
pub use tensor::PopulationTensor;
