pub mod matrix;
pub mod oracle;

pub use matrix::DistanceMatrix;
pub use oracle::{canonical_key, DistanceModel, DistanceOracle, HaversineModel};
