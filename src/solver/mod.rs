pub mod pool;
pub mod tour;

pub use pool::solve_clusters;
pub use tour::{build_tour, SeedStrategy};
