pub mod generator;
pub mod test_support;

pub use generator::{generate_tickets, GeneratorConfig};
