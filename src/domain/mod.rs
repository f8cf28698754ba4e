pub mod error;
pub mod types;

pub use error::{RouteEngineError, StoreError};
pub use types::*;
