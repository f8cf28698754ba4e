pub mod distance_cache;
pub mod ticket_store;

pub use distance_cache::{DistanceCacheStore, NullDistanceCacheStore, SqliteDistanceCacheStore};
pub use ticket_store::{SqliteTicketStore, TicketStore};
