pub mod dbscan;

pub use dbscan::cluster;
