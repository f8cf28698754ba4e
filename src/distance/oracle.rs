//! Component A — pairwise distance/time with a concurrent memoizing cache.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;

use crate::domain::types::{Ticket, TicketId};
use crate::store::distance_cache::DistanceCacheStore;

/// A pair of ticket ids in canonical order: `(min(a,b), max(a,b))`.
pub type CacheKey = (TicketId, TicketId);

pub fn canonical_key(a: TicketId, b: TicketId) -> CacheKey {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// A swappable distance model. The shipped implementation is
/// haversine-only; a real-road-network provider implements the same trait.
pub trait DistanceModel: Send + Sync {
    fn compute(&self, a: (f64, f64), b: (f64, f64)) -> (f64, f64);
}

/// Great-circle distance with a flat travel-speed factor.
pub struct HaversineModel {
    pub earth_radius_km: f64,
    pub avg_speed_kmh: f64,
}

impl DistanceModel for HaversineModel {
    fn compute(&self, a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
        let (lat1, lon1) = a;
        let (lat2, lon2) = b;
        if (lat1, lon1) == (lat2, lon2) {
            return (0.0, 0.0);
        }

        let phi1 = lat1.to_radians();
        let phi2 = lat2.to_radians();
        let d_phi = (lat2 - lat1).to_radians();
        let d_lambda = (lon2 - lon1).to_radians();

        let sin_half_phi = (d_phi / 2.0).sin();
        let sin_half_lambda = (d_lambda / 2.0).sin();
        let h = sin_half_phi * sin_half_phi
            + phi1.cos() * phi2.cos() * sin_half_lambda * sin_half_lambda;
        let central_angle = 2.0 * h.sqrt().asin();

        let km = self.earth_radius_km * central_angle;
        let minutes = km / self.avg_speed_kmh * 60.0;
        (km, minutes)
    }
}

/// Pairwise distance oracle. Safe for many concurrent readers; writes to the
/// in-memory cache race harmlessly since every writer computes the same
/// value for a given key (last-writer-wins, compare-and-set semantics via
/// `DashMap::entry`).
pub struct DistanceOracle<M: DistanceModel> {
    model: M,
    memory_cache: DashMap<CacheKey, (f64, f64)>,
    backing_store: Option<Arc<dyn DistanceCacheStore>>,
}

impl<M: DistanceModel> DistanceOracle<M> {
    pub fn new(model: M) -> Self {
        DistanceOracle {
            model,
            memory_cache: DashMap::new(),
            backing_store: None,
        }
    }

    pub fn with_backing_store(model: M, store: Arc<dyn DistanceCacheStore>) -> Self {
        DistanceOracle {
            model,
            memory_cache: DashMap::new(),
            backing_store: Some(store),
        }
    }

    /// Convenience constructor for an optional backing store, so callers
    /// don't have to branch between `new` and `with_backing_store`.
    pub fn with_backing_store_opt(model: M, store: Option<Arc<dyn DistanceCacheStore>>) -> Self {
        DistanceOracle {
            model,
            memory_cache: DashMap::new(),
            backing_store: store,
        }
    }

    /// Returns (km, minutes) between two coordinates, memoizing under the
    /// canonical key. `distance(a, a) == (0, 0)`.
    pub async fn distance(&self, a: &Ticket, b: &Ticket) -> (f64, f64) {
        if a.id == b.id {
            return (0.0, 0.0);
        }
        let key = canonical_key(a.id, b.id);

        if let Some(cached) = self.memory_cache.get(&key) {
            return *cached;
        }

        if let Some(store) = &self.backing_store {
            match store.get(key).await {
                Ok(Some(value)) => {
                    self.memory_cache.insert(key, value);
                    return value;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "distance cache store read failed, computing in memory only");
                }
            }
        }

        let value = self.model.compute((a.lat, a.lon), (b.lat, b.lon));
        self.memory_cache.insert(key, value);

        if let Some(store) = &self.backing_store {
            if let Err(e) = store.put(key, value.0, value.1).await {
                warn!(error = %e, "distance cache store write failed, continuing with in-memory cache only");
            }
        }

        value
    }

    /// Batch variant: lazily fills a symmetric matrix for a ticket set.
    /// Returns distances indexed in the same order as `tickets`.
    pub async fn matrix(&self, tickets: &[Ticket]) -> Vec<Vec<(f64, f64)>> {
        let n = tickets.len();
        let mut out = vec![vec![(0.0, 0.0); n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let value = self.distance(&tickets[i], &tickets[j]).await;
                out[i][j] = value;
                out[j][i] = value;
            }
        }
        out
    }
}
