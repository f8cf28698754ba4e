//! A precomputed, ticket-indexed distance matrix. Built once per request via
//! the (async) `DistanceOracle`, then consumed synchronously by the
//! clustering/solving/stitching/validation stages so they can run on the
//! rayon worker pool without touching the async runtime.

use std::collections::HashMap;

use crate::domain::types::TicketId;

pub struct DistanceMatrix {
    index_of: HashMap<TicketId, usize>,
    /// `data[i][j] = (km, minutes)`, symmetric, zero on the diagonal.
    data: Vec<Vec<(f64, f64)>>,
}

impl DistanceMatrix {
    pub fn new(ids: &[TicketId], data: Vec<Vec<(f64, f64)>>) -> Self {
        let index_of = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        DistanceMatrix { index_of, data }
    }

    pub fn travel_minutes(&self, a: TicketId, b: TicketId) -> f64 {
        self.lookup(a, b).1
    }

    pub fn km(&self, a: TicketId, b: TicketId) -> f64 {
        self.lookup(a, b).0
    }

    fn lookup(&self, a: TicketId, b: TicketId) -> (f64, f64) {
        if a == b {
            return (0.0, 0.0);
        }
        let i = *self
            .index_of
            .get(&a)
            .unwrap_or_else(|| panic!("ticket {a:?} missing from distance matrix"));
        let j = *self
            .index_of
            .get(&b)
            .unwrap_or_else(|| panic!("ticket {b:?} missing from distance matrix"));
        self.data[i][j]
    }
}
