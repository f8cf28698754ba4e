//! Component E — per-cluster tour construction: urgency- or
//! centroid-seeded nearest-neighbor construction followed by 2-opt
//! refinement. Pure CPU; safe to run on a worker-pool thread with no async
//! runtime in scope.

use std::collections::HashMap;
use std::time::Instant;

use crate::distance::{DistanceMatrix, DistanceModel, HaversineModel};
use crate::domain::types::{Cluster, ClusterTour, Ticket, TicketId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedStrategy {
    /// Seed with the ticket of maximum urgency (`mixed`/`urgency_first`).
    MaxUrgency,
    /// Seed with the ticket closest to the cluster centroid (`geographic`).
    ClosestToCentroid,
}

/// Builds and refines one cluster's tour. `deadline` is checked between
/// 2-opt passes; if it has already passed when called, the seed+
/// nearest-neighbor tour is still returned unrefined (a cheap, valid
/// fallback) rather than nothing.
pub fn build_tour(
    cluster: &Cluster,
    tickets_by_id: &HashMap<TicketId, &Ticket>,
    urgency_of: &HashMap<TicketId, f64>,
    matrix: &DistanceMatrix,
    seed: SeedStrategy,
    epsilon: f64,
    max_iters: usize,
    deadline: Option<Instant>,
) -> ClusterTour {
    let mut order = nearest_neighbor(cluster, tickets_by_id, urgency_of, matrix, seed);
    two_opt_refine(&mut order, matrix, epsilon, max_iters, deadline);

    ClusterTour {
        cluster: cluster.clone(),
        order,
    }
}

fn nearest_neighbor(
    cluster: &Cluster,
    tickets_by_id: &HashMap<TicketId, &Ticket>,
    urgency_of: &HashMap<TicketId, f64>,
    matrix: &DistanceMatrix,
    seed: SeedStrategy,
) -> Vec<TicketId> {
    let mut unvisited = cluster.ticket_ids.clone();
    if unvisited.is_empty() {
        return unvisited;
    }

    let seed_index = match seed {
        SeedStrategy::MaxUrgency => unvisited
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                urgency_of[a]
                    .partial_cmp(&urgency_of[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(0),
        SeedStrategy::ClosestToCentroid => {
            let model = HaversineModel {
                earth_radius_km: crate::config::constant::EARTH_RADIUS_KM,
                avg_speed_kmh: 30.0,
            };
            unvisited
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    let ta = tickets_by_id[a];
                    let tb = tickets_by_id[b];
                    let (da, _) = model.compute(
                        (ta.lat, ta.lon),
                        (cluster.centroid_lat, cluster.centroid_lon),
                    );
                    let (db, _) = model.compute(
                        (tb.lat, tb.lon),
                        (cluster.centroid_lat, cluster.centroid_lon),
                    );
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(i, _)| i)
                .unwrap_or(0)
        }
    };

    let mut order = Vec::with_capacity(unvisited.len());
    let seed_id = unvisited.remove(seed_index);
    order.push(seed_id);

    while !unvisited.is_empty() {
        let tail = *order.last().unwrap();
        let (next_index, _) = unvisited
            .iter()
            .enumerate()
            .map(|(i, &id)| (i, matrix.travel_minutes(tail, id)))
            .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .expect("unvisited is non-empty in this branch");
        order.push(unvisited.remove(next_index));
    }

    order
}

/// Reverses the segment between non-adjacent edges whenever doing so
/// shortens total travel time by more than `epsilon`, until a full pass
/// finds no improvement or `max_iters` passes have run.
fn two_opt_refine(
    order: &mut [TicketId],
    matrix: &DistanceMatrix,
    epsilon: f64,
    max_iters: usize,
    deadline: Option<Instant>,
) {
    let n = order.len();
    if n < 4 {
        return;
    }

    for _pass in 0..max_iters {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return;
            }
        }

        let mut improved = false;
        for i in 0..n - 1 {
            for j in (i + 2)..n {
                if i == 0 && j == n - 1 {
                    // (i, i+1) and (j, j+1) would both need a "wrap" edge
                    // that doesn't exist for an open tour; skip it.
                    continue;
                }
                let d_i = matrix.travel_minutes(order[i], order[i + 1]);
                let d_j = matrix.travel_minutes(order[j], order[(j + 1) % n]);
                let d_ij = matrix.travel_minutes(order[i], order[j]);
                let d_i1j1 = matrix.travel_minutes(order[i + 1], order[(j + 1) % n]);

                if j + 1 >= n {
                    // Last edge has no successor in an open tour.
                    if d_ij < d_i - epsilon {
                        order[i + 1..=j].reverse();
                        improved = true;
                    }
                    continue;
                }

                if d_ij + d_i1j1 < d_i + d_j - epsilon {
                    order[i + 1..=j].reverse();
                    improved = true;
                }
            }
        }

        if !improved {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::oracle::HaversineModel;
    use crate::fixtures::test_support::basic_ticket;
    use std::collections::HashMap as Map;

    fn build_matrix(tickets: &[Ticket]) -> DistanceMatrix {
        let model = HaversineModel {
            earth_radius_km: crate::config::constant::EARTH_RADIUS_KM,
            avg_speed_kmh: 30.0,
        };
        let ids: Vec<TicketId> = tickets.iter().map(|t| t.id).collect();
        let n = tickets.len();
        let mut data = vec![vec![(0.0, 0.0); n]; n];
        for i in 0..n {
            for j in 0..n {
                data[i][j] = model.compute((tickets[i].lat, tickets[i].lon), (tickets[j].lat, tickets[j].lon));
            }
        }
        DistanceMatrix::new(&ids, data)
    }

    #[test]
    fn two_opt_never_increases_tour_time() {
        // A deliberately crossed order that 2-opt should untangle.
        let tickets = vec![
            basic_ticket(1, 0.0, 0.0),
            basic_ticket(2, 0.0, 2.0),
            basic_ticket(3, 0.0, 1.0),
            basic_ticket(4, 0.0, 3.0),
        ];
        let matrix = build_matrix(&tickets);
        let ids: Vec<TicketId> = tickets.iter().map(|t| t.id).collect();

        let tour_time = |order: &[TicketId]| -> f64 {
            order.windows(2).map(|w| matrix.travel_minutes(w[0], w[1])).sum()
        };

        let seed_time = tour_time(&ids);
        let mut refined = ids.clone();
        two_opt_refine(&mut refined, &matrix, 1e-6, 50, None);
        let refined_time = tour_time(&refined);

        assert!(refined_time <= seed_time + 1e-9);
    }

    #[test]
    fn nearest_neighbor_seeds_with_max_urgency() {
        let tickets = vec![
            basic_ticket(1, 0.0, 0.0),
            basic_ticket(2, 0.0, 0.01),
            basic_ticket(3, 0.0, 0.02),
        ];
        let matrix = build_matrix(&tickets);
        let cluster = Cluster {
            ticket_ids: tickets.iter().map(|t| t.id).collect(),
            centroid_lat: 0.0,
            centroid_lon: 0.01,
            aggregate_priority: crate::domain::types::Priority::Medium,
            total_service_minutes: 30,
        };
        let tickets_by_id: Map<TicketId, &Ticket> = tickets.iter().map(|t| (t.id, t)).collect();
        let mut urgency_of = Map::new();
        urgency_of.insert(TicketId(1), 10.0);
        urgency_of.insert(TicketId(2), 10.0);
        urgency_of.insert(TicketId(3), 999.0);

        let order = nearest_neighbor(
            &cluster,
            &tickets_by_id,
            &urgency_of,
            &matrix,
            SeedStrategy::MaxUrgency,
        );
        assert_eq!(order[0], TicketId(3));
    }
}
