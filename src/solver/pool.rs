//! Worker-pool fan-out across clusters. Each cluster's tour is independent
//! of every other cluster's, so they solve on a scoped rayon pool sized to
//! the host, built fresh per request and torn down on completion.

use std::collections::HashMap;
use std::time::Instant;

use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::distance::DistanceMatrix;
use crate::domain::types::{Cluster, ClusterTour, Ticket, TicketId};
use crate::solver::tour::{build_tour, SeedStrategy};

/// Solves every cluster's tour in parallel on a pool sized
/// `min(clusters.len(), available_parallelism)`. `deadline` is forwarded to
/// each tour build so in-flight 2-opt passes cut short if the request is
/// running late; clusters are still seeded and nearest-neighbor extended
/// even past the deadline so every ticket ends up somewhere.
pub fn solve_clusters(
    clusters: &[Cluster],
    tickets_by_id: &HashMap<TicketId, &Ticket>,
    urgency_of: &HashMap<TicketId, f64>,
    matrix: &DistanceMatrix,
    seed: SeedStrategy,
    cfg: &EngineConfig,
    deadline: Option<Instant>,
) -> Vec<ClusterTour> {
    if clusters.is_empty() {
        return Vec::new();
    }

    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let workers = clusters.len().min(available).max(1);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .expect("failed to build solver thread pool");

    pool.install(|| {
        clusters
            .par_iter()
            .map(|cluster| {
                build_tour(
                    cluster,
                    tickets_by_id,
                    urgency_of,
                    matrix,
                    seed,
                    cfg.two_opt_epsilon,
                    cfg.two_opt_max_iters,
                    deadline,
                )
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{DistanceModel, HaversineModel};
    use crate::domain::types::Priority;
    use crate::fixtures::test_support::basic_ticket;

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
                data[i][j] =
                    model.compute((tickets[i].lat, tickets[i].lon), (tickets[j].lat, tickets[j].lon));
            }
        }
        DistanceMatrix::new(&ids, data)
    }

    #[test]
    fn solves_every_cluster_and_covers_every_ticket() {
        let tickets = vec![
            basic_ticket(1, 0.0, 0.0),
            basic_ticket(2, 0.0, 0.001),
            basic_ticket(3, 10.0, 10.0),
            basic_ticket(4, 10.0, 10.001),
        ];
        let matrix = build_matrix(&tickets);
        let tickets_by_id: HashMap<TicketId, &Ticket> =
            tickets.iter().map(|t| (t.id, t)).collect();
        let urgency_of: HashMap<TicketId, f64> =
            tickets.iter().map(|t| (t.id, 1.0)).collect();

        let clusters = vec![
            Cluster {
                ticket_ids: vec![TicketId(1), TicketId(2)],
                centroid_lat: 0.0,
                centroid_lon: 0.0005,
                aggregate_priority: Priority::Medium,
                total_service_minutes: 20,
            },
            Cluster {
                ticket_ids: vec![TicketId(3), TicketId(4)],
                centroid_lat: 10.0,
                centroid_lon: 10.0005,
                aggregate_priority: Priority::Medium,
                total_service_minutes: 20,
            },
        ];

        let cfg = EngineConfig::default();
        let tours = solve_clusters(
            &clusters,
            &tickets_by_id,
            &urgency_of,
            &matrix,
            SeedStrategy::MaxUrgency,
            &cfg,
            None,
        );

        assert_eq!(tours.len(), 2);
        let covered: std::collections::HashSet<TicketId> =
            tours.iter().flat_map(|t| t.order.iter().copied()).collect();
        assert_eq!(covered.len(), 4);
    }
}
